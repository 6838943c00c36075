use serde::{Deserialize, Serialize};

/// How many items of a gated dataset a basic user sees.
pub const BASIC_ITEM_LIMIT: usize = 20;

/// Entitlement tier. Pro is bought once and unlocks the full datasets.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Basic,
    Pro,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Basic => "basic",
            Role::Pro => "pro",
        }
    }

    /// How many items of a role-gated dataset this role may see.
    pub fn visible_limit(&self, basic_limit: usize) -> Option<usize> {
        match self {
            Role::Basic => Some(basic_limit),
            Role::Pro => None,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Role::Basic),
            "pro" => Ok(Role::Pro),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct User {
    pub id: String,
    pub role: Role,
    pub tries: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_basic_is_limited() {
        assert_eq!(Role::Basic.visible_limit(20), Some(20));
        assert_eq!(Role::Pro.visible_limit(20), None);
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!("pro".parse::<Role>(), Ok(Role::Pro));
        assert_eq!(Role::Basic.as_str(), "basic");
        assert!("admin".parse::<Role>().is_err());
    }
}

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// A fresh generator for exam assembly and random flashcard draws.
pub fn seeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(entropy())
}

#[cfg(target_arch = "wasm32")]
fn entropy() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64 ^ js_sys::Date::now() as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy() -> u64 {
    let now = chrono::Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros()) as u64
}

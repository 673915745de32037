//! Fuzz target: configuration parsing and validation
//!
//! Any JSON that parses must validate without panicking, and a config
//! that validates must yield usable derived parameters.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use lightwatch::config::SystemConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<SystemConfig>(data) else {
        return;
    };
    if config.validate().is_ok() {
        assert!(config.buffer_capacity() >= config.detect_lag() + 1);
        assert!(config.sequence_len <= config.buffer_capacity());
        assert!(config.actuation_settle_ticks() >= 2);
        assert!(config.frame_shape().len() > 0);
    }
});

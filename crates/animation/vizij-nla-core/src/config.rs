//! Core configuration for vizij-nla-core.

use serde::{Deserialize, Serialize};

/// Configuration for scratch sizing and evaluation policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial capacity hint for the reusable accumulation buffer.
    pub scratch_channels: usize,

    /// Upper bound on nested strip evaluation (meta inside transition inside meta...).
    pub max_strip_depth: usize,

    /// Reset channels that some enabled action animates, but that no active strip wrote
    /// this pass, to the property default. Keeps the result a pure function of time.
    pub reset_untouched_channels: bool,

    /// Memoise `(owner, path) -> handle` resolutions across evaluations.
    pub cache_bindings: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scratch_channels: 256,
            max_strip_depth: 32,
            reset_untouched_channels: true,
            cache_bindings: true,
        }
    }
}

//! Heap tuning knobs.
//!
//! Both knobs can be overridden through the environment:
//! `SEGFIT_CHUNK_SIZE` sets the heap-extension granularity in bytes and
//! `SEGFIT_MAX_HEAP` sets the sbrk provider's ceiling. Values that fail to
//! parse fall back to the compiled defaults.

use std::sync::OnceLock;

/// Default heap-extension granularity in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = (1 << 8) - (1 << 5);

/// Default ceiling for the managed region.
pub const DEFAULT_MAX_HEAP: usize = 20 * (1 << 20);

/// Tuning parameters for a [`HeapState`](crate::HeapState).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Minimum number of bytes each heap extension requests from the sbrk
    /// provider. Larger allocations extend by their own size instead.
    pub chunk_size: usize,
    /// Upper bound on the total managed region size in bytes.
    pub max_heap: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_heap: DEFAULT_MAX_HEAP,
        }
    }
}

impl HeapConfig {
    /// Returns the process-wide configuration, reading the environment on
    /// first call and caching the result thereafter.
    pub fn from_env() -> Self {
        static GLOBAL: OnceLock<HeapConfig> = OnceLock::new();
        *GLOBAL.get_or_init(|| {
            let defaults = HeapConfig::default();
            HeapConfig {
                chunk_size: parse_env("SEGFIT_CHUNK_SIZE", defaults.chunk_size),
                max_heap: parse_env("SEGFIT_MAX_HEAP", defaults.max_heap),
            }
        })
    }
}

fn parse_env(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_size_value() {
        assert_eq!(DEFAULT_CHUNK_SIZE, 224);
        assert_eq!(HeapConfig::default().chunk_size, 224);
    }

    #[test]
    fn default_ceiling_is_twenty_mebibytes() {
        assert_eq!(HeapConfig::default().max_heap, 20 * 1024 * 1024);
    }
}

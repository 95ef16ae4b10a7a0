//! Error types for heap construction and growth.

use thiserror::Error;

/// Failures surfaced by the sbrk provider and heap construction.
///
/// Allocation-path callers never see these directly: `malloc`, `realloc` and
/// `calloc` translate exhaustion into a `None` return, leaving any original
/// block untouched. Construction (`HeapState::new`) propagates them.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// The sbrk provider cannot grow the region within its configured
    /// ceiling.
    #[error("sbrk provider exhausted: {requested} bytes requested, {available} bytes available")]
    OutOfMemory {
        /// Bytes the caller asked for.
        requested: usize,
        /// Bytes remaining under the configured ceiling.
        available: usize,
    },
    /// Growing the region would push it past the 32-bit offset space that
    /// free-list links are encoded in.
    #[error("managed region of {current} bytes cannot grow by {requested} without exceeding 32-bit offsets")]
    AddressSpaceExceeded {
        /// Current region size in bytes.
        current: usize,
        /// Requested growth in bytes.
        requested: usize,
    },
    /// The supplied [`HeapConfig`](crate::HeapConfig) cannot describe a
    /// working heap.
    #[error("invalid heap configuration: {reason}")]
    InvalidConfig {
        /// Human-readable rejection reason.
        reason: &'static str,
    },
}

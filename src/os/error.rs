//! Error types for kernel setup
//!
//! Blocking primitives report timeouts as values; only the configuration
//! surface (init, registration, start) can fail.

/// Kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ OS state errors ============
    /// OS is already running
    OsRunning = 24202,
    /// OS not initialized
    OsNotInit = 24203,
    /// No application process registered
    OsNoAppTask = 24204,

    // ============ Priority errors ============
    /// Priority outside the configured range, or reserved for idle
    PrioInvalid = 25203,

    // ============ Stack errors ============
    /// Stack region is empty
    StkInvalid = 28207,
    /// Stack smaller than `CFG_STK_SIZE_MIN`
    StkSizeInvalid = 28208,
}

/// Result type alias for kernel setup operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Numeric error code
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

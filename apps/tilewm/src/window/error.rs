use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

/// Counts failures the manager tolerates instead of propagating.
pub struct ErrorTracker {
    protocol_errors: AtomicU64,
    request_errors: AtomicU64,
    window_errors: AtomicU64,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self {
            protocol_errors: AtomicU64::new(0),
            request_errors: AtomicU64::new(0),
            window_errors: AtomicU64::new(0),
        }
    }

    /// An asynchronous X11 error report, usually a request on a window that
    /// has since been destroyed.
    pub fn record_protocol_error(&self, description: impl std::fmt::Display) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
        error!("X11 error: {}", description);
    }

    pub fn record_request_error(&self, operation: &str, error: impl std::fmt::Display) {
        self.request_errors.fetch_add(1, Ordering::Relaxed);
        warn!("X11 request failed in {}: {}", operation, error);
    }

    pub fn record_window_error(&self, operation: &str, error: impl std::fmt::Display) {
        self.window_errors.fetch_add(1, Ordering::Relaxed);
        error!("Window management error in {}: {}", operation, error);
    }

    pub fn warn_if_failed<T, E: std::fmt::Display>(
        &self,
        result: Result<T, E>,
        operation: &str,
        category: ErrorCategory,
    ) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                match category {
                    ErrorCategory::Protocol => self.record_protocol_error(format!("{}: {}", operation, e)),
                    ErrorCategory::Request => self.record_request_error(operation, e),
                    ErrorCategory::Window => self.record_window_error(operation, e),
                }
                None
            }
        }
    }

    pub fn summary(&self) -> ErrorSummary {
        ErrorSummary {
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            request_errors: self.request_errors.load(Ordering::Relaxed),
            window_errors: self.window_errors.load(Ordering::Relaxed),
        }
    }
}

pub enum ErrorCategory {
    Protocol,
    Request,
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSummary {
    pub protocol_errors: u64,
    pub request_errors: u64,
    pub window_errors: u64,
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Log and ignore X11 errors (for cleanup operations)
pub fn log_and_ignore<T, E: std::fmt::Display>(result: Result<T, E>, operation: &str) {
    if let Err(e) = result {
        debug!("Ignoring error in {}: {}", operation, e);
    }
}

/// Log warning for non-critical errors
pub fn log_warn<T, E: std::fmt::Display>(result: Result<T, E>, operation: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Warning in {}: {}", operation, e);
            None
        }
    }
}

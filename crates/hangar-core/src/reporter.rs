//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

use hangar_schema::ModId;

/// Sink for progress and status messages.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Resolving", "Installing").
    fn section(&self, title: &str);

    /// Fraction (0.0 to 1.0) of the repository refresh completed so far.
    fn refreshing(&self, fraction: f64);

    /// Updates the progress of a mod archive download.
    fn downloading(&self, id: &ModId, current: u64, total: Option<u64>);

    /// The archive of `id` is being unpacked.
    fn extracting(&self, id: &ModId);

    /// `current` of `total` files of `id` have been copied.
    fn installing(&self, id: &ModId, current: usize, total: usize);

    /// The files of `id` are being deleted.
    fn removing(&self, id: &ModId);

    /// Marks a mod operation as successfully completed.
    fn done(&self, id: &ModId, detail: &str);

    /// Marks a mod operation as failed with a specific reason.
    fn failed(&self, id: &ModId, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn refreshing(&self, fraction: f64) {
        (**self).refreshing(fraction);
    }
    fn downloading(&self, id: &ModId, current: u64, total: Option<u64>) {
        (**self).downloading(id, current, total);
    }
    fn extracting(&self, id: &ModId) {
        (**self).extracting(id);
    }
    fn installing(&self, id: &ModId, current: usize, total: usize) {
        (**self).installing(id, current, total);
    }
    fn removing(&self, id: &ModId) {
        (**self).removing(id);
    }
    fn done(&self, id: &ModId, detail: &str) {
        (**self).done(id, detail);
    }
    fn failed(&self, id: &ModId, reason: &str) {
        (**self).failed(id, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn refreshing(&self, _: f64) {}
    fn downloading(&self, _: &ModId, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &ModId) {}
    fn installing(&self, _: &ModId, _: usize, _: usize) {}
    fn removing(&self, _: &ModId) {}
    fn done(&self, _: &ModId, _: &str) {}
    fn failed(&self, _: &ModId, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}

//! Reporter trait for dependency injection
//!
//! Core engines report progress through this trait so they never depend on
//! a terminal. The CLI supplies a styled implementation; tests use
//! [`NullReporter`] or their own recorder.

use apkg_schema::{PackageName, Version};

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Fetching", "Installing").
    fn section(&self, title: &str);

    /// Updates the progress of a download.
    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>);

    /// Updates the state of a package to 'extracting'.
    fn extracting(&self, name: &PackageName, version: &Version);

    /// Updates the state of a package to 'installing'.
    fn installing(&self, name: &PackageName, version: &Version);

    /// Updates the state of a package to 'removing'.
    fn removing(&self, name: &PackageName, version: &Version);

    /// Marks a package operation as successfully completed.
    fn done(&self, name: &PackageName, version: &Version, detail: &str);

    /// Marks a package operation as failed with a specific reason.
    fn failed(&self, name: &PackageName, version: &Version, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);

    /// Display a final summary without timing information.
    fn summary_plain(&self, count: usize, status: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        (**self).downloading(name, version, current, total);
    }
    fn extracting(&self, name: &PackageName, version: &Version) {
        (**self).extracting(name, version);
    }
    fn installing(&self, name: &PackageName, version: &Version) {
        (**self).installing(name, version);
    }
    fn removing(&self, name: &PackageName, version: &Version) {
        (**self).removing(name, version);
    }
    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        (**self).done(name, version, detail);
    }
    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        (**self).failed(name, version, reason);
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
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
    fn summary_plain(&self, count: usize, status: &str) {
        (**self).summary_plain(count, status);
    }
}

/// A no-op reporter for silent operations (e.g., catalog probes, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &PackageName, _: &Version, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &PackageName, _: &Version) {}
    fn installing(&self, _: &PackageName, _: &Version) {}
    fn removing(&self, _: &PackageName, _: &Version) {}
    fn done(&self, _: &PackageName, _: &Version, _: &str) {}
    fn failed(&self, _: &PackageName, _: &Version, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
    fn summary_plain(&self, _: usize, _: &str) {}
}

//! Progress-callback trait for per-document preparation events.
//!
//! Inject an [`Arc<dyn PrepareProgressCallback>`] via
//! [`crate::config::PrepareConfigBuilder::progress_callback`] to receive
//! events as the orchestrator walks the input tree.
//!
//! The library never draws anything itself: the CLI forwards these events to
//! an `indicatif` bar, tests count them, and other hosts may log them.
//!
//! # Example
//!
//! ```rust
//! use kbprep::{PrepareConfig, PrepareProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     artifacts: AtomicUsize,
//! }
//!
//! impl PrepareProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, _index: usize, _total: usize, rel: &str, artifacts: usize) {
//!         self.artifacts.fetch_add(artifacts, Ordering::SeqCst);
//!         eprintln!("{rel}: {artifacts} artifact(s)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { artifacts: AtomicUsize::new(0) });
//!
//! let config = PrepareConfig::builder()
//!     .progress_callback(counter as Arc<dyn PrepareProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::prepare()`] as it processes each source document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based; `total` counts every discovered
/// file, supported or not.
pub trait PrepareProgressCallback: Send + Sync {
    /// Called once, after discovery and before the first document.
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a supported document is handed to its extractor.
    fn on_document_start(&self, index: usize, total: usize, rel: &str) {
        let _ = (index, total, rel);
    }

    /// Called after every artifact of a document has been recorded.
    ///
    /// # Arguments
    /// * `artifacts` — number of manifest entries produced (PDF chunks count
    ///   individually)
    fn on_document_complete(&self, index: usize, total: usize, rel: &str, artifacts: usize) {
        let _ = (index, total, rel, artifacts);
    }

    /// Called when a file produces no artifact: unsupported extension, or an
    /// extractor that returned no chunks.
    fn on_document_skipped(&self, index: usize, total: usize, rel: &str, reason: &str) {
        let _ = (index, total, rel, reason);
    }

    /// Called once after the manifest files are written (or would have been,
    /// in a dry run).
    fn on_run_complete(&self, documents: usize, artifacts: usize) {
        let _ = (documents, artifacts);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl PrepareProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PrepareConfig`].
pub type ProgressCallback = Arc<dyn PrepareProgressCallback>;

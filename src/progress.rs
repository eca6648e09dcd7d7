//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionOptionsBuilder::progress_callback`] to receive
//! events as the pipeline renders code blocks and embeds images. Image
//! embedding is the only slow stage (decode, resize, re-encode), so most
//! events concern individual `<img>` references.
//!
//! # Example
//!
//! ```rust
//! use md2wx_html::{ConversionOptions, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     embedded: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, size_bytes: usize) {
//!         self.embedded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("image #{index} embedded ({size_bytes} bytes)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { embedded: AtomicUsize::new(0) });
//!
//! let options = ConversionOptions::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it works through a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` so one
/// options value can be shared by conversions running on different threads.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after code-block extraction.
    ///
    /// # Arguments
    /// * `code_blocks` — number of fenced code blocks found
    fn on_conversion_start(&self, code_blocks: usize) {
        let _ = code_blocks;
    }

    /// Called before a local image is read and encoded.
    ///
    /// # Arguments
    /// * `index` — 0-based position of the `<img>` in the document
    /// * `src`   — the decoded source path as written in the document
    fn on_image_start(&self, index: usize, src: &str) {
        let _ = (index, src);
    }

    /// Called when an image was replaced by a data URI.
    ///
    /// # Arguments
    /// * `index`      — 0-based position of the `<img>` in the document
    /// * `size_bytes` — size of the encoded image payload (before base64)
    fn on_image_complete(&self, index: usize, size_bytes: usize) {
        let _ = (index, size_bytes);
    }

    /// Called when an image could not be embedded.
    fn on_image_error(&self, index: usize, error: &str) {
        let _ = (index, error);
    }

    /// Called once when the result record is assembled.
    fn on_conversion_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionOptions`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        blocks: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, code_blocks: usize) {
            self.blocks.store(code_blocks, Ordering::SeqCst);
        }

        fn on_image_start(&self, _index: usize, _src: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _index: usize, _size_bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_error(&self, _index: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(2);
        cb.on_image_start(0, "a.png");
        cb.on_image_complete(0, 42);
        cb.on_image_error(1, "Image not found: b.png");
        cb.on_conversion_complete(false);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_conversion_start(3);
        tracker.on_image_start(0, "a.png");
        tracker.on_image_complete(0, 100);
        tracker.on_image_start(1, "b.png");
        tracker.on_image_error(1, "Image not found: b.png");

        assert_eq!(tracker.blocks.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ConversionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(0);
        cb.on_conversion_complete(true);
    }
}

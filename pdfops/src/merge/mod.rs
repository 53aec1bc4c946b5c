//! Merge engine: combine the pages of several documents into one.
//!
//! # Examples
//!
//! ```no_run
//! use pdfops::config::{MergeMode, MergeOptions};
//!
//! # fn example(a: Vec<u8>, b: Vec<u8>) -> pdfops::Result<()> {
//! let options = MergeOptions {
//!     mode: MergeMode::Interleave,
//!     include_bookmarks: true,
//! };
//! let output = pdfops::merge::merge(&[a, b], &options)?;
//! println!("{} pages", output.page_count);
//! # Ok(())
//! # }
//! ```

pub mod bookmarks;
pub mod merger;

pub use bookmarks::{Bookmark, BookmarkManager};
pub use merger::{MIN_SOURCES, MergeOutput, MergeStatistics, Merger, page_order};

use crate::config::MergeOptions;
use crate::error::Result;

/// Merge source buffers with a default [`Merger`].
///
/// # Errors
///
/// See [`Merger::merge`].
pub fn merge<B: AsRef<[u8]>>(sources: &[B], options: &MergeOptions) -> Result<MergeOutput> {
    Merger::new().merge(sources, options)
}

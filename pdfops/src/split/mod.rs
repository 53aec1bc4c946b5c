//! Split engine: partition a document's pages into new documents.
//!
//! Three strategies are supported, selected by [`SplitOptions`]:
//!
//! - `Single`: one document per page
//! - `Ranges`: one document per range expression (`"5"`, `"4-8"`)
//! - `Every(n)`: consecutive chunks of `n` pages

pub mod partition;
pub mod splitter;

pub use partition::{Partition, PartitionLabel, plan};
pub use splitter::{SplitPart, Splitter};

use crate::config::SplitOptions;
use crate::error::Result;

/// Split a buffer with a default [`Splitter`].
///
/// # Errors
///
/// See [`Splitter::split`].
pub fn split(source: &[u8], options: &SplitOptions) -> Result<Vec<SplitPart>> {
    Splitter::new().split(source, options)
}

//! Partition planning for splits.
//!
//! Planning is a pure function of the page count and the options, so every
//! bounds and stride rule can be checked without touching a document.

use std::fmt;

use crate::config::{RangeSpec, SplitOptions};
use crate::error::Result;

/// What produced a partition; drives the result file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionLabel {
    /// One page in `single` mode.
    Page(u32),
    /// One range expression in `ranges` mode.
    Range(RangeSpec),
    /// The k-th chunk (1-based) in `every` mode.
    Chunk(usize),
}

impl fmt::Display for PartitionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(page) | Self::Range(RangeSpec::Page(page)) => write!(f, "page-{page}"),
            Self::Range(RangeSpec::Span { start, end }) => write!(f, "pages-{start}-{end}"),
            Self::Chunk(k) => write!(f, "part-{k}"),
        }
    }
}

/// An ordered subset of source pages assigned to one result document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// 1-based page numbers in result order.
    pub pages: Vec<u32>,

    /// Origin of the partition.
    pub label: PartitionLabel,
}

impl Partition {
    /// Zero-based page indices, as the codec expects them.
    pub fn indices(&self) -> Vec<usize> {
        self.pages.iter().map(|&p| p as usize - 1).collect()
    }

    /// Suggested file-name suffix, e.g. `page-3`, `pages-4-8`, `part-2`.
    pub fn suffix(&self) -> String {
        self.label.to_string()
    }
}

/// Plan the partitions of a document with `page_count` pages.
///
/// A zero-page document yields no partitions in every mode.
///
/// # Errors
///
/// Returns `InvalidRange` naming the first range expression that reaches
/// past the last page.
pub fn plan(page_count: usize, options: &SplitOptions) -> Result<Vec<Partition>> {
    if page_count == 0 {
        return Ok(Vec::new());
    }

    let last = u32::try_from(page_count).unwrap_or(u32::MAX);

    let partitions = match options {
        SplitOptions::Single => (1..=last)
            .map(|page| Partition {
                pages: vec![page],
                label: PartitionLabel::Page(page),
            })
            .collect(),
        SplitOptions::Ranges(ranges) => ranges
            .iter()
            .map(|range| {
                Ok(Partition {
                    pages: range.pages(page_count)?,
                    label: PartitionLabel::Range(*range),
                })
            })
            .collect::<Result<Vec<_>>>()?,
        SplitOptions::Every(stride) => {
            let pages: Vec<u32> = (1..=last).collect();
            pages
                .chunks(stride.get() as usize)
                .enumerate()
                .map(|(k, chunk)| Partition {
                    pages: chunk.to_vec(),
                    label: PartitionLabel::Chunk(k + 1),
                })
                .collect()
        }
    };

    Ok(partitions)
}

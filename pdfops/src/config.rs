//! Typed operation options.
//!
//! Options arrive from the outside world as loosely-typed JSON objects
//! (`RawMergeOptions`, `RawSplitOptions`, `RawCompressOptions`). They are
//! decoded and validated exactly once, at the boundary, into the typed
//! forms the engines consume.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use tracing::warn;

use crate::error::{PdfOpsError, Result};

/// Page order strategy for merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// All pages of the first source, then all pages of the second, etc.
    #[default]
    Concatenate,
    /// Page 1 of every source, then page 2 of every source, etc.
    Interleave,
}

impl FromStr for MergeMode {
    type Err = PdfOpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "concatenate" | "sequential" | "append" => Ok(Self::Concatenate),
            "interleave" | "alternate" => Ok(Self::Interleave),
            _ => Err(PdfOpsError::invalid_options(format!(
                "Invalid merge mode: {s}. Must be one of: concatenate, interleave"
            ))),
        }
    }
}

/// Options for the merge engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    /// Page ordering.
    pub mode: MergeMode,
    /// Retain each source's outline with remapped destinations.
    pub include_bookmarks: bool,
}

/// A single range expression: `"5"` or `"4-8"` (1-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// One page.
    Page(u32),
    /// An inclusive span of pages.
    Span {
        /// First page (1-based).
        start: u32,
        /// Last page (1-based, inclusive).
        end: u32,
    },
}

impl RangeSpec {
    /// Parse a range expression.
    ///
    /// Syntax is checked here; bounds against a concrete document are
    /// checked by [`RangeSpec::pages`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidRangeSyntax` for non-numeric parts and reversed
    /// spans. Page `0` parses; it is rejected as out of bounds by
    /// [`RangeSpec::pages`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfops::config::RangeSpec;
    ///
    /// assert_eq!(RangeSpec::parse("5").unwrap(), RangeSpec::Page(5));
    /// assert_eq!(
    ///     RangeSpec::parse("4-8").unwrap(),
    ///     RangeSpec::Span { start: 4, end: 8 }
    /// );
    /// assert!(RangeSpec::parse("5-3").is_err());
    /// ```
    pub fn parse(expression: &str) -> Result<Self> {
        let part = expression.trim();

        if part.is_empty() {
            return Err(PdfOpsError::invalid_range_syntax(
                expression,
                "range expression is empty",
            ));
        }

        let parse_page = |value: &str| -> Result<u32> {
            let value = value.trim();
            value.parse().map_err(|_| {
                PdfOpsError::invalid_range_syntax(
                    expression,
                    format!("'{value}' is not a page number"),
                )
            })
        };

        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_page(start)?;
                let end = parse_page(end)?;

                if start > end {
                    return Err(PdfOpsError::invalid_range_syntax(
                        expression,
                        "start page is after end page",
                    ));
                }

                Ok(Self::Span { start, end })
            }
            None => Ok(Self::Page(parse_page(part)?)),
        }
    }

    /// First page of the range.
    pub fn start(&self) -> u32 {
        match *self {
            Self::Page(page) => page,
            Self::Span { start, .. } => start,
        }
    }

    /// Last page of the range.
    pub fn end(&self) -> u32 {
        match *self {
            Self::Page(page) => page,
            Self::Span { end, .. } => end,
        }
    }

    /// Resolve the range against a document with `page_count` pages.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` if any page lies outside `1..=page_count`.
    pub fn pages(&self, page_count: usize) -> Result<Vec<u32>> {
        if self.start() < 1 || self.end() as usize > page_count {
            return Err(PdfOpsError::invalid_range(self.to_string(), page_count));
        }
        Ok((self.start()..=self.end()).collect())
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(page) => write!(f, "{page}"),
            Self::Span { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

impl FromStr for RangeSpec {
    type Err = PdfOpsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Partitioning strategy for the split engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SplitOptions {
    /// One result per source page.
    #[default]
    Single,
    /// One result per range expression.
    Ranges(Vec<RangeSpec>),
    /// Consecutive chunks of a fixed number of pages.
    Every(NonZeroU32),
}

impl SplitOptions {
    /// Build `Ranges` from textual expressions.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error, or `InvalidOptions` if the list is
    /// empty.
    pub fn ranges<I, S>(expressions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ranges = expressions
            .into_iter()
            .map(|expr| RangeSpec::parse(expr.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        if ranges.is_empty() {
            return Err(PdfOpsError::invalid_options(
                "split mode 'ranges' requires at least one range expression",
            ));
        }

        Ok(Self::Ranges(ranges))
    }

    /// Build `Every` from a stride.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` if the stride is zero.
    pub fn every(stride: u32) -> Result<Self> {
        NonZeroU32::new(stride).map(Self::Every).ok_or_else(|| {
            PdfOpsError::invalid_options("split stride must be a positive integer")
        })
    }

    /// Short name of the mode.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Ranges(_) => "ranges",
            Self::Every(_) => "every",
        }
    }
}

/// Compression quality, 1 (smallest) to 100 (lossless).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    /// Below this quality embedded raster images are resampled.
    pub const RESAMPLE_THRESHOLD: u8 = 70;

    /// Highest quality; structural optimization only.
    pub const MAX: Quality = Quality(100);

    /// Create a quality value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` outside 1..=100.
    pub fn new(value: u8) -> Result<Self> {
        if (1..=100).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PdfOpsError::invalid_options(format!(
                "Invalid quality: {value}. Must be between 1 and 100"
            )))
        }
    }

    /// Numeric value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Whether this quality asks for lossy image resampling.
    pub fn resamples_images(self) -> bool {
        self.0 < Self::RESAMPLE_THRESHOLD
    }

    /// Linear image scale factor for resampling (1.0 when lossless).
    pub fn scale_factor(self) -> f32 {
        if self.resamples_images() {
            f32::from(self.0) / f32::from(Self::RESAMPLE_THRESHOLD)
        } else {
            1.0
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::MAX
    }
}

/// Options for the compress engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressOptions {
    /// Requested quality.
    pub quality: Quality,
}

/// Merge options as they arrive on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMergeOptions {
    /// `"concatenate"` (default) or `"interleave"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_mode: Option<String>,
    /// Accepted for compatibility; page orientation is never changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    /// Retain source outlines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_bookmarks: Option<bool>,
}

impl TryFrom<&RawMergeOptions> for MergeOptions {
    type Error = PdfOpsError;

    fn try_from(raw: &RawMergeOptions) -> Result<Self> {
        let mode = match raw.merge_mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => MergeMode::default(),
        };

        Ok(Self {
            mode,
            include_bookmarks: raw.include_bookmarks.unwrap_or(false),
        })
    }
}

/// Split options as they arrive on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSplitOptions {
    /// `"single"`, `"ranges"` or `"every"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_mode: Option<String>,
    /// Range expressions for `"ranges"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Vec<String>>,
    /// Stride for `"every"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<u32>,
}

impl TryFrom<&RawSplitOptions> for SplitOptions {
    type Error = PdfOpsError;

    /// An absent or unrecognized `splitMode` selects `single`; `ranges`
    /// without any expression is an error rather than a silent fallback.
    fn try_from(raw: &RawSplitOptions) -> Result<Self> {
        match raw.split_mode.as_deref().map(str::trim) {
            None | Some("") => {
                if raw.ranges.as_ref().is_some_and(|r| !r.is_empty()) || raw.every.is_some() {
                    warn!("'ranges' or 'every' given without a split mode, splitting per page");
                }
                Ok(Self::Single)
            }
            Some("single") => Ok(Self::Single),
            Some("ranges") => match &raw.ranges {
                Some(ranges) => Self::ranges(ranges),
                None => Err(PdfOpsError::invalid_options(
                    "split mode 'ranges' requires a 'ranges' array",
                )),
            },
            Some("every") => match raw.every {
                Some(stride) => Self::every(stride),
                None => Err(PdfOpsError::invalid_options(
                    "split mode 'every' requires a positive 'every' stride",
                )),
            },
            Some(other) => {
                warn!(mode = other, "unrecognized split mode, splitting per page");
                Ok(Self::Single)
            }
        }
    }
}

/// Compress options as they arrive on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompressOptions {
    /// Quality 1..=100. Whole-valued floats such as `75.0` are accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Number>,
}

impl TryFrom<&RawCompressOptions> for CompressOptions {
    type Error = PdfOpsError;

    fn try_from(raw: &RawCompressOptions) -> Result<Self> {
        let quality = match &raw.quality {
            None => Quality::default(),
            Some(number) => {
                let value = number
                    .as_u64()
                    .or_else(|| {
                        number
                            .as_f64()
                            .filter(|v| v.fract() == 0.0 && (0.0..=255.0).contains(v))
                            .map(|v| v as u64)
                    })
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| {
                        PdfOpsError::invalid_options(format!(
                            "Invalid quality: {number}. Must be between 1 and 100"
                        ))
                    })?;
                Quality::new(value)?
            }
        };
        Ok(Self { quality })
    }
}

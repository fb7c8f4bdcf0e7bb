//! Semantic text chunker with a hard length ceiling.
//!
//! Splits document text into chunks that group consecutive sentences and
//! paragraphs while their topical drift stays low, then hard-wraps any
//! group longer than `max_chars`.
//!
//! # Algorithm
//!
//! 1. Normalize the input (see [`normalize`](crate::normalize::normalize)).
//!    Empty text produces no chunks.
//! 2. Split the text into units at whitespace runs that follow `.`, `?`
//!    or `!`, and at blank lines. Units are slices of the normalized text.
//! 3. Ask the [`SegmentSimilarity`] oracle for the drift between each pair
//!    of adjacent units.
//! 4. Compute a threshold from the drift values with the configured
//!    [`BreakpointStrategy`] and start a new segment after every unit whose
//!    drift is strictly above it.
//! 5. Hard-wrap every segment into consecutive slices of exactly
//!    `max_chars` characters (the last may be shorter). No overlap, no loss.
//!
//! A segment is the contiguous span of the normalized text from its first
//! unit to its last, so text without boundaries comes back unchanged.
//! Lengths are counted in `char`s, never bytes.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use synapse_core::chunk::{NoBoundaries, SemanticChunker};
//!
//! let chunker = SemanticChunker::new(10, Arc::new(NoBoundaries));
//! let chunks = futures::executor::block_on(chunker.chunk("Hello world. Bye.")).unwrap();
//! assert_eq!(chunks, vec!["Hello worl", "d. Bye."]);
//! ```

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{Error, Result};
use crate::normalize::normalize;

/// Default hard ceiling on chunk length, in characters.
pub const DEFAULT_MAX_CHARS: usize = 900;

/// Oracle that measures topical drift between adjacent text units.
#[async_trait]
pub trait SegmentSimilarity: Send + Sync {
    /// Return `units.len() - 1` distances; `distances[i]` is the drift
    /// between `units[i]` and `units[i + 1]`. Larger means less related.
    async fn adjacent_distances(&self, units: &[String]) -> AnyResult<Vec<f32>>;
}

/// Oracle that never reports drift, so only the hard wrap applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBoundaries;

#[async_trait]
impl SegmentSimilarity for NoBoundaries {
    async fn adjacent_distances(&self, units: &[String]) -> AnyResult<Vec<f32>> {
        Ok(vec![0.0; units.len().saturating_sub(1)])
    }
}

/// Oracle backed by an [`Embedder`].
///
/// Each unit is embedded together with `buffer_size` neighbours on each
/// side, and drift is `1 - cosine_similarity` between adjacent windows.
pub struct EmbeddingSimilarity {
    embedder: Arc<dyn Embedder>,
    buffer_size: usize,
}

impl EmbeddingSimilarity {
    pub fn new(embedder: Arc<dyn Embedder>, buffer_size: usize) -> Self {
        Self {
            embedder,
            buffer_size,
        }
    }
}

#[async_trait]
impl SegmentSimilarity for EmbeddingSimilarity {
    async fn adjacent_distances(&self, units: &[String]) -> AnyResult<Vec<f32>> {
        if units.len() < 2 {
            return Ok(Vec::new());
        }

        let windows: Vec<String> = (0..units.len())
            .map(|i| {
                let lo = i.saturating_sub(self.buffer_size);
                let hi = (i + self.buffer_size).min(units.len() - 1);
                units[lo..=hi].join(" ")
            })
            .collect();

        let vectors = self.embedder.embed(&windows).await?;
        if vectors.len() != windows.len() {
            anyhow::bail!(
                "embedder returned {} vectors for {} windows",
                vectors.len(),
                windows.len()
            );
        }

        Ok(vectors
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
            .collect())
    }
}

/// How the drift threshold is derived from the observed distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreakpointStrategy {
    /// Threshold is the given percentile (0 to 100) of all distances.
    Percentile(f32),
    /// Threshold is `mean + k × standard deviation`.
    StandardDeviation(f32),
    /// Threshold is `mean + k × interquartile range`.
    Interquartile(f32),
}

impl Default for BreakpointStrategy {
    fn default() -> Self {
        BreakpointStrategy::Percentile(95.0)
    }
}

impl BreakpointStrategy {
    /// Compute the drift threshold. Returns `f32::INFINITY` for no input.
    pub fn threshold(&self, distances: &[f32]) -> f32 {
        if distances.is_empty() {
            return f32::INFINITY;
        }
        match *self {
            BreakpointStrategy::Percentile(p) => percentile(distances, p),
            BreakpointStrategy::StandardDeviation(k) => {
                let mean = mean(distances);
                let var = distances.iter().map(|d| (d - mean) * (d - mean)).sum::<f32>()
                    / distances.len() as f32;
                mean + k * var.sqrt()
            }
            BreakpointStrategy::Interquartile(k) => {
                let iqr = percentile(distances, 75.0) - percentile(distances, 25.0);
                mean(distances) + k * iqr
            }
        }
    }
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

/// Percentile with linear interpolation between closest ranks.
fn percentile(values: &[f32], p: f32) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f32)
}

/// Splits text into semantic segments, then enforces `max_chars`.
pub struct SemanticChunker {
    max_chars: usize,
    strategy: BreakpointStrategy,
    oracle: Arc<dyn SegmentSimilarity>,
}

impl SemanticChunker {
    pub fn new(max_chars: usize, oracle: Arc<dyn SegmentSimilarity>) -> Self {
        Self {
            max_chars,
            strategy: BreakpointStrategy::default(),
            oracle,
        }
    }

    pub fn with_strategy(mut self, strategy: BreakpointStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Chunk `text` into non-empty pieces of at most `max_chars` characters.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `max_chars` is zero.
    /// - [`Error::Chunking`] if the similarity oracle fails or returns the
    ///   wrong number of distances.
    pub async fn chunk(&self, text: &str) -> Result<Vec<String>> {
        if self.max_chars == 0 {
            return Err(Error::validation("max_chars must be > 0"));
        }

        let text = normalize(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let segments = self.segment(&text).await?;

        let chunks: Vec<String> = segments
            .iter()
            .flat_map(|s| hard_wrap(s, self.max_chars))
            .collect();

        tracing::debug!(
            segments = segments.len(),
            chunks = chunks.len(),
            max_chars = self.max_chars,
            "chunked text"
        );

        Ok(chunks)
    }

    /// Group units into semantic segments (before the hard wrap).
    async fn segment<'t>(&self, text: &'t str) -> Result<Vec<&'t str>> {
        let spans = unit_spans(text);
        if spans.len() < 2 {
            return Ok(vec![text]);
        }

        let units: Vec<String> = spans.iter().map(|&(s, e)| text[s..e].to_string()).collect();
        let distances = self
            .oracle
            .adjacent_distances(&units)
            .await
            .map_err(Error::chunking)?;

        if distances.len() != units.len() - 1 {
            return Err(Error::chunking(format!(
                "similarity oracle returned {} distances for {} units",
                distances.len(),
                units.len()
            )));
        }

        let threshold = self.strategy.threshold(&distances);

        let mut segments = Vec::new();
        let mut seg_start = spans[0].0;
        for (i, d) in distances.iter().enumerate() {
            if *d > threshold {
                segments.push(&text[seg_start..spans[i].1]);
                seg_start = spans[i + 1].0;
            }
        }
        segments.push(&text[seg_start..spans[spans.len() - 1].1]);

        Ok(segments)
    }
}

/// Byte spans of the sentence/paragraph units in `text`.
///
/// A whitespace run ends a unit when it follows `.`, `?` or `!`, or when
/// it contains a blank line. The run itself belongs to neither unit.
pub fn unit_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !c.is_whitespace() {
            prev = Some(c);
            continue;
        }

        let mut end = i + c.len_utf8();
        let mut newlines = usize::from(c == '\n');
        while let Some(&(j, d)) = chars.peek() {
            if !d.is_whitespace() {
                break;
            }
            newlines += usize::from(d == '\n');
            end = j + d.len_utf8();
            chars.next();
        }

        let after_terminal = matches!(prev, Some('.' | '?' | '!'));
        if after_terminal || newlines >= 2 {
            if i > start {
                spans.push((start, i));
            }
            start = end;
        }
    }

    if start < text.len() {
        spans.push((start, text.len()));
    }

    spans
}

/// Split `segment` into consecutive slices of exactly `max_chars`
/// characters; the final slice may be shorter.
///
/// Concatenating the output reproduces `segment` exactly.
pub fn hard_wrap(segment: &str, max_chars: usize) -> Vec<String> {
    if segment.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut piece_start = 0;
    let mut count = 0;

    for (i, _) in segment.char_indices() {
        if count == max_chars {
            pieces.push(segment[piece_start..i].to_string());
            piece_start = i;
            count = 0;
        }
        count += 1;
    }
    pieces.push(segment[piece_start..].to_string());

    pieces
}

//! Identifier allocation for ingestion batches.
//!
//! Canonical identifiers are `TASK-###` tokens: zero-padded to at least
//! three digits, widening as the number grows, never truncated, never
//! reused.

use crate::models::Manifest;

/// Prefix shared by every canonical task identifier.
pub const ID_PREFIX: &str = "TASK-";

/// Parse a canonical identifier into its number and written digit width.
///
/// Returns `None` for anything that is not `TASK-` followed by digits.
pub fn parse_id(id: &str) -> Option<(u64, usize)> {
    let digits = id.strip_prefix(ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number = digits.parse::<u64>().ok()?;
    Some((number, digits.len()))
}

/// Format an identifier with the given minimum digit width.
///
/// The width never truncates: numbers wider than `width` keep all their
/// digits (`TASK-099` is followed by `TASK-100`).
pub fn format_id(number: u64, width: usize) -> String {
    format!("{}{:0width$}", ID_PREFIX, number)
}

/// A speculative identifier sequence for a batch.
///
/// Computed before dependency resolution (indices cannot be translated
/// without identifiers) and discarded if any downstream stage fails.
#[derive(Debug, Clone)]
pub struct IdSequence {
    /// One identifier per candidate, in batch order
    pub ids: Vec<String>,
    /// The identifier a subsequent batch would start at
    pub next_id: String,
}

/// Allocate the next `count` sequential identifiers.
///
/// Numbering continues from the maximum among identifiers currently in the
/// manifest, or from `floor` when that is higher. Callers pass the
/// transaction log's lifetime high-water mark as `floor` so an identifier
/// freed by rollback is never reissued. Padding follows the widest
/// conforming identifier observed, with a minimum of three digits.
pub fn allocate(manifest: &Manifest, floor: u64, count: usize) -> IdSequence {
    let mut max = 0u64;
    let mut width = 3usize;

    for task in &manifest.tasks {
        if let Some((number, w)) = parse_id(&task.id) {
            max = max.max(number);
            width = width.max(w);
        }
    }
    max = max.max(floor);

    let ids = (1..=count as u64)
        .map(|offset| format_id(max + offset, width))
        .collect();
    let next_id = format_id(max + count as u64 + 1, width);

    IdSequence { ids, next_id }
}

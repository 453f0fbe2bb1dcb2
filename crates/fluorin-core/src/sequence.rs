//! # Sequence preprocessing
//!
//! Sequences are cut to a maximum number of residues before they reach an
//! encoder. Lengths are counted in `char`s so that the row count of an
//! embedding always matches what `truncate` returns.
use itertools::Itertools;

/// Drop whitespace and uppercase the residues.
pub fn normalize(seq: &str) -> String {
    seq.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Number of residues in `seq`.
pub fn residue_count(seq: &str) -> usize {
    seq.chars().count()
}

/// Keep the first `max_len` residues of `seq`.
///
/// `residue_count(truncate(s, l)) == min(residue_count(s), l)`
pub fn truncate(seq: &str, max_len: usize) -> &str {
    match seq.char_indices().nth(max_len) {
        Some((byte_idx, _)) => &seq[..byte_idx],
        None => seq,
    }
}

/// Normalize, truncate and split a sequence into the per-residue list handed to encoders.
pub fn to_residue_list(seq: &str, max_len: usize) -> Vec<char> {
    let normalized = normalize(seq);
    truncate(&normalized, max_len).chars().collect_vec()
}

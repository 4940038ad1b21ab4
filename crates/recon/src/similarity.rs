//! Indel-based string similarity measures, all in `[0, 1]`.
//!
//! Semantics follow the usual fuzzy-matching family: `ratio` is the
//! normalized indel similarity, the `token_*` variants compare whitespace
//! tokens independent of order, and `partial_ratio` scores the best
//! alignment of the shorter string inside the longer one.

use std::collections::BTreeSet;

/// `2·LCS / (|a| + |b|)` over chars. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Ratio of the alphabetically sorted token sequences.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Set-based comparison: ignores token order and duplicates, and scores
/// 1.0 when one token set contains the other.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = ta.intersection(&tb).copied().collect();
    let diff_ab: Vec<&str> = ta.difference(&tb).copied().collect();
    let diff_ba: Vec<&str> = tb.difference(&ta).copied().collect();

    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 1.0;
    }

    let sect = sect.join(" ");
    let with_sect = |diff: &[&str]| -> String {
        match (sect.is_empty(), diff.is_empty()) {
            (true, _) => diff.join(" "),
            (false, true) => sect.clone(),
            (false, false) => format!("{sect} {}", diff.join(" ")),
        }
    };
    let combined_ab = with_sect(&diff_ab);
    let combined_ba = with_sect(&diff_ba);

    let mut best = ratio(&combined_ab, &combined_ba);
    if !sect.is_empty() {
        best = best.max(ratio(&sect, &combined_ab)).max(ratio(&sect, &combined_ba));
    }
    best
}

/// Best ratio of the shorter string against any equally long window of the
/// longer one, including windows clipped at either edge.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 1.0 } else { 0.0 };
    }

    let n = short.len();
    let mut best = 0.0f64;

    // Windows entering from the left edge.
    for end in 1..n {
        best = best.max(ratio_chars(&short, &long[..end]));
    }
    // Full-width windows.
    for start in 0..=(long.len() - n) {
        best = best.max(ratio_chars(&short, &long[start..start + n]));
        if best >= 1.0 {
            return 1.0;
        }
    }
    // Windows leaving through the right edge.
    for start in (long.len() - n + 1)..long.len() {
        best = best.max(ratio_chars(&short, &long[start..]));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ratio_basics() {
        assert!(close(ratio("", ""), 1.0));
        assert!(close(ratio("abc", ""), 0.0));
        assert!(close(ratio("pritty", "pritty"), 1.0));
        // LCS("abcd", "abed") = 3 -> 6/8
        assert!(close(ratio("abcd", "abed"), 0.75));
    }

    #[test]
    fn token_sort_ignores_order() {
        assert!(close(token_sort_ratio("pritty distribuidora", "distribuidora pritty"), 1.0));
        assert!(token_sort_ratio("pritty", "pritty ret") < 1.0);
    }

    #[test]
    fn token_set_subset_is_full_score() {
        assert!(close(token_set_ratio("pritty", "merpag pritty ret"), 1.0));
        assert!(close(token_set_ratio("pritty pritty", "pritty"), 1.0));
        assert!(close(token_set_ratio("", "pritty"), 0.0));
    }

    #[test]
    fn token_set_disjoint() {
        let s = token_set_ratio("acme", "zenith");
        assert!(s < 0.5, "got {s}");
    }

    #[test]
    fn partial_finds_fragment() {
        assert!(close(partial_ratio("pritty", "merpag pritty ret"), 1.0));
        assert!(close(partial_ratio("merpag pritty ret", "pritty"), 1.0));
        assert!(close(partial_ratio("", ""), 1.0));
        assert!(close(partial_ratio("", "x"), 0.0));
    }

    #[test]
    fn partial_edge_window() {
        // "tyxx" only overlaps the tail of "pritty" through a clipped window.
        let s = partial_ratio("tyxx", "pritty");
        assert!(s >= 0.5, "got {s}");
    }
}

//! Token-level fuzzy matching for search relevance.
//!
//! `similarity` splits both strings on whitespace, uppercases the tokens and
//! scores every pattern token by its closest candidate token using a
//! length-normalized Levenshtein distance. Word order does not matter.

/// Default minimum score for a search hit.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Score in [0, 1] of how well `pattern` matches `candidate`.
/// An empty pattern matches everything with 1.0.
pub fn similarity(pattern: &str, candidate: &str) -> f64 {
    let pattern_tokens = tokens(pattern);
    if pattern_tokens.is_empty() {
        return 1.0;
    }
    let candidate_tokens = tokens(candidate);

    let total: f64 = pattern_tokens
        .iter()
        .map(|p| {
            let closest = candidate_tokens
                .iter()
                .map(|c| {
                    let d = unlimited_distance(p, c);
                    d as f64 / c.len() as f64
                })
                .fold(f64::INFINITY, f64::min);
            (1.0 - closest).clamp(0.0, 1.0)
        })
        .sum();
    total / pattern_tokens.len() as f64
}

fn tokens(s: &str) -> Vec<Vec<char>> {
    s.split_whitespace()
        .map(|t| t.to_uppercase().chars().collect())
        .collect()
}

/// Levenshtein edit distance between two strings.
///
/// With a threshold the computation is restricted to a diagonal stripe of
/// width `2 * threshold + 1` and returns `None` once the distance must exceed
/// it. Without one it always returns `Some`.
pub fn levenshtein(left: &str, right: &str, threshold: Option<usize>) -> Option<usize> {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    match threshold {
        Some(k) => limited_distance(&left, &right, k),
        None => Some(unlimited_distance(&left, &right)),
    }
}

/// Full DP, one reused row sized to the shorter input.
fn unlimited_distance(left: &[char], right: &[char]) -> usize {
    let (short, long) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    if short.is_empty() {
        return long.len();
    }

    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (j, &lc) in long.iter().enumerate() {
        let mut upper_left = row[0];
        row[0] = j + 1;
        for i in 1..=short.len() {
            let upper = row[i];
            let cost = usize::from(short[i - 1] != lc);
            row[i] = (row[i - 1] + 1).min(upper + 1).min(upper_left + cost);
            upper_left = upper;
        }
    }
    row[short.len()]
}

/// Banded DP: only cells within `k` of the diagonal are computed.
fn limited_distance(left: &[char], right: &[char], k: usize) -> Option<usize> {
    let (short, long) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    let n = short.len();
    let m = long.len();

    if n == 0 {
        return (m <= k).then_some(m);
    }
    if m - n > k {
        return None;
    }

    const FAR: usize = usize::MAX;
    let boundary = n.min(k) + 1;
    let mut prev = vec![FAR; n + 1];
    let mut cur = vec![FAR; n + 1];
    for (i, cell) in prev.iter_mut().enumerate().take(boundary) {
        *cell = i;
    }

    for j in 1..=m {
        let lc = long[j - 1];
        cur[0] = j;

        let lo = if j > k { j - k } else { 1 };
        let hi = j.saturating_add(k).min(n);
        if lo > hi {
            return None;
        }
        if lo > 1 {
            cur[lo - 1] = FAR;
        }

        let mut lower_bound = FAR;
        for i in lo..=hi {
            cur[i] = if short[i - 1] == lc {
                prev[i - 1]
            } else {
                cur[i - 1].min(prev[i]).min(prev[i - 1]).saturating_add(1)
            };
            lower_bound = lower_bound.min(cur[i]);
        }
        if lower_bound > k {
            return None;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    (prev[n] <= k).then_some(prev[n])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn classic_distances() {
        assert_eq!(levenshtein("kitten", "sitting", None), Some(3));
        assert_eq!(levenshtein("", "abc", None), Some(3));
        assert_eq!(levenshtein("abc", "", None), Some(3));
        assert_eq!(levenshtein("flaw", "lawn", None), Some(2));
        assert_eq!(levenshtein("same", "same", None), Some(0));
        assert_eq!(levenshtein("ünï", "uni", None), Some(2));
    }

    #[test]
    fn threshold_agrees_with_full_computation_when_within() {
        let pairs = [
            ("kitten", "sitting"),
            ("flaw", "lawn"),
            ("hippo", "elephant"),
            ("gumbo", "gambol"),
            ("", "ab"),
            ("password", "passwrod"),
        ];
        for (a, b) in pairs {
            let full = levenshtein(a, b, None).expect("full distance");
            for k in 0..10 {
                let limited = levenshtein(a, b, Some(k));
                if full <= k {
                    assert_eq!(limited, Some(full), "{a} / {b} with k={k}");
                } else {
                    assert_eq!(limited, None, "{a} / {b} with k={k}");
                }
            }
        }
    }

    #[test]
    fn threshold_rejects_large_length_gap_early() {
        assert_eq!(levenshtein("a", "abcdefgh", Some(2)), None);
        assert_eq!(levenshtein("", "abc", Some(2)), None);
    }

    #[test]
    fn identical_strings_score_one() {
        assert!(close(similarity("Test string", "Test string"), 1.0));
        assert!(close(similarity("test STRING", "Test string"), 1.0));
    }

    #[test]
    fn empty_pattern_matches_everything() {
        assert!(close(similarity("", "anything at all"), 1.0));
        assert!(close(similarity("   ", ""), 1.0));
    }

    #[test]
    fn unrelated_tokens_score_low() {
        assert!(similarity("xyz", "Test service") < 0.3);
        assert!(similarity("qqqq wwww", "bank account") < 0.3);
    }

    #[test]
    fn single_typo_still_matches() {
        assert!(similarity("Tset", "Test") >= 0.5);
        assert!(similarity("gmail", "gmial") >= 0.5);
        assert!(similarity("Test", "Test service") >= 0.5);
    }

    #[test]
    fn word_order_is_irrelevant() {
        assert!(close(
            similarity("service test", "Test service"),
            similarity("test service", "Test service")
        ));
    }

    #[test]
    fn empty_candidate_scores_zero() {
        assert!(close(similarity("abc", ""), 0.0));
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let s = similarity("averyveryverylongtoken", "ab");
        assert!((0.0..=1.0).contains(&s));
        assert!(close(s, 0.0));
    }
}

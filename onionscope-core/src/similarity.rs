//! Approximate string similarity on a 0-100 scale.
//!
//! `ratio` is twice the longest-common-subsequence length over the combined
//! length, rounded. `partial_ratio` slides the shorter string across the
//! longer one and keeps the best window. `token_set_ratio` compares the
//! shared and distinct token sets so word order and repetition do not matter.

use std::collections::BTreeSet;

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let score = 200.0 * lcs_len(a, b) as f64 / total as f64;
    score.round() as u8
}

pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best `ratio` of the shorter string against every equal-length window of
/// the longer one. The first best window wins.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100 } else { 0 };
    }

    let mut best = 0u8;
    for start in 0..=(long.len() - short.len()) {
        let window = &long[start..start + short.len()];
        let score = ratio_chars(&short, window);
        if score > best {
            best = score;
            if best == 100 {
                break;
            }
        }
    }
    best
}

fn tokens(s: &str) -> BTreeSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn join(set: impl IntoIterator<Item = String>) -> String {
    set.into_iter().collect::<Vec<_>>().join(" ")
}

pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0;
    }

    let shared = join(ta.intersection(&tb).cloned());
    let only_a = join(ta.difference(&tb).cloned());
    let only_b = join(tb.difference(&ta).cloned());

    let combined = |rest: &str| match (shared.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => shared.clone(),
        (false, false) => format!("{} {}", shared, rest),
    };
    let with_a = combined(&only_a);
    let with_b = combined(&only_b);

    let mut best = ratio(&with_a, &with_b);
    if !shared.is_empty() {
        best = best.max(ratio(&shared, &with_a)).max(ratio(&shared, &with_b));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_identical_and_disjoint() {
        assert_eq!(ratio("cocaine", "cocaine"), 100);
        assert_eq!(ratio("abc", "xyz"), 0);
        assert_eq!(ratio("", ""), 100);
    }

    #[test]
    fn test_ratio_single_typo() {
        // LCS of "cocaine"/"cocane" is 6, 2*6/13
        assert_eq!(ratio("cocaine", "cocane"), 92);
    }

    #[test]
    fn test_partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("heroin", "buy pure heroin today"), 100);
        assert_eq!(partial_ratio("buy pure heroin today", "heroin"), 100);
    }

    #[test]
    fn test_partial_ratio_tolerates_misspelling() {
        let score = partial_ratio("marijuana", "best marijuanna here");
        assert!(score >= 80, "score was {score}");
        assert!(score < 100);
    }

    #[test]
    fn test_partial_ratio_empty_needle() {
        assert_eq!(partial_ratio("", "text"), 0);
    }

    #[test]
    fn test_token_set_ignores_order_and_extras() {
        assert_eq!(token_set_ratio("credit card", "card credit"), 100);
        assert_eq!(
            token_set_ratio("credit card", "we sell credit card dumps daily"),
            100
        );
    }

    #[test]
    fn test_token_set_partial_overlap() {
        let score = token_set_ratio("stolen credit card", "credit card offers");
        assert!(score > 50 && score < 100, "score was {score}");
        assert!(token_set_ratio("fake passport", "nothing related") < 50);
    }
}

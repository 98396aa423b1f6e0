//! Approximate string similarity on a 0–100 scale
//!
//! Scores tolerate recognition noise ("сонь" vs "соня"). `ratio` is the
//! indel similarity of two whole strings, `partial_ratio` the best `ratio`
//! of the shorter string against any equally long window of the longer one.

/// Similarity of two whole strings, 0–100
///
/// Computed as `2 * lcs / (len_a + len_b)` over chars, where `lcs` is the
/// length of the longest common subsequence. Equal strings score 100, an
/// empty string against a non-empty one scores 0.
#[must_use]
pub fn ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    score(&a, &b)
}

/// Best similarity of the shorter string against any window of the longer
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return 0;
    }

    let mut best = 0;
    for window in long.windows(short.len()) {
        let s = score(&short, window);
        if s == 100 {
            return 100;
        }
        best = best.max(s);
    }
    best
}

/// Index and score of the candidate with the highest `ratio` against `query`
///
/// Ties keep the earliest candidate. Returns `None` for an empty candidate list.
pub fn best_match<'a, I>(query: &str, candidates: I) -> Option<(usize, u8)>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| (i, ratio(query, c)))
        .fold(None, |best, (i, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
}

fn score(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let common = lcs_len(a, b);

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let s = ((200 * common) as f64 / total as f64).round() as u8;
    s
}

/// Longest common subsequence length, single rolling row
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diag + 1
            } else {
                above.max(row[j])
            };
            diag = above;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_full() {
        assert_eq!(ratio("соня", "соня"), 100);
        assert_eq!(ratio("", ""), 100);
    }

    #[test]
    fn empty_against_text_scores_zero() {
        assert_eq!(ratio("", "соня"), 0);
        assert_eq!(partial_ratio("", "соня"), 0);
    }

    #[test]
    fn ratio_counts_common_subsequence() {
        // "соня" / "сони": 3 common of 8 chars -> 75
        assert_eq!(ratio("соня", "сони"), 75);
        assert_eq!(ratio("abc", "xyz"), 0);
    }

    #[test]
    fn partial_ratio_finds_embedded_word() {
        assert_eq!(partial_ratio("соня какой сегодня день", "соня"), 100);
        assert_eq!(partial_ratio("эй сонечка", "сонечка"), 100);
    }

    #[test]
    fn partial_ratio_is_symmetric_in_argument_order() {
        let a = "скажи анекдот сонька";
        let b = "сонька";
        assert_eq!(partial_ratio(a, b), partial_ratio(b, a));
    }

    #[test]
    fn partial_ratio_rejects_unrelated_text() {
        assert!(partial_ratio("привет как дела", "соня") < 80);
    }

    #[test]
    fn best_match_prefers_earliest_on_tie() {
        let candidates = ["погода", "погода", "анекдот"];
        assert_eq!(best_match("погода", candidates), Some((0, 100)));
        assert_eq!(best_match("x", std::iter::empty()), None);
    }
}

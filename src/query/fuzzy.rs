//! String similarity for `~=` and free-text search
//!
//! `similarity` is the normalized Indel similarity: one minus the number of
//! insertions and deletions needed to turn one string into the other,
//! divided by the combined length. With `lcs` the longest common
//! subsequence that is `2 * lcs / (len(a) + len(b))`.

/// Similarity score at or above which `~=` matches
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

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
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let score = (2 * lcs_len(a, b)) as f64 / total as f64;
    score
}

/// Normalized Indel similarity in `[0, 1]`. Case-sensitive; callers lowercase.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio(&a, &b)
}

/// Best similarity of the shorter string against any equally long window
/// of the longer one. A substring scores `1.0`.
#[must_use]
pub fn partial_similarity(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return if long.is_empty() { 1.0 } else { 0.0 };
    }
    if long.contains(short) {
        return 1.0;
    }

    let short: Vec<char> = short.chars().collect();
    let long: Vec<char> = long.chars().collect();
    long.windows(short.len())
        .map(|window| ratio(&short, window))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_typo() {
        let score = similarity("pyhton", "python");
        assert!((score - 10.0 / 12.0).abs() < 1e-9);
        assert!(score >= DEFAULT_FUZZY_THRESHOLD);
    }

    #[test]
    fn test_similarity_unrelated() {
        assert!(similarity("java", "python") < DEFAULT_FUZZY_THRESHOLD);
        assert!(similarity("abc", "xyz").abs() < f64::EPSILON);
    }

    #[test]
    fn test_similarity_bounds() {
        assert!((similarity("same", "same") - 1.0).abs() < f64::EPSILON);
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("", "x").abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_similarity() {
        assert!((partial_similarity("learn", "machine learning") - 1.0).abs() < f64::EPSILON);
        assert!(partial_similarity("lerning", "machine learning") >= DEFAULT_FUZZY_THRESHOLD);
        assert!(partial_similarity("quantum", "machine learning") < DEFAULT_FUZZY_THRESHOLD);
    }
}

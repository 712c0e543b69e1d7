//! Textual similarity between a query name and a candidate name.

/// Similarity ratio in `[0, 100]`.
///
/// Both names are lowercased, then `2 * matched / (len(a) + len(b)) * 100`
/// where `matched` is the length of the longest common subsequence of
/// characters. Identical names score 100, names with no common character 0.
pub fn score_name(query_name: &str, candidate_name: &str) -> f64 {
    let a: Vec<char> = query_name.to_lowercase().chars().collect();
    let b: Vec<char> = candidate_name.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    let matched = longest_common_subsequence(&a, &b);
    (matched * 2) as f64 / total as f64 * 100.0
}

/// LCS length with two rolling rows, O(len(a) * len(b)) time.
fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    // Iterate over the shorter string in the inner loop to keep rows small
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if inner.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; inner.len() + 1];
    let mut curr = vec![0usize; inner.len() + 1];

    for &oc in outer {
        for (j, &ic) in inner.iter().enumerate() {
            curr[j + 1] = if oc == ic {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[inner.len()]
}

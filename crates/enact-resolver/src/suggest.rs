// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edit-distance suggestions for a misspelled or partial tool name.

/// Levenshtein distance between two strings, operating on `char`s.
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Returns up to `limit` candidates from `names` ordered by ascending edit
/// distance to `query`, ties broken lexicographically. Candidates whose
/// distance exceeds half the query's length (floor, minimum 1) are dropped
/// as too dissimilar to be a useful suggestion.
#[must_use]
pub fn suggest<'a>(query: &str, names: impl IntoIterator<Item = &'a String>, limit: usize) -> Vec<String> {
    let max_distance = (query.chars().count() / 2).max(1);
    let mut scored: Vec<(usize, &str)> =
        names.into_iter().map(|n| (edit_distance(query, n), n.as_str())).filter(|(d, _)| *d <= max_distance).collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(limit).map(|(_, n)| n.to_string()).collect()
}

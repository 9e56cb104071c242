//! Wildcard matching

/// Match `text` against a `pattern` where `*` matches any run of characters
/// (including none) and `?` matches exactly one character
///
/// An empty pattern only matches empty text.
pub fn wildcard_matched(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matched[j]: text[..i] matches pattern[..j] for the current row i
    let mut matched = vec![false; pattern.len() + 1];
    matched[0] = true;
    for j in 1..=pattern.len() {
        matched[j] = matched[j - 1] && pattern[j - 1] == '*';
    }

    for &c in &text {
        let mut diagonal = matched[0];
        matched[0] = false;
        for j in 1..=pattern.len() {
            let above = matched[j];
            matched[j] = match pattern[j - 1] {
                '*' => above || matched[j - 1],
                '?' => diagonal,
                p => diagonal && p == c,
            };
            diagonal = above;
        }
    }

    matched[pattern.len()]
}

use std::collections::HashSet;

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard overlap of the lower-cased whitespace tokens of two OCR texts.
/// Returns 0.0 when either side has no tokens.
pub fn text_overlap(text1: &str, text2: &str) -> f64 {
    let words1 = tokens(text1);
    let words2 = tokens(text2);

    if words1.is_empty() || words2.is_empty() {
        return 0.0;
    }

    let intersection = words1.intersection(&words2).count();
    let union = words1.union(&words2).count();

    intersection as f64 / union as f64
}

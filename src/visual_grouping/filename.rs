use super::ProcessedAsset;
use regex::Regex;
use std::sync::LazyLock;

static LEADING_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+").unwrap());
static TRAILING_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+$").unwrap());
static ANY_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Strip the last extension from a filename, if any.
pub fn strip_extension(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(name, _)| name)
        .unwrap_or(filename)
}

/// Extension of a filename without the dot, if any.
pub fn extension(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

/// Extract the sequence number from a filename.
///
/// Priority: digits at the start (`01_story.png`), then digits at the end
/// (`story_01.png`, `slide01.png`), then the last run of digits anywhere
/// (`ad_3_final_v2x` -> 2). A run too long for `u64` is skipped in favour
/// of the next candidate, with earlier runs tried last to first.
pub fn extract_sequence_number(filename: &str) -> Option<u64> {
    let name = strip_extension(filename);

    let mut runs: Vec<_> = ANY_DIGITS.find_iter(name).collect();
    runs.reverse();

    LEADING_DIGITS
        .find(name)
        .into_iter()
        .chain(TRAILING_DIGITS.find(name))
        .chain(runs)
        .find_map(|digits| digits.as_str().parse().ok())
}

/// Ordering key that puts numbered names first, ascending, and numberless
/// names last.
pub fn sequence_key(filename: &str) -> (bool, u64) {
    match extract_sequence_number(filename) {
        Some(n) => (false, n),
        None => (true, 0),
    }
}

/// Sort assets by filename number for card ordering. Card01 goes to the
/// smallest number; numberless files come last in name order.
pub fn sort_by_filename_number(assets: &mut [ProcessedAsset]) {
    assets.sort_by(|a, b| {
        sequence_key(a.name())
            .cmp(&sequence_key(b.name()))
            .then_with(|| a.name().cmp(b.name()))
    });
}

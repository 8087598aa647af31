//! Product, angle and offer inference from the OCR text of an ad group.
//!
//! All members' text is joined into one corpus; fields are never inferred
//! per asset. Every function here is total: no text means empty fields with
//! their fixed confidences.

use regex::Regex;
use std::sync::LazyLock;

use crate::visual_grouping::AdGroup;

/// Angle categories in tie-break order: on equal hit counts the category
/// declared first wins.
pub const ANGLE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Offer",
        &["off", "discount", "sale", "deal", "save", "promo", "code", "coupon", "free"],
    ),
    (
        "Price",
        &["$", "€", "£", "price", "cost", "only", "just", "from", "starting"],
    ),
    (
        "SocialProof",
        &["reviews", "stars", "rated", "customers", "sold", "trusted", "loved", "favorite", "best"],
    ),
    (
        "Education",
        &["how", "learn", "guide", "tips", "tutorial", "step", "discover", "understand"],
    ),
    (
        "BehindTheScenes",
        &["behind", "making", "process", "studio", "team", "craft", "made"],
    ),
    (
        "Founder",
        &["founder", "ceo", "owner", "story", "journey", "started", "mission"],
    ),
    (
        "Brand",
        &["brand", "quality", "premium", "luxury", "original", "authentic"],
    ),
    (
        "Newness",
        &["new", "launch", "introducing", "just arrived", "fresh", "latest", "coming soon"],
    ),
];

const OFFER_PATTERNS: &[&str] = &[
    r"\d+%\s*off",
    r"discount",
    r"sale",
    r"promo",
    r"code",
    r"coupon",
    r"free\s+shipping",
    r"buy\s+\d+\s+get",
    r"save\s+\$?\d+",
    r"limited\s+time",
    r"special\s+offer",
];

static PRODUCT_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,3}\b").unwrap());
static PRODUCT_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]{3,}\b").unwrap());
static OFFER_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    OFFER_PATTERNS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Fields inferred for one group
#[derive(Debug, Clone, PartialEq)]
pub struct InferredFields {
    pub product: String,
    pub product_confidence: f64,
    pub angle: String,
    pub angle_confidence: f64,
    pub offer: bool,
    pub offer_confidence: f64,
}

/// Space-joined OCR text of every member with any text.
pub fn combined_text(group: &AdGroup) -> String {
    group
        .assets
        .iter()
        .map(|a| a.ocr_text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Product name: the longest run of 2-4 capitalised words (spaces become
/// underscores), else the first capitalised word of 4+ letters.
pub fn infer_product(text: &str) -> (String, f64) {
    if text.is_empty() {
        return (String::new(), 0.0);
    }

    // First match wins among equally long phrases
    let longest = PRODUCT_PHRASE
        .find_iter(text)
        .fold(None::<regex::Match>, |best, m| match best {
            Some(b) if b.as_str().len() >= m.as_str().len() => Some(b),
            _ => Some(m),
        });

    if let Some(phrase) = longest {
        let product = phrase
            .as_str()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        return (product, 0.6);
    }

    match PRODUCT_WORD.find(text) {
        Some(word) => (word.as_str().to_string(), 0.4),
        None => (String::new(), 0.0),
    }
}

/// Angle with the most keyword hits; confidence grows 0.15 per hit from 0.3,
/// capped at 0.9.
pub fn infer_angle(text: &str) -> (String, f64) {
    if text.is_empty() {
        return (String::new(), 0.0);
    }

    let lower = text.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for &(angle, keywords) in ANGLE_KEYWORDS {
        let hits = keywords.iter().filter(|kw| lower.contains(**kw)).count();
        if hits == 0 {
            continue;
        }
        if best.is_none_or(|(_, top)| hits > top) {
            best = Some((angle, hits));
        }
    }

    match best {
        Some((angle, hits)) => (angle.to_string(), (0.3 + hits as f64 * 0.15).min(0.9)),
        None => (String::new(), 0.0),
    }
}

/// Whether the text advertises an offer. Two or more distinct patterns give
/// 0.9, one gives 0.7; no match is still 0.6 confident there is no offer.
pub fn infer_offer(text: &str) -> (bool, f64) {
    if text.is_empty() {
        return (false, 0.5);
    }

    let lower = text.to_lowercase();
    let matches = OFFER_REGEXES.iter().filter(|re| re.is_match(&lower)).count();

    match matches {
        0 => (false, 0.6),
        1 => (true, 0.7),
        _ => (true, 0.9),
    }
}

pub fn infer_from_text(text: &str) -> InferredFields {
    let (product, product_confidence) = infer_product(text);
    let (angle, angle_confidence) = infer_angle(text);
    let (offer, offer_confidence) = infer_offer(text);
    InferredFields {
        product,
        product_confidence,
        angle,
        angle_confidence,
        offer,
        offer_confidence,
    }
}

/// Infer fields for a group in place, keeping its group confidence.
pub fn infer_fields(group: &mut AdGroup) {
    let fields = infer_from_text(&combined_text(group));

    tracing::debug!(
        group = %group.id,
        product = %fields.product,
        angle = %fields.angle,
        offer = fields.offer,
        "inferred fields"
    );

    group.product = fields.product;
    group.angle = fields.angle;
    group.offer = fields.offer;
    group.confidence.product = fields.product_confidence;
    group.confidence.angle = fields.angle_confidence;
    group.confidence.offer = fields.offer_confidence;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual_grouping::{
        Asset, AssetKind, AssetMetadata, GroupKind, ProcessedAsset,
    };

    fn asset_with_text(id: &str, ocr: &str) -> ProcessedAsset {
        ProcessedAsset::new(
            Asset {
                id: id.to_string(),
                name: format!("{id}.png"),
                path: String::new(),
                kind: AssetKind::Image,
                size_bytes: None,
            },
            AssetMetadata::new(1080, 1080),
            ocr,
            "",
        )
    }

    #[test]
    fn test_product_longest_phrase() {
        let (product, conf) = infer_product("Try the Glow Serum or the Night Repair Cream now");
        assert_eq!(product, "Night_Repair_Cream");
        assert_eq!(conf, 0.6);
    }

    #[test]
    fn test_product_first_longest_wins_ties() {
        let (product, _) = infer_product("Blue Cap and Gray Hat");
        assert_eq!(product, "Blue_Cap");
    }

    #[test]
    fn test_product_single_word() {
        let (product, conf) = infer_product("meet Lumina, our best lamp by Acme");
        assert_eq!(product, "Lumina");
        assert_eq!(conf, 0.4);
    }

    #[test]
    fn test_product_none() {
        assert_eq!(infer_product("all lower case"), (String::new(), 0.0));
        assert_eq!(infer_product(""), (String::new(), 0.0));
    }

    #[test]
    fn test_angle() {
        let (angle, conf) = infer_angle("Read our 5 stars reviews from trusted customers");
        assert_eq!(angle, "SocialProof");
        assert!((conf - 0.9).abs() < 1e-9);

        let (angle, conf) = infer_angle("Learn more");
        assert_eq!(angle, "Education");
        assert!((conf - 0.45).abs() < 1e-9);

        assert_eq!(infer_angle("zzz"), (String::new(), 0.0));
    }

    #[test]
    fn test_angle_tie_goes_to_first_category() {
        // one hit each for Offer ("deal") and Brand ("luxury")
        let (angle, _) = infer_angle("luxury deal");
        assert_eq!(angle, "Offer");
    }

    #[test]
    fn test_offer() {
        assert_eq!(infer_offer("50% OFF today only, limited time"), (true, 0.9));
        assert_eq!(infer_offer("Use code SPRING"), (true, 0.7));
        assert_eq!(infer_offer("A beautiful morning"), (false, 0.6));
        assert_eq!(infer_offer(""), (false, 0.5));
    }

    #[test]
    fn test_infer_fields_uses_combined_text() {
        let mut group = AdGroup::new(
            GroupKind::Standard,
            vec![
                asset_with_text("a", "Glow Serum"),
                asset_with_text("b", ""),
                asset_with_text("c", "free shipping on every sale"),
            ],
            1,
            "",
            "",
            0.8,
        );
        assert_eq!(combined_text(&group), "Glow Serum free shipping on every sale");

        infer_fields(&mut group);
        assert_eq!(group.product, "Glow_Serum");
        assert_eq!(group.angle, "Offer");
        assert!(group.offer);
        assert_eq!(group.confidence.offer, 0.9);
        assert_eq!(group.confidence.group, 0.8);
    }

    #[test]
    fn test_infer_fields_without_text() {
        let mut group = AdGroup::new(
            GroupKind::Single,
            vec![asset_with_text("a", "")],
            1,
            "",
            "",
            0.2,
        );
        infer_fields(&mut group);
        assert!(group.product.is_empty());
        assert!(group.angle.is_empty());
        assert!(!group.offer);
        assert_eq!(group.confidence.product, 0.0);
        assert_eq!(group.confidence.offer, 0.5);
    }
}

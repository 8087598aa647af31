//! Filename generation.
//!
//! Two group-level rules coexist on purpose. [`generate_filename`] is the
//! export schema and keeps a slot for every field, so empty fields leave
//! adjacent underscores. [`AdGroup::display_filename`] is the detail-view
//! name: empty fields are dropped and repeated underscores collapsed.

use regex::Regex;
use std::sync::LazyLock;

use crate::visual_grouping::filename::extension;
use crate::visual_grouping::{AdGroup, ProcessedAsset};

static REPEATED_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__+").unwrap());

const DEFAULT_EXTENSION: &str = "png";

/// `{AdNumber:03}_{Campaign}_{Product}_{Format}_{Angle}_{Yes|No}_{Date}`
pub fn generate_filename(group: &AdGroup) -> String {
    let offer = if group.offer { "Yes" } else { "No" };
    format!(
        "{:03}_{}_{}_{}_{}_{}_{}",
        group.ad_number,
        group.campaign,
        group.product,
        group.format_token(),
        group.angle,
        offer,
        group.date
    )
}

/// Carousel card name: `{AdNumber:04}_CAR_Card{index:02}.{ext}` where
/// `card_index` is 1-based and the extension comes from the source file.
pub fn generate_carousel_filename(group: &AdGroup, asset: &ProcessedAsset, card_index: usize) -> String {
    let ext = extension(asset.name()).unwrap_or(DEFAULT_EXTENSION);
    format!("{:04}_CAR_Card{:02}.{}", group.ad_number, card_index, ext)
}

impl AdGroup {
    /// Detail-view filename: empty fields omitted, hook and creator included,
    /// `Offer` only when the group has one.
    pub fn display_filename(&self) -> String {
        let ad_number = format!("{:03}", self.ad_number);
        let mut parts: Vec<&str> = vec![ad_number.as_str()];

        for field in [&self.campaign, &self.product] {
            if !field.is_empty() {
                parts.push(field);
            }
        }
        parts.push(self.format_token());
        for field in [&self.angle, &self.hook, &self.creator] {
            if !field.is_empty() {
                parts.push(field);
            }
        }
        if self.offer {
            parts.push("Offer");
        }
        if !self.date.is_empty() {
            parts.push(&self.date);
        }

        REPEATED_UNDERSCORES
            .replace_all(&parts.join("_"), "_")
            .into_owned()
    }
}

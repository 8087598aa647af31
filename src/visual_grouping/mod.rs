pub mod filename;
pub mod grouping;
pub mod hash;
pub mod text;

use serde::{Deserialize, Serialize};

/// Media kind of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    #[serde(rename = "IMG")]
    Image,
    #[serde(rename = "VID")]
    Video,
}

impl AssetKind {
    pub fn token(self) -> &'static str {
        match self {
            AssetKind::Image => "IMG",
            AssetKind::Video => "VID",
        }
    }
}

/// Layout class inferred from the aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// 9:16
    Story,
    /// 4:5 or 1:1
    Feed,
    Unknown,
}

impl Placement {
    /// Classify a width/height ratio into a placement band.
    ///
    /// Bands are closed on both ends: `[0.50, 0.60]` is a story and
    /// `[0.75, 1.05]` is a feed creative. Everything else (landscape, 2:3,
    /// NaN from a zero height) is unknown.
    pub fn from_aspect_ratio(ratio: f64) -> Self {
        if (0.5..=0.6).contains(&ratio) {
            Placement::Story
        } else if (0.75..=1.05).contains(&ratio) {
            Placement::Feed
        } else {
            Placement::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Placement::Story => "story",
            Placement::Feed => "feed",
            Placement::Unknown => "unknown",
        }
    }
}

/// Asset type with file information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(rename = "asset_type", alias = "kind")]
    pub kind: AssetKind,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// Dimensions and duration reported by the upstream probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub duration: Option<f64>,
    pub aspect_ratio: f64,
}

impl AssetMetadata {
    pub fn new(width: u32, height: u32) -> Self {
        let aspect_ratio = if height == 0 {
            0.0
        } else {
            width as f64 / height as f64
        };
        Self {
            width,
            height,
            duration: None,
            aspect_ratio,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement::from_aspect_ratio(self.aspect_ratio)
    }
}

/// Asset with everything extraction produced: dimensions, OCR text and the
/// perceptual hash. Only the copy fields and the filename override change
/// after this point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAsset {
    pub asset: Asset,
    pub metadata: AssetMetadata,
    pub placement: Placement,
    #[serde(default)]
    pub ocr_text: String,
    /// Perceptual hash as a hex string, empty when hashing failed.
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,

    // Per-asset copy, used for carousel cards
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub custom_filename: Option<String>,
}

impl ProcessedAsset {
    /// Build a processed asset, deriving the placement from the metadata.
    pub fn new(
        asset: Asset,
        metadata: AssetMetadata,
        ocr_text: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            placement: metadata.placement(),
            asset,
            metadata,
            ocr_text: ocr_text.into(),
            fingerprint: fingerprint.into(),
            thumbnail_url: None,
            headline: String::new(),
            description: String::new(),
            custom_filename: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.asset.id
    }

    pub fn name(&self) -> &str {
        &self.asset.name
    }

    pub fn is_video(&self) -> bool {
        self.asset.kind == AssetKind::Video
    }

    pub fn has_fingerprint(&self) -> bool {
        !self.fingerprint.is_empty()
    }

    /// The user's filename override when set, otherwise `generated`.
    pub fn effective_filename(&self, generated: &str) -> String {
        match &self.custom_filename {
            Some(custom) => custom.clone(),
            None => generated.to_string(),
        }
    }
}

/// Kind of ad unit a group represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Story + feed pair
    Standard,
    /// 3-10 feed cards
    Carousel,
    /// Unpaired asset
    Single,
}

impl GroupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupKind::Standard => "standard",
            GroupKind::Carousel => "carousel",
            GroupKind::Single => "single",
        }
    }

    /// Derive the kind from a group's membership after an edit.
    ///
    /// Groups of more than two members only count as carousels when every
    /// member is a feed creative and the card count is in range; anything
    /// else a user assembles by hand stays standard.
    pub fn for_members(assets: &[ProcessedAsset], min_cards: usize, max_cards: usize) -> Self {
        match assets.len() {
            0 | 1 => GroupKind::Single,
            2 => GroupKind::Standard,
            n if (min_cards..=max_cards).contains(&n)
                && assets.iter().all(|a| a.placement == Placement::Feed) =>
            {
                GroupKind::Carousel
            }
            _ => GroupKind::Standard,
        }
    }
}

/// Confidence per inferred dimension, each in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub group: f64,
    pub product: f64,
    pub angle: f64,
    pub offer: f64,
}

impl ConfidenceScores {
    pub fn for_group(group: f64) -> Self {
        Self {
            group,
            ..Default::default()
        }
    }
}

/// A group of assets that form a single ad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdGroup {
    pub id: String,
    #[serde(rename = "group_type", alias = "kind")]
    pub kind: GroupKind,
    pub assets: Vec<ProcessedAsset>,

    /// Zero means not yet numbered.
    pub ad_number: u32,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub angle: String,
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub offer: bool,

    pub campaign: String,
    pub date: String,

    #[serde(default)]
    pub primary_text: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cta: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub comment_media_buyer: String,
    #[serde(default)]
    pub comment_client: String,

    #[serde(default)]
    pub confidence: ConfidenceScores,
}

impl AdGroup {
    pub fn new(
        kind: GroupKind,
        assets: Vec<ProcessedAsset>,
        ad_number: u32,
        campaign: &str,
        date: &str,
        group_confidence: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            assets,
            ad_number,
            product: String::new(),
            angle: String::new(),
            hook: String::new(),
            creator: String::new(),
            offer: false,
            campaign: campaign.to_string(),
            date: date.to_string(),
            primary_text: String::new(),
            headline: String::new(),
            description: String::new(),
            cta: String::new(),
            url: String::new(),
            comment_media_buyer: String::new(),
            comment_client: String::new(),
            confidence: ConfidenceScores::for_group(group_confidence),
        }
    }

    /// "CAR" for carousels, "VID" when any member is a video, else "IMG".
    pub fn format_token(&self) -> &'static str {
        match self.kind {
            GroupKind::Carousel => "CAR",
            GroupKind::Standard | GroupKind::Single => {
                if self.assets.iter().any(ProcessedAsset::is_video) {
                    AssetKind::Video.token()
                } else {
                    AssetKind::Image.token()
                }
            }
        }
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.assets.iter().any(|a| a.id() == asset_id)
    }

    pub fn position_of(&self, asset_id: &str) -> Option<usize> {
        self.assets.iter().position(|a| a.id() == asset_id)
    }
}

/// Result of the grouping pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedAssets {
    pub groups: Vec<AdGroup>,
    /// Always empty once the pipeline has run; singletons absorb leftovers.
    #[serde(default)]
    pub ungrouped: Vec<ProcessedAsset>,
}

impl GroupedAssets {
    pub fn asset_count(&self) -> usize {
        self.groups.iter().map(|g| g.assets.len()).sum::<usize>() + self.ungrouped.len()
    }

    pub fn group(&self, group_id: &str) -> Option<&AdGroup> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn group_mut(&mut self, group_id: &str) -> Option<&mut AdGroup> {
        self.groups.iter_mut().find(|g| g.id == group_id)
    }
}

/// User-provided inputs for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInputs {
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default = "default_start_number")]
    pub start_number: u32,
    /// `YYYY.MM.DD`; today when absent.
    #[serde(default)]
    pub date: Option<String>,
}

fn default_start_number() -> u32 {
    1
}

impl UserInputs {
    /// Campaign token for generated names; blank unless the user set one.
    pub fn campaign_or_default(&self) -> String {
        self.campaign.clone().unwrap_or_default()
    }

    pub fn date_or_today(&self) -> String {
        self.date.clone().unwrap_or_else(crate::config::today_date)
    }
}

impl Default for UserInputs {
    fn default() -> Self {
        Self {
            client: String::new(),
            campaign: None,
            start_number: default_start_number(),
            date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(id: &str) -> ProcessedAsset {
        ProcessedAsset::new(
            Asset {
                id: id.to_string(),
                name: format!("{id}.png"),
                path: format!("/tmp/{id}.png"),
                kind: AssetKind::Image,
                size_bytes: None,
            },
            AssetMetadata::new(1080, 1080),
            "",
            "",
        )
    }

    #[test]
    fn test_placement_bands() {
        assert_eq!(Placement::from_aspect_ratio(1080.0 / 1920.0), Placement::Story);
        assert_eq!(Placement::from_aspect_ratio(0.5), Placement::Story);
        assert_eq!(Placement::from_aspect_ratio(0.6), Placement::Story);
        assert_eq!(Placement::from_aspect_ratio(0.8), Placement::Feed);
        assert_eq!(Placement::from_aspect_ratio(1.0), Placement::Feed);
        assert_eq!(Placement::from_aspect_ratio(1.05), Placement::Feed);
        assert_eq!(Placement::from_aspect_ratio(0.7), Placement::Unknown);
        assert_eq!(Placement::from_aspect_ratio(16.0 / 9.0), Placement::Unknown);
        assert_eq!(AssetMetadata::new(100, 0).placement(), Placement::Unknown);
    }

    #[test]
    fn test_kind_for_members() {
        let assets: Vec<_> = (0..4).map(|i| feed(&format!("f{i}"))).collect();
        assert_eq!(GroupKind::for_members(&assets[..1], 3, 10), GroupKind::Single);
        assert_eq!(GroupKind::for_members(&assets[..2], 3, 10), GroupKind::Standard);
        assert_eq!(GroupKind::for_members(&assets[..3], 3, 10), GroupKind::Carousel);

        let mut mixed = assets.clone();
        mixed[0].placement = Placement::Story;
        assert_eq!(GroupKind::for_members(&mixed, 3, 10), GroupKind::Standard);
    }

    #[test]
    fn test_format_token() {
        let mut group = AdGroup::new(GroupKind::Single, vec![feed("a")], 1, "", "", 0.2);
        assert_eq!(group.format_token(), "IMG");
        group.assets[0].asset.kind = AssetKind::Video;
        assert_eq!(group.format_token(), "VID");
        group.kind = GroupKind::Carousel;
        assert_eq!(group.format_token(), "CAR");
    }

    #[test]
    fn test_json_field_names() {
        let json = r#"{
            "id": "g1",
            "group_type": "carousel",
            "assets": [{
                "asset": {"id": "a", "name": "a.mp4", "path": "/a.mp4", "asset_type": "VID"},
                "metadata": {"width": 1080, "height": 1080, "aspect_ratio": 1.0},
                "placement": "feed"
            }],
            "ad_number": 4,
            "campaign": "OctAds",
            "date": "2026.10.18"
        }"#;
        let group: AdGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.kind, GroupKind::Carousel);
        assert_eq!(group.assets[0].asset.kind, AssetKind::Video);
        assert_eq!(group.confidence, ConfidenceScores::default());

        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["group_type"], "carousel");
        assert_eq!(value["assets"][0]["asset"]["asset_type"], "VID");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_effective_filename() {
        let mut asset = feed("a");
        assert_eq!(asset.effective_filename("001_IMG"), "001_IMG");
        asset.custom_filename = Some("hero.png".to_string());
        assert_eq!(asset.effective_filename("001_IMG"), "hero.png");
    }
}

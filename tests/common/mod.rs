#![allow(dead_code)]

use adnamer_rs::{Asset, AssetKind, AssetMetadata, ProcessedAsset, UserInputs};

pub const STORY: (u32, u32) = (1080, 1920);
pub const FEED: (u32, u32) = (1080, 1080);
pub const LANDSCAPE: (u32, u32) = (1920, 1080);

pub fn processed(
    name: &str,
    (width, height): (u32, u32),
    kind: AssetKind,
    fingerprint: &str,
    ocr: &str,
) -> ProcessedAsset {
    ProcessedAsset::new(
        Asset {
            id: format!("id-{name}"),
            name: name.to_string(),
            path: format!("/assets/{name}"),
            kind,
            size_bytes: None,
        },
        AssetMetadata::new(width, height),
        ocr,
        fingerprint,
    )
}

pub fn image(name: &str, dims: (u32, u32), fingerprint: &str) -> ProcessedAsset {
    processed(name, dims, AssetKind::Image, fingerprint, "")
}

pub fn inputs(start_number: u32) -> UserInputs {
    UserInputs {
        client: "Acme".to_string(),
        campaign: Some("OctAds".to_string()),
        start_number,
        date: Some("2026.10.18".to_string()),
    }
}

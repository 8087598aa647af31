//! Rename plan rows and their CSV rendering.

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::naming::{generate_carousel_filename, generate_filename};
use crate::visual_grouping::{AdGroup, GroupKind, ProcessedAsset};

/// One row of the export CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub file_id: String,
    pub old_name: String,
    pub new_name: String,
    pub group_id: String,
    pub group_type: String,
    pub placement_inferred: String,
    pub confidence_group: f64,
    pub confidence_product: f64,
    pub confidence_angle: f64,
    pub confidence_offer: f64,
}

/// CSV columns, in `ExportRow` field order.
pub const COLUMNS: [&str; 10] = [
    "file_id",
    "old_name",
    "new_name",
    "group_id",
    "group_type",
    "placement_inferred",
    "confidence_group",
    "confidence_product",
    "confidence_angle",
    "confidence_offer",
];

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl ExportRow {
    fn new(group: &AdGroup, asset: &ProcessedAsset, generated: &str) -> Self {
        Self {
            file_id: asset.id().to_string(),
            old_name: asset.name().to_string(),
            new_name: asset.effective_filename(generated),
            group_id: group.id.clone(),
            group_type: group.kind.as_str().to_string(),
            placement_inferred: asset.placement.as_str().to_string(),
            confidence_group: round3(group.confidence.group),
            confidence_product: round3(group.confidence.product),
            confidence_angle: round3(group.confidence.angle),
            confidence_offer: round3(group.confidence.offer),
        }
    }
}

/// One row per asset. Carousel cards each get their own name by position;
/// standard and single members share the group name. A per-asset override
/// replaces the generated name.
pub fn export_rows(groups: &[AdGroup]) -> Vec<ExportRow> {
    let mut rows = Vec::new();

    for group in groups {
        match group.kind {
            GroupKind::Carousel => {
                for (i, asset) in group.assets.iter().enumerate() {
                    let name = generate_carousel_filename(group, asset, i + 1);
                    rows.push(ExportRow::new(group, asset, &name));
                }
            }
            GroupKind::Standard | GroupKind::Single => {
                let name = generate_filename(group);
                for asset in &group.assets {
                    rows.push(ExportRow::new(group, asset, &name));
                }
            }
        }
    }

    rows
}

/// Render the export as CSV with a header row.
pub fn export_csv(groups: &[AdGroup]) -> SessionResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    // Header first, even for an empty plan
    writer
        .write_record(COLUMNS)
        .map_err(|e| SessionError::Export(e.to_string()))?;
    for row in export_rows(groups) {
        writer
            .serialize(&row)
            .map_err(|e| SessionError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SessionError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SessionError::Export(e.to_string()))
}

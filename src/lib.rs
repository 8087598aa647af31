#![deny(clippy::all)]

pub mod config;
pub mod error;
pub mod export;
pub mod inference;
pub mod naming;
pub mod session;
pub mod visual_grouping;

pub use config::Settings;
pub use error::{ConfigError, SessionError, SessionResult};
pub use export::{ExportRow, export_csv, export_rows};
pub use naming::{generate_carousel_filename, generate_filename};
pub use session::{AssetUpdate, GroupField, GroupUpdate, Session, SessionId, SessionStore};
pub use visual_grouping::{
    AdGroup, Asset, AssetKind, AssetMetadata, ConfidenceScores, GroupKind, GroupedAssets,
    Placement, ProcessedAsset, UserInputs,
};

/// Group assets and infer fields for every group.
///
/// Must be called with the complete asset set: pairing and clustering look
/// at every asset at once.
pub fn run_pipeline(
    assets: &[ProcessedAsset],
    campaign: &str,
    date: &str,
    start_number: u32,
    settings: &Settings,
) -> GroupedAssets {
    let mut grouped =
        visual_grouping::grouping::group_assets(assets, campaign, date, start_number, settings);
    for group in &mut grouped.groups {
        inference::infer_fields(group);
    }
    grouped
}

/// Run the pipeline with user inputs. A blank campaign stays blank; a
/// missing date becomes today.
pub fn analyze(assets: &[ProcessedAsset], inputs: &UserInputs, settings: &Settings) -> GroupedAssets {
    run_pipeline(
        assets,
        &inputs.campaign_or_default(),
        &inputs.date_or_today(),
        inputs.start_number,
        settings,
    )
}

#[cfg(feature = "node")]
mod node {
    use napi::bindgen_prelude::*;
    use napi_derive::napi;

    use crate::{AdGroup, ProcessedAsset, Settings, UserInputs};

    fn invalid<E: std::fmt::Display>(err: E) -> Error {
        Error::from_reason(err.to_string())
    }

    /// Analyse processed assets (JSON array) with user inputs (JSON object)
    /// and return the grouped result as JSON.
    #[napi]
    pub fn analyze_assets(assets_json: String, inputs_json: String) -> Result<String> {
        let assets: Vec<ProcessedAsset> = serde_json::from_str(&assets_json).map_err(invalid)?;
        let inputs: UserInputs = serde_json::from_str(&inputs_json).map_err(invalid)?;
        let grouped = crate::analyze(&assets, &inputs, &Settings::default());
        serde_json::to_string(&grouped).map_err(invalid)
    }

    /// Render groups (JSON array) as the rename-plan CSV.
    #[napi]
    pub fn export_groups_csv(groups_json: String) -> Result<String> {
        let groups: Vec<AdGroup> = serde_json::from_str(&groups_json).map_err(invalid)?;
        crate::export_csv(&groups).map_err(invalid)
    }
}

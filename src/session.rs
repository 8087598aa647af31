//! Analysis sessions and the edits users make to a grouping result.
//!
//! A [`Session`] owns one analysis. Edits are synchronous read-modify-write
//! transitions that keep every group's kind consistent with its members.
//! [`SessionStore`] holds any number of independent sessions keyed by id;
//! edits to one session are serialised by the map's entry lock.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{SessionError, SessionResult};
use crate::export;
use crate::visual_grouping::filename::sort_by_filename_number;
use crate::visual_grouping::grouping::renumber;
use crate::visual_grouping::{AdGroup, GroupKind, GroupedAssets, ProcessedAsset, UserInputs};

pub type SessionId = Uuid;

/// Scalar group fields that bulk edits can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupField {
    Product,
    Angle,
    Hook,
    Creator,
    Campaign,
    Offer,
}

impl FromStr for GroupField {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(GroupField::Product),
            "angle" => Ok(GroupField::Angle),
            "hook" => Ok(GroupField::Hook),
            "creator" => Ok(GroupField::Creator),
            "campaign" => Ok(GroupField::Campaign),
            "offer" => Ok(GroupField::Offer),
            other => Err(SessionError::UnknownField(other.to_string())),
        }
    }
}

/// "yes", "true" and "1" (any case) are true; anything else is false.
pub fn parse_offer(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "yes" | "true" | "1")
}

impl GroupField {
    fn text_mut(self, group: &mut AdGroup) -> Option<&mut String> {
        match self {
            GroupField::Product => Some(&mut group.product),
            GroupField::Angle => Some(&mut group.angle),
            GroupField::Hook => Some(&mut group.hook),
            GroupField::Creator => Some(&mut group.creator),
            GroupField::Campaign => Some(&mut group.campaign),
            GroupField::Offer => None,
        }
    }

    fn set(self, group: &mut AdGroup, value: &str) {
        match self.text_mut(group) {
            Some(field) => *field = value.to_string(),
            None => group.offer = parse_offer(value),
        }
    }

    fn replace(self, group: &mut AdGroup, find: &str, replace: &str) {
        match self.text_mut(group) {
            Some(field) => {
                if *field == find {
                    *field = replace.to_string();
                }
            }
            None => {
                if group.offer == parse_offer(find) {
                    group.offer = parse_offer(replace);
                }
            }
        }
    }
}

/// Partial update of a group's editable fields; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupUpdate {
    pub product: Option<String>,
    pub angle: Option<String>,
    pub hook: Option<String>,
    pub creator: Option<String>,
    pub offer: Option<bool>,
    pub campaign: Option<String>,
    pub primary_text: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub cta: Option<String>,
    pub url: Option<String>,
    pub comment_media_buyer: Option<String>,
    pub comment_client: Option<String>,
}

impl GroupUpdate {
    fn apply(self, group: &mut AdGroup) {
        let text_fields = [
            (self.product, &mut group.product),
            (self.angle, &mut group.angle),
            (self.hook, &mut group.hook),
            (self.creator, &mut group.creator),
            (self.campaign, &mut group.campaign),
            (self.primary_text, &mut group.primary_text),
            (self.headline, &mut group.headline),
            (self.description, &mut group.description),
            (self.cta, &mut group.cta),
            (self.url, &mut group.url),
            (self.comment_media_buyer, &mut group.comment_media_buyer),
            (self.comment_client, &mut group.comment_client),
        ];
        for (value, field) in text_fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(offer) = self.offer {
            group.offer = offer;
        }
    }
}

/// Partial update of per-asset copy. An empty `custom_filename` clears the
/// override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetUpdate {
    pub headline: Option<String>,
    pub description: Option<String>,
    pub custom_filename: Option<String>,
}

/// One analysis run and its edit history's current state
#[derive(Debug, Clone)]
pub struct Session {
    pub inputs: UserInputs,
    pub settings: Settings,
    /// Campaign and date resolved when the analysis ran.
    pub campaign: String,
    pub date: String,
    result: GroupedAssets,
}

impl Session {
    /// Run the full pipeline over a complete asset set.
    pub fn analyze(assets: &[ProcessedAsset], inputs: UserInputs, settings: Settings) -> Self {
        let campaign = inputs.campaign_or_default();
        let date = inputs.date_or_today();
        let result = crate::run_pipeline(assets, &campaign, &date, inputs.start_number, &settings);
        Self {
            inputs,
            settings,
            campaign,
            date,
            result,
        }
    }

    /// Wrap an existing result, e.g. one restored from storage.
    pub fn from_result(result: GroupedAssets, inputs: UserInputs, settings: Settings) -> Self {
        Self {
            campaign: inputs.campaign_or_default(),
            date: inputs.date_or_today(),
            inputs,
            settings,
            result,
        }
    }

    pub fn result(&self) -> &GroupedAssets {
        &self.result
    }

    pub fn into_result(self) -> GroupedAssets {
        self.result
    }

    fn group_mut(&mut self, group_id: &str) -> SessionResult<&mut AdGroup> {
        self.result
            .group_mut(group_id)
            .ok_or_else(|| SessionError::GroupNotFound(group_id.to_string()))
    }

    fn kind_for(&self, assets: &[ProcessedAsset]) -> GroupKind {
        GroupKind::for_members(
            assets,
            self.settings.carousel_min_cards,
            self.settings.carousel_max_cards,
        )
    }

    pub fn update_group(&mut self, group_id: &str, update: GroupUpdate) -> SessionResult<&AdGroup> {
        let group = self.group_mut(group_id)?;
        update.apply(group);
        Ok(&*group)
    }

    pub fn update_asset(
        &mut self,
        group_id: &str,
        asset_id: &str,
        update: AssetUpdate,
    ) -> SessionResult<&ProcessedAsset> {
        let group = self.group_mut(group_id)?;
        let index = group
            .position_of(asset_id)
            .ok_or_else(|| SessionError::AssetNotFound(asset_id.to_string()))?;
        let asset = &mut group.assets[index];

        if let Some(headline) = update.headline {
            asset.headline = headline;
        }
        if let Some(description) = update.description {
            asset.description = description;
        }
        if let Some(custom) = update.custom_filename {
            asset.custom_filename = (!custom.is_empty()).then_some(custom);
        }
        Ok(&*asset)
    }

    /// Move an asset to `new_index` within its group, e.g. to change the
    /// card order of a carousel.
    pub fn reorder_asset(
        &mut self,
        group_id: &str,
        asset_id: &str,
        new_index: usize,
    ) -> SessionResult<&AdGroup> {
        let group = self.group_mut(group_id)?;
        let current = group
            .position_of(asset_id)
            .ok_or_else(|| SessionError::AssetNotFound(asset_id.to_string()))?;
        if new_index >= group.assets.len() {
            return Err(SessionError::InvalidIndex(new_index));
        }

        let asset = group.assets.remove(current);
        group.assets.insert(new_index, asset);
        Ok(&*group)
    }

    /// Move an asset into another group, or into a new single group when no
    /// target is given.
    ///
    /// Emptied groups are dropped and both ends get their kind re-derived. A
    /// source group left as a carousel is re-sorted into card order. All
    /// groups are then renumbered from the lowest surviving ad number.
    pub fn regroup(
        &mut self,
        asset_id: &str,
        target_group_id: Option<&str>,
        destination_index: Option<usize>,
    ) -> SessionResult<&GroupedAssets> {
        let (source_idx, asset_idx) = self
            .result
            .groups
            .iter()
            .enumerate()
            .find_map(|(gi, g)| g.position_of(asset_id).map(|ai| (gi, ai)))
            .ok_or_else(|| SessionError::AssetNotFound(asset_id.to_string()))?;

        let target_idx = match target_group_id {
            Some(target_id) => {
                let idx = self
                    .result
                    .groups
                    .iter()
                    .position(|g| g.id == target_id)
                    .ok_or_else(|| SessionError::GroupNotFound(target_id.to_string()))?;
                if idx == source_idx {
                    return Ok(&self.result);
                }
                Some(idx)
            }
            None => None,
        };

        let asset = self.result.groups[source_idx].assets.remove(asset_idx);

        match target_idx {
            Some(idx) => {
                let target = &mut self.result.groups[idx].assets;
                let insert_at = destination_index.map_or(target.len(), |i| i.min(target.len()));
                target.insert(insert_at, asset);
                let kind = self.kind_for(&self.result.groups[idx].assets);
                self.result.groups[idx].kind = kind;
            }
            None => {
                let group = AdGroup::new(GroupKind::Single, vec![asset], 0, &self.campaign, &self.date, 0.0);
                self.result.groups.push(group);
            }
        }

        if self.result.groups[source_idx].assets.is_empty() {
            self.result.groups.remove(source_idx);
        } else {
            let kind = self.kind_for(&self.result.groups[source_idx].assets);
            let source = &mut self.result.groups[source_idx];
            source.kind = kind;
            if kind == GroupKind::Carousel {
                sort_by_filename_number(&mut source.assets);
            }
        }

        let start = self
            .result
            .groups
            .iter()
            .map(|g| g.ad_number)
            .filter(|&n| n > 0)
            .min()
            .unwrap_or(self.inputs.start_number);
        renumber(&mut self.result.groups, start);

        tracing::debug!(asset = asset_id, target = ?target_group_id, "moved asset");
        Ok(&self.result)
    }

    /// Renumber every group contiguously in list order.
    pub fn renumber(&mut self, start_number: u32) -> &GroupedAssets {
        renumber(&mut self.result.groups, start_number);
        &self.result
    }

    /// Replace `find` with `replace` in `field` on every group where it
    /// matches exactly. For `offer`, both sides are parsed as yes/no.
    pub fn bulk_replace(&mut self, field: &str, find: &str, replace: &str) -> SessionResult<&GroupedAssets> {
        let field: GroupField = field.parse()?;
        for group in &mut self.result.groups {
            field.replace(group, find, replace);
        }
        Ok(&self.result)
    }

    /// Set `field` to `value` on the listed groups. Unknown ids are skipped.
    pub fn bulk_apply(&mut self, group_ids: &[String], field: &str, value: &str) -> SessionResult<&GroupedAssets> {
        let field: GroupField = field.parse()?;
        for group in &mut self.result.groups {
            if group_ids.contains(&group.id) {
                field.set(group, value);
            }
        }
        Ok(&self.result)
    }

    pub fn export_csv(&self) -> SessionResult<String> {
        export::export_csv(&self.result.groups)
    }
}

/// Independent analysis sessions keyed by id
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.insert(id, session);
        id
    }

    /// Analyse assets into a new session and return its id.
    pub fn analyze(&self, assets: &[ProcessedAsset], inputs: UserInputs, settings: Settings) -> SessionId {
        let id = self.insert(Session::analyze(assets, inputs, settings));
        tracing::info!(session = %id, "stored analysis session");
        id
    }

    pub fn with_session<R>(&self, id: &SessionId, f: impl FnOnce(&Session) -> R) -> SessionResult<R> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| SessionError::SessionNotFound(id.to_string()))?;
        Ok(f(&session))
    }

    pub fn with_session_mut<R>(&self, id: &SessionId, f: impl FnOnce(&mut Session) -> R) -> SessionResult<R> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::SessionNotFound(id.to_string()))?;
        Ok(f(&mut session))
    }

    pub fn remove(&self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

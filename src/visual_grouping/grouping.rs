use super::filename::{extract_sequence_number, sequence_key, sort_by_filename_number};
use super::hash::{distance, is_similar};
use super::text::text_overlap;
use super::{AdGroup, GroupKind, GroupedAssets, Placement, ProcessedAsset};
use crate::config::Settings;
use std::collections::HashSet;

/// Pair scores at or below this are floored to [`FLOOR_SCORE`].
const MIN_PAIR_SCORE: f64 = 0.2;
const FLOOR_SCORE: f64 = 0.1;
/// Carousel confidence when every remaining feed is taken as one carousel
/// without visual agreement.
const FALLBACK_CAROUSEL_CONFIDENCE: f64 = 0.3;
const SINGLE_CONFIDENCE: f64 = 0.2;

/// Score of a candidate story/feed pairing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    /// Composite ranking score used by the greedy matcher.
    pub score: f64,
    /// Group confidence the pair gets if committed.
    pub confidence: f64,
}

/// Bonus from filename numbers: same number (`ad1_story`/`ad1_feed`) is the
/// strongest hint, story N followed by feed N+1 next, the reversed order last.
pub fn filename_bonus(story_name: &str, feed_name: &str) -> f64 {
    let (Some(story), Some(feed)) = (
        extract_sequence_number(story_name),
        extract_sequence_number(feed_name),
    ) else {
        return 0.0;
    };

    if story == feed {
        0.35
    } else if story.checked_add(1) == Some(feed) {
        0.3
    } else if feed.checked_add(1) == Some(story) {
        0.2
    } else {
        0.0
    }
}

/// Score a story/feed candidate.
///
/// With both fingerprints present visual similarity dominates
/// (60% hash, 25% filename, 15% OCR); otherwise the filename pattern does
/// (70% filename, 30% OCR).
pub fn pair_score(story: &ProcessedAsset, feed: &ProcessedAsset, hash_threshold: u32) -> PairScore {
    let bonus = filename_bonus(story.name(), feed.name());
    let ocr = text_overlap(&story.ocr_text, &feed.ocr_text);

    let (score, confidence) = if story.has_fingerprint() && feed.has_fingerprint() {
        let hash_distance = distance(&story.fingerprint, &feed.fingerprint);
        let hash_score = (1.0 - hash_distance as f64 / hash_threshold as f64).max(0.0);
        (hash_score * 0.60 + bonus * 0.25 + ocr * 0.15, hash_score)
    } else {
        let confidence = if bonus > 0.0 { 0.3 } else { 0.1 };
        (bonus * 0.7 + ocr * 0.3, confidence)
    };

    if score > MIN_PAIR_SCORE {
        PairScore {
            score,
            confidence: confidence.max(MIN_PAIR_SCORE),
        }
    } else {
        PairScore {
            score: FLOOR_SCORE,
            confidence: FLOOR_SCORE,
        }
    }
}

/// Greedily pair stories with feeds into standard groups.
///
/// Every story x feed candidate is scored, candidates are stably sorted by
/// score (ties keep story-major order of the inputs) and a pair is committed
/// only while both members are unclaimed.
pub fn match_story_feed_pairs(
    stories: &[ProcessedAsset],
    feeds: &[ProcessedAsset],
    campaign: &str,
    date: &str,
    start_number: u32,
    settings: &Settings,
) -> (Vec<AdGroup>, HashSet<String>) {
    let mut candidates: Vec<(usize, usize, PairScore)> = Vec::with_capacity(stories.len() * feeds.len());
    for (si, story) in stories.iter().enumerate() {
        for (fi, feed) in feeds.iter().enumerate() {
            candidates.push((si, fi, pair_score(story, feed, settings.hash_threshold)));
        }
    }

    candidates.sort_by(|a, b| b.2.score.total_cmp(&a.2.score));

    let mut groups = Vec::new();
    let mut used_stories = vec![false; stories.len()];
    let mut used_feeds = vec![false; feeds.len()];
    let mut current_number = start_number;

    for (si, fi, pair) in candidates {
        if used_stories[si] || used_feeds[fi] {
            continue;
        }
        used_stories[si] = true;
        used_feeds[fi] = true;

        let (story, feed) = (&stories[si], &feeds[fi]);
        tracing::debug!(
            story = story.name(),
            feed = feed.name(),
            score = pair.score,
            confidence = pair.confidence,
            "paired story and feed"
        );

        groups.push(AdGroup::new(
            GroupKind::Standard,
            vec![story.clone(), feed.clone()],
            current_number,
            campaign,
            date,
            pair.confidence,
        ));
        current_number = current_number.saturating_add(1);
    }

    let used = groups
        .iter()
        .flat_map(|g| g.assets.iter().map(|a| a.id().to_string()))
        .collect();

    (groups, used)
}

/// Star clustering by hash: each unassigned asset seeds a cluster and pulls
/// in every later unassigned asset within `threshold` of the seed. Members
/// are not compared with each other.
pub fn cluster_by_hash(assets: &[ProcessedAsset], threshold: u32) -> Vec<Vec<ProcessedAsset>> {
    let mut clusters = Vec::new();
    let mut assigned = vec![false; assets.len()];

    for (i, seed) in assets.iter().enumerate() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut cluster = vec![seed.clone()];

        for (j, other) in assets.iter().enumerate().skip(i + 1) {
            if assigned[j] {
                continue;
            }
            if is_similar(&seed.fingerprint, &other.fingerprint, threshold) {
                cluster.push(other.clone());
                assigned[j] = true;
            }
        }

        clusters.push(cluster);
    }

    clusters
}

/// Confidence from internal agreement: `1 - mean pairwise distance / scale`,
/// clamped at zero. Sets of fewer than two assets get 0.5.
pub fn group_confidence(assets: &[ProcessedAsset], scale: f64) -> f64 {
    if assets.len() < 2 {
        return 0.5;
    }

    let mut total_distance = 0u64;
    let mut count = 0u64;
    for (i, a) in assets.iter().enumerate() {
        for b in &assets[i + 1..] {
            total_distance += distance(&a.fingerprint, &b.fingerprint) as u64;
            count += 1;
        }
    }

    let mean = total_distance as f64 / count as f64;
    (1.0 - mean / scale).max(0.0)
}

/// Detect carousels among the feeds left over after pairing.
pub fn detect_carousels(
    feeds: &[ProcessedAsset],
    campaign: &str,
    date: &str,
    start_number: u32,
    settings: &Settings,
) -> (Vec<AdGroup>, HashSet<String>) {
    let mut groups = Vec::new();
    let mut used = HashSet::new();
    let card_range = settings.carousel_min_cards..=settings.carousel_max_cards;

    if feeds.len() < settings.carousel_min_cards {
        return (groups, used);
    }

    let clusters = cluster_by_hash(feeds, settings.carousel_threshold);
    let largest = clusters.iter().map(Vec::len).max().unwrap_or(0);

    // Hashing was inconclusive but the leftover count is a plausible
    // carousel: keep it together rather than scatter it into singles.
    if card_range.contains(&feeds.len()) && largest < settings.carousel_min_cards {
        let mut cards = feeds.to_vec();
        sort_by_filename_number(&mut cards);
        used.extend(cards.iter().map(|a| a.id().to_string()));
        tracing::debug!(cards = cards.len(), "treating all remaining feeds as one carousel");
        groups.push(AdGroup::new(
            GroupKind::Carousel,
            cards,
            start_number,
            campaign,
            date,
            FALLBACK_CAROUSEL_CONFIDENCE,
        ));
        return (groups, used);
    }

    let mut current_number = start_number;
    for mut cluster in clusters {
        if !card_range.contains(&cluster.len()) {
            continue;
        }
        sort_by_filename_number(&mut cluster);
        let confidence = group_confidence(&cluster, settings.carousel_confidence_scale);
        used.extend(cluster.iter().map(|a| a.id().to_string()));
        tracing::debug!(cards = cluster.len(), confidence, "detected carousel");
        groups.push(AdGroup::new(
            GroupKind::Carousel,
            cluster,
            current_number,
            campaign,
            date,
            confidence,
        ));
        current_number = current_number.saturating_add(1);
    }

    (groups, used)
}

/// Order groups by the filename number of their first asset (numberless and
/// empty groups last). The sort is stable.
pub fn sort_groups_by_filename_number(groups: &mut [AdGroup]) {
    groups.sort_by_key(|g| match g.assets.first() {
        Some(first) => sequence_key(first.name()),
        None => (true, 0),
    });
}

/// Assign contiguous ad numbers in list order. Numbers saturate at
/// `u32::MAX` instead of wrapping.
pub fn renumber(groups: &mut [AdGroup], start_number: u32) {
    for (i, group) in groups.iter_mut().enumerate() {
        let offset = u32::try_from(i).unwrap_or(u32::MAX);
        group.ad_number = start_number.saturating_add(offset);
    }
}

/// Group processed assets into ad groups.
///
/// 1. Story/feed pairs by hash, filename and OCR agreement.
/// 2. Carousels from the feeds left over.
/// 3. A single group for every asset still unclaimed.
///
/// Groups are then ordered by filename number and numbered from
/// `start_number`. Every input asset ends up in exactly one group.
pub fn group_assets(
    assets: &[ProcessedAsset],
    campaign: &str,
    date: &str,
    start_number: u32,
    settings: &Settings,
) -> GroupedAssets {
    if assets.is_empty() {
        return GroupedAssets::default();
    }

    tracing::info!(assets = assets.len(), "grouping assets");

    let of_placement = |placement: Placement| -> Vec<ProcessedAsset> {
        assets
            .iter()
            .filter(|a| a.placement == placement)
            .cloned()
            .collect()
    };
    let mut stories = of_placement(Placement::Story);
    let mut feeds = of_placement(Placement::Feed);

    // Filename order makes the 3+4, 5+6 convention line up in the cross product
    stories.sort_by_key(|a| sequence_key(a.name()));
    feeds.sort_by_key(|a| sequence_key(a.name()));

    let mut groups = Vec::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut current_number = start_number;

    let (pairs, pair_used) =
        match_story_feed_pairs(&stories, &feeds, campaign, date, current_number, settings);
    current_number = current_number.saturating_add(pairs.len() as u32);
    groups.extend(pairs);
    used.extend(pair_used);

    let remaining_feeds: Vec<ProcessedAsset> = feeds
        .into_iter()
        .filter(|f| !used.contains(f.id()))
        .collect();
    let (carousels, carousel_used) =
        detect_carousels(&remaining_feeds, campaign, date, current_number, settings);
    current_number = current_number.saturating_add(carousels.len() as u32);
    groups.extend(carousels);
    used.extend(carousel_used);

    let placement_order = [Placement::Story, Placement::Feed, Placement::Unknown];
    for placement in placement_order {
        for asset in assets.iter().filter(|a| a.placement == placement) {
            if used.contains(asset.id()) {
                continue;
            }
            groups.push(AdGroup::new(
                GroupKind::Single,
                vec![asset.clone()],
                current_number,
                campaign,
                date,
                SINGLE_CONFIDENCE,
            ));
            current_number = current_number.saturating_add(1);
        }
    }

    sort_groups_by_filename_number(&mut groups);
    renumber(&mut groups, start_number);

    tracing::info!(
        groups = groups.len(),
        standard = groups.iter().filter(|g| g.kind == GroupKind::Standard).count(),
        carousel = groups.iter().filter(|g| g.kind == GroupKind::Carousel).count(),
        single = groups.iter().filter(|g| g.kind == GroupKind::Single).count(),
        "created ad groups"
    );

    GroupedAssets {
        groups,
        ungrouped: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual_grouping::{Asset, AssetKind, AssetMetadata};

    fn asset(name: &str, width: u32, height: u32, fingerprint: &str, ocr: &str) -> ProcessedAsset {
        ProcessedAsset::new(
            Asset {
                id: name.to_string(),
                name: name.to_string(),
                path: format!("/assets/{name}"),
                kind: AssetKind::Image,
                size_bytes: None,
            },
            AssetMetadata::new(width, height),
            ocr,
            fingerprint,
        )
    }

    fn story(name: &str, fingerprint: &str) -> ProcessedAsset {
        asset(name, 1080, 1920, fingerprint, "")
    }

    fn feed(name: &str, fingerprint: &str) -> ProcessedAsset {
        asset(name, 1080, 1080, fingerprint, "")
    }

    #[test]
    fn test_filename_bonus() {
        assert_eq!(filename_bonus("ad1_story.png", "ad1_feed.png"), 0.35);
        assert_eq!(filename_bonus("03.png", "04.png"), 0.3);
        assert_eq!(filename_bonus("04.png", "03.png"), 0.2);
        assert_eq!(filename_bonus("03.png", "07.png"), 0.0);
        assert_eq!(filename_bonus("story.png", "04.png"), 0.0);
    }

    #[test]
    fn test_pair_score_with_hashes() {
        let s = story("ad1_story.png", "ffffffff00000000");
        let f = feed("ad1_feed.png", "ffffffff00000000");
        let pair = pair_score(&s, &f, 25);
        assert!((pair.score - (0.60 + 0.35 * 0.25)).abs() < 1e-9);
        assert_eq!(pair.confidence, 1.0);
    }

    #[test]
    fn test_pair_score_without_hashes() {
        let s = story("03.png", "");
        let f = feed("04.png", "");
        let pair = pair_score(&s, &f, 25);
        // 0.3 * 0.7 = 0.21 clears the floor
        assert!((pair.score - 0.21).abs() < 1e-9);
        assert_eq!(pair.confidence, 0.3);

        let weak = pair_score(&story("a.png", ""), &feed("b.png", ""), 25);
        assert_eq!(weak, PairScore { score: 0.1, confidence: 0.1 });
    }

    #[test]
    fn test_greedy_matching_prefers_best_pairs() {
        let stories = vec![
            story("01_story.png", "ffffffff00000000"),
            story("02_story.png", "00000000ffffffff"),
        ];
        let feeds = vec![
            feed("01_feed.png", "00000000fffffff0"),
            feed("02_feed.png", "ffffffff0000000f"),
        ];
        let (groups, used) = match_story_feed_pairs(&stories, &feeds, "", "", 1, &Settings::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(used.len(), 4);
        for group in &groups {
            assert_eq!(group.kind, GroupKind::Standard);
            let d = distance(&group.assets[0].fingerprint, &group.assets[1].fingerprint);
            assert_eq!(d, 4);
        }
    }

    #[test]
    fn test_cluster_by_hash_is_star_shaped() {
        // b is close to a, c is close to b but not to a
        let assets = vec![
            feed("a.png", "0000"),
            feed("b.png", "000f"),
            feed("c.png", "00ff"),
        ];
        let clusters = cluster_by_hash(&assets, 4);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 2);
        assert_eq!(clusters[1][0].name(), "c.png");
    }

    #[test]
    fn test_group_confidence() {
        let same = vec![feed("a", "00"), feed("b", "00"), feed("c", "00")];
        assert_eq!(group_confidence(&same, 20.0), 1.0);

        // distances 4, 4, 0 -> mean 8/3
        let mixed = vec![feed("a", "00"), feed("b", "0f"), feed("c", "0f")];
        assert!((group_confidence(&mixed, 20.0) - (1.0 - (8.0 / 3.0) / 20.0)).abs() < 1e-9);

        assert_eq!(group_confidence(&same[..1], 20.0), 0.5);
        let missing = vec![feed("a", ""), feed("b", "")];
        assert_eq!(group_confidence(&missing, 20.0), 0.0);
    }

    #[test]
    fn test_carousel_fallback_takes_all_feeds() {
        let feeds = vec![
            feed("card_3.png", "0000000000000000"),
            feed("card_1.png", "ffffffffffffffff"),
            feed("card_2.png", "00000000ffffffff"),
        ];
        let (groups, used) = detect_carousels(&feeds, "", "", 1, &Settings::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(used.len(), 3);
        assert_eq!(groups[0].confidence.group, 0.3);
        let names: Vec<_> = groups[0].assets.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["card_1.png", "card_2.png", "card_3.png"]);
    }

    #[test]
    fn test_too_few_feeds_form_no_carousel() {
        let feeds = vec![feed("a.png", "00"), feed("b.png", "00")];
        let (groups, used) = detect_carousels(&feeds, "", "", 1, &Settings::default());
        assert!(groups.is_empty());
        assert!(used.is_empty());
    }

    #[test]
    fn test_oversized_cluster_falls_through() {
        let feeds: Vec<_> = (1..=11)
            .map(|i| feed(&format!("card_{i}.png"), "0000000000000000"))
            .collect();
        let (groups, _) = detect_carousels(&feeds, "", "", 1, &Settings::default());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_group_assets_orders_and_numbers() {
        let assets = vec![
            asset("05_banner.png", 1920, 1080, "", ""),
            story("ad1_story.png", "ffffffff00000000"),
            feed("ad1_feed.png", "ffffffff00000001"),
        ];
        let grouped = group_assets(&assets, "OctAds", "2026.10.18", 7, &Settings::default());
        assert!(grouped.ungrouped.is_empty());
        assert_eq!(grouped.groups.len(), 2);
        assert_eq!(grouped.groups[0].kind, GroupKind::Standard);
        assert_eq!(grouped.groups[0].ad_number, 7);
        assert_eq!(grouped.groups[1].kind, GroupKind::Single);
        assert_eq!(grouped.groups[1].ad_number, 8);
        assert_eq!(grouped.groups[1].confidence.group, 0.2);
    }

    #[test]
    fn test_mixed_clusters_skip_fallback() {
        // three close cards plus two strays: the cluster wins, strays stay free
        let feeds = vec![
            feed("card_1.png", "0000000000000000"),
            feed("card_2.png", "0000000000000001"),
            feed("card_3.png", "0000000000000003"),
            feed("card_4.png", "ffffffffffffffff"),
            feed("card_5.png", "ffffffff00000000"),
        ];
        let (groups, used) = detect_carousels(&feeds, "", "", 1, &Settings::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].assets.len(), 3);
        assert!(groups[0].confidence.group > 0.9);
        assert_eq!(used.len(), 3);
        assert!(!used.contains("card_4.png"));
        assert!(!used.contains("card_5.png"));

        let grouped = group_assets(&feeds, "", "", 1, &Settings::default());
        let kinds: Vec<_> = grouped.groups.iter().map(|g| (g.kind, g.assets.len())).collect();
        assert_eq!(
            kinds,
            vec![
                (GroupKind::Carousel, 3),
                (GroupKind::Single, 1),
                (GroupKind::Single, 1),
            ]
        );
    }

    #[test]
    fn test_numbering_saturates_at_max_start() {
        let assets = vec![
            asset("a_1.png", 1920, 1080, "", ""),
            asset("b_2.png", 1920, 1080, "", ""),
        ];
        let grouped = group_assets(&assets, "", "", u32::MAX, &Settings::default());
        assert_eq!(grouped.groups.len(), 2);
        assert!(grouped.groups.iter().all(|g| g.ad_number == u32::MAX));

        let mut groups = grouped.groups;
        renumber(&mut groups, u32::MAX - 1);
        let numbers: Vec<_> = groups.iter().map(|g| g.ad_number).collect();
        assert_eq!(numbers, vec![u32::MAX - 1, u32::MAX]);
    }

    #[test]
    fn test_group_assets_empty() {
        let grouped = group_assets(&[], "", "", 1, &Settings::default());
        assert!(grouped.groups.is_empty());
    }
}

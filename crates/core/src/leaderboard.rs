//! Leaderboard ranking.
//!
//! Entries arrive unordered (usually from the analytics endpoint). Ranking
//! sorts them under one [`SortKey`], breaks ties by partner id and name so
//! the order is total, and numbers them from 1. Ranks are never stored on
//! the entries; changing the key recomputes the whole ranking.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::partner::{Partner, PartnerGroup};
use crate::shipment::ShipmentRecord;
use crate::stats::PartnerStats;
use crate::types::DbId;

/// Glyphs for the first three places.
pub const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

/// One leaderboard row as the analytics endpoint reports it.
///
/// Group rows carry a negative id, their colour and per-member rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub partner_id: DbId,
    pub partner_name: String,
    #[serde(default)]
    pub avg_liver_weight: f64,
    #[serde(default)]
    pub avg_kosher_percent: f64,
    #[serde(default)]
    pub avg_mortality_rate: f64,
    #[serde(default)]
    pub total_score: f64,
    #[serde(default, alias = "group")]
    pub is_group: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<LeaderboardEntry>,
}

impl LeaderboardEntry {
    /// Build an entry from locally computed stats. Stats are rounded to two
    /// decimals before scoring, matching the analytics endpoint.
    pub fn from_stats(partner_id: DbId, partner_name: impl Into<String>, stats: PartnerStats) -> Self {
        let stats = stats.rounded();
        Self {
            partner_id,
            partner_name: partner_name.into(),
            avg_liver_weight: stats.avg_liver_weight,
            avg_kosher_percent: stats.avg_kosher_percent,
            avg_mortality_rate: stats.avg_mortality_rate,
            total_score: stats.score(),
            is_group: false,
            color: None,
            members: Vec::new(),
        }
    }

    /// Value of the metric a key sorts on.
    pub fn metric(&self, key: SortKey) -> f64 {
        match key {
            SortKey::TotalScore => self.total_score,
            SortKey::LiverWeight => self.avg_liver_weight,
            SortKey::KosherPercent => self.avg_kosher_percent,
            SortKey::MortalityRate => self.avg_mortality_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Sort keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "score")]
    TotalScore,
    #[serde(rename = "liver")]
    LiverWeight,
    #[serde(rename = "kosher")]
    KosherPercent,
    #[serde(rename = "mortality")]
    MortalityRate,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        Self::TotalScore,
        Self::LiverWeight,
        Self::KosherPercent,
        Self::MortalityRate,
    ];

    /// Lower mortality is better; every other metric ranks high-first.
    pub fn ascending(self) -> bool {
        matches!(self, Self::MortalityRate)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TotalScore => "score",
            Self::LiverWeight => "liver",
            Self::KosherPercent => "kosher",
            Self::MortalityRate => "mortality",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown leaderboard sort key '{needle}'. Must be one of: score, liver, kosher, mortality"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// An entry with its position under the active key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub rank: usize,
    /// Medal glyph for ranks 1-3, otherwise `"{rank}."`.
    pub label: String,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Medal glyph for ranks 1-3, `"{rank}."` from 4 on.
pub fn medal_label(rank: usize) -> String {
    match rank {
        1..=3 => MEDALS[rank - 1].to_string(),
        _ => format!("{rank}."),
    }
}

fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry, key: SortKey) -> Ordering {
    let by_metric = a.metric(key).total_cmp(&b.metric(key));
    let by_metric = if key.ascending() { by_metric } else { by_metric.reverse() };
    by_metric
        .then_with(|| a.partner_id.cmp(&b.partner_id))
        .then_with(|| a.partner_name.cmp(&b.partner_name))
}

/// Rank `entries` under `key`. The input order does not affect the result.
pub fn rank(entries: &[LeaderboardEntry], key: SortKey) -> Vec<RankedEntry> {
    let mut sorted: Vec<&LeaderboardEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| compare(a, b, key));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, entry)| RankedEntry {
            rank: i + 1,
            label: medal_label(i + 1),
            entry: entry.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Building entries from shipments
// ---------------------------------------------------------------------------

/// Build leaderboard entries from raw shipments, the way the analytics
/// endpoint does.
///
/// Every group yields one entry (id negated so it never collides with a
/// partner id) scoring the pooled shipments of its members, with one
/// member entry per partner even when that partner has no data. Partners
/// outside any group are listed only when they have liver or kosher data.
pub fn build_entries(
    partners: &[Partner],
    groups: &[PartnerGroup],
    shipments: &[ShipmentRecord],
) -> Vec<LeaderboardEntry> {
    let mut by_partner: HashMap<DbId, Vec<&ShipmentRecord>> = HashMap::new();
    for shipment in shipments {
        let owner = shipment
            .partner_id
            .or_else(|| shipment.partner.as_ref().map(|p| p.id));
        if let Some(owner) = owner {
            by_partner.entry(owner).or_default().push(shipment);
        }
    }
    let history = |id: DbId| by_partner.get(&id).map(Vec::as_slice).unwrap_or_default();
    let name_of = |id: DbId| {
        partners
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    };

    let mut entries = Vec::new();
    let mut grouped: HashSet<DbId> = HashSet::new();

    for group in groups {
        let mut pooled: Vec<&ShipmentRecord> = Vec::new();
        let mut members = Vec::with_capacity(group.partner_ids.len());
        for &member in &group.partner_ids {
            grouped.insert(member);
            let rows = history(member);
            pooled.extend_from_slice(rows);
            members.push(LeaderboardEntry::from_stats(
                member,
                name_of(member),
                PartnerStats::from_shipments(rows.iter().copied()),
            ));
        }

        let stats = PartnerStats::from_shipments(pooled).rounded();
        if !stats.has_quality_data() && members.is_empty() {
            continue;
        }
        let mut entry = LeaderboardEntry::from_stats(-group.id, group.name.clone(), stats);
        entry.is_group = true;
        entry.color = Some(group.color.clone());
        entry.members = members;
        entries.push(entry);
    }

    for partner in partners.iter().filter(|p| !grouped.contains(&p.id)) {
        let stats = PartnerStats::from_shipments(history(partner.id).iter().copied()).rounded();
        if stats.has_quality_data() {
            entries.push(LeaderboardEntry::from_stats(partner.id, partner.name.clone(), stats));
        }
    }

    entries
}

/// Leaderboard view state: the raw entries plus the ranking for the active
/// key.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    sort_key: SortKey,
    ranked: Vec<RankedEntry>,
}

impl Leaderboard {
    pub fn new(entries: Vec<LeaderboardEntry>, sort_key: SortKey) -> Self {
        let ranked = rank(&entries, sort_key);
        Self {
            entries,
            sort_key,
            ranked,
        }
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn ranked(&self) -> &[RankedEntry] {
        &self.ranked
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Switch the active key and rebuild the full ranking.
    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
        self.ranked = rank(&self.entries, key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

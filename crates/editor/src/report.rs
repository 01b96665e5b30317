//! Dashboard report: the ranked leaderboard plus the weekly delivery trend.

use serde::Serialize;

use poultry_core::leaderboard::{Leaderboard, RankedEntry, SortKey};
use poultry_core::trend::{self, TrendChart};
use poultry_core::types::DbId;

use crate::error::{EditorError, EditorResult};
use crate::gateway::Gateway;

/// Fetch the leaderboard and rank it under `sort_key`.
pub async fn load_leaderboard(gateway: &dyn Gateway, sort_key: SortKey) -> EditorResult<Leaderboard> {
    let entries = gateway.leaderboard().await?;
    tracing::debug!(entries = entries.len(), %sort_key, "Leaderboard loaded");
    Ok(Leaderboard::new(entries, sort_key))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub sort_key: SortKey,
    pub leaderboard: Vec<RankedEntry>,
    /// Years with shipments, newest first.
    pub years: Vec<i32>,
    pub trend_year: Option<i32>,
    pub trend: Option<TrendChart>,
}

/// Build the report over the shipments of `partner_ids`.
pub async fn build_report(
    gateway: &dyn Gateway,
    partner_ids: &[DbId],
    sort_key: SortKey,
    trend_year: Option<i32>,
) -> EditorResult<Report> {
    let (leaderboard, history) = futures::try_join!(
        load_leaderboard(gateway, sort_key),
        async { gateway.batch_history(partner_ids).await.map_err(EditorError::from) },
    )?;

    Ok(Report {
        sort_key,
        leaderboard: leaderboard.ranked().to_vec(),
        years: trend::available_years(&history),
        trend_year,
        trend: trend::aggregate_year(&history, trend_year),
    })
}

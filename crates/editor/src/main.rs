//! `poultry-report` -- prints the partner leaderboard and weekly delivery
//! trend for a JSON fixture.
//!
//! See [`poultry_editor::config`] for the environment variables read.

use poultry_editor::config::ReportConfig;
use poultry_editor::gateway::Gateway;
use poultry_editor::memory::{Fixture, InMemoryGateway};
use poultry_editor::report;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poultry_editor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let config = ReportConfig::from_env()?;
    tracing::info!(
        fixture = %config.fixture_path.display(),
        sort_key = %config.sort_key,
        trend_year = ?config.trend_year,
        "Building report",
    );

    let fixture = Fixture::from_path(&config.fixture_path).await?;
    let gateway = InMemoryGateway::new(fixture);
    let partner_ids = gateway.partner_ids().await;

    let gateway: &dyn Gateway = &gateway;
    let report = report::build_report(gateway, &partner_ids, config.sort_key, config.trend_year)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    tracing::info!(
        entries = report.leaderboard.len(),
        series = report.trend.as_ref().map_or(0, |t| t.series.len()),
        "Report built",
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

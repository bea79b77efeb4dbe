use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tradelog::domain::{dedup_trades, sort_trades_deterministic};
use tradelog::engine::{cumulative, pnl_buckets, summarize, PnlBucket, SummaryStats};
use tradelog::{Compiler, Config, Position, PositionInput};
use uuid::Uuid;

/// Accepted input shapes: a bare list of positions or `{"positions": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TradeBook {
    List(Vec<PositionInput>),
    Wrapped { positions: Vec<PositionInput> },
}

impl TradeBook {
    fn into_positions(self) -> Vec<PositionInput> {
        match self {
            TradeBook::List(positions) | TradeBook::Wrapped { positions } => positions,
        }
    }
}

#[derive(Serialize)]
struct Rejected {
    position_id: Uuid,
    error: String,
}

#[derive(Serialize)]
struct Report {
    positions: Vec<Position>,
    rejected: Vec<Rejected>,
    buckets: Vec<PnlBucket>,
    cumulative: Vec<PnlBucket>,
    summary: SummaryStats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: tradelog <trade-book.json>");
    };
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let book: TradeBook =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path))?;

    let inputs: Vec<PositionInput> = book
        .into_positions()
        .into_iter()
        .map(|mut input| {
            let mut trades = dedup_trades(std::mem::take(&mut input.trades));
            sort_trades_deterministic(&mut trades);
            input.trades = trades;
            input
        })
        .collect();

    let compiler = Compiler::from_config(&config).context("Failed to load fee schedules")?;
    let (positions, failures) = compiler.compile_all(inputs);
    tracing::info!(
        compiled = positions.len(),
        rejected = failures.len(),
        "Trade book recomputed"
    );

    let range_start = positions.iter().map(|p| p.opened_at).min();
    let range_end = positions
        .iter()
        .flat_map(|p| p.trades.iter().map(|t| t.time))
        .max();
    let buckets = match (range_start, range_end) {
        (Some(start), Some(end)) => pnl_buckets(
            &positions,
            config.bucket_period,
            start,
            end + Duration::seconds(1),
            config.display_timezone,
        )?,
        _ => Vec::new(),
    };

    let report = Report {
        cumulative: cumulative(&buckets),
        summary: summarize(&positions),
        rejected: failures
            .into_iter()
            .map(|(position_id, e)| Rejected {
                position_id,
                error: e.to_string(),
            })
            .collect(),
        positions,
        buckets,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

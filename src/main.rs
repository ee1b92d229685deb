//! value-analyzer CLI: scores a JSON array of scraped listings and prints the report.
//!
//! Usage: `value-analyzer [PRODUCTS_JSON] [REQUIREMENT...]`
//! Set `VALUE_BUDGET=10000` to include the budget view.

use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use value_analyzer::acquire::load_raw_records;
use value_analyzer::analyze::filter_by_budget;
use value_analyzer::analyzer_from_default_config;

const DEFAULT_PRODUCTS_PATH: &str = "data/sample_products.json";
const ENV_BUDGET: &str = "VALUE_BUDGET";

/// Compact logs on stderr; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("value_analyzer=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn budget_from_env() -> Option<f64> {
    std::env::var(ENV_BUDGET)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|b| b.is_finite() && *b >= 0.0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev (GEMINI_API_KEY, VALUE_AI_CONFIG_PATH, ...).
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PRODUCTS_PATH));
    let requirement = args.collect::<Vec<_>>().join(" ");
    let requirement = Some(requirement.trim()).filter(|s| !s.is_empty());

    let raws = load_raw_records(&path)?;
    let analyzer = analyzer_from_default_config();

    let report = match analyzer.analyze(&raws, requirement).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    if report.is_degraded() {
        eprintln!("note: feature weights come from the local heuristic");
    }

    let budget = budget_from_env()
        .map(|b| filter_by_budget(&report.records, &report.weights, b));
    let out = serde_json::json!({
        "report": report,
        "budget": budget,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

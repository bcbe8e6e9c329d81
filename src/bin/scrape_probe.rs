//! Runs one acquisition against a reference and prints the record or the failure trail.
//!
//! Usage: `scrape_probe <reference> [source]`

use outreach_voice::acquire::types::AcquisitionRequest;
use outreach_voice::acquire::{AcquireError, Orchestrator};
use outreach_voice::bootstrap::{build_sources, log_credential_summary};
use outreach_voice::config::OutreachConfig;

// Poll-by-poll progress is the point of this tool.
const PROBE_LOG_FILTER: &str = "outreach_voice=debug,acquire=debug,poller=debug,info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(PROBE_LOG_FILTER)),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(reference) = args.next() else {
        eprintln!("usage: scrape_probe <reference> [source]");
        std::process::exit(2);
    };

    let cfg = OutreachConfig::load()?;
    log_credential_summary(&cfg);
    let orchestrator = Orchestrator::new(build_sources(&cfg)?);
    println!("sources: {}", orchestrator.source_names().join(", "));

    let mut request = AcquisitionRequest::new(reference);
    if let Some(source) = args.next() {
        request = request.restricted_to([source]);
    }

    match orchestrator.acquire(&request).await {
        Ok(acquired) => {
            println!("acquired via {}", acquired.source);
            println!("{}", serde_json::to_string_pretty(&acquired.record)?);
        }
        Err(AcquireError::Exhausted(failure)) => {
            println!("all sources failed; most informative: {}", failure.reason);
            for f in &failure.attempts {
                println!("  - {f}");
            }
        }
        Err(defect) => return Err(defect.into()),
    }
    Ok(())
}

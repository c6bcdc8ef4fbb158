//! Replays recorded model dumps through the analysis pipeline.
//!
//! Usage: `pitchradar-replay <dump.jsonl>...`
//!
//! `PITCHRADAR_CONFIG` points at an optional config file,
//! `PITCHRADAR_OUTPUT_DIR` overrides where scene files are written.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pitchradar::job::{JobService, JobStatus};
use pitchradar::replay::ReplayBackend;
use pitchradar::PipelineConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pitchradar=info")))
        .init();

    let inputs: Vec<String> = std::env::args().skip(1).collect();
    if inputs.is_empty() {
        eprintln!("usage: pitchradar-replay <dump.jsonl>...");
        std::process::exit(2);
    }

    let config_path = std::env::var_os("PITCHRADAR_CONFIG").map(PathBuf::from);
    let config = match PipelineConfig::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let output_dir = std::env::var_os("PITCHRADAR_OUTPUT_DIR").map(PathBuf::from);
    let backend = Arc::new(ReplayBackend::new(&config, output_dir));
    let service = JobService::new(config, backend);

    let ids: Vec<_> = inputs.iter().map(|input| service.submit(input)).collect();

    let mut failed = 0;
    for id in ids {
        match service.wait(id).await {
            Ok(rec) if rec.status == JobStatus::Done => {
                info!(job = %id, input = %rec.input, output = ?rec.output, "done");
            }
            Ok(rec) => {
                failed += 1;
                error!(job = %id, input = %rec.input, error = ?rec.error, "failed");
            }
            Err(e) => {
                failed += 1;
                error!(job = %id, "{}", e);
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

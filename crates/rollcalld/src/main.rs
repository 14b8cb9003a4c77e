use anyhow::{Context, Result};
use rollcall_core::{AttendanceRecorder, Config, RecordOutcome};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

mod report;
mod service;

use report::{AcceptedEvent, Command, FrameReport, Input};
use service::RecorderHandle;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries accepted events; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::load().context("failed to load configuration")?;
    let recorder =
        AttendanceRecorder::open(&config).context("failed to open attendance ledger")?;
    let handle = service::spawn_recorder(recorder)?;

    tracing::info!("rollcalld ready; reading recognition reports from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    tracing::info!("input closed");
                    break;
                };
                handle_line(&handle, &mut stdout, &line).await?;
            }
            _ = &mut shutdown => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    tracing::info!("rollcalld shutting down");
    Ok(())
}

/// Dispatch one input line. Malformed lines are logged and skipped; only a
/// dead recorder thread or a closed stdout is fatal.
async fn handle_line(
    handle: &RecorderHandle,
    out: &mut tokio::io::Stdout,
    line: &str,
) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    match Input::parse(line) {
        Ok(Input::Command {
            command: Command::ClearCache,
        }) => {
            let dropped = handle.clear_cache().await?;
            tracing::info!(dropped, "cache reset requested");
        }
        Ok(Input::Sighting { identity, camera }) => {
            let outcome = handle.record(identity.as_str()).await?;
            emit(out, &identity, outcome, camera.as_deref()).await?;
        }
        Ok(Input::Frame(FrameReport { camera, faces })) => {
            for (identity, outcome) in handle.record_frame(faces).await? {
                emit(out, identity.as_str(), outcome, camera.as_deref()).await?;
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed input line");
        }
    }

    Ok(())
}

async fn emit(
    out: &mut tokio::io::Stdout,
    identity: &str,
    outcome: RecordOutcome,
    camera: Option<&str>,
) -> Result<()> {
    match outcome {
        RecordOutcome::Accepted(row) => {
            let mut json = serde_json::to_string(&AcceptedEvent { row: &row, camera })?;
            json.push('\n');
            out.write_all(json.as_bytes()).await?;
            out.flush().await?;
        }
        RecordOutcome::Suppressed(reason) => {
            tracing::debug!(identity, camera = ?camera, %reason, "not recorded");
        }
    }
    Ok(())
}

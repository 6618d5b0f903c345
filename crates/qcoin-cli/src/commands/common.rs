//! Helpers shared by the commands.

use anyhow::{Context, Result};
use serde::Serialize;

/// Print `report` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

/// Run a blocking, printing scenario off the async runtime.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Scenario task aborted")?
}

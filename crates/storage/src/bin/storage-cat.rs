//! storage-cat binary entry point
//!
//! Streams one object from the configured storage to stdout.
//!
//! Usage: `storage-cat <config.json> <name> [--ignore-missing]`

use std::process::ExitCode;

use storage::Storage;
use storage_core::{logging, Error, Result, StorageConfig};
use tokio::io::AsyncWriteExt;

const USAGE: &str = "usage: storage-cat <config.json> <name> [--ignore-missing]";

#[tokio::main]
async fn main() -> ExitCode {
    logging::init("storage=info,storage_core=info");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let ignore_missing = args.iter().any(|arg| arg == "--ignore-missing");
    let positional: Vec<&String> = args.iter().filter(|arg| !arg.starts_with("--")).collect();

    let [config_path, name] = positional.as_slice() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    match run(config_path, name, ignore_missing).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, kind = %e.kind(), "Read failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &str, name: &str, ignore_missing: bool) -> Result<()> {
    let config = StorageConfig::from_file(config_path)?;
    let storage = Storage::from_config(config).await?;

    let mut file = storage.new_read_with(
        name,
        ignore_missing || storage.config().ignore_missing,
        storage.config().buffer_size,
    );
    if !file.open().await?.is_opened() {
        tracing::info!(%name, "Object missing, nothing to read");
        return Ok(());
    }

    let mut stdout = tokio::io::stdout();
    let mut total = 0u64;
    while let Some(chunk) = file.read().await? {
        stdout
            .write_all(&chunk)
            .await
            .map_err(|e| Error::from_io("stdout", e))?;
        total += chunk.len() as u64;
    }
    stdout.flush().await.map_err(|e| Error::from_io("stdout", e))?;

    let outcome = file.close().await;
    if let Some(warning) = outcome.warning() {
        tracing::warn!(%name, error = %warning, "Object read but release failed");
    }

    tracing::info!(%name, bytes = total, "Object copied to stdout");
    Ok(())
}

//! Blueprint Inspect Binary
//!
//! Loads a stored blueprint, rebuilds it and prints the rebuilt stats as
//! JSON on stdout. Every connection record that could not be restored is
//! logged as a warning.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `SNAP_POLICY`: path to a JSON `SnapPolicyV1` (default: built-in defaults)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin blueprint_inspect --features fs -- blueprints/buggy.blueprint.json
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use assembly_kernel::store::file::BLUEPRINT_EXTENSION;
use assembly_kernel::{
    BlueprintCodec, BlueprintStats, BlueprintStore, FileBlueprintStore, SnapPolicyV1,
    ASSEMBLY_KERNEL_SCHEMA_VERSION,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blueprint_inspect=info,assembly_kernel=info".into());

    // Logs go to stderr so stdout stays valid JSON.
    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
            )
            .init();
    }
}

fn load_policy() -> Result<SnapPolicyV1, Box<dyn std::error::Error>> {
    match std::env::var("SNAP_POLICY") {
        Ok(path) if !path.is_empty() => {
            let bytes = std::fs::read(&path)?;
            let policy: SnapPolicyV1 = serde_json::from_slice(&bytes)?;
            info!(path = %path, params_hash = %policy.params_hash(), "policy loaded");
            Ok(policy)
        }
        _ => Ok(SnapPolicyV1::default()),
    }
}

/// Split `dir/name.blueprint.json` into a store root and a blueprint name.
fn locate(path: &Path) -> Option<(PathBuf, String)> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.strip_suffix(BLUEPRINT_EXTENSION)?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((root, name.to_string()))
}

#[derive(Serialize)]
struct InspectReport<'a> {
    schema_version: &'a str,
    name: &'a str,
    fingerprint: String,
    saved: &'a BlueprintStats,
    rebuilt: BlueprintStats,
    skipped: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("usage: blueprint_inspect <name.blueprint.json>")?;
    let (root, name) = locate(&path)
        .ok_or_else(|| format!("expected a *{BLUEPRINT_EXTENSION} file, got {}", path.display()))?;

    let store = FileBlueprintStore::new(root);
    let snapshot = store
        .load(&name)
        .await?
        .ok_or_else(|| format!("blueprint not found: {}", path.display()))?;

    let codec = BlueprintCodec::new(load_policy()?);
    let rebuilt = codec.build(&snapshot)?;
    for skipped in &rebuilt.skipped {
        let record = &snapshot.connections[skipped.record];
        warn!(
            record = skipped.record,
            part_a = record.part_a,
            part_b = record.part_b,
            reason = %skipped.reason,
            "connection record not restored"
        );
    }

    let report = InspectReport {
        schema_version: ASSEMBLY_KERNEL_SCHEMA_VERSION,
        name: &snapshot.metadata.name,
        fingerprint: snapshot.fingerprint(),
        saved: &snapshot.stats,
        rebuilt: BlueprintStats::from_graph(&rebuilt.graph),
        skipped: rebuilt.skipped_count(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

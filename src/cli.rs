use crate::adapters::storage::json_file::JsonFileCallStorage;
use crate::app::dto::{CallListing, CallSummary};
use crate::domain::call::RecordedCall;
use crate::domain::ports::CallStorage;
use anyhow::{Context as _, Result};
use std::path::Path;

fn load_recording(path: &Path) -> Result<Vec<RecordedCall>> {
    let storage = JsonFileCallStorage::new(path);
    storage
        .load()
        .with_context(|| format!("Failed to load call recording: {}", path.display()))?
        .ok_or_else(|| anyhow::anyhow!("No call recording found at {}", path.display()))
}

/// Print the calls of a recording, optionally only those whose method
/// contains `method_filter`.
pub fn inspect_recording(path: &Path, method_filter: Option<&str>, json: bool) -> Result<()> {
    let calls = load_recording(path)?;
    let listing = CallListing::from_recorded(&calls, method_filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("Recording: {}", path.display());
    println!("{}", "=".repeat(80));
    if listing.calls.is_empty() {
        println!("No matching calls ({} recorded).", listing.total_calls);
        return Ok(());
    }
    for call in &listing.calls {
        println!("{}. {}", call.position, call.method);
        if !call.output_arguments.is_empty() {
            println!("   out/ref: {}", call.output_arguments.join(", "));
        }
        println!("   returns: {}", call.return_value);
    }
    println!(
        "\nShowing {} of {} recorded call(s)",
        listing.calls.len(),
        listing.total_calls
    );
    Ok(())
}

/// Print call counts per method.
pub fn summarize_recording(path: &Path, json: bool) -> Result<()> {
    let calls = load_recording(path)?;
    let summary = CallSummary::from_recorded(&calls);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Recording: {}", path.display());
    println!("  Total calls: {}", summary.total_calls);
    println!("  Distinct methods: {}", summary.methods.len());
    println!();
    for item in &summary.methods {
        println!("  {:>6}  {}", item.calls, item.method);
    }
    Ok(())
}

//! Catalog listing handlers

use crate::error::CliError;
use hearth::{CatalogEntry, Hearth};

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn print_entries(entries: &[CatalogEntry]) {
    for entry in entries {
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("  {:<48} {:>10}  {}", entry.name, human_size(entry.size_bytes), modified);
    }
}

pub async fn list_models(app: &Hearth) -> Result<(), CliError> {
    let entries = app.models().list().await?;
    println!("📦 Models in {}\n", app.config().models_dir.display());
    if entries.is_empty() {
        println!("  (none found)");
    }
    print_entries(&entries);
    Ok(())
}

pub async fn list_prompts(app: &Hearth) -> Result<(), CliError> {
    let entries = app.prompts().list().await?;
    println!("📝 Prompts in {}\n", app.config().prompts_dir.display());
    if entries.is_empty() {
        println!("  (none found)");
    }
    print_entries(&entries);
    Ok(())
}

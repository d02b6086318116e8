use anyhow::{Context, Result};
use marquee_core::{CatalogTable, Database};
use std::path::Path;

/// Drop and recreate the catalog tables.
pub fn run_init(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    db.apply_schema().context("Failed to apply schema")?;

    println!("✓ Initialized catalog at {}", db_path.display());
    for table in CatalogTable::ALL {
        println!("  - {table}");
    }
    Ok(())
}

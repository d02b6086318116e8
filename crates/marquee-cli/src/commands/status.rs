use anyhow::Result;
use marquee_core::{CatalogTable, Database};
use std::path::Path;

pub fn show_status(db_path: &Path) -> Result<()> {
    println!("\n📊 Marquee Status\n");
    println!("  Database: {}", db_path.display());

    if !db_path.exists() {
        println!("\n  No catalog yet. Run `marquee run` or `marquee init`.");
        return Ok(());
    }

    let db = Database::open(db_path)?;
    let mut missing = Vec::new();
    for table in CatalogTable::ALL {
        if db.table_exists(table.name())? {
            println!("  {:<16} {:>8} rows", table.name(), db.count_rows(table)?);
        } else {
            missing.push(table.name());
        }
    }

    if !missing.is_empty() {
        println!("\n  Missing tables: {}", missing.join(", "));
        println!("  Run `marquee init` to create them");
    }

    Ok(())
}

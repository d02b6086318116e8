use anyhow::Result;
use marquee_etl::{config, Config};

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    let path = config::config_file_path();
    println!("Config file: {}", path.display());
    println!(
        "File exists: {}\n",
        if path.exists() { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    println!(
        "  omdb_api_key: {}",
        if config.omdb_key().is_some() { "<set>" } else { "<not set>" }
    );
    println!("  database_path: {}", config.database_path.display());
    println!("  data_dir: {}", config.data_dir.display());
    println!("  cache_path: {}", config.cache_path.display());
    println!("  output_dir: {}", config.output_dir.display());
    println!("  run_log_path: {}", config.run_log_path.display());
    println!("  omdb_max_retries: {}", config.omdb_max_retries);

    println!("\nPriority: CLI args > ENV vars (MARQUEE_*) > Config file > Defaults");

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure marquee.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

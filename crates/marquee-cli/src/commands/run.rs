use anyhow::{Context, Result};
use marquee_etl::{build_pipeline, run_pipeline, Config, EnrichMode, EtlRun};

/// Run the full ETL: load the CSVs, enrich, export the top 10.
pub async fn run_etl(config: &Config, mode: EnrichMode, export: bool) -> Result<()> {
    log::info!("Starting ETL");
    log::info!("  Data directory: {}", config.data_dir.display());
    log::info!("  Database: {}", config.database_path.display());

    let workflow =
        build_pipeline(config, &mode, export).context("Failed to build pipeline")?;

    let run = EtlRun::fresh(config.data_dir.clone());

    // Subscribe to events for progress display
    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    if let Err(e) = run_pipeline(&workflow, &run, &config.pipeline_state_path()).await {
        log::error!("ETL failed: {e}");
        return Err(e).context("Pipeline execution failed");
    }

    log::info!("ETL finished");
    Ok(())
}

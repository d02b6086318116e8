use std::path::Path;

use treadle::{SqliteStateStore, StageStatus, WorkItem, Workflow};

use crate::config::Config;
use crate::enrich::stage::{EnrichMode, EnrichStage};
use crate::export::ExportStage;
use crate::error::{EtlError, EtlResult};
use crate::load::LoadStage;
use crate::work_item::EtlRun;

/// Build the load -> enrich -> export pipeline.
///
/// The export stage is left out when `export` is false.
///
/// # Errors
/// Returns an error if the workflow cannot be built.
pub fn build_pipeline(
    config: &Config,
    mode: &EnrichMode,
    export: bool,
) -> treadle::Result<Workflow> {
    let load_stage = LoadStage::new(config.data_dir.clone(), config.database_path.clone());
    let enrich_stage = EnrichStage::new(config, mode).map_err(|e| {
        treadle::TreadleError::InvalidWorkflow(format!("Failed to create enrich stage: {e}"))
    })?;

    let builder = Workflow::builder()
        .stage("load", load_stage)
        .stage("enrich", enrich_stage)
        .dependency("enrich", "load");

    if export {
        let export_stage =
            ExportStage::new(config.database_path.clone(), config.output_dir.clone());
        builder
            .stage("export", export_stage)
            .dependency("export", "enrich")
            .build()
    } else {
        builder.build()
    }
}

/// Advance `run` through `workflow`, keeping stage state in `state_path`.
///
/// treadle records a failing stage in the state store and stops that path
/// without returning an error, so the outcome is read back from the store
/// once `advance` returns.
///
/// # Errors
/// Returns [`EtlError::StageFailed`] for the first failed stage, or
/// [`EtlError::Incomplete`] if any stage did not run.
pub async fn run_pipeline(
    workflow: &Workflow,
    run: &EtlRun,
    state_path: &Path,
) -> EtlResult<()> {
    let mut store = SqliteStateStore::open(state_path).await?;
    workflow.advance(run, &mut store).await?;

    let status = workflow.status(run.id(), &store).await?;
    if let Some(failed) = status
        .stages
        .iter()
        .find(|s| matches!(s.status, StageStatus::Failed))
    {
        return Err(EtlError::StageFailed {
            stage: failed.name.clone(),
            message: failed
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    if !status.is_complete() {
        let pending: Vec<&str> = status
            .stages
            .iter()
            .filter(|s| !matches!(s.status, StageStatus::Complete))
            .map(|s| s.name.as_str())
            .collect();
        return Err(EtlError::Incomplete {
            pending: pending.join(", "),
        });
    }

    Ok(())
}

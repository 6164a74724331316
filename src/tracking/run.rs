//! Scoped run lifecycle

use std::future::Future;

use tracing::{error, info};

use super::{RunInfo, RunStatus, TrackingClient};
use crate::error::Result;

/// Open a run, drive `body` against it, and close it.
///
/// The run is ended exactly once: `FINISHED` when `body` succeeds, `FAILED`
/// when it returns an error. An error from `body` takes precedence over a
/// failure to close the run, which is logged instead.
pub async fn with_run<C, F, Fut, T>(client: &C, run_name: &str, body: F) -> Result<(RunInfo, T)>
where
    C: TrackingClient + ?Sized,
    F: FnOnce(RunInfo) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let run = client.create_run(run_name).await?;
    info!(run_id = %run.run_id, experiment_id = %run.experiment_id, "tracking run opened");

    match body(run.clone()).await {
        Ok(value) => {
            client.end_run(&run, RunStatus::Finished).await?;
            info!(run_id = %run.run_id, "tracking run finished");
            Ok((run, value))
        }
        Err(err) => {
            if let Err(close_err) = client.end_run(&run, RunStatus::Failed).await {
                error!(run_id = %run.run_id, error = %close_err, "failed to close tracking run");
            } else {
                info!(run_id = %run.run_id, "tracking run marked failed");
            }
            Err(err)
        }
    }
}

use toprepos::connect_and_migrate;
use toprepos::source::build_source;
use toprepos::sync::{ErrorPolicy, SyncOrchestrator};

use crate::SyncArgs;
use crate::config::Config;
use crate::progress::LoggingReporter;

/// Run one sync cycle.
///
/// A failed cycle is logged and reported as success so a scheduler simply
/// runs the next one. Only setup problems (bad configuration, unreachable
/// database) return an error.
pub(crate) async fn handle_sync(
    args: SyncArgs,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let source_config = config.source_config()?;
    let mut options = config.sync_options()?;
    if let Some(top_n) = args.top_n {
        options.top_n = top_n;
    }
    if args.continue_on_error {
        options.on_error = ErrorPolicy::Continue;
    }

    let source = build_source(&source_config)?;
    let db = connect_and_migrate(database_url, &config.pool_options()).await?;

    let reporter = LoggingReporter::new();
    let orchestrator = SyncOrchestrator::new(source, db.clone(), options)
        .with_progress(Box::new(move |event| reporter.handle(event)));

    match orchestrator.run_cycle().await {
        Ok(report) if report.is_clean() => {
            tracing::info!(
                ranked = report.ranked,
                synced = report.activity_synced,
                rows = report.activity_rows,
                "Sync finished"
            );
        }
        Ok(report) => {
            for failure in &report.failures {
                tracing::warn!(
                    repo = %format!("{}/{}", failure.owner, failure.repo),
                    error = %failure.error,
                    "Repository skipped"
                );
            }
            tracing::warn!(
                ranked = report.ranked,
                synced = report.activity_synced,
                failed = report.failures.len(),
                "Sync finished with failures"
            );
        }
        Err(err) => {
            tracing::error!(error = %err, retryable = err.is_retryable(), "Sync cycle failed");
        }
    }

    db.close().await?;
    Ok(())
}

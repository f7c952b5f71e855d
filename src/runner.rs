// Concurrent hook execution with per-hook failure isolation
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::json;

use crate::core::{Job, PartialResult};
use crate::error::HookExecutionError;
use crate::hooks::Hook;

/// Default per-hook timeout; matches the process timeout used elsewhere
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(300);

/// Drives the concurrent execution of all hooks selected for one run.
#[derive(Debug, Clone)]
pub struct HookRunner {
    hook_timeout: Duration,
}

impl Default for HookRunner {
    fn default() -> Self {
        Self::new(DEFAULT_HOOK_TIMEOUT)
    }
}

impl HookRunner {
    pub fn new(hook_timeout: Duration) -> Self {
        Self { hook_timeout }
    }

    /// Execute all hooks concurrently against the same job and wait for every
    /// one to settle.
    ///
    /// Each hook is isolated: an error, panic, or timeout in one hook becomes a
    /// partial result carrying one error plus `failedHook`/`failureReason`
    /// information entries, so the remaining hooks still contribute to the
    /// report. Results are returned in input order.
    pub async fn run_all(&self, hooks: Vec<Arc<dyn Hook>>, job: Arc<Job>) -> Vec<PartialResult> {
        let timeout = self.hook_timeout;
        let tasks = hooks.into_iter().map(|hook| {
            let job = Arc::clone(&job);
            let hook_id = hook.id().to_string();
            let handle =
                tokio::spawn(
                    async move { tokio::time::timeout(timeout, hook.run(job)).await },
                );
            async move {
                match handle.await {
                    Ok(Ok(Ok(result))) => {
                        tracing::debug!(hook_id = %hook_id, "hook completed");
                        result
                    }
                    Ok(Ok(Err(err))) => {
                        tracing::warn!(hook_id = %hook_id, error = %err, "hook failed");
                        failure_result(&hook_id, &err.to_string())
                    }
                    Ok(Err(_elapsed)) => {
                        let err = HookExecutionError::ExecutionTimeout {
                            hook_id: hook_id.clone(),
                            timeout_secs: timeout.as_secs(),
                        };
                        tracing::warn!(hook_id = %hook_id, error = %err, "hook timed out");
                        failure_result(&hook_id, &err.to_string())
                    }
                    Err(join_err) => {
                        let err = HookExecutionError::Panicked {
                            hook_id: hook_id.clone(),
                            message: join_err.to_string(),
                        };
                        tracing::error!(hook_id = %hook_id, error = %err, "hook panicked");
                        failure_result(&hook_id, &err.to_string())
                    }
                }
            }
        });

        join_all(tasks).await
    }
}

/// The terminal partial result a failed hook contributes
fn failure_result(hook_id: &str, reason: &str) -> PartialResult {
    PartialResult::new()
        .with_errors(1)
        .with_info("failedHook", json!(hook_id))
        .with_info("failureReason", json!(reason))
}

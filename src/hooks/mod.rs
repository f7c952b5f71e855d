// Hook trait and built-in check modules
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Job, PartialResult};
use crate::error::Result;

pub mod builtin;

/// An independently executable check unit producing a partial result for one job.
///
/// Hooks receive the job read-only and must not share mutable state with other
/// hooks; the runner executes all hooks for a run concurrently.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Stable identifier, matched against discovered module ids
    fn id(&self) -> &str;

    /// Execute the check against the job
    async fn run(&self, job: Arc<Job>) -> Result<PartialResult>;
}

/// Factory constructing one hook instance per run
pub type HookFactory = Arc<dyn Fn() -> Arc<dyn Hook> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CycleRef, ProjectRef};

    struct NoopHook;

    #[async_trait]
    impl Hook for NoopHook {
        fn id(&self) -> &str {
            "noop"
        }

        async fn run(&self, _job: Arc<Job>) -> Result<PartialResult> {
            Ok(PartialResult::new())
        }
    }

    #[tokio::test]
    async fn test_hook_trait_object_safety() {
        let hook: Arc<dyn Hook> = Arc::new(NoopHook);
        let job = Arc::new(Job::new(
            "git@host:org/app.git",
            "master",
            ProjectRef {
                id: "p1".to_string(),
                name: "App".to_string(),
            },
            None,
            CycleRef {
                id: "c1".to_string(),
            },
        ));
        let result = hook.run(job).await.unwrap();
        assert_eq!(result.errors, 0);
    }
}

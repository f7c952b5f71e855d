// Integration tests for the concurrent hook runner
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flightcheck::error::HookExecutionError;
use flightcheck::{
    CycleRef, Hook, HookRunner, Job, PartialResult, ProjectRef, Result,
};
use serde_json::json;

fn job() -> Arc<Job> {
    Arc::new(Job::new(
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
    ))
}

/// Hook that records how many instances saw the job before finishing
struct BarrierProbeHook {
    id: String,
    started: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl Hook for BarrierProbeHook {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, _job: Arc<Job>) -> Result<PartialResult> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(PartialResult::new().with_warnings(1))
    }
}

struct ErroringHook;

#[async_trait]
impl Hook for ErroringHook {
    fn id(&self) -> &str {
        "erroring"
    }

    async fn run(&self, _job: Arc<Job>) -> Result<PartialResult> {
        Err(HookExecutionError::ExecutionFailed {
            hook_id: "erroring".to_string(),
            message: "deliberate".to_string(),
        }
        .into())
    }
}

struct PanickingHook;

#[async_trait]
impl Hook for PanickingHook {
    fn id(&self) -> &str {
        "panicking"
    }

    async fn run(&self, _job: Arc<Job>) -> Result<PartialResult> {
        panic!("hook blew up");
    }
}

struct SleepyHook;

#[async_trait]
impl Hook for SleepyHook {
    fn id(&self) -> &str {
        "sleepy"
    }

    async fn run(&self, _job: Arc<Job>) -> Result<PartialResult> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(PartialResult::new())
    }
}

#[tokio::test]
async fn test_all_hooks_share_the_same_job() {
    struct JobCheckHook;

    #[async_trait]
    impl Hook for JobCheckHook {
        fn id(&self) -> &str {
            "jobcheck"
        }

        async fn run(&self, job: Arc<Job>) -> Result<PartialResult> {
            Ok(PartialResult::new().with_info("cycle", json!(job.cycle.id)))
        }
    }

    let runner = HookRunner::default();
    let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(JobCheckHook), Arc::new(JobCheckHook)];
    let results = runner.run_all(hooks, job()).await;
    for result in results {
        assert_eq!(result.information["cycle"], json!("c1"));
    }
}

#[tokio::test]
async fn test_hooks_overlap_in_time() {
    // All hooks must have started before any of them finished sleeping; proof
    // the fan-out is concurrent rather than sequential.
    let started = Arc::new(AtomicUsize::new(0));
    let hooks: Vec<Arc<dyn Hook>> = (0..4)
        .map(|i| {
            Arc::new(BarrierProbeHook {
                id: format!("probe-{i}"),
                started: Arc::clone(&started),
                delay: Duration::from_millis(200),
            }) as Arc<dyn Hook>
        })
        .collect();

    let runner = HookRunner::default();
    let begin = std::time::Instant::now();
    let results = runner.run_all(hooks, job()).await;
    let elapsed = begin.elapsed();

    assert_eq!(results.len(), 4);
    assert_eq!(started.load(Ordering::SeqCst), 4);
    // Four sequential 200ms sleeps would need 800ms
    assert!(
        elapsed < Duration::from_millis(700),
        "hooks appear to have run sequentially: {elapsed:?}"
    );
}

#[tokio::test]
async fn test_runner_waits_for_every_hook_to_settle() {
    let started = Arc::new(AtomicUsize::new(0));
    let hooks: Vec<Arc<dyn Hook>> = vec![
        Arc::new(BarrierProbeHook {
            id: "fast".to_string(),
            started: Arc::clone(&started),
            delay: Duration::from_millis(10),
        }),
        Arc::new(BarrierProbeHook {
            id: "slow".to_string(),
            started: Arc::clone(&started),
            delay: Duration::from_millis(250),
        }),
    ];
    let runner = HookRunner::default();
    let results = runner.run_all(hooks, job()).await;
    // Both contributed, including the slow one behind the barrier
    assert_eq!(results.iter().map(|r| r.warnings).sum::<u64>(), 2);
}

#[tokio::test]
async fn test_one_erroring_hook_does_not_empty_the_batch() {
    let started = Arc::new(AtomicUsize::new(0));
    let hooks: Vec<Arc<dyn Hook>> = vec![
        Arc::new(ErroringHook),
        Arc::new(BarrierProbeHook {
            id: "healthy".to_string(),
            started,
            delay: Duration::from_millis(5),
        }),
    ];
    let runner = HookRunner::default();
    let results = runner.run_all(hooks, job()).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].errors, 1);
    assert_eq!(results[0].information["failedHook"], json!("erroring"));
    assert_eq!(results[1].warnings, 1);
}

#[tokio::test]
async fn test_panicking_hook_becomes_an_error_result() {
    let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(PanickingHook)];
    let runner = HookRunner::default();
    let results = runner.run_all(hooks, job()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].errors, 1);
    let reason = results[0].information["failureReason"].as_str().unwrap();
    assert!(reason.contains("panicked"));
    // The diagnostic names the hook that blew up
    assert!(reason.contains("panicking"));
}

#[tokio::test]
async fn test_timeout_is_a_hook_level_failure() {
    let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(SleepyHook), Arc::new(ErroringHook)];
    let runner = HookRunner::new(Duration::from_millis(50));
    let results = runner.run_all(hooks, job()).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].information["failedHook"], json!("sleepy"));
    let reason = results[0].information["failureReason"].as_str().unwrap();
    assert!(reason.contains("timed out"));
    assert!(reason.contains("sleepy"));
    assert_eq!(results[1].information["failedHook"], json!("erroring"));
}

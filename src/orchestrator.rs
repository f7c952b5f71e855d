// Orchestrator: bus subscription, run pipeline, report publication
//
// Holds the process's single bus transport. Each `cycle:start` run executes in
// its own spawned task with independent state; the serve loop is the only place
// that touches the transport, so overlapping runs never share anything beyond
// the read-only registry.
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bus::{BusTransport, TcpBusTransport, CYCLE_FAILED, CYCLE_FINISHED, CYCLE_START};
use crate::config::Config;
use crate::core::{aggregate, AggregateReport, Job, Phase};
use crate::discovery::{discover, resolve, HookRegistry};
use crate::error::Result;
use crate::runner::HookRunner;

/// Observable states of a constructed orchestrator.
///
/// Construction requires an established transport, so there is no idle or
/// connecting state to observe: [`Orchestrator::connect`] performs the
/// handshake first and a failure surfaces as a `ConnectionError` (terminal,
/// the process exits) rather than a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    Listening,
    /// At least one run is in flight for the named phase
    Running(Phase),
}

/// Everything a run needs besides the job itself
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub hook_root: PathBuf,
    pub downstream: String,
    pub hook_timeout: std::time::Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hook_root: config.hook_root(),
            downstream: config.downstream(),
            hook_timeout: config.hook_timeout(),
        }
    }
}

/// Outcome a spawned run reports back to the serve loop for publication
enum RunOutcome {
    Finished {
        run_id: Uuid,
        report: AggregateReport,
    },
    Failed {
        run_id: Uuid,
        cycle: String,
        project: String,
        error: String,
    },
}

pub struct Orchestrator<T: BusTransport> {
    transport: T,
    registry: Arc<HookRegistry>,
    settings: OrchestratorSettings,
    state: OrchestratorState,
    active_runs: usize,
}

impl Orchestrator<TcpBusTransport> {
    /// Establish the bus connection to `endpoint`.
    ///
    /// A handshake failure leaves nothing to retry; the caller should exit.
    pub async fn connect(
        endpoint: &str,
        settings: OrchestratorSettings,
        registry: HookRegistry,
    ) -> Result<Self> {
        tracing::info!(endpoint = %endpoint, "connecting to bus");
        let transport = TcpBusTransport::connect(endpoint).await?;
        tracing::info!(endpoint = %endpoint, "connected, listening for cycles");
        Ok(Self::with_transport(transport, settings, registry))
    }
}

impl<T: BusTransport> Orchestrator<T> {
    /// Build an orchestrator over an already-established transport
    pub fn with_transport(
        transport: T,
        settings: OrchestratorSettings,
        registry: HookRegistry,
    ) -> Self {
        Self {
            transport,
            registry: Arc::new(registry),
            settings,
            state: OrchestratorState::Listening,
            active_runs: 0,
        }
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    /// Process bus events until the connection closes.
    ///
    /// Per-run failures are absorbed and reported as `cycle:failed`; only
    /// transport-level errors propagate out of this loop.
    pub async fn serve(mut self) -> Result<()> {
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<RunOutcome>(16);

        loop {
            tokio::select! {
                message = self.transport.next_message() => {
                    match message? {
                        None => {
                            tracing::info!("bus connection closed, shutting down");
                            break;
                        }
                        Some(msg) if msg.event == CYCLE_START => {
                            self.start_run(msg.payload, &outcome_tx);
                        }
                        Some(msg) => {
                            tracing::trace!(event = %msg.event, "ignoring unhandled event");
                        }
                    }
                }
                Some(outcome) = outcome_rx.recv() => {
                    self.publish(outcome).await?;
                }
            }
        }

        // Publish outcomes of runs that were still in flight when the inbound
        // stream ended.
        drop(outcome_tx);
        while let Some(outcome) = outcome_rx.recv().await {
            self.publish(outcome).await?;
        }

        self.transport.close().await
    }

    /// Spawn an isolated run for an inbound job payload
    fn start_run(&mut self, payload: serde_json::Value, outcome_tx: &mpsc::Sender<RunOutcome>) {
        let job: Job = match serde_json::from_value(payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, "dropping cycle:start with malformed job payload");
                return;
            }
        };

        let phase = Phase::pre();
        let run_id = Uuid::new_v4();
        tracing::info!(
            run_id = %run_id,
            project = %job.project.name,
            cycle = %job.cycle.id,
            phase = %phase,
            "starting run"
        );

        self.active_runs += 1;
        self.state = OrchestratorState::Running(phase.clone());

        let registry = Arc::clone(&self.registry);
        let hook_root = self.settings.hook_root.clone();
        let runner = HookRunner::new(self.settings.hook_timeout);
        let tx = outcome_tx.clone();
        tokio::spawn(async move {
            let cycle = job.cycle.id.clone();
            let project = job.project.id.clone();
            let project_name = job.project.name.clone();
            let outcome = match execute_run(&registry, &runner, &hook_root, &phase, job).await {
                Ok(report) => RunOutcome::Finished { run_id, report },
                Err(error) => {
                    tracing::error!(
                        run_id = %run_id,
                        project = %project_name,
                        error = %error,
                        "run failed"
                    );
                    RunOutcome::Failed {
                        run_id,
                        cycle,
                        project,
                        error: error.to_string(),
                    }
                }
            };
            // The serve loop only drops the receiver on shutdown
            let _ = tx.send(outcome).await;
        });
    }

    async fn publish(&mut self, outcome: RunOutcome) -> Result<()> {
        match outcome {
            RunOutcome::Finished { run_id, report } => {
                tracing::info!(
                    run_id = %run_id,
                    cycle = %report.cycle,
                    errors = report.errors,
                    warnings = report.warnings,
                    issues = report.issues.len(),
                    "run finished, publishing report"
                );
                let payload = serde_json::to_value(&report)?;
                self.transport
                    .send(&self.settings.downstream, CYCLE_FINISHED, payload)
                    .await?;
            }
            RunOutcome::Failed {
                run_id,
                cycle,
                project,
                error,
            } => {
                tracing::warn!(run_id = %run_id, cycle = %cycle, "publishing failure");
                let payload = serde_json::json!({
                    "cycle": cycle,
                    "project": project,
                    "error": error,
                });
                self.transport
                    .send(&self.settings.downstream, CYCLE_FAILED, payload)
                    .await?;
            }
        }

        self.active_runs = self.active_runs.saturating_sub(1);
        if self.active_runs == 0 {
            self.state = OrchestratorState::Listening;
        }
        Ok(())
    }
}

/// The run pipeline: discovery, registry resolution, concurrent execution,
/// aggregation. Strictly in that order; the runner's barrier completes before
/// aggregation begins.
pub async fn execute_run(
    registry: &HookRegistry,
    runner: &HookRunner,
    hook_root: &std::path::Path,
    phase: &Phase,
    job: Job,
) -> Result<AggregateReport> {
    let discovered = discover(hook_root, phase)?;
    tracing::debug!(
        phase = %phase,
        discovered = discovered.len(),
        "hook discovery complete"
    );

    let hooks = resolve(registry, &discovered);
    let job = Arc::new(job);
    let results = runner.run_all(hooks, Arc::clone(&job)).await;

    Ok(aggregate(&results, &job))
}

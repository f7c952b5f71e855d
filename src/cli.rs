// CLI interface for flightcheck using clap
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::core::{CycleRef, Job, Phase, ProjectRef, ReleaseRef};
use crate::discovery::{discover, HookRegistry};
use crate::error::{exit_codes, Result};
use crate::orchestrator::{execute_run, Orchestrator, OrchestratorSettings};
use crate::runner::HookRunner;

#[derive(Parser)]
#[command(
    name = "flightcheck",
    about = "Flightcheck - a release-cycle check worker",
    version = crate::VERSION,
    long_about = "Flightcheck listens for cycle:start events on the bus, runs the hooks \
registered for the requested phase against the job concurrently, and publishes the \
aggregated report back as cycle:finished."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Control color output (auto, always, never)
    #[arg(long, global = true, value_name = "WHEN")]
    pub color: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the bus and serve cycle:start events (default command)
    Listen {
        /// Bus endpoint override
        #[arg(long)]
        endpoint: Option<String>,

        /// Hook tree root override
        #[arg(long)]
        hook_root: Option<PathBuf>,
    },

    /// Run one job locally without a bus and print the report as JSON
    Run {
        /// Repository address of the job
        #[arg(long)]
        repo: String,

        /// Tag or branch to check
        #[arg(long)]
        tag: String,

        /// Project identifier
        #[arg(long)]
        project_id: String,

        /// Project display name
        #[arg(long, default_value = "")]
        project_name: String,

        /// Cycle identifier
        #[arg(long)]
        cycle_id: String,

        /// Release identifier, when the job carries a release
        #[arg(long)]
        release_id: Option<String>,

        /// Release version string
        #[arg(long)]
        release_version: Option<String>,

        /// Phase to discover hooks for
        #[arg(long, default_value = "pre")]
        phase: String,

        /// Hook tree root override
        #[arg(long)]
        hook_root: Option<PathBuf>,
    },

    /// List registered hooks and what discovery selects for a phase
    Hooks {
        /// Phase to discover hooks for
        #[arg(long, default_value = "pre")]
        phase: String,

        /// Hook tree root override
        #[arg(long)]
        hook_root: Option<PathBuf>,
    },
}

impl Cli {
    pub fn run(&self) -> Result<i32> {
        let config = Config::load(self.config.as_deref())?;
        self.init_logging(&config);

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.dispatch(config))
    }

    async fn dispatch(&self, config: Config) -> Result<i32> {
        let registry = HookRegistry::with_builtins();

        match &self.command {
            None => {
                let settings = OrchestratorSettings::from_config(&config);
                let orchestrator =
                    Orchestrator::connect(&config.bus_endpoint(), settings, registry).await?;
                orchestrator.serve().await?;
                Ok(exit_codes::SUCCESS)
            }
            Some(Commands::Listen {
                endpoint,
                hook_root,
            }) => {
                let mut settings = OrchestratorSettings::from_config(&config);
                if let Some(root) = hook_root {
                    settings.hook_root = root.clone();
                }
                let endpoint = endpoint.clone().unwrap_or_else(|| config.bus_endpoint());
                let orchestrator = Orchestrator::connect(&endpoint, settings, registry).await?;
                orchestrator.serve().await?;
                Ok(exit_codes::SUCCESS)
            }
            Some(Commands::Run {
                repo,
                tag,
                project_id,
                project_name,
                cycle_id,
                release_id,
                release_version,
                phase,
                hook_root,
            }) => {
                let job = Job::new(
                    repo.clone(),
                    tag.clone(),
                    ProjectRef {
                        id: project_id.clone(),
                        name: project_name.clone(),
                    },
                    release_id.as_ref().map(|id| ReleaseRef {
                        id: id.clone(),
                        version: release_version.clone(),
                    }),
                    CycleRef {
                        id: cycle_id.clone(),
                    },
                );
                let root = hook_root.clone().unwrap_or_else(|| config.hook_root());
                let runner = HookRunner::new(config.hook_timeout());
                let report =
                    execute_run(&registry, &runner, &root, &Phase::new(phase), job).await?;

                println!("{}", serde_json::to_string_pretty(&report)?);
                if report.errors > 0 {
                    Ok(exit_codes::GENERAL_ERROR)
                } else {
                    Ok(exit_codes::SUCCESS)
                }
            }
            Some(Commands::Hooks { phase, hook_root }) => {
                println!("registered hooks:");
                for id in registry.module_ids() {
                    println!("  {id}");
                }

                let root = hook_root.clone().unwrap_or_else(|| config.hook_root());
                let phase = Phase::new(phase);
                match discover(&root, &phase) {
                    Ok(discovered) => {
                        println!("discovered for phase {phase}:");
                        for module in discovered {
                            let resolved = if registry.contains(&module.module_id) {
                                ""
                            } else {
                                "  (no implementation registered)"
                            };
                            println!("  {} -> {}{}", module.module_id, module.path.display(), resolved);
                        }
                    }
                    Err(e) => println!("discovery failed: {e}"),
                }
                Ok(exit_codes::SUCCESS)
            }
        }
    }

    fn init_logging(&self, config: &Config) {
        use crate::logging::{init_logging, LogConfig};

        let log_config = LogConfig::from_cli(
            self.verbose,
            self.quiet,
            self.color.clone(),
            config.log_level(),
            config.log_format(),
        );

        if let Err(e) = init_logging(log_config) {
            eprintln!("Failed to initialize logging: {e}");
            // Continue execution even if logging fails
        }
    }
}

//! CLI argument parsing and command dispatch

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pvc_bench_backends::{KubeBackend, SimulatedBackend, ThrottledBackend};
use pvc_bench_core::{
    summarize, ClusterBackend, Mode, OrchestratorBuilder, RunConfig, WorkflowEvent, APP_NAME,
};
use pvc_bench_report::{print_summary, ResultsSink};

/// pvc-bench - create and delete storage-backed pods in bulk and time them
#[derive(Parser, Debug)]
#[command(name = "pvc-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create every pod and claim, then wait until all are ready
    Deploy(RunArgs),
    /// Delete every pod and claim, then wait until all are gone
    Clean(RunArgs),
}

/// Flags shared by `deploy` and `clean`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Name prefix used for pods and claims
    #[arg(long, default_value = APP_NAME)]
    pub prefix: String,

    /// Namespace for the pods and claims
    #[arg(short, long, default_value = "default")]
    pub namespace: String,

    /// Pod image
    #[arg(long, default_value = "docker.io/alpine:latest")]
    pub image: String,

    /// Path to the kubeconfig file
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Number of pods with a claim to create or delete
    #[arg(short, long, default_value = "3")]
    pub count: usize,

    /// Storage class of the claims (mandatory against a real cluster)
    #[arg(long)]
    pub storage_class: Option<String>,

    /// Requested size of the claims
    #[arg(long, default_value = "100m")]
    pub pvc_size: String,

    /// Path to write the JSON results
    #[arg(long, default_value = "shiny-potato.json")]
    pub results_file: PathBuf,

    /// Do not write the JSON results to a file
    #[arg(long)]
    pub no_results_file: bool,

    /// Print the JSON results to stdout
    #[arg(long)]
    pub results_stdout: bool,

    /// Do not output JSON results at all
    #[arg(long)]
    pub no_results: bool,

    /// Also write one CSV row per resource to this path
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Seconds between two status checks of a resource
    #[arg(long, default_value = "5")]
    pub poll_interval: u64,

    /// Seconds to wait for a single resource before giving up
    #[arg(long, default_value = "1800")]
    pub poll_timeout: u64,

    /// Upper bound of the random pause between launching two pairs
    #[arg(long, default_value = "3000")]
    pub max_jitter_ms: u64,

    /// Client-side limit on API calls per second
    #[arg(long)]
    pub api_qps: Option<f64>,

    /// Run against an in-memory cluster instead of Kubernetes
    #[arg(long)]
    pub simulate: bool,
}

impl RunArgs {
    /// Build the run configuration for `mode`
    pub fn run_config(&self, mode: Mode) -> Result<RunConfig> {
        let mut config = RunConfig::new(self.namespace.clone(), self.count)
            .with_prefix(self.prefix.clone())
            .with_mode(mode)
            .with_poll(
                Duration::from_secs(self.poll_interval),
                Duration::from_secs(self.poll_timeout),
            )
            .with_max_jitter(Duration::from_millis(self.max_jitter_ms))
            .with_claim_size(self.pvc_size.clone())
            .with_image(self.image.clone());

        match &self.storage_class {
            Some(class) if !class.is_empty() => config = config.with_storage_class(class.clone()),
            _ if self.simulate => {}
            _ => bail!("--storage-class is required unless --simulate is set"),
        }

        config.validate().context("invalid run configuration")?;
        Ok(config)
    }

    /// Where the results go
    pub fn results_sink(&self) -> ResultsSink {
        ResultsSink {
            no_results: self.no_results,
            no_results_file: self.no_results_file,
            results_file: Some(self.results_file.clone()),
            stdout: self.results_stdout,
            csv_file: self.csv.clone(),
        }
    }

    /// Connect to the backend selected by the flags
    pub async fn backend(&self) -> Result<Arc<dyn ClusterBackend>> {
        let backend: Arc<dyn ClusterBackend> = if self.simulate {
            Arc::new(SimulatedBackend::new())
        } else {
            let kube = KubeBackend::connect(self.kubeconfig.as_deref())
                .await
                .context("connecting to the cluster")?;
            Arc::new(kube)
        };

        Ok(match self.api_qps {
            Some(qps) if qps > 0.0 => {
                tracing::debug!(qps, "Throttling API calls");
                Arc::new(ThrottledBackend::new(backend, qps))
            }
            _ => backend,
        })
    }
}

impl Cli {
    /// Run the selected subcommand
    pub async fn run(&self) -> Result<()> {
        let (mode, args) = match &self.command {
            Commands::Deploy(args) => (Mode::Provision, args),
            Commands::Clean(args) => (Mode::Decommission, args),
        };

        let config = args.run_config(mode)?;
        let backend = args.backend().await?;

        let start = Utc::now();
        println!(">>> Starting {}: {}", mode, start);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let progress = spawn_progress(events_rx, 2 * config.count)?;

        let orchestrator = OrchestratorBuilder::new()
            .config(config)
            .backend(backend)
            .events(events_tx)
            .build()?;
        let outcome = orchestrator.run().await;

        // Closes the event channel so the progress task can finish
        drop(orchestrator);
        progress.await.context("progress reporter stopped unexpectedly")?;

        let result = outcome.with_context(|| format!("{mode} run failed"))?;

        print_summary(&summarize(&result));
        for path in args.results_sink().emit(&result)? {
            println!(">>> Results written to: {}", path.display());
        }

        let finished = Utc::now();
        println!(">>> Finished: {}", finished);
        println!(
            ">>> Duration: {:.3}s",
            (finished - start).num_milliseconds() as f64 / 1000.0
        );

        Ok(())
    }
}

/// Tick a progress bar for every joined workflow
fn spawn_progress(
    mut events: mpsc::UnboundedReceiver<WorkflowEvent>,
    total: usize,
) -> Result<JoinHandle<()>> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    Ok(tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            pb.set_message(format!("{} {} {}", event.kind, event.name, event.state));
            pb.inc(1);
        }
        pb.finish_and_clear();
    }))
}

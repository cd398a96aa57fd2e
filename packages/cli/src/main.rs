//! Operator CLI for the fleet transcoding master: submit, list,
//! inspect, and cancel jobs; inspect nodes; view aggregate metrics.

mod client;
mod config;
mod render;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use fleet_proto::wire::SubmitJobRequest;
use fleet_proto::{Engine, Priority, Queue};
use uuid::Uuid;

use client::MasterClient;
use config::Config;

#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(about = "Operate the fleet transcoding master")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Job submission and lifecycle operations
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
    /// Worker node inspection
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Aggregate queue/job metrics, derived client-side from the job list
    Status,
}

#[derive(Subcommand)]
enum JobAction {
    /// Submit a new transcoding job
    Submit {
        /// Transcoding scenario identifier
        scenario: String,
        /// Target engine alias (e.g. h264, hevc, nvenc_h264)
        #[arg(short, long)]
        engine: Option<String>,
        /// Queue: live, default, or batch
        #[arg(short, long, default_value = "default")]
        queue: String,
        /// Priority: high, medium, or low
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Required capability tokens, comma separated
        #[arg(short = 'c', long, value_delimiter = ',')]
        required_capabilities: Vec<String>,
        /// Maximum retry attempts
        #[arg(long)]
        max_retries: Option<i32>,
        /// Enable wrapper governance for this job
        #[arg(long)]
        wrapper: bool,
        /// Extra parameters as key=value pairs, comma separated
        #[arg(long, value_delimiter = ',')]
        param: Vec<String>,
    },
    /// List all jobs
    List,
    /// Show full detail for one job
    Show { id: Uuid },
    /// Cancel a job
    Cancel { id: Uuid },
    /// Pause a running job
    Pause { id: Uuid },
    /// Resume a paused job
    Resume { id: Uuid },
}

#[derive(Subcommand)]
enum NodeAction {
    /// List all registered nodes
    List,
    /// Show full detail for one node
    Show { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let client = MasterClient::new(config.master_url, config.api_key);

    match cli.command {
        Commands::Job { action } => run_job(&client, action).await,
        Commands::Node { action } => run_node(&client, action).await,
        Commands::Status => run_status(&client).await,
    }
}

async fn run_job(client: &MasterClient, action: JobAction) -> Result<()> {
    match action {
        JobAction::Submit { scenario, engine, queue, priority, required_capabilities, max_retries, wrapper, param } => {
            let engine = match engine {
                Some(e) => parse_engine(&e)?,
                None => Engine::default(),
            };
            let queue = parse_queue(&queue)?;
            let priority = parse_priority(&priority)?;
            let parameters = parse_params(&param)?;

            let req = SubmitJobRequest {
                scenario,
                engine,
                confidence: 1.0,
                queue,
                priority,
                parameters,
                required_capabilities,
                max_retries,
                wrapper_enabled: Some(wrapper),
                wrapper_constraints: None,
            };
            let resp = client.submit_job(&req).await?;
            println!("{} job {} (sequence {})", style("submitted").green(), resp.id, resp.sequence_number);
            Ok(())
        }
        JobAction::List => {
            let jobs = client.list_jobs().await?;
            render::job_table(&jobs);
            Ok(())
        }
        JobAction::Show { id } => {
            let job = client.get_job(id).await?;
            render::job_detail(&job);
            Ok(())
        }
        JobAction::Cancel { id } => {
            let job = client.cancel_job(id).await?;
            println!("{} job {} -> {}", style("canceled").yellow(), job.id, job.status);
            Ok(())
        }
        JobAction::Pause { id } => {
            let job = client.pause_job(id).await?;
            println!("{} job {} -> {}", style("paused").yellow(), job.id, job.status);
            Ok(())
        }
        JobAction::Resume { id } => {
            let job = client.resume_job(id).await?;
            println!("{} job {} -> {}", style("resumed").cyan(), job.id, job.status);
            Ok(())
        }
    }
}

async fn run_node(client: &MasterClient, action: NodeAction) -> Result<()> {
    match action {
        NodeAction::List => {
            let nodes = client.list_nodes().await?;
            render::node_table(&nodes);
            Ok(())
        }
        NodeAction::Show { id } => {
            let node = client.get_node(id).await?;
            println!("{node:#?}");
            Ok(())
        }
    }
}

async fn run_status(client: &MasterClient) -> Result<()> {
    let metrics = client.metrics().await?;
    println!("active_jobs:  {}", metrics.active_jobs);
    println!("queue_length: {}", metrics.queue_length);
    println!("by_state:");
    for (state, count) in &metrics.by_state {
        println!("  {state:<10} {count}");
    }
    println!("by_queue:");
    for (queue, count) in &metrics.by_queue {
        println!("  {queue:<10} {count}");
    }
    println!("by_priority:");
    for (priority, count) in &metrics.by_priority {
        println!("  {priority:<10} {count}");
    }
    println!("by_engine:");
    for (engine, count) in &metrics.by_engine {
        println!("  {engine:<10} {count}");
    }
    Ok(())
}

fn parse_engine(s: &str) -> Result<Engine> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).context(format!("unknown engine {s}"))
}

fn parse_queue(s: &str) -> Result<Queue> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).context(format!("unknown queue {s}"))
}

fn parse_priority(s: &str) -> Result<Priority> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).context(format!("unknown priority {s}"))
}

fn parse_params(pairs: &[String]) -> Result<BTreeMap<String, serde_json::Value>> {
    let mut out = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').with_context(|| format!("expected key=value, got {pair}"))?;
        out.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }
    Ok(out)
}

//! recruitflow CLI
//!
//! Drives hiring workflows against the configured checkpoint store, or
//! serves the HTTP API with `recruitflow serve`.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use recruitflow::api::{create_router, models::CheckpointSummary};
use recruitflow::config::{ConfigLoader, LogFormat, LoggingConfig};
use recruitflow::{node_ids, ApprovalStatus, CandidateRef, JobInput, JobStatus, RecruitConfig, RecruitmentService};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recruitflow")]
#[command(about = "Recruitflow - resumable hiring pipelines", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Use this config file instead of the user and project locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Override the configured bind address, e.g. 0.0.0.0:9000
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create a job and generate its description
    Create {
        /// Job id (a UUID is generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Read the job input from a JSON file instead of flags
        #[arg(long, conflicts_with_all = ["title", "department", "company"])]
        file: Option<PathBuf>,
        #[arg(long, required_unless_present = "file")]
        title: Option<String>,
        #[arg(long, required_unless_present = "file")]
        department: Option<String>,
        #[arg(long, required_unless_present = "file")]
        company: Option<String>,
        #[arg(long)]
        company_description: Option<String>,
        /// Key requirement (repeatable)
        #[arg(long = "requirement")]
        requirements: Vec<String>,
        /// Nice-to-have skill (repeatable)
        #[arg(long = "nice-to-have")]
        nice_to_have: Vec<String>,
        #[arg(long, default_value_t = 0)]
        experience_years: u32,
        #[arg(long)]
        location: Option<String>,
        /// Prescreening question (repeatable)
        #[arg(long = "question")]
        questions: Vec<String>,
    },

    /// Show where a job stands
    Status { job_id: String },

    /// Print the latest full snapshot of a job
    Show { job_id: String },

    /// List checkpoints, newest first
    History {
        job_id: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Approve the generated description
    Approve { job_id: String },

    /// Ask for a new description
    Regenerate {
        job_id: String,
        /// What to change
        #[arg(short, long)]
        feedback: String,
    },

    /// Record an applicant
    AddApplicant {
        job_id: String,
        /// Candidate id
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        profile: String,
        /// Score already assigned by the source, in [0, 1]
        #[arg(long)]
        score: Option<f64>,
    },

    /// Approve the shortlist
    ApproveShortlist { job_id: String },

    /// Reject the shortlist and wait for more applicants
    RejectShortlist { job_id: String },

    /// Record the recruiter's prescreening review
    Review {
        job_id: String,
        #[arg(value_enum)]
        decision: Decision,
    },

    /// Wake a job parked at an approval without changing it
    Nudge { job_id: String },

    /// Stop a job for good
    Abandon {
        job_id: String,
        #[arg(short, long, default_value = "abandoned by operator")]
        reason: String,
    },

    /// Resume a job from an earlier checkpoint
    Rerun { job_id: String, sequence: u64 },

    /// Re-enter the node the latest checkpoint points at
    Recover { job_id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for ApprovalStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_file(path).await?,
        None => ConfigLoader::new().load().await?,
    };
    init_tracing(&config.logging);

    let service = RecruitmentService::from_config(&config).await?;

    match cli.command {
        Commands::Serve { bind } => serve(service, &config, bind).await,
        Commands::Create {
            id,
            file,
            title,
            department,
            company,
            company_description,
            requirements,
            nice_to_have,
            experience_years,
            location,
            questions,
        } => {
            let input = match file {
                Some(path) => read_input(&path).await?,
                None => JobInput {
                    role_title: title.unwrap_or_default(),
                    department: department.unwrap_or_default(),
                    company_name: company.unwrap_or_default(),
                    company_description,
                    key_requirements: requirements,
                    nice_to_have,
                    experience_years,
                    location,
                    prescreening_questions: questions,
                },
            };
            let status = match id {
                Some(id) => service.create_job_with_id(&id, input).await?,
                None => service.create_job(input).await?,
            };
            print_status(&status, cli.json)
        }
        Commands::Status { job_id } => print_status(&service.job_status(&job_id).await?, cli.json),
        Commands::Show { job_id } => {
            let state = service.job_state(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Commands::History { job_id, limit } => {
            let history = service.history(&job_id, limit).await?;
            let summaries: Vec<CheckpointSummary> = history.iter().map(CheckpointSummary::from).collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }
            println!("{:<6} {:<8} {:<28} {:<26} {}", "Seq", "Source", "Node", "Written", "Note");
            println!("{}", "-".repeat(90));
            for entry in summaries {
                println!(
                    "{:<6} {:<8} {:<28} {:<26} {}",
                    entry.sequence,
                    entry.source.to_string(),
                    entry.current_node.as_deref().unwrap_or("-"),
                    entry.written_at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                    entry.note.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
        Commands::Approve { job_id } => print_status(&service.approve_description(&job_id).await?, cli.json),
        Commands::Regenerate { job_id, feedback } => {
            print_status(&service.regenerate_description(&job_id, &feedback).await?, cli.json)
        }
        Commands::AddApplicant {
            job_id,
            id,
            name,
            profile,
            score,
        } => {
            let mut candidate = CandidateRef::new(id, name, profile);
            candidate.score = score;
            let before = service.job_status(&job_id).await?;
            if before.current_node != node_ids::AWAIT_APPLICATIONS {
                eprintln!(
                    "note: job is at '{}'; the applicant is only kept until this process exits",
                    before.current_node
                );
            }
            print_status(&service.add_applicants(&job_id, vec![candidate]).await?, cli.json)
        }
        Commands::ApproveShortlist { job_id } => print_status(&service.approve_shortlist(&job_id).await?, cli.json),
        Commands::RejectShortlist { job_id } => print_status(&service.reject_shortlist(&job_id).await?, cli.json),
        Commands::Review { job_id, decision } => {
            print_status(&service.record_review(&job_id, decision.into()).await?, cli.json)
        }
        Commands::Nudge { job_id } => print_status(&service.nudge(&job_id).await?, cli.json),
        Commands::Abandon { job_id, reason } => print_status(&service.abandon_job(&job_id, &reason).await?, cli.json),
        Commands::Rerun { job_id, sequence } => print_status(&service.rerun_job(&job_id, sequence).await?, cli.json),
        Commands::Recover { job_id } => print_status(&service.recover_job(&job_id).await?, cli.json),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn serve(service: RecruitmentService, config: &RecruitConfig, bind: Option<String>) -> anyhow::Result<()> {
    let address = bind.unwrap_or_else(|| config.server.bind_address());
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!(address = %address, "Serving recruitflow API");

    axum::serve(listener, create_router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn read_input(path: &Path) -> anyhow::Result<JobInput> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid job input in {}", path.display()))
}

fn print_status(status: &JobStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }
    println!("Job:        {}", status.job_id);
    println!("Node:       {}", status.current_node);
    println!("Status:     {}", status.status);
    println!("Checkpoint: {}", status.sequence);
    if let Some(message) = &status.error_message {
        println!("Error:      {}", message);
    }
    Ok(())
}

//! Terminal client for the figure-generation service.
//!
//! Usage:
//!     autofigure run "A three-stage encoder with skip connections" --iterations 2
//!     autofigure resume

mod config;
mod logging;
mod persistence;
mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use autofigure_client::{CancelAck, JobController, JobRequest, TrackingSession};
use autofigure_core::{JobId, JobSnapshot, JobStatus};
use clap::{Args, Parser, Subcommand};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracker_logging::{tracker_error, tracker_info, tracker_warn};

use config::FileConfig;
use logging::LogDestination;
use persistence::{load_resume_record, save_resume_record, ResumeRecord};

#[derive(Parser, Debug)]
#[command(name = "autofigure", about = "Submit figure jobs and follow their progress")]
struct Cli {
    /// RON config file (defaults to ./autofigure.ron when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL, overrides the config file
    #[arg(long, global = true)]
    server: Option<String>,

    #[arg(long, value_enum, default_value_t = LogDestination::File, global = true)]
    log: LogDestination,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a method description and follow the job
    Run {
        /// Method description to illustrate
        method_text: Option<String>,

        /// Read the method description from a file
        #[arg(long, conflicts_with = "method_text")]
        method_file: Option<PathBuf>,

        /// SVG optimization rounds
        #[arg(long)]
        iterations: Option<u32>,

        /// Local reference image to upload first
        #[arg(long)]
        reference: Option<PathBuf>,

        #[arg(long)]
        invite: Option<String>,

        /// Submit only, do not follow
        #[arg(long)]
        detach: bool,

        #[command(flatten)]
        follow: FollowArgs,
    },
    /// Follow an existing job
    Track {
        job_id: String,

        #[command(flatten)]
        follow: FollowArgs,
    },
    /// Follow the most recently submitted job
    Resume {
        #[command(flatten)]
        follow: FollowArgs,
    },
    /// Ask the server to stop a job
    Cancel { job_id: String },
    /// Check an invite code
    Verify { code: String },
}

#[derive(Args, Debug)]
struct FollowArgs {
    /// Seconds between reconnect attempts once the live channel gave up (0 disables)
    #[arg(long, default_value_t = 30)]
    reconnect_every: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracker_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut settings = FileConfig::load(cli.config.as_deref())?.into_settings();
    let state_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    match cli.command {
        Command::Run {
            method_text,
            method_file,
            iterations,
            reference,
            invite,
            detach,
            follow,
        } => {
            if let Some(server) = cli.server {
                settings.base_url = server;
            }
            let controller = JobController::new(settings)?;
            let method_text = read_method_text(method_text, method_file.as_deref())?;
            let mut request = JobRequest::new(method_text);
            if let Some(iterations) = iterations {
                request = request.with_iterations(iterations);
            }
            if let Some(invite) = invite {
                request = request.with_invite_code(invite);
            }
            if let Some(path) = reference {
                let uploaded = controller
                    .upload_reference(&path)
                    .await
                    .with_context(|| format!("uploading {}", path.display()))?;
                println!("uploaded reference {}", uploaded.name);
                request = request.with_reference(uploaded.path);
            }

            let job_id = controller.submit(&request).await?;
            println!("submitted job {job_id}");
            let record = ResumeRecord::new(job_id.clone(), controller.settings().base_url.clone());
            if let Err(err) = save_resume_record(&state_dir, &record) {
                tracker_warn!("Could not store resume record: {:#}", err);
            }
            if detach {
                return Ok(ExitCode::SUCCESS);
            }
            let session = controller.track(job_id);
            Ok(exit_code(&follow_session(&controller, session, &follow).await))
        }
        Command::Track { job_id, follow } => {
            if let Some(server) = cli.server {
                settings.base_url = server;
            }
            let controller = JobController::new(settings)?;
            let session = controller.track(JobId::new(job_id));
            Ok(exit_code(&follow_session(&controller, session, &follow).await))
        }
        Command::Resume { follow } => {
            let Some(record) = load_resume_record(&state_dir) else {
                bail!("no job to resume in {}", state_dir.display());
            };
            settings.base_url = cli.server.unwrap_or(record.base_url);
            println!(
                "resuming job {} submitted {}",
                record.job_id,
                record.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            let controller = JobController::new(settings)?;
            let session = controller.track(record.job_id);
            Ok(exit_code(&follow_session(&controller, session, &follow).await))
        }
        Command::Cancel { job_id } => {
            if let Some(server) = cli.server {
                settings.base_url = server;
            }
            let controller = JobController::new(settings)?;
            match controller.cancel(&JobId::new(job_id.clone())).await? {
                CancelAck::Cancelled => println!("job {job_id} cancelled"),
                CancelAck::AlreadyFinished => println!("job {job_id} had already finished"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { code } => {
            if let Some(server) = cli.server {
                settings.base_url = server;
            }
            let controller = JobController::new(settings)?;
            let invite = controller.verify_invite(&code).await?;
            println!("{}", render::invite_line(&code, &invite));
            Ok(if invite.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn read_method_text(text: Option<String>, file: Option<&Path>) -> anyhow::Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading method text from {}", path.display())),
        (None, None) => bail!("provide the method text or --method-file"),
    }
}

fn exit_code(snapshot: &JobSnapshot) -> ExitCode {
    if snapshot.status == JobStatus::Succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Prints progress until the session settles. Ctrl-C cancels the job.
async fn follow_session(
    controller: &JobController,
    mut session: TrackingSession,
    args: &FollowArgs,
) -> JobSnapshot {
    let mut snapshots = session.watch();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    let period = Duration::from_secs(args.reconnect_every.max(1));
    let mut reconnect_tick = interval_at(Instant::now() + period, period);
    reconnect_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_polled_line: Option<String> = None;

    loop {
        let disconnected = snapshots.borrow().status == JobStatus::Disconnected;
        tokio::select! {
            Some(notification) = session.next_notification() => {
                println!("{}", render::notification_line(&notification, controller));
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.status == JobStatus::Disconnected {
                    if let Some(line) = snapshot.log_tail.last() {
                        if last_polled_line.as_ref() != Some(line) {
                            println!("  | {line}");
                            last_polled_line = Some(line.clone());
                        }
                    }
                }
                if snapshot.settled {
                    break;
                }
            }
            _ = reconnect_tick.tick(), if disconnected && args.reconnect_every > 0 => {
                tracker_info!("Retrying live channel for job {}", session.job_id());
                session.reconnect();
            }
            result = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                match result {
                    Ok(()) => {
                        println!("cancelling job {}", session.job_id());
                        session.cancel();
                    }
                    Err(err) => tracker_warn!("Cannot listen for Ctrl-C: {}", err),
                }
            }
        }
    }

    while let Some(notification) = session.try_next_notification() {
        println!("{}", render::notification_line(&notification, controller));
    }
    let snapshot = session.snapshot();
    for line in render::summary(&snapshot, controller) {
        println!("{line}");
    }
    session.close().await;
    snapshot
}

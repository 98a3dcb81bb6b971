//! CLI entry point for yadloader.

use std::io::{self, BufWriter, IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use yadloader_core::{FileResult, Mirror, MirrorError, PublicDiskClient, WalkProgress};

mod app_config;
mod cli;
mod progress;
mod terminal;

use cli::Args;
use progress::{MirrorBar, WalkSpinner};

/// Outcome of a run, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Failure,
    Partial,
    Cancelled,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Partial => ExitCode::from(2),
            ProcessExit::Cancelled => ExitCode::from(130),
        }
    }
}

/// Maps completed and failed download counts to the exit outcome.
fn determine_exit_outcome(completed: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = terminal::no_color_env_requested() || terminal::is_dumb_terminal();
    terminal::init_tracing(terminal::default_log_level(args.quiet, args.verbose), no_color);
    debug!(?args, "CLI arguments parsed");

    match run(&args).await {
        Ok(exit) => exit.into(),
        Err(err) => {
            error!("{err:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: &Args) -> Result<ProcessExit> {
    let file_config = app_config::load_file_config(args.config.as_deref())?;
    let settings = app_config::resolve_settings(args, &file_config)?;
    let client =
        PublicDiskClient::new(settings.client).context("Failed to initialize API client")?;

    let cancel = client.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });

    let show_progress = terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        args.no_progress,
        terminal::is_dumb_terminal(),
    );

    info!(link = %args.link, path = %args.path, "Listing share");
    let spinner = WalkSpinner::new(show_progress);
    let mut on_progress = |progress: WalkProgress| spinner.update(progress);
    let walk = client
        .get_tree(&args.link, &args.path, Some(&mut on_progress))
        .await;
    spinner.finish();

    let files = match walk {
        Ok(files) => files,
        Err(err) if err.is_cancelled() => {
            warn!("Listing cancelled");
            return Ok(ProcessExit::Cancelled);
        }
        Err(err) => return Err(anyhow::Error::new(err).context("Failed to list share")),
    };
    let total_bytes: u64 = files.iter().map(|f| f.size).sum();
    info!(files = files.len(), bytes = total_bytes, "Share listed");

    let Some(output) = settings.output else {
        print_listing(&files, args.json)?;
        return Ok(ProcessExit::Success);
    };

    let mirror = Mirror::new(output, settings.failure_policy);
    let bar = MirrorBar::new(show_progress, total_bytes);
    let result = mirror.run(&client, &files, |event| bar.on_event(&event)).await;
    bar.finish();

    match result {
        Ok(stats) => {
            info!(
                completed = stats.completed,
                failed = stats.failed,
                bytes = stats.bytes,
                output = %mirror.output_root().display(),
                "Download complete"
            );
            Ok(determine_exit_outcome(stats.completed, stats.failed))
        }
        Err(MirrorError::Cancelled) => {
            warn!("Download cancelled");
            Ok(ProcessExit::Cancelled)
        }
        Err(err) => Err(anyhow::Error::new(err).context("Download aborted")),
    }
}

fn print_listing(files: &[FileResult], json: bool) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    if json {
        serde_json::to_writer_pretty(&mut out, files).context("Failed to encode listing")?;
        writeln!(out)?;
    } else {
        for file in files {
            writeln!(out, "{} {}", file.path, file.file)?;
        }
    }
    out.flush()?;
    Ok(())
}

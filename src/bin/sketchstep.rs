use std::{
    io::{BufRead as _, Write as _},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sketchstep::{
    ApiKeyStore, CredentialError, FrameSampler, GeminiSketchGenerator, SamplerOptions,
    SketchConfig, StepEvent, StepStatus, TutorialSession, VideoSource, format_timestamp,
};

#[derive(Parser, Debug)]
#[command(name = "sketchstep", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample frames only and write them as JPEG files (requires `ffmpeg` on PATH).
    Frames(FramesArgs),
    /// Sample frames and redraw each as a sketch (requires `ffmpeg` and an API key).
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Number of frames to sample.
    #[arg(long)]
    count: Option<u32>,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for sketches and `tutorial.json`.
    #[arg(long)]
    out: PathBuf,

    /// Number of steps to generate.
    #[arg(long)]
    count: Option<u32>,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image model override.
    #[arg(long)]
    model: Option<String>,

    /// Fail instead of prompting when no API key is set in the environment.
    #[arg(long)]
    no_prompt: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Frames(args) => cmd_frames(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, count: Option<u32>) -> anyhow::Result<SketchConfig> {
    let mut cfg = match path {
        Some(p) => SketchConfig::from_json_file(p)?,
        None => SketchConfig::default(),
    };
    if let Some(n) = count {
        cfg.frame_count = n;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref(), args.count)?;
    let sampler = FrameSampler::ffmpeg(SamplerOptions::from(&cfg));

    let sampled = sampler
        .sample(&VideoSource::Path(args.in_path.clone()), cfg.frame_count)
        .with_context(|| format!("sample '{}'", args.in_path.display()))?;
    let written = sketchstep::write_frames(&sampled.frames, &args.out)?;

    for (path, frame) in written.iter().zip(&sampled.frames) {
        eprintln!(
            "wrote {} ({})",
            path.display(),
            format_timestamp(frame.timestamp_sec)
        );
    }
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref(), args.count)?;
    if let Some(model) = args.model {
        cfg.model = model;
    }

    let mut keys = ApiKeyStore::from_env();
    if !args.no_prompt {
        keys = keys.with_selector(prompt_for_key);
    }

    let generator = GeminiSketchGenerator::new(&cfg, keys.clone())?;
    let session = TutorialSession::new(
        Arc::new(keys),
        FrameSampler::ffmpeg(SamplerOptions::from(&cfg)),
        Arc::new(generator),
        cfg.frame_count,
    );
    session.subscribe(print_progress);

    let source = VideoSource::Path(args.in_path.clone());
    let summary = session
        .run(&source)
        .with_context(|| format!("process '{}'", args.in_path.display()))?;

    let report = sketchstep::write_tutorial(
        &session.steps(),
        session.metadata(),
        &source.display_name(),
        &args.out,
    )?;

    eprintln!(
        "{} completed, {} failed; wrote {}",
        summary.completed,
        summary.failed,
        report.manifest.display()
    );
    if summary.completed == 0 && summary.failed > 0 {
        anyhow::bail!("no sketches were generated");
    }
    Ok(())
}

fn print_progress(event: &StepEvent) {
    let step = &event.step;
    let marker = match step.status {
        StepStatus::Pending => return,
        StepStatus::Processing => "sketching...",
        StepStatus::Completed => "done",
        StepStatus::Failed => "FAILED",
    };
    eprintln!(
        "[{}/{}] step at {} {marker}",
        step.index + 1,
        event.total,
        format_timestamp(step.timestamp_sec)
    );
}

fn prompt_for_key() -> Result<String, CredentialError> {
    eprint!("Gemini API key: ");
    std::io::stderr()
        .flush()
        .map_err(|e| CredentialError::Rejected(e.to_string()))?;

    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| CredentialError::Rejected(e.to_string()))?;
    if read == 0 || line.trim().is_empty() {
        return Err(CredentialError::Cancelled);
    }
    Ok(line.trim().to_string())
}

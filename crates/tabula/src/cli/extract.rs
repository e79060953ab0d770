//! The `tabula extract` command: one model over one folder of screenshots.

use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tabula_core::{
    random_prefix, AgentConfig, BatchEvent, BatchMode, BatchProcessor, BatchResult, Config,
    TableAgent,
};

/// File name of each run's persisted result.
pub const OUTPUT_FILE_NAME: &str = "extracted_data.json";

/// Length of the random run id that names a run's log directory.
const RUN_ID_LEN: usize = 5;

/// Batch mode as accepted on the command line.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Mode {
    /// One model call carrying every screenshot
    Joint,
    /// One model call per screenshot (default)
    #[default]
    Sequential,
}

impl From<Mode> for BatchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Joint => BatchMode::Joint,
            Mode::Sequential => BatchMode::Sequential,
        }
    }
}

/// Options shared by every command that runs an agent.
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// How screenshots are grouped into model calls
    #[arg(short, long, value_enum, default_value_t = Mode::Sequential)]
    pub mode: Mode,

    /// Base directory for audit logs and outputs (defaults to general.log_dir)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// System prompt template (defaults to general.system_prompt_path)
    #[arg(long)]
    pub prompt: Option<PathBuf>,
}

/// Arguments for the `extract` command.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Folder of table screenshots
    #[arg(required = true)]
    pub folder: PathBuf,

    /// LLM provider (openai, google, bedrock)
    #[arg(short, long)]
    pub provider: String,

    /// Model identifier, as the provider names it
    #[arg(long)]
    pub model: String,

    /// Output file (defaults to <log-dir>/<run-id>/extracted_data.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunOptions,
}

/// Outcome of one agent run.
pub struct AgentRun {
    pub output: PathBuf,
    pub result: BatchResult,
}

/// Execute the extract command.
pub async fn execute(args: ExtractArgs, config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();
    let run = run_agent(
        &args.provider,
        &args.model,
        &args.folder,
        args.output.as_deref(),
        &args.run,
        config,
    )
    .await?;

    print_summary(&run.result, start.elapsed());
    println!("{}", run.output.display());
    Ok(())
}

/// Run one agent over `folder` in its own log directory.
///
/// Each run gets a fresh random id; audit files and (unless `output` is
/// given) the result land under `<log-dir>/<run-id>/`.
pub async fn run_agent(
    provider: &str,
    model: &str,
    folder: &Path,
    output: Option<&Path>,
    options: &RunOptions,
    config: &Config,
) -> anyhow::Result<AgentRun> {
    let run_id = random_prefix(RUN_ID_LEN);
    let log_base = options.log_dir.clone().unwrap_or_else(|| config.log_dir());
    let log_path = log_base.join(&run_id);
    let prompt = options
        .prompt
        .clone()
        .unwrap_or_else(|| config.system_prompt_path());
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| log_path.join(OUTPUT_FILE_NAME));

    let agent_config = AgentConfig::new(provider, model, prompt, &log_path)?;
    let agent = TableAgent::new(agent_config, config).await?;
    let processor = BatchProcessor::new(agent, config);

    tracing::info!("Run {run_id}: {provider}/{model} over {:?}", folder);
    let pb = create_progress_bar();
    let result = processor
        .process_folder_with_progress(folder, &output, options.mode.into(), &run_id, |event| {
            match event {
                BatchEvent::Started { total, mode } => {
                    let len = if mode == BatchMode::Joint { 1 } else { total };
                    pb.set_length(len as u64);
                    pb.set_message(format!("{provider}/{model}"));
                }
                BatchEvent::ItemDone {
                    file_name, failed, ..
                } => {
                    if failed {
                        pb.println(format!("  failed: {file_name}"));
                    }
                    pb.inc(1);
                }
            }
        })
        .await;
    pb.finish_and_clear();

    Ok(AgentRun {
        output,
        result: result?,
    })
}

/// Create a progress bar for batch processing.
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a short summary after a run.
fn print_summary(result: &BatchResult, elapsed: std::time::Duration) {
    let (entries, errors) = match result {
        BatchResult::Joint(r) => (1, usize::from(r.is_error())),
        BatchResult::Sequential(rs) => (rs.len(), result.error_count()),
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Entries:      {:>8}", entries);
    eprintln!("    Errors:       {:>8}", errors);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
    eprintln!();
}

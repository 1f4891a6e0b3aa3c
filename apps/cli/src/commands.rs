//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tagtree_core::pipeline::{ImportOutcome, ImportRequest, ProgressReporter};
use tagtree_shared::{AppConfig, CollisionPolicy, ImportMode, init_config, load_config, load_config_from};
use tagtree_sources::{FetchOptions, Fetcher};
use tagtree_tree::DirTree;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// tagtree: import tag taxonomies into a content-addressed tree.
#[derive(Parser)]
#[command(
    name = "tagtree",
    version,
    about = "Import tag taxonomies into a deterministic, content-addressed tree.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.tagtree/tagtree.toml.
    #[arg(long, global = true, env = "TAGTREE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Duplicate-path handling, as accepted on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum CollisionArg {
    LastWriteWins,
    FirstWriteWins,
    Error,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::LastWriteWins => Self::LastWriteWins,
            CollisionArg::FirstWriteWins => Self::FirstWriteWins,
            CollisionArg::Error => Self::Error,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Import one tag source and write its tree.
    Import {
        /// Source type: handle-prefixed, flat-keyed, or csv-categorized.
        source_type: String,

        /// Source URL or file path (defaults to the configured location).
        #[arg(short, long)]
        source: Option<String>,

        /// Output directory for the tree (defaults to `output.dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Merge into the existing tree instead of replacing it.
        #[arg(long)]
        append: bool,

        /// Override the configured collision policy.
        #[arg(long)]
        on_collision: Option<CollisionArg>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tagtree=info",
        1 => "tagtree=debug",
        _ => "tagtree=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Import {
            source_type,
            source,
            out,
            append,
            on_collision,
        } => cmd_import(config, &source_type, source, out, append, on_collision).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

async fn cmd_import(
    mut config: AppConfig,
    source_type: &str,
    source: Option<String>,
    out: Option<PathBuf>,
    append: bool,
    on_collision: Option<CollisionArg>,
) -> Result<()> {
    let mode = if append {
        ImportMode::Append
    } else {
        ImportMode::Replace
    };
    let request = ImportRequest::parse(source_type, source, mode)?;

    if let Some(policy) = on_collision {
        config.output.collision = policy.into();
    }

    let out_dir = out.unwrap_or_else(|| PathBuf::from(&config.output.dir));

    info!(
        source = %request.source_type,
        location = request.location.as_deref().unwrap_or("<default>"),
        out = %out_dir.display(),
        collision = %config.output.collision,
        "importing tag source"
    );

    let fetcher = Fetcher::new(&FetchOptions::default())?;
    let reporter = CliProgress::new();

    let result = tagtree_core::pipeline::run_import(
        &request,
        &config,
        &fetcher,
        DirTree::new(&out_dir),
        &reporter,
    )
    .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.spinner.abandon_with_message("import failed");
            return Err(eyre!(e));
        }
    };

    println!();
    println!("  Tree written successfully!");
    println!("  Tree:       {}", outcome.content_id);
    println!("  Source:     {}", request.source_type);
    println!("  Documents:  {}", outcome.written);
    println!("  Skipped:    {}", outcome.skipped.len());
    println!("  Collisions: {}", outcome.collisions.len());
    println!("  Path:       {}", out_dir.display());
    println!("  Time:       {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config)?;
    print!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn entry_written(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {path}"));
    }

    fn done(&self, _outcome: &ImportOutcome) {
        self.spinner.finish_and_clear();
    }
}

//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use stat_matrix::core::config::Config;
use stat_matrix::core::errors::SmxError;
use stat_matrix::daemon::clock::SystemClock;
use stat_matrix::daemon::loop_main::{CycleBudget, FetchOutcome, RowOutcome, UpdateLoop};
use stat_matrix::daemon::signals::SignalHandler;
use stat_matrix::display::layout::build_layout;
use stat_matrix::display::spec::ROW_BUDGET;
use stat_matrix::display::surface::{
    Frame, JsonLinesSurface, RecordingSurface, RenderSurface, composite_rows,
};
use stat_matrix::display::terminal::TerminalSurface;
use stat_matrix::logger::activity::{ActivitySink, JsonlActivity, NullActivity};
use stat_matrix::logger::jsonl::JsonlConfig;
use stat_matrix::source::http::HttpMetricsSource;

/// Matrix panel stats display.
#[derive(Debug, Parser)]
#[command(
    name = "smx",
    author,
    version,
    about = "Stat Matrix - threshold-colored metrics on an RGB matrix panel",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the display loop.
    Run(RunArgs),
    /// Validate the configuration and show the initial layout.
    Check,
    /// Fetch once and show the resulting frame.
    Fetch,
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Stop after N cycles (runs until SIGINT/SIGTERM when omitted).
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,
    /// Where frames are drawn.
    #[arg(long, value_enum, default_value_t = SurfaceKind::Terminal)]
    surface: SurfaceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SurfaceKind {
    /// Live preview in this terminal.
    Terminal,
    /// One JSON frame per line on stdout.
    Jsonl,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print the config file path in use.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<SmxError> for CliError {
    fn from(err: SmxError) -> Self {
        if err.is_config_error() {
            Self::User(err.to_string())
        } else if matches!(err, SmxError::Serialization { .. }) {
            Self::Internal(err.to_string())
        } else {
            Self::Runtime(err.to_string())
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_loop(cli, args),
        Command::Check => run_check(cli),
        Command::Fetch => run_fetch(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn run_loop(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut update_loop = UpdateLoop::new(&config)?;
    let mut source = HttpMetricsSource::from_config(&config)?;
    let mut sink = activity_sink(&config);

    let signals = SignalHandler::new();
    let mut clock = SystemClock::interruptible(signals.shutdown_flag());
    let mut stop = (signals, CycleBudget(args.cycles.unwrap_or(u64::MAX)));

    let mut surface: Box<dyn RenderSurface> = match args.surface {
        SurfaceKind::Terminal => Box::new(TerminalSurface::stdout(!cli.no_color)),
        SurfaceKind::Jsonl => Box::new(JsonLinesSurface::new(io::stdout())),
    };

    update_loop.run(
        &mut source,
        surface.as_mut(),
        &mut clock,
        sink.as_mut(),
        &mut stop,
    );
    Ok(())
}

fn activity_sink(config: &Config) -> Box<dyn ActivitySink> {
    if config.logging.enabled {
        Box::new(JsonlActivity::open(JsonlConfig::from(&config.logging)))
    } else {
        Box::new(NullActivity)
    }
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn run_check(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let hash = config.stable_hash()?;
    let layout = build_layout(&config.data);
    let frame = Frame::compose(config.background_color, &layout);

    let warnings: Vec<String> = config
        .data
        .iter()
        .filter(|spec| !spec.thresholds.is_monotonic())
        .map(|spec| {
            format!(
                "{}: thresholds are not descending (high {} / med {} / low {}); bands apply as written",
                spec.key,
                spec.thresholds.high.cutoff,
                spec.thresholds.med.cutoff,
                spec.thresholds.low.cutoff
            )
        })
        .collect();

    match output_mode(cli) {
        OutputMode::Human => {
            let hash_note = format!("(hash {hash})");
            println!("{} {}", "Configuration is valid.".green(), hash_note.as_str().dimmed());
            println!("  Endpoint: {}", config.api_url);
            println!(
                "  Panel: {}x{} @ {}-bit, background {}",
                config.size.width, config.size.height, config.size.bit_depth, config.background_color
            );
            println!(
                "  Interval: {}s, keep values on fail: {}, failure scope: {}",
                config.update_interval, config.keep_values_on_fail, config.failure_scope
            );
            println!();
            for (spec, pair) in config.data.iter().zip(&layout) {
                println!(
                    "  {:<6} width {:>2}/{ROW_BUDGET}  at ({}, {})  placeholder {}",
                    spec.key.bold(),
                    spec.row_width(),
                    pair.position.x,
                    pair.position.y,
                    spec.placeholder
                        .as_deref()
                        .map_or_else(|| "(blank)".to_string(), |p| format!("{p:?}"))
                );
            }
            println!();
            print_rows(&frame);
            for warning in &warnings {
                eprintln!("{} {warning}", "warning:".yellow());
            }
        }
        OutputMode::Json => {
            let metrics: Vec<Value> = config
                .data
                .iter()
                .zip(&layout)
                .map(|(spec, pair)| {
                    json!({
                        "key": spec.key,
                        "width": spec.row_width(),
                        "x": pair.position.x,
                        "y": pair.position.y,
                        "placeholder": spec.placeholder,
                    })
                })
                .collect();
            let payload = json!({
                "command": "check",
                "valid": true,
                "hash": hash,
                "metrics": metrics,
                "frame": serde_json::to_value(&frame)?,
                "warnings": warnings,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

fn run_fetch(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut update_loop = UpdateLoop::new(&config)?;
    let mut source = HttpMetricsSource::from_config(&config)?;
    let mut surface = RecordingSurface::new();

    let report = update_loop.tick(&mut source, &mut surface, &mut NullActivity);
    let frame = surface
        .last()
        .cloned()
        .ok_or_else(|| CliError::Internal("no frame was rendered".to_string()))?;

    match output_mode(cli) {
        OutputMode::Human => {
            match &report.fetch {
                FetchOutcome::Ok { metrics } => println!(
                    "{} {metrics}/{} metric(s) from {}",
                    "fetched".green(),
                    config.data.len(),
                    source.url()
                ),
                FetchOutcome::Failed { message, .. } => {
                    println!("{} {message}", "fetch failed:".red());
                }
            }
            for (spec, outcome) in config.data.iter().zip(&report.rows) {
                println!("  {:<6} {}", spec.key, outcome_label(*outcome));
            }
            println!();
            print_rows(&frame);
        }
        OutputMode::Json => {
            let fetch = match &report.fetch {
                FetchOutcome::Ok { metrics } => json!({ "ok": true, "metrics": metrics }),
                FetchOutcome::Failed {
                    error_code,
                    message,
                } => json!({ "ok": false, "error_code": error_code, "error": message }),
            };
            let rows: Vec<Value> = config
                .data
                .iter()
                .zip(&report.rows)
                .map(|(spec, outcome)| json!({ "key": spec.key, "outcome": outcome_label(*outcome) }))
                .collect();
            let payload = json!({
                "command": "fetch",
                "url": source.url(),
                "fetch": fetch,
                "rows": rows,
                "frame": serde_json::to_value(&frame)?,
            });
            write_json_line(&payload)?;
        }
    }

    match report.fetch {
        FetchOutcome::Ok { .. } => Ok(()),
        FetchOutcome::Failed { message, .. } => Err(CliError::Runtime(message)),
    }
}

const fn outcome_label(outcome: RowOutcome) -> &'static str {
    match outcome {
        RowOutcome::Live => "live",
        RowOutcome::Kept => "kept",
        RowOutcome::Placeholder => "placeholder",
        RowOutcome::Blanked => "blank",
    }
}

/// Print composited panel rows between rulers.
fn print_rows(frame: &Frame) {
    let rows = composite_rows(frame);
    let width = rows
        .iter()
        .map(|row| row.glyphs.len())
        .max()
        .unwrap_or(ROW_BUDGET);
    let ruler = format!("  +{}+", "-".repeat(width));
    println!("{ruler}");
    for row in &rows {
        println!("  |{:<width$}|", row.text());
    }
    println!("{ruler}");
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    match args.command {
        None | Some(ConfigCommand::Path) => {
            let exists = path.exists();
            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;
            match output_mode(cli) {
                OutputMode::Human => println!("{}", config.to_toml()?),
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("{}", "Configuration is valid.".green());
                        println!("  Source: {}", path.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": path.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("{} {e}", "Configuration is INVALID:".red()),
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error_code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// output helpers
// ---------------------------------------------------------------------------

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SMX_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

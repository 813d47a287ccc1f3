//! Sollytch chaincode simulator.
//!
//! # Usage
//!
//! ```bash
//! # Replay a script, printing one JSON outcome per step
//! sollytch-sim run crates/sim/scripts/smoke.jsonl
//!
//! # Encode a JSON tree as a storeModel payload
//! sollytch-sim model encode tree.json --purpose qc_status
//!
//! # Print the config schema or an example config
//! sollytch-sim config schema
//! ```

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sollytch_ledger_classifier::{DecisionTree, NodeSpec, parse_purpose};
use sollytch_ledger_sim::{
    LogFormat, SimConfig, SimError, Simulator, check_expectations, config_example, config_schema,
    parse_script,
};

/// Replays invocation scripts against an in-memory Sollytch ledger.
#[derive(Debug, Parser)]
#[command(name = "sollytch-sim", version)]
struct Cli {
    /// TOML config file.
    #[arg(short, long, env = "SOLLYTCH_SIM_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log output format; overrides the config file.
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a JSON Lines script.
    Run {
        /// Script path.
        script: PathBuf,
        /// Stop at the first step that misses its expected status.
        #[arg(long)]
        fail_fast: bool,
    },
    /// Classifier model utilities.
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Config file utilities.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ModelAction {
    /// Print the base64 storeModel payload of a JSON tree.
    Encode {
        /// JSON tree path.
        tree: PathBuf,
        /// Purpose key the tree predicts.
        #[arg(long)]
        purpose: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the config JSON schema.
    Schema,
    /// Print an example config with default values.
    Example,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<(), SimError> {
    let (script, fail_fast) = match cli.command {
        Command::Config { action } => {
            match action {
                ConfigAction::Schema => print!("{}", config_schema()?),
                ConfigAction::Example => print!("{}", config_example()?),
            }
            return Ok(());
        },
        Command::Model { action: ModelAction::Encode { tree, purpose } } => {
            println!("{}", encode_model(&tree, &purpose)?);
            return Ok(());
        },
        Command::Run { script, fail_fast } => (script, fail_fast),
    };

    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    init_logging(cli.log_format.unwrap_or(config.log_format));

    let text = read_file(&script)?;
    let steps = parse_script(&text)?;
    tracing::info!(script = %script.display(), steps = steps.len(), "Replaying script");

    let mut simulator = Simulator::new(&config);
    let mut outcomes = Vec::with_capacity(steps.len());
    let mut stdout = std::io::stdout().lock();
    for step in &steps {
        let outcome = simulator.step(step)?;
        let line = serde_json::to_string(&outcome)
            .map_err(|err| SimError::Render { message: err.to_string() })?;
        writeln!(stdout, "{line}").map_err(|err| SimError::Render { message: err.to_string() })?;
        let missed = !outcome.expectation_met;
        outcomes.push(outcome);
        if fail_fast && missed {
            break;
        }
    }

    check_expectations(&outcomes)
}

fn encode_model(path: &Path, purpose: &str) -> Result<String, SimError> {
    let purpose =
        parse_purpose(purpose).map_err(|_| SimError::UnknownPurpose { key: purpose.to_string() })?;
    let text = read_file(path)?;
    let root: NodeSpec =
        serde_json::from_str(&text).map_err(|source| SimError::Tree { source })?;
    DecisionTree::from_spec(purpose.key(), root)
        .to_base64()
        .map_err(|source| SimError::Encode { source })
}

fn read_file(path: &Path) -> Result<String, SimError> {
    std::fs::read_to_string(path)
        .map_err(|source| SimError::Read { path: path.to_path_buf(), source })
}

/// Initializes logging on stderr; stdout carries the outcomes.
///
/// `RUST_LOG` overrides the default `info` filter.
fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stderr().is_terminal(),
    };

    let layer = fmt::layer().with_writer(std::io::stderr);
    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(layer).init();
    }
}

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use testgen_core::config::{Dialect, GeneratorConfig};
use testgen_core::logging::{LogConfig, LogLevel};

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Rust,
    C,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Rust => Dialect::Rust,
            DialectArg::C => Dialect::C,
        }
    }
}

/// Generate the 6502 instruction test suite
#[derive(Parser)]
#[command(name = "gen6502")]
struct Args {
    /// Output dialect (overrides the config file)
    #[arg(long, value_enum)]
    dialect: Option<DialectArg>,

    /// Only generate these mnemonics, comma separated
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,

    /// Import path of the Rust harness module
    #[arg(long)]
    harness: Option<String>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the suite here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print per-instruction test counts as JSON instead of the suite
    #[arg(long, default_value_t = false)]
    summary: bool,

    /// Generator log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "off")]
    log_level: String,

    /// Append generator logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(dialect) = args.dialect {
        config.dialect = dialect.into();
    }
    if let Some(harness) = &args.harness {
        config.harness = harness.clone();
    }
    if !args.only.is_empty() {
        config.only = args.only.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let Some(level) = LogLevel::from_str(&args.log_level) else {
        anyhow::bail!("Unknown log level: {}", args.log_level);
    };
    let logging = LogConfig::global();
    logging.set_global_level(level);
    if let Some(path) = &args.log_file {
        logging
            .set_log_file(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
    }

    let config = build_config(&args)?;
    log::info!("generating {:?} suite", config.dialect);

    // Everything is rendered before the first byte is written.
    let text = if args.summary {
        let summary = testgen_core::summarize(&config)?;
        serde_json::to_string_pretty(&summary)? + "\n"
    } else {
        testgen_core::generate_suite(&config)?
    };

    match &args.output {
        Some(path) => {
            let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            f.write_all(text.as_bytes())?;
            log::info!("wrote {} bytes to {}", text.len(), path.display());
        }
        None => io::stdout().lock().write_all(text.as_bytes())?,
    }

    Ok(())
}

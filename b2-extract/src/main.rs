use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use tracing::Level;

use b2_extract::{ExtractOptions, Extractor, LogLevel};

#[derive(Parser)]
#[command(
    name = "b2x",
    about = "Extractor for b2 archive pairs (.b2index / .b2container)",
    version
)]
struct Cli {
    /// Index file to extract
    index: PathBuf,

    /// Destination directory
    #[arg(short, long)]
    output: PathBuf,

    /// Disable header-based asset path recovery
    #[arg(long)]
    no_header_path: bool,

    /// Disable content-scan path recovery
    #[arg(long)]
    no_content_path: bool,

    /// Skip Wwise audio outputs (also skips localized entries)
    #[arg(long)]
    skip_wem: bool,

    /// Skip Bink video files (.bik / .bk2)
    #[arg(long)]
    skip_bink: bool,

    /// Skip entries already present in the output directory
    #[arg(long)]
    skip_existing: bool,

    /// Skip .res / .ace entries
    #[arg(long)]
    skip_res_ace: bool,

    /// Skip configuration files (.ini, .json, ...)
    #[arg(long)]
    skip_configs: bool,

    /// Emit only asset, map, and bulk families (implies all skips)
    #[arg(long)]
    only_assets: bool,

    /// Console log level
    #[arg(long, value_enum, default_value = "full")]
    log_level: LogLevelArg,

    /// Enable internal diagnostics on stderr
    #[arg(long)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevelArg {
    Full,
    Warnings,
    Error,
    Minimal,
    Silent,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Full => LogLevel::Full,
            LogLevelArg::Warnings => LogLevel::Warnings,
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Minimal => LogLevel::Minimal,
            LogLevelArg::Silent => LogLevel::Silent,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut options = ExtractOptions::new(&cli.output);
    options.enable_header_path = !cli.no_header_path;
    options.enable_content_path = !cli.no_content_path;
    options.skip_wem_files = cli.skip_wem;
    options.skip_bink_files = cli.skip_bink;
    options.skip_existing_files = cli.skip_existing;
    options.skip_res_and_ace = cli.skip_res_ace;
    options.skip_config_files = cli.skip_configs;
    options.only_assets = cli.only_assets;
    options.log_level = cli.log_level.into();

    // Progress prints once per whole percent to keep the terminal calm.
    let last_percent = AtomicU64::new(u64::MAX);
    let mut extractor = Extractor::new(options)
        .on_log(|message| println!("{message}"))
        .on_progress(move |percent| {
            let whole = percent as u64;
            if last_percent.swap(whole, Ordering::Relaxed) != whole {
                eprint!("\r{whole:>3}%");
                if whole >= 100 {
                    eprintln!();
                }
            }
        });

    match extractor.run(&cli.index) {
        Ok(summary) => {
            if summary.failed > 0 {
                eprintln!("{} entr(ies) failed; see the extract log", summary.failed);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

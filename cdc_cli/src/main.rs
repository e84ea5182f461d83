mod driver;

use std::env::current_dir;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use common::config::{read_config, CdcConfig, FConfig};
use common::log::tracing_factory::{OutputType, TracingFactory, TracingFactoryOptions};
use common::pretty_util::{to_string_pretty, OutputFormat};

use crate::driver::{run, EXIT_FAILED, EXIT_MISUSE, EXIT_OK};

#[derive(Parser, Serialize, Debug, Clone)]
#[command(name = "cdc-cli")]
#[command(version = "0.0.2")]
#[command(author = "rust-us")]
// about [=<expr>] 启用但未设置值时, crate description. 未启用时为Doc comment
#[command(about = "Collapse decoded MySQL binlog row events into per-day Parquet partitions")]
// long_about [=<expr>] 启用但未设置值时, 使用Doc comment. 未启用时没有值
#[command(long_about = None)]
pub(crate) struct CliArgs {
    /// 加载的配置文件路径
    #[arg(short, long, help = "Path to loaded configuration file", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// enable debug info
    #[arg(short, long, help = "enable debug mode", default_value_t = false)]
    pub debug: bool,

    #[arg(short, long, help = "output format: [yaml | json | plain], default yaml", default_value = "yaml")]
    pub format: String,

    ///////////////////////////////////////////////////
    // Target table options //
    ///////////////////////////////////////////////////
    #[arg(long = "database", help = "database of the target table", value_name = "database")]
    pub database: Option<String>,

    #[arg(long = "table", help = "target table name", value_name = "table")]
    pub table: Option<String>,

    #[arg(long = "base-dir", help = "directory holding the per-day partition files", value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    #[arg(long = "ext", help = "extension of the per-day partition files, without the dot", value_name = "ext")]
    pub ext: Option<String>,

    #[arg(long = "workers", help = "bounded day-writer pool size, default min(days touched, cpus)")]
    pub workers: Option<usize>,

    ///////////////////////////////////////////////////
    // Input //
    ///////////////////////////////////////////////////
    #[arg(long = "input", help = "path to the decoded event text file, default stdin", value_name = "FILE")]
    pub input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    let format: OutputFormat = args.format.parse().unwrap_or_default();
    eprintln!("args: \n{}", to_string_pretty(format, &args));

    let f_config = load_config(&args);
    let mut config = f_config.get_config();
    eprintln!("load config: \n{}", to_string_pretty(format, &config));

    let output_type = if args.debug { OutputType::Stdout } else { OutputType::File };
    let log_opt = TracingFactoryOptions::new(args.debug, output_type, config.log_dir.clone());
    let log_factory = TracingFactory::init(log_opt);
    eprintln!("log_dir: {}", log_factory.log_dir());

    merge(&mut config, &args);
    eprintln!("final config: \n{}", to_string_pretty(format, &config));

    if let Err(reason) = validate(&config) {
        eprintln!("usage error: {reason}");
        return ExitCode::from(EXIT_MISUSE as u8);
    }

    eprintln!();
    eprintln!("╔╦╗╔═╗ ╔═╗╔╦╗╦  ");
    eprintln!(" ║ ╠═╣ ║   ║ ║  ");
    eprintln!(" ╩ ╩ ╩ ╚═╝ ╩ ╩═╝ CDC consolidation CLI");
    eprintln!();

    match run(&config, args.input.as_ref()).await {
        Ok(report) => {
            eprintln!(
                "events_seen={} days_written={} days_removed={} rows_written={} elapsed={:?}",
                report.events_seen,
                report.days_written,
                report.days_removed,
                report.rows_written,
                report.elapsed,
            );
            ExitCode::from(EXIT_OK as u8)
        }
        Err(e) => {
            eprintln!("batch failed: {e}");
            ExitCode::from(EXIT_FAILED as u8)
        }
    }
}

// 加载配置文件， 读取配置
fn load_config(args: &CliArgs) -> FConfig {
    match get_config_path(args) {
        Some(path) if path.exists() => match read_config(&path) {
            Ok(config) => FConfig::new(config),
            Err(e) => {
                eprintln!("failed to read config at {path:?}: {e}, falling back to defaults");
                FConfig::default()
            }
        },
        _ => FConfig::default(),
    }
}

fn get_config_path(args: &CliArgs) -> Option<PathBuf> {
    if args.config.is_some() {
        return args.config.clone();
    }

    let mut pwd = current_dir().unwrap_or_else(|_| "/".into());
    // ./conf/cdc-consolidate.toml
    pwd.push("conf");
    pwd.push("cdc-consolidate");
    pwd.set_extension("toml");

    Some(pwd)
}

/// Misuse (exit code 2) is a missing required setting after the config file
/// and CLI overlay are both applied, not a malformed input stream.
fn validate(config: &CdcConfig) -> Result<(), String> {
    if config.database.is_empty() {
        return Err("no database configured (pass --database or set it in the config file)".to_string());
    }
    if config.table.is_empty() {
        return Err("no table configured (pass --table or set it in the config file)".to_string());
    }
    if config.base_dir.as_os_str().is_empty() {
        return Err("no base-dir configured (pass --base-dir or set it in the config file)".to_string());
    }
    Ok(())
}

// CLI flags always win over the loaded config file.
fn merge(config: &mut CdcConfig, args: &CliArgs) {
    if let Some(database) = &args.database {
        config.database = database.clone();
    }
    if let Some(table) = &args.table {
        config.table = table.clone();
    }
    if let Some(base_dir) = &args.base_dir {
        config.base_dir = base_dir.clone();
    }
    if let Some(ext) = &args.ext {
        config.ext = ext.clone();
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }
}

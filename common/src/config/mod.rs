mod load_style;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use load_style::LoadStyle;

use crate::err::CdcError;

/// Default extension used for per-day columnar files when the config omits one.
pub const DEFAULT_EXT: &str = "parquet";

/// Configuration for one batch invocation of the consolidation engine.
///
/// Loaded from an optional TOML file and then overlaid with whatever the
/// caller passed on the command line; CLI flags always win (see
/// [`CdcConfig::overlay`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdcConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Database name of the one target table, e.g. `metrics`.
    #[serde(default)]
    pub database: String,

    /// Table name of the one target table, e.g. `readings`.
    #[serde(default)]
    pub table: String,

    /// Base directory that holds the `<day>.<ext>` partition files.
    #[serde(default)]
    pub base_dir: PathBuf,

    /// Extension of the per-day partition files, without the leading dot.
    #[serde(default = "default_ext")]
    pub ext: String,

    /// Directory for daily-rolling log files; unused in debug/console mode.
    pub log_dir: Option<String>,

    /// Size of the bounded day-writer pool. `None` means `min(days_touched, num_cpus)`.
    pub workers: Option<usize>,
}

fn default_app_name() -> String {
    "cdc-consolidate".to_string()
}

fn default_ext() -> String {
    DEFAULT_EXT.to_string()
}

impl Default for CdcConfig {
    fn default() -> Self {
        CdcConfig {
            app_name: default_app_name(),
            database: String::new(),
            table: String::new(),
            base_dir: PathBuf::new(),
            ext: default_ext(),
            log_dir: None,
            workers: None,
        }
    }
}

impl CdcConfig {
    /// Fully-qualified `` `database`.`table` `` identifier used to recognize
    /// statement blocks in the input stream.
    pub fn qualified_table(&self) -> String {
        format!("`{}`.`{}`", self.database, self.table)
    }

    pub fn day_file_path(&self, day: &str) -> PathBuf {
        self.base_dir.join(format!("{day}.{}", self.ext))
    }
}

/// A [`CdcConfig`] together with how it was obtained, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FConfig {
    config: CdcConfig,
    load_style: LoadStyle,
}

impl Default for FConfig {
    fn default() -> Self {
        FConfig {
            config: CdcConfig::default(),
            load_style: LoadStyle::Default,
        }
    }
}

impl FConfig {
    pub fn new(config: CdcConfig) -> Self {
        FConfig {
            config,
            load_style: LoadStyle::Toml,
        }
    }

    pub fn get_config(self) -> CdcConfig {
        self.config
    }

    pub fn load_style(&self) -> LoadStyle {
        self.load_style
    }
}

/// Reads and parses a TOML configuration file.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<CdcConfig, CdcError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut s = String::new();
    file.read_to_string(&mut s)?;

    toml::from_str(&s).map_err(|source| CdcError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

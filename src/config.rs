//! Directory layout settings loaded from `dreamshift.toml`.
//!
//! Settings are read once at start-up and passed by reference to every
//! analysis; nothing in the crate looks them up globally.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file consulted in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "dreamshift.toml";
/// Environment variable naming an alternative config file.
pub const CONFIG_ENV_VAR: &str = "DREAMSHIFT_CONFIG";

pub const DEFAULT_SOURCE_DIR: &str = "data/source";
pub const DEFAULT_DERIVATIVES_DIR: &str = "data/derivatives";

/// LIWC output for post bodies.
pub const POSTS_TABLE: &str = "LIWC-22 Results - r-dreams_posts - LIWC Analysis.csv";
/// LIWC output for post titles.
pub const TITLES_TABLE: &str = "LIWC-22 Results - r-dreams_titles - LIWC Analysis.csv";
/// LIWC output for news headlines.
pub const NEWS_TABLE: &str = "LIWC-22 Results - r-news_titles - LIWC Analysis.csv";
/// Raw scrape of the dreams forum.
pub const RAW_POSTS_TABLE: &str = "r-dreams.csv";

/// `[paths]` section as written in the file; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawPaths {
    source_directory: Option<PathBuf>,
    derivatives_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    paths: RawPaths,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paths {
    /// Raw scraped data; never written to.
    pub source_directory: PathBuf,
    /// LIWC output and every analysis report.
    pub derivatives_directory: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            source_directory: PathBuf::from(DEFAULT_SOURCE_DIR),
            derivatives_directory: PathBuf::from(DEFAULT_DERIVATIVES_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub paths: Paths,
}

impl Settings {
    /// Settings rooted at explicit directories.
    pub fn with_dirs(source: impl Into<PathBuf>, derivatives: impl Into<PathBuf>) -> Self {
        Self {
            paths: Paths {
                source_directory: source.into(),
                derivatives_directory: derivatives.into(),
            },
        }
    }

    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one, the file named by
    /// `DREAMSHIFT_CONFIG` or `./dreamshift.toml` is used when present, and
    /// the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let candidate = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if candidate.exists() {
            Self::from_file(&candidate)
        } else {
            debug!(path = %candidate.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Read and parse one TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| AnalysisError::Io(format!("{}: {}", path.display(), e)))?;
        let settings = Self::from_toml(&contents)?;
        debug!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    /// Parse TOML, filling unset keys with defaults.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let raw: RawSettings = toml::from_str(contents)
            .map_err(|e| AnalysisError::InvalidParameter(format!("config: {}", e)))?;
        let defaults = Paths::default();
        Ok(Self {
            paths: Paths {
                source_directory: raw
                    .paths
                    .source_directory
                    .unwrap_or(defaults.source_directory),
                derivatives_directory: raw
                    .paths
                    .derivatives_directory
                    .unwrap_or(defaults.derivatives_directory),
            },
        })
    }

    pub fn source_dir(&self) -> &Path {
        &self.paths.source_directory
    }

    pub fn derivatives_dir(&self) -> &Path {
        &self.paths.derivatives_directory
    }

    pub fn posts_table(&self) -> PathBuf {
        self.derivatives_dir().join(POSTS_TABLE)
    }

    pub fn titles_table(&self) -> PathBuf {
        self.derivatives_dir().join(TITLES_TABLE)
    }

    pub fn news_table(&self) -> PathBuf {
        self.derivatives_dir().join(NEWS_TABLE)
    }

    pub fn raw_posts_table(&self) -> PathBuf {
        self.source_dir().join(RAW_POSTS_TABLE)
    }

    /// Create the source and derivatives directories if missing.
    ///
    /// Returns the directories that were created.
    pub fn init_directories(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for dir in [self.source_dir(), self.derivatives_dir()] {
            if dir.is_dir() {
                continue;
            }
            fs::create_dir_all(dir)
                .map_err(|e| AnalysisError::Io(format!("{}: {}", dir.display(), e)))?;
            info!(dir = %dir.display(), "created directory");
            created.push(dir.to_path_buf());
        }
        Ok(created)
    }
}

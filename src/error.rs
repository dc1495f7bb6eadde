use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum YtAudioError {
    #[error("{0}")]
    Configuration(String),

    #[error("{tool} not found. Please install {tool} and try again.")]
    DependencyMissing { tool: String },

    #[error("{url} is not a valid url. Please check and try again.")]
    InvalidUrl { url: String },

    #[error("failed to run `{command}`: {source}")]
    Execution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cli(#[from] clap::Error),
}

pub type Result<T> = std::result::Result<T, YtAudioError>;

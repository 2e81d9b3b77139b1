use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid repository set: {0}")]
    Invalid(String),
    #[error("failed to start config watcher: {0}")]
    Watch(#[from] notify::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

use thiserror::Error;

use crate::metadata::MetadataError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Report error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Other(String),
}

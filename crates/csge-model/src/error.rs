use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid product id: {0:?}")]
    InvalidProductId(String),
    #[error("unsupported frequency code {0} (only year-grained frequencies can be loaded)")]
    UnsupportedFrequency(u32),
    #[error("unknown table name: {0}")]
    UnknownTable(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BindingError {
    #[error("variable limit of {limit} exceeded adding '{name}'")]
    VariableLimit { name: String, limit: usize },
    #[error("val request out of range for variable '{name}' (row {row}, length {length})")]
    OutOfRange { name: String, row: usize, length: usize },
    #[error("block {block} exceeds the block limit of {limit}")]
    BlockLimit { block: usize, limit: usize },
    #[error("Config error: {0}")]
    Config(String),
    #[error("Input error: {0}")]
    Input(String),
}

pub type Result<T> = std::result::Result<T, BindingError>;

// Helper conversions
impl From<config::ConfigError> for BindingError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for BindingError {
    fn from(e: serde_json::Error) -> Self { Self::Input(e.to_string()) }
}

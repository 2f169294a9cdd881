use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Shape mismatch in {layer}: expected {expected}, found {found}")]
    ShapeMismatch {
        layer: String,
        expected: String,
        found: String,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to open source file")]
    FromFileOpeningError(#[from] io::Error),
    #[error("Failed to deserialize from file")]
    FromFileDeserializeError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn shape_mismatch(
        layer: &str,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Error::ShapeMismatch {
            layer: layer.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

use thiserror::Error;

use crate::datatype::TypeTag;

#[derive(Error, Debug)]
pub enum AnnexError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Decode error for key '{key}' tagged '{tag}': {message}")]
    Decode {
        key: String,
        tag: TypeTag,
        message: String,
    },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl AnnexError {
    /// Whether this error reports an unmet precondition rather than a failure
    /// while doing work. Precondition errors mean nothing was mutated; callers
    /// may report them and move on, while the other variants should surface as
    /// failures.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Schema(_))
    }

    /// Attach the attribute key an operation was working on, for diagnosability.
    pub fn keyed(self, attribute_key: &str) -> Self {
        match self {
            Self::Decode { tag, message, .. } => Self::Decode {
                key: attribute_key.to_owned(),
                tag,
                message,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnexError>;

// Helper conversions
impl From<rusqlite::Error> for AnnexError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_and_schema_are_preconditions() {
        assert!(AnnexError::Configuration("bad entity".into()).is_precondition());
        assert!(AnnexError::Schema("missing table".into()).is_precondition());
        assert!(!AnnexError::Persistence("disk full".into()).is_precondition());
        assert!(!AnnexError::Lock("poisoned".into()).is_precondition());
        assert!(
            !AnnexError::Decode {
                key: "isbn".into(),
                tag: TypeTag::Integer,
                message: "not a number".into(),
            }
            .is_precondition()
        );
    }
}

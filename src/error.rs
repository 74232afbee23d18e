use thiserror::Error;

/// Failures the picking engine reports to its callers.
#[derive(Debug, Error)]
pub enum PickerError {
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    #[error("cannot parse {field} of {record}: {value:?}")]
    Parse {
        field: &'static str,
        record: String,
        value: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("team config not valid: you only have {matched} players but need {required}")]
    InsufficientSquad { matched: usize, required: usize },

    #[error("config: {0}")]
    Config(String),
}

impl PickerError {
    /// A missing player name is reported but leaves the rest of the run intact.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PickerError::NotFound(_))
    }
}

pub type PickerResult<T> = Result<T, PickerError>;

use thiserror::Error;

use crate::{attributes::StoreError, sheets::GatewayError};

/// Failures while handling a single skill request. Only
/// `MissingAccountLinking` has its own spoken response; every other variant
/// ends in the generic apology.
#[derive(Error, Debug)]
pub enum SkillError {
    #[error("no access token present, account linking required")]
    MissingAccountLinking,
    #[error("cached spreadsheet {spreadsheet_id} failed validation: {source}")]
    ValidationFailure {
        spreadsheet_id: String,
        source: GatewayError,
    },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no handler for request {0}")]
    UnrecognizedIntent(String),
}

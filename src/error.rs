use crate::domain::validator::ValidationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpgradeError>;

#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("unknown package: {0}")]
    UnknownPackage(String),
    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("this M-Pesa transaction has already been used: {0}")]
    ReferenceInUse(String),
    #[error("current daily limit of {current} already covers the requested package limit of {requested}")]
    QuotaAlreadyMet { current: u32, requested: u32 },
    #[error("no payment found for reference: {0}")]
    UnknownReference(String),
    #[error("payment provider error: {0}")]
    Gateway(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
}

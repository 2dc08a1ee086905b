use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Config directory not found at {0}. Run 'solobooks init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Record '{id}' not found in {collection}")]
    NotFound { collection: String, id: String },

    #[error("Record '{id}' already exists in {collection}")]
    AlreadyExists { collection: String, id: String },

    #[error("Record '{id}' in {collection} cannot be decoded")]
    Malformed { collection: String, id: String },

    #[error("Failed to persist data to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Invalid status '{0}'. Must be one of: draft, sent, partially_paid, paid, overdue, cancelled"
    )]
    InvalidStatus(String),

    #[error("Invalid payment method '{0}'. Must be one of: stripe, check, wire, cash, other")]
    InvalidPaymentMethod(String),

    #[error("Invalid expense category '{0}'")]
    InvalidCategory(String),

    #[error("Invoice must have at least one line item")]
    NoLineItems,

    #[error("Quarter must be between 1 and 4 (got {0})")]
    InvalidQuarter(u32),

    #[error(
        "Invalid period '{0}'. Must be one of: current_month, last_month, current_quarter, last_quarter, ytd"
    )]
    InvalidPeriod(String),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Amount is outside the supported numeric range")]
    AmountOutOfRange,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid item '{0}'. Expected 'description:quantity:rate' (e.g., 'Development:10:150')")]
    InvalidItemFormat(String),

    #[error("Invoice '{0}' is already paid")]
    AlreadyPaid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

pub mod billing;
pub mod config;
pub mod error;
pub mod ids;
pub mod money;
pub mod store;

pub use billing::Billing;
pub use config::Settings;
pub use error::{LedgerError, Result};
pub use store::{Record, Store};

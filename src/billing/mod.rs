mod expenses;
mod ledger;
mod payments;
mod reports;

pub use expenses::{Expense, ExpenseCategory, ExpenseDraft, ExpenseFilter, ExpenseList, ExpenseSummary};
pub use ledger::{
    AgingBucket, Invoice, InvoiceDraft, InvoiceFilter, InvoiceList, InvoiceStatus, InvoiceSummary,
    LineItem, LineItemInput, OverdueInvoice, OverdueReport,
};
pub use payments::{Payment, PaymentMethod, PaymentOutcome, PaymentRequest};
pub use reports::{Period, ProfitMargin, QuarterlyEstimate, RevenueReport, RevenueSummary};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::{LedgerError, Result};
use crate::ids::generate_id;
use crate::store::{Record, Store};

pub const INVOICES: &str = "invoices";
pub const PAYMENTS: &str = "payments";
pub const EXPENSES: &str = "expenses";

/// The billing module: invoice ledger, payment application, expenses and
/// period reports over one document store. Constructed explicitly and passed
/// by the caller; there is no hidden shared instance.
pub struct Billing {
    store: Store,
    settings: Settings,
}

impl Billing {
    pub fn open(data_path: impl Into<PathBuf>, settings: Settings) -> Billing {
        Billing {
            store: Store::open(data_path),
            settings,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Allocate a fresh record id. Timestamp ids can collide within one
    /// second; probe with a numeric suffix until the store accepts it.
    pub(crate) fn next_id(&self, collection: &str, prefix: &str) -> String {
        let base = generate_id(prefix, true);
        if self.store.read(collection, &base).is_err() {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.store.read(collection, &candidate).is_err() {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Validate a caller-supplied monetary input before any arithmetic.
pub(crate) fn money_input(value: f64) -> Result<rust_decimal::Decimal> {
    crate::money::try_dec(value).ok_or(LedgerError::AmountOutOfRange)
}

pub(crate) fn to_record<T: Serialize>(value: &T) -> Record {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Record::new(),
    }
}

pub(crate) fn from_record<T: DeserializeOwned>(collection: &str, record: Record) -> Result<T> {
    let id = record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    serde_json::from_value(Value::Object(record)).map_err(|_| LedgerError::Malformed {
        collection: collection.to_string(),
        id,
    })
}

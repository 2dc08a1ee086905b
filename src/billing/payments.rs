use chrono::{Local, NaiveDate};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use super::{from_record, money_input, to_record, Billing, Invoice, InvoiceStatus, INVOICES, PAYMENTS};
use crate::error::{LedgerError, Result};
use crate::money::{dec, to_f64};
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Stripe,
    Check,
    Wire,
    Cash,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Check => "check",
            PaymentMethod::Wire => "wire",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Other => "other",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<PaymentMethod> {
        match s {
            "stripe" => Ok(PaymentMethod::Stripe),
            "check" => Ok(PaymentMethod::Check),
            "wire" => Ok(PaymentMethod::Wire),
            "cash" => Ok(PaymentMethod::Cash),
            "other" => Ok(PaymentMethod::Other),
            other => Err(LedgerError::InvalidPaymentMethod(other.to_string())),
        }
    }
}

/// Append-only record of money applied against an invoice. Payments are
/// never mutated or deleted; an invoice's paid total is their sum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub id: String,
    pub invoice_id: String,
    pub invoice_number: String,
    pub client_id: String,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub invoice_id: String,
    pub amount: f64,
    /// Defaults to today.
    pub payment_date: Option<NaiveDate>,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub invoice: Invoice,
}

impl Billing {
    /// Record a payment and promote the invoice status.
    ///
    /// Two-record mutation with no cross-collection transaction: a crash
    /// between the payment create and the invoice update leaves a payment
    /// without the matching invoice state; `reconcile_invoice` repairs that.
    pub fn record_payment(&mut self, request: PaymentRequest) -> Result<PaymentOutcome> {
        if request.amount <= 0.0 {
            return Err(LedgerError::InvalidAmount);
        }
        let amount = money_input(request.amount)?;

        let invoice = self.invoice(&request.invoice_id)?;
        // Reject before the payment record is written, so a bad amount never
        // leaves a payment behind with no matching invoice update.
        let paid_amount = dec(invoice.paid_amount)
            .checked_add(amount)
            .ok_or(LedgerError::AmountOutOfRange)?;
        let payment_date = request
            .payment_date
            .unwrap_or_else(|| Local::now().date_naive());

        let payment = Payment {
            id: String::new(),
            invoice_id: request.invoice_id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            client_id: invoice.client_id.clone(),
            amount: request.amount,
            payment_date,
            payment_method: request.method,
            transaction_id: request.transaction_id,
            notes: request.notes,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let payment_id = self.next_id(PAYMENTS, "payment");
        let record = self
            .store_mut()
            .create(PAYMENTS, &payment_id, to_record(&payment))?;
        let payment: Payment = from_record(PAYMENTS, record)?;

        let mut patch = Record::new();
        patch.insert("paid_amount".to_string(), json!(to_f64(paid_amount)));
        patch.insert("last_payment_date".to_string(), json!(payment_date));
        if paid_amount >= dec(invoice.total) {
            // Overpayment is permitted and surfaced as-is.
            patch.insert("status".to_string(), json!(InvoiceStatus::Paid));
            patch.insert("paid_date".to_string(), json!(payment_date));
        } else {
            patch.insert("status".to_string(), json!(InvoiceStatus::PartiallyPaid));
        }

        let record = self.store_mut().update(INVOICES, &request.invoice_id, patch)?;
        let invoice: Invoice = from_record(INVOICES, record)?;
        info!(
            "recorded {:.2} payment for {} ({})",
            payment.amount, invoice.invoice_number, invoice.status
        );

        Ok(PaymentOutcome { payment, invoice })
    }

    /// Payments applied to one invoice, oldest first.
    pub fn payments_for(&self, invoice_id: &str) -> Vec<Payment> {
        let predicate = |record: &Record| -> bool {
            record.get("invoice_id").and_then(Value::as_str) == Some(invoice_id)
        };
        self.store()
            .list(PAYMENTS, Some(&predicate), Some("payment_date"), false)
            .into_iter()
            .filter_map(|r| from_record(PAYMENTS, r).ok())
            .collect()
    }

    /// Repair procedure for the non-atomic payment/invoice update: recompute
    /// the cached `paid_amount` from the payments collection and re-derive
    /// the status.
    pub fn reconcile_invoice(&mut self, invoice_id: &str) -> Result<Invoice> {
        let invoice = self.invoice(invoice_id)?;
        let payments = self.payments_for(invoice_id);

        let paid: Decimal = payments.iter().map(|p| dec(p.amount)).sum();
        let last_date = payments.iter().map(|p| p.payment_date).max();

        let status = if paid >= dec(invoice.total) && !paid.is_zero() {
            InvoiceStatus::Paid
        } else if !paid.is_zero() {
            InvoiceStatus::PartiallyPaid
        } else if matches!(
            invoice.status,
            InvoiceStatus::Paid | InvoiceStatus::PartiallyPaid
        ) {
            // Cached state claimed payments that do not exist.
            InvoiceStatus::Sent
        } else {
            invoice.status
        };

        let mut patch = Record::new();
        patch.insert("paid_amount".to_string(), json!(to_f64(paid)));
        patch.insert("status".to_string(), json!(status));
        patch.insert("last_payment_date".to_string(), json!(last_date));
        if status == InvoiceStatus::Paid {
            patch.insert("paid_date".to_string(), json!(last_date));
        } else {
            patch.insert("paid_date".to_string(), Value::Null);
        }

        let record = self.store_mut().update(INVOICES, invoice_id, patch)?;
        from_record(INVOICES, record)
    }

    /// Bump the reminder counter for an unpaid invoice. Delivery itself is
    /// the caller's concern.
    pub fn send_payment_reminder(&mut self, invoice_id: &str) -> Result<Invoice> {
        let invoice = self.invoice(invoice_id)?;
        if invoice.status == InvoiceStatus::Paid {
            return Err(LedgerError::AlreadyPaid(invoice.invoice_number));
        }

        let mut patch = Record::new();
        patch.insert("reminders_sent".to_string(), json!(invoice.reminders_sent + 1));
        patch.insert("last_reminder".to_string(), json!(Local::now().date_naive()));

        let record = self.store_mut().update(INVOICES, invoice_id, patch)?;
        from_record(INVOICES, record)
    }
}

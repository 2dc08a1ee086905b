use chrono::{Datelike, Duration, Local, NaiveDate};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{from_record, money_input, to_record, Billing, INVOICES};
use crate::error::{LedgerError, Result};
use crate::money::{dec, round_money, to_f64};
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Terminal statuses carry no outstanding balance.
    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for InvoiceStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<InvoiceStatus> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "partially_paid" => Ok(InvoiceStatus::PartiallyPaid),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(LedgerError::InvalidStatus(other.to_string())),
        }
    }
}

/// A priced line on an invoice; `amount` is quantity x rate rounded half-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub amount: f64,
}

/// Caller-supplied line item before pricing.
#[derive(Debug, Clone)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(default)]
    pub id: String,
    pub invoice_number: String,
    pub client_id: String,
    pub client_name: String,
    pub line_items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub discount: f64,
    pub total: f64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    pub paid_amount: f64,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub sent_date: Option<NaiveDate>,
    #[serde(default)]
    pub status_notes: Option<String>,
    #[serde(default)]
    pub last_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub reminders_sent: u32,
    #[serde(default)]
    pub last_reminder: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Invoice {
    pub fn outstanding(&self) -> f64 {
        to_f64(dec(self.total) - dec(self.paid_amount))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceDraft {
    pub client_id: String,
    pub client_name: String,
    pub line_items: Vec<LineItemInput>,
    /// Defaults to today; kept explicit so backdated invoices land in the
    /// right reporting period.
    pub issue_date: Option<NaiveDate>,
    /// Defaults to issue date + payment-terms-days.
    pub due_date: Option<NaiveDate>,
    pub tax_rate: f64,
    pub discount: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub client_id: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub overdue_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub total_invoices: usize,
    pub by_status: BTreeMap<String, usize>,
    pub total_billed: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceList {
    pub invoices: Vec<Invoice>,
    pub summary: InvoiceSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgingBucket {
    #[serde(rename = "0-30 days")]
    UpTo30,
    #[serde(rename = "31-60 days")]
    UpTo60,
    #[serde(rename = "61-90 days")]
    UpTo90,
    #[serde(rename = "90+ days")]
    Over90,
}

impl AgingBucket {
    pub fn for_days(days_overdue: i64) -> AgingBucket {
        match days_overdue {
            ..=30 => AgingBucket::UpTo30,
            31..=60 => AgingBucket::UpTo60,
            61..=90 => AgingBucket::UpTo90,
            _ => AgingBucket::Over90,
        }
    }
}

impl fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgingBucket::UpTo30 => "0-30 days",
            AgingBucket::UpTo60 => "31-60 days",
            AgingBucket::UpTo90 => "61-90 days",
            AgingBucket::Over90 => "90+ days",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueInvoice {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub days_overdue: i64,
    pub aging_bucket: AgingBucket,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueReport {
    pub overdue_invoices: Vec<OverdueInvoice>,
    pub count: usize,
    pub total_overdue: f64,
}

impl Billing {
    /// Create a new invoice in draft status.
    pub fn create_invoice(&mut self, draft: InvoiceDraft) -> Result<Invoice> {
        if draft.line_items.is_empty() {
            return Err(LedgerError::NoLineItems);
        }
        if draft.tax_rate < 0.0 || draft.discount < 0.0 {
            return Err(LedgerError::InvalidAmount);
        }

        let issue_date = draft.issue_date.unwrap_or_else(|| Local::now().date_naive());
        let terms_days = self.settings().billing.payment_terms_days;
        let due_date = draft
            .due_date
            .unwrap_or_else(|| issue_date + Duration::days(i64::from(terms_days)));

        let mut line_items = Vec::with_capacity(draft.line_items.len());
        let mut subtotal = Decimal::ZERO;
        for item in &draft.line_items {
            if item.quantity <= 0.0 || item.rate < 0.0 {
                return Err(LedgerError::InvalidAmount);
            }
            // Checked arithmetic: a product or sum beyond Decimal's range is
            // a rejected input, not a panic or a zeroed amount.
            let amount = money_input(item.quantity)?
                .checked_mul(money_input(item.rate)?)
                .ok_or(LedgerError::AmountOutOfRange)?;
            let amount = round_money(amount);
            subtotal = subtotal
                .checked_add(amount)
                .ok_or(LedgerError::AmountOutOfRange)?;
            line_items.push(LineItem {
                description: item.description.clone(),
                quantity: item.quantity,
                rate: item.rate,
                amount: to_f64(amount),
            });
        }

        let tax_amount = round_money(
            subtotal
                .checked_mul(money_input(draft.tax_rate)?)
                .ok_or(LedgerError::AmountOutOfRange)?,
        );
        let discount = round_money(money_input(draft.discount)?);
        let total = round_money(
            subtotal
                .checked_add(tax_amount)
                .and_then(|t| t.checked_sub(discount))
                .ok_or(LedgerError::AmountOutOfRange)?,
        );

        let invoice_number = self.next_invoice_number(issue_date.year());
        let invoice = Invoice {
            id: String::new(),
            invoice_number,
            client_id: draft.client_id,
            client_name: draft.client_name,
            line_items,
            subtotal: to_f64(subtotal),
            tax_rate: draft.tax_rate,
            tax_amount: to_f64(tax_amount),
            discount: to_f64(discount),
            total: to_f64(total),
            currency: self.settings().billing.currency.clone(),
            status: InvoiceStatus::Draft,
            issue_date,
            due_date,
            notes: draft
                .notes
                .or_else(|| Some(format!("Payment due within {terms_days} days"))),
            paid_amount: 0.0,
            paid_date: None,
            sent_date: None,
            status_notes: None,
            last_payment_date: None,
            reminders_sent: 0,
            last_reminder: None,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let id = self.next_id(INVOICES, "inv");
        let record = self.store_mut().create(INVOICES, &id, to_record(&invoice))?;
        let created: Invoice = from_record(INVOICES, record)?;
        info!(
            "created invoice {} for {}: {:.2}",
            created.invoice_number, created.client_name, created.total
        );
        Ok(created)
    }

    pub fn invoice(&self, invoice_id: &str) -> Result<Invoice> {
        from_record(INVOICES, self.store().read(INVOICES, invoice_id)?)
    }

    /// Next number in the `YYYY-NNNN` sequence, derived by scanning the
    /// year's invoices rather than a stored counter.
    fn next_invoice_number(&self, year: i32) -> String {
        let prefix = format!("{year}-");
        let highest = self
            .store()
            .list(INVOICES, None, None, false)
            .iter()
            .filter_map(|r| r.get("invoice_number").and_then(Value::as_str))
            .filter_map(|num| num.strip_prefix(&prefix))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{year}-{:04}", highest + 1)
    }

    /// Update invoice status through the closed enumeration; stamps
    /// `sent_date` when the invoice transitions to sent.
    pub fn update_invoice_status(
        &mut self,
        invoice_id: &str,
        status: InvoiceStatus,
        notes: Option<&str>,
    ) -> Result<Invoice> {
        // Existence check up front so the patch never vivifies anything.
        self.invoice(invoice_id)?;

        let mut patch = Record::new();
        patch.insert("status".to_string(), json!(status));
        if let Some(notes) = notes {
            patch.insert("status_notes".to_string(), json!(notes));
        }
        if status == InvoiceStatus::Sent {
            patch.insert("sent_date".to_string(), json!(Local::now().date_naive()));
        }

        let record = self.store_mut().update(INVOICES, invoice_id, patch)?;
        from_record(INVOICES, record)
    }

    /// List invoices newest first, with count-by-status and running totals
    /// across the filtered set.
    pub fn list_invoices(&self, filter: &InvoiceFilter, today: NaiveDate) -> InvoiceList {
        let predicate = |record: &Record| -> bool {
            let Ok(invoice) = from_record::<Invoice>(INVOICES, record.clone()) else {
                return false;
            };
            if let Some(client_id) = &filter.client_id {
                if &invoice.client_id != client_id {
                    return false;
                }
            }
            if let Some(status) = filter.status {
                if invoice.status != status {
                    return false;
                }
            }
            if filter.overdue_only && (invoice.status.is_terminal() || invoice.due_date >= today) {
                return false;
            }
            true
        };

        let invoices: Vec<Invoice> = self
            .store()
            .list(INVOICES, Some(&predicate), Some("issue_date"), true)
            .into_iter()
            .filter_map(|r| from_record(INVOICES, r).ok())
            .collect();

        let mut by_status = BTreeMap::new();
        let mut billed = Decimal::ZERO;
        let mut paid = Decimal::ZERO;
        let mut outstanding = Decimal::ZERO;
        for invoice in &invoices {
            *by_status.entry(invoice.status.to_string()).or_insert(0) += 1;
            billed += dec(invoice.total);
            paid += dec(invoice.paid_amount);
            if !invoice.status.is_terminal() {
                outstanding += dec(invoice.total) - dec(invoice.paid_amount);
            }
        }

        let summary = InvoiceSummary {
            total_invoices: invoices.len(),
            by_status,
            total_billed: to_f64(billed),
            total_paid: to_f64(paid),
            total_outstanding: to_f64(outstanding),
        };

        InvoiceList { invoices, summary }
    }

    /// Overdue invoices with days-overdue and aging buckets.
    pub fn overdue_invoices(&self, today: NaiveDate) -> OverdueReport {
        let filter = InvoiceFilter {
            overdue_only: true,
            ..InvoiceFilter::default()
        };
        let list = self.list_invoices(&filter, today);

        let overdue_invoices: Vec<OverdueInvoice> = list
            .invoices
            .into_iter()
            .map(|invoice| {
                let days_overdue = (today - invoice.due_date).num_days();
                OverdueInvoice {
                    days_overdue,
                    aging_bucket: AgingBucket::for_days(days_overdue),
                    invoice,
                }
            })
            .collect();

        OverdueReport {
            count: overdue_invoices.len(),
            total_overdue: list.summary.total_outstanding,
            overdue_invoices,
        }
    }
}

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{from_record, money_input, Billing, ExpenseFilter, Invoice, InvoiceStatus, INVOICES};
use crate::error::{LedgerError, Result};
use crate::money::{dec, percentage, to_f64};

/// A reporting window: one of the canonical calendar periods or an explicit
/// custom range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    CurrentMonth,
    LastMonth,
    CurrentQuarter,
    LastQuarter,
    YearToDate,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl Period {
    /// Inclusive date range for this period, anchored at `today`.
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            Period::CurrentMonth => (
                first_of_month(today.year(), today.month()),
                last_day_of_month(today.year(), today.month()),
            ),
            Period::LastMonth => {
                let (year, month) = if today.month() == 1 {
                    (today.year() - 1, 12)
                } else {
                    (today.year(), today.month() - 1)
                };
                (first_of_month(year, month), last_day_of_month(year, month))
            }
            Period::CurrentQuarter => {
                let (quarter, year) = quarter_of(today);
                quarter_dates(quarter, year).expect("quarter_of yields 1..=4")
            }
            Period::LastQuarter => {
                let (quarter, year) = quarter_of(today);
                let (quarter, year) = if quarter == 1 {
                    (4, year - 1)
                } else {
                    (quarter - 1, year)
                };
                quarter_dates(quarter, year).expect("previous quarter is 1..=4")
            }
            Period::YearToDate => (first_of_month(today.year(), 1), today),
            Period::Custom { start, end } => (start, end),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::CurrentMonth => "current_month",
            Period::LastMonth => "last_month",
            Period::CurrentQuarter => "current_quarter",
            Period::LastQuarter => "last_quarter",
            Period::YearToDate => "year_to_date",
            Period::Custom { .. } => "custom",
        };
        f.write_str(s)
    }
}

impl FromStr for Period {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Period> {
        match s {
            "current_month" => Ok(Period::CurrentMonth),
            "last_month" => Ok(Period::LastMonth),
            "current_quarter" => Ok(Period::CurrentQuarter),
            "last_quarter" => Ok(Period::LastQuarter),
            "ytd" | "year_to_date" => Ok(Period::YearToDate),
            other => Err(LedgerError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Calendar quarter and year containing `date`.
pub fn quarter_of(date: NaiveDate) -> (u32, i32) {
    ((date.month() - 1) / 3 + 1, date.year())
}

/// Inclusive start and end dates of a quarter (Q1=Jan-Mar .. Q4=Oct-Dec).
pub fn quarter_dates(quarter: u32, year: i32) -> Result<(NaiveDate, NaiveDate)> {
    if !(1..=4).contains(&quarter) {
        return Err(LedgerError::InvalidQuarter(quarter));
    }
    let start_month = (quarter - 1) * 3 + 1;
    let end_month = quarter * 3;
    Ok((
        first_of_month(year, start_month),
        last_day_of_month(year, end_month),
    ))
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is always valid")
}

/// Calendar-correct last day of a month, leap years included.
fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next = if month == 12 {
        first_of_month(year + 1, 1)
    } else {
        first_of_month(year, month + 1)
    };
    next - Duration::days(1)
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueSummary {
    pub invoice_count: usize,
    pub total_revenue: f64,
    pub paid_revenue: f64,
    pub outstanding: f64,
    pub collection_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub summary: RevenueSummary,
    pub by_client: BTreeMap<String, f64>,
    pub by_month: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfitMargin {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revenue: f64,
    pub expenses: f64,
    pub gross_profit: f64,
    pub profit_margin_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuarterlyEstimate {
    pub quarter: u32,
    pub year: i32,
    pub revenue: f64,
    pub expenses: f64,
    pub net_income: f64,
    pub self_employment_tax: f64,
    pub income_tax: f64,
    pub quarterly_payment: f64,
}

impl Billing {
    /// Revenue over a period: invoices issued in range, cancelled excluded,
    /// grouped by client name and by issue month.
    pub fn revenue_report(&self, period: Period, today: NaiveDate) -> RevenueReport {
        let (start_date, end_date) = period.date_range(today);

        let mut invoice_count = 0;
        let mut total_revenue = Decimal::ZERO;
        let mut paid_revenue = Decimal::ZERO;
        let mut outstanding = Decimal::ZERO;
        let mut by_client: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut by_month: BTreeMap<String, Decimal> = BTreeMap::new();

        for record in self.store().list(INVOICES, None, None, false) {
            let Ok(invoice) = from_record::<Invoice>(INVOICES, record) else {
                continue;
            };
            if invoice.issue_date < start_date || invoice.issue_date > end_date {
                continue;
            }
            if invoice.status == InvoiceStatus::Cancelled {
                continue;
            }

            let total = dec(invoice.total);
            let paid = dec(invoice.paid_amount);
            invoice_count += 1;
            total_revenue += total;
            paid_revenue += paid;
            if !invoice.status.is_terminal() {
                outstanding += total - paid;
            }

            *by_client
                .entry(invoice.client_name.clone())
                .or_insert(Decimal::ZERO) += total;
            *by_month
                .entry(invoice.issue_date.format("%Y-%m").to_string())
                .or_insert(Decimal::ZERO) += total;
        }

        RevenueReport {
            period: period.to_string(),
            start_date,
            end_date,
            summary: RevenueSummary {
                invoice_count,
                total_revenue: to_f64(total_revenue),
                paid_revenue: to_f64(paid_revenue),
                outstanding: to_f64(outstanding),
                collection_rate: percentage(paid_revenue, total_revenue, 2),
            },
            by_client: by_client.into_iter().map(|(k, v)| (k, to_f64(v))).collect(),
            by_month: by_month.into_iter().map(|(k, v)| (k, to_f64(v))).collect(),
        }
    }

    /// Gross profit over a range: paid revenue less expense totals.
    /// Defaults to January 1 of the current year through today.
    pub fn profit_margin(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ProfitMargin {
        let start = start_date.unwrap_or_else(|| first_of_month(today.year(), 1));
        let end = end_date.unwrap_or(today);

        let revenue_report = self.revenue_report(Period::Custom { start, end }, today);
        let revenue = dec(revenue_report.summary.paid_revenue);

        let expense_filter = ExpenseFilter {
            start_date: Some(start),
            end_date: Some(end),
            ..ExpenseFilter::default()
        };
        let expenses = dec(self.list_expenses(&expense_filter).summary.total_amount);

        let gross_profit = revenue - expenses;

        ProfitMargin {
            start_date: start,
            end_date: end,
            revenue: to_f64(revenue),
            expenses: to_f64(expenses),
            gross_profit: to_f64(gross_profit),
            profit_margin_percent: percentage(gross_profit, revenue, 2),
        }
    }

    /// Simplified quarterly estimated-tax payment. Advisory only; no claim
    /// of tax-law correctness.
    pub fn quarterly_estimate(
        &self,
        quarter: u32,
        year: i32,
        revenue: f64,
        expenses: f64,
    ) -> Result<QuarterlyEstimate> {
        if !(1..=4).contains(&quarter) {
            return Err(LedgerError::InvalidQuarter(quarter));
        }

        let revenue = money_input(revenue)?;
        let expenses = money_input(expenses)?;
        let net_income = revenue
            .checked_sub(expenses)
            .ok_or(LedgerError::AmountOutOfRange)?;
        // 15.3% self-employment tax on 92.35% of net income. Checked so an
        // out-of-range figure is rejected rather than panicking.
        let se_tax = net_income
            .checked_mul(dec(0.9235))
            .and_then(|v| v.checked_mul(dec(0.153)))
            .ok_or(LedgerError::AmountOutOfRange)?;
        let income_tax = net_income
            .checked_mul(dec(self.settings().tax.quarterly_rate))
            .ok_or(LedgerError::AmountOutOfRange)?;
        let quarterly_payment = se_tax
            .checked_add(income_tax)
            .ok_or(LedgerError::AmountOutOfRange)?
            / Decimal::from(4);

        Ok(QuarterlyEstimate {
            quarter,
            year,
            revenue: to_f64(revenue),
            expenses: to_f64(expenses),
            net_income: to_f64(net_income),
            self_employment_tax: to_f64(se_tax),
            income_tax: to_f64(income_tax),
            quarterly_payment: to_f64(quarterly_payment),
        })
    }
}

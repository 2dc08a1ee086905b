use chrono::NaiveDate;
use solobooks::billing::{
    Billing, ExpenseCategory, ExpenseDraft, InvoiceDraft, InvoiceStatus, LineItemInput,
    PaymentMethod, PaymentRequest, Period,
};
use solobooks::config::Settings;
use tempfile::TempDir;

fn billing(dir: &TempDir) -> Billing {
    Billing::open(dir.path().join("billing.json"), Settings::default())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn invoice_for(
    billing: &mut Billing,
    client: &str,
    amount: f64,
    issued: NaiveDate,
) -> solobooks::billing::Invoice {
    billing
        .create_invoice(InvoiceDraft {
            client_id: client.to_lowercase(),
            client_name: client.to_string(),
            line_items: vec![LineItemInput {
                description: "Work".to_string(),
                quantity: 1.0,
                rate: amount,
            }],
            issue_date: Some(issued),
            ..InvoiceDraft::default()
        })
        .unwrap()
}

fn pay_in_full(billing: &mut Billing, invoice: &solobooks::billing::Invoice, on: NaiveDate) {
    billing
        .record_payment(PaymentRequest {
            invoice_id: invoice.id.clone(),
            amount: invoice.total,
            payment_date: Some(on),
            method: PaymentMethod::Wire,
            transaction_id: None,
            notes: None,
        })
        .unwrap();
}

#[test]
fn revenue_report_groups_by_client_and_month() {
    let dir = TempDir::new().unwrap();
    let mut billing = billing(&dir);
    let today = date(2026, 4, 1);

    let a = invoice_for(&mut billing, "Acme", 1000.0, date(2026, 1, 10));
    invoice_for(&mut billing, "Acme", 500.0, date(2026, 2, 10));
    invoice_for(&mut billing, "Globex", 2000.0, date(2026, 2, 20));
    pay_in_full(&mut billing, &a, date(2026, 2, 1));

    let report = billing.revenue_report(
        Period::Custom {
            start: date(2026, 1, 1),
            end: date(2026, 3, 31),
        },
        today,
    );

    assert_eq!(report.summary.invoice_count, 3);
    assert_eq!(report.summary.total_revenue, 3500.0);
    assert_eq!(report.summary.paid_revenue, 1000.0);
    assert_eq!(report.summary.outstanding, 2500.0);
    assert_eq!(report.summary.collection_rate, 28.57);

    assert_eq!(report.by_client["Acme"], 1500.0);
    assert_eq!(report.by_client["Globex"], 2000.0);
    assert_eq!(report.by_month["2026-01"], 1000.0);
    assert_eq!(report.by_month["2026-02"], 2500.0);
}

#[test]
fn revenue_report_excludes_cancelled_and_out_of_range() {
    let dir = TempDir::new().unwrap();
    let mut billing = billing(&dir);
    let today = date(2026, 4, 1);

    invoice_for(&mut billing, "Acme", 1000.0, date(2026, 2, 1));
    let cancelled = invoice_for(&mut billing, "Acme", 999.0, date(2026, 2, 5));
    billing
        .update_invoice_status(&cancelled.id, InvoiceStatus::Cancelled, None)
        .unwrap();
    // Issued outside the window.
    invoice_for(&mut billing, "Acme", 750.0, date(2025, 12, 15));

    let report = billing.revenue_report(
        Period::Custom {
            start: date(2026, 1, 1),
            end: date(2026, 3, 31),
        },
        today,
    );

    assert_eq!(report.summary.invoice_count, 1);
    assert_eq!(report.summary.total_revenue, 1000.0);
}

#[test]
fn empty_report_has_zero_collection_rate() {
    let dir = TempDir::new().unwrap();
    let billing = billing(&dir);

    let report = billing.revenue_report(Period::YearToDate, date(2026, 6, 1));
    assert_eq!(report.summary.invoice_count, 0);
    assert_eq!(report.summary.total_revenue, 0.0);
    assert_eq!(report.summary.collection_rate, 0.0);
    assert_eq!(report.period, "year_to_date");
    assert_eq!(report.start_date, date(2026, 1, 1));
    assert_eq!(report.end_date, date(2026, 6, 1));
}

#[test]
fn profit_margin_uses_paid_revenue_within_range() {
    let dir = TempDir::new().unwrap();
    let mut billing = billing(&dir);
    let today = date(2026, 6, 30);

    let paid = invoice_for(&mut billing, "Acme", 8000.0, date(2026, 2, 1));
    pay_in_full(&mut billing, &paid, date(2026, 2, 20));
    // Unpaid billing does not count as revenue.
    invoice_for(&mut billing, "Acme", 3000.0, date(2026, 3, 1));
    // Outside the requested range.
    let early = invoice_for(&mut billing, "Acme", 5000.0, date(2025, 11, 1));
    pay_in_full(&mut billing, &early, date(2025, 11, 20));

    billing
        .create_expense(ExpenseDraft {
            description: "Software".to_string(),
            amount: 2000.0,
            category: ExpenseCategory::OfficeExpense,
            expense_date: Some(date(2026, 1, 15)),
            vendor: None,
            receipt_url: None,
            notes: None,
            billable_to_client: None,
        })
        .unwrap();
    billing
        .create_expense(ExpenseDraft {
            description: "Old rent".to_string(),
            amount: 900.0,
            category: ExpenseCategory::RentOrLease,
            expense_date: Some(date(2025, 12, 1)),
            vendor: None,
            receipt_url: None,
            notes: None,
            billable_to_client: None,
        })
        .unwrap();

    let margin = billing.profit_margin(Some(date(2026, 1, 1)), Some(date(2026, 6, 30)), today);
    assert_eq!(margin.revenue, 8000.0);
    assert_eq!(margin.expenses, 2000.0);
    assert_eq!(margin.gross_profit, 6000.0);
    assert_eq!(margin.profit_margin_percent, 75.0);
}

#[test]
fn profit_margin_defaults_to_year_to_date() {
    let dir = TempDir::new().unwrap();
    let billing = billing(&dir);
    let today = date(2026, 5, 15);

    let margin = billing.profit_margin(None, None, today);
    assert_eq!(margin.start_date, date(2026, 1, 1));
    assert_eq!(margin.end_date, today);
    assert_eq!(margin.revenue, 0.0);
    assert_eq!(margin.profit_margin_percent, 0.0);
}

#[test]
fn quarterly_estimate_matches_hand_computation() {
    let dir = TempDir::new().unwrap();
    let billing = billing(&dir);

    let estimate = billing.quarterly_estimate(2, 2026, 50000.0, 10000.0).unwrap();

    assert_eq!(estimate.quarter, 2);
    assert_eq!(estimate.year, 2026);
    assert_eq!(estimate.net_income, 40000.0);
    // 40000 x 0.9235 x 0.153
    assert_eq!(estimate.self_employment_tax, 5651.82);
    // 40000 x 0.30
    assert_eq!(estimate.income_tax, 12000.0);
    // (5651.82 + 12000) / 4, rounded half-up
    assert_eq!(estimate.quarterly_payment, 4412.96);
}

#[test]
fn quarterly_estimate_allows_negative_net_income() {
    let dir = TempDir::new().unwrap();
    let billing = billing(&dir);

    let estimate = billing.quarterly_estimate(1, 2026, 5000.0, 8000.0).unwrap();
    assert_eq!(estimate.net_income, -3000.0);
    assert!(estimate.quarterly_payment < 0.0);
}

#[test]
fn quarterly_estimate_rejects_out_of_range_inputs() {
    let dir = TempDir::new().unwrap();
    let billing = billing(&dir);

    let err = billing.quarterly_estimate(1, 2026, 1e30, 0.0).unwrap_err();
    assert!(err.to_string().contains("supported numeric range"));
    assert!(billing.quarterly_estimate(1, 2026, 0.0, f64::NAN).is_err());
}

#[test]
fn quarterly_estimate_rejects_bad_quarters() {
    let dir = TempDir::new().unwrap();
    let billing = billing(&dir);

    let err = billing.quarterly_estimate(0, 2026, 1.0, 0.0).unwrap_err();
    assert!(err.to_string().contains("between 1 and 4"));
    assert!(billing.quarterly_estimate(5, 2026, 1.0, 0.0).is_err());
}

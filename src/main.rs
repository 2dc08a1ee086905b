use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use solobooks::billing::{
    Billing, ExpenseCategory, ExpenseDraft, ExpenseFilter, InvoiceDraft, InvoiceFilter,
    InvoiceStatus, LineItemInput, PaymentMethod, PaymentRequest, Period,
};
use solobooks::config::{self, Settings, CONFIG_TEMPLATE};
use solobooks::error::{LedgerError, Result};
use solobooks::money::format_amount;

#[derive(Parser)]
#[command(name = "solobooks")]
#[command(version, about = "Flat-file bookkeeping for a one-person services business", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.solobooks or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config file
    Init,

    /// Create a new invoice
    CreateInvoice {
        /// Client identifier
        #[arg(long)]
        client_id: String,

        /// Client name as it should appear on the invoice
        #[arg(long)]
        client_name: String,

        /// Line items in format "description:quantity:rate" (can be repeated)
        #[arg(short, long, value_name = "DESC:QTY:RATE")]
        item: Vec<String>,

        /// Issue date (default: today)
        #[arg(long)]
        issue_date: Option<String>,

        /// Due date (default: issue date + payment terms)
        #[arg(long)]
        due_date: Option<String>,

        /// Tax rate as a decimal (e.g., 0.08 for 8%)
        #[arg(long, default_value_t = 0.0)]
        tax_rate: f64,

        /// Discount amount
        #[arg(long, default_value_t = 0.0)]
        discount: f64,

        /// Notes or payment terms
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show a single invoice
    ShowInvoice {
        /// Invoice record id (e.g., inv-20260830-142501)
        invoice_id: String,
    },

    /// Update invoice status
    SetStatus {
        /// Invoice record id
        invoice_id: String,

        /// New status (draft, sent, partially_paid, paid, overdue, cancelled)
        status: String,

        /// Status change notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List invoices with a financial summary
    Invoices {
        /// Filter by client id
        #[arg(long)]
        client: Option<String>,

        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Show only overdue invoices
        #[arg(long)]
        overdue: bool,
    },

    /// List overdue invoices with aging buckets
    Overdue,

    /// Record a payment against an invoice
    AddPayment {
        /// Invoice record id
        invoice_id: String,

        /// Payment amount
        amount: f64,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Payment method (stripe, check, wire, cash, other)
        #[arg(long, default_value = "stripe")]
        method: String,

        /// External transaction id
        #[arg(long)]
        transaction_id: Option<String>,

        /// Payment notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show payment history for an invoice
    Payments {
        /// Invoice record id
        invoice_id: String,
    },

    /// Recompute an invoice's paid amount from its payment records
    Reconcile {
        /// Invoice record id
        invoice_id: String,
    },

    /// Record a payment reminder for an unpaid invoice
    Remind {
        /// Invoice record id
        invoice_id: String,
    },

    /// Record a business expense
    AddExpense {
        /// Expense description
        description: String,

        /// Expense amount
        amount: f64,

        /// Expense category (e.g., office_expense, travel, meals)
        #[arg(long)]
        category: String,

        /// Expense date (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Vendor or merchant name
        #[arg(long)]
        vendor: Option<String>,

        /// Client id if billable
        #[arg(long)]
        billable_to: Option<String>,

        /// Additional notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List expenses with category totals
    Expenses {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Filter from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Filter to this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Filter by tax year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Revenue report for a period
    Revenue {
        /// Period (current_month, last_month, current_quarter, last_quarter, ytd)
        #[arg(long, default_value = "current_month", conflicts_with_all = ["from", "to"])]
        period: String,

        /// Custom range start (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Custom range end (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Profit margin over a date range
    Profit {
        /// Range start (default: January 1 of this year)
        #[arg(long)]
        from: Option<String>,

        /// Range end (default: today)
        #[arg(long)]
        to: Option<String>,
    },

    /// Estimated quarterly tax payment (advisory only)
    TaxEstimate {
        /// Quarter number (1-4)
        quarter: u32,

        /// Tax year (default: current year)
        #[arg(long)]
        year: Option<i32>,

        /// Revenue for the period
        #[arg(long)]
        revenue: f64,

        /// Expenses for the period
        #[arg(long)]
        expenses: f64,
    },

    /// Show record counts per collection
    Stats,
}

fn main() {
    // Keep the handle alive for the whole run; dropping it stops the logger.
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .and_then(|logger| logger.start())
        .ok();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config::config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::CreateInvoice {
            client_id,
            client_name,
            item,
            issue_date,
            due_date,
            tax_rate,
            discount,
            notes,
        } => cmd_create_invoice(
            &cfg_dir,
            client_id,
            client_name,
            &item,
            issue_date,
            due_date,
            tax_rate,
            discount,
            notes,
        ),
        Commands::ShowInvoice { invoice_id } => cmd_show_invoice(&cfg_dir, &invoice_id),
        Commands::SetStatus {
            invoice_id,
            status,
            notes,
        } => cmd_set_status(&cfg_dir, &invoice_id, &status, notes.as_deref()),
        Commands::Invoices {
            client,
            status,
            overdue,
        } => cmd_invoices(&cfg_dir, client, status, overdue),
        Commands::Overdue => cmd_overdue(&cfg_dir),
        Commands::AddPayment {
            invoice_id,
            amount,
            date,
            method,
            transaction_id,
            notes,
        } => cmd_add_payment(&cfg_dir, &invoice_id, amount, date, &method, transaction_id, notes),
        Commands::Payments { invoice_id } => cmd_payments(&cfg_dir, &invoice_id),
        Commands::Reconcile { invoice_id } => cmd_reconcile(&cfg_dir, &invoice_id),
        Commands::Remind { invoice_id } => cmd_remind(&cfg_dir, &invoice_id),
        Commands::AddExpense {
            description,
            amount,
            category,
            date,
            vendor,
            billable_to,
            notes,
        } => cmd_add_expense(
            &cfg_dir,
            description,
            amount,
            &category,
            date,
            vendor,
            billable_to,
            notes,
        ),
        Commands::Expenses {
            category,
            from,
            to,
            year,
        } => cmd_expenses(&cfg_dir, category, from, to, year),
        Commands::Revenue { period, from, to } => cmd_revenue(&cfg_dir, &period, from, to),
        Commands::Profit { from, to } => cmd_profit(&cfg_dir, from, to),
        Commands::TaxEstimate {
            quarter,
            year,
            revenue,
            expenses,
        } => cmd_tax_estimate(&cfg_dir, quarter, year, revenue, expenses),
        Commands::Stats => cmd_stats(&cfg_dir),
    }
}

fn open_billing(cfg_dir: &PathBuf) -> Result<Billing> {
    let settings = Settings::load(cfg_dir)?;
    Ok(Billing::open(config::data_file(cfg_dir), settings))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| LedgerError::InvalidDate(s.to_string()))
}

fn parse_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
    s.as_deref().map(parse_date).transpose()
}

/// Parse line item input like "Development:10:150" into a LineItemInput.
/// Quantity and rate are taken from the right so the description may
/// contain colons.
fn parse_item_input(input: &str) -> Result<LineItemInput> {
    let mut parts = input.rsplitn(3, ':');
    let rate = parts.next();
    let quantity = parts.next();
    let description = parts.next();

    let (Some(description), Some(quantity), Some(rate)) = (description, quantity, rate) else {
        return Err(LedgerError::InvalidItemFormat(input.to_string()));
    };

    let quantity: f64 = quantity
        .parse()
        .map_err(|_| LedgerError::InvalidItemFormat(input.to_string()))?;
    let rate: f64 = rate
        .parse()
        .map_err(|_| LedgerError::InvalidItemFormat(input.to_string()))?;

    Ok(LineItemInput {
        description: description.to_string(),
        quantity,
        rate,
    })
}

/// Initialize config directory with a template config file
fn cmd_init(cfg_dir: &PathBuf) -> Result<()> {
    if cfg_dir.exists() {
        return Err(LedgerError::AlreadyInitialized(cfg_dir.clone()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("data"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized solobooks config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your business details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Create your first invoice:");
    println!("     solobooks create-invoice --client-id acme --client-name \"Acme Inc.\" \\");
    println!("       --item \"Development:10:150\"");

    Ok(())
}

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "ISSUED")]
    issued: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "PAID")]
    paid: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "CLIENT")]
    client: String,
}

#[derive(Tabled)]
struct PaymentRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "METHOD")]
    method: String,
}

#[derive(Tabled)]
struct ExpenseRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
}

#[derive(Tabled)]
struct BreakdownRow {
    #[tabled(rename = "KEY")]
    key: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
}

#[allow(clippy::too_many_arguments)]
fn cmd_create_invoice(
    cfg_dir: &PathBuf,
    client_id: String,
    client_name: String,
    items: &[String],
    issue_date: Option<String>,
    due_date: Option<String>,
    tax_rate: f64,
    discount: f64,
    notes: Option<String>,
) -> Result<()> {
    let mut billing = open_billing(cfg_dir)?;

    let line_items = items
        .iter()
        .map(|i| parse_item_input(i))
        .collect::<Result<Vec<_>>>()?;

    let invoice = billing.create_invoice(InvoiceDraft {
        client_id,
        client_name,
        line_items,
        issue_date: parse_opt_date(issue_date)?,
        due_date: parse_opt_date(due_date)?,
        tax_rate,
        discount,
        notes,
    })?;

    println!("Created {}", invoice.invoice_number);
    println!("  Id:     {}", invoice.id);
    println!("  Client: {}", invoice.client_name);
    println!("  Total:  {}", format_amount(invoice.total));
    println!("  Due:    {}", invoice.due_date);

    Ok(())
}

fn cmd_show_invoice(cfg_dir: &PathBuf, invoice_id: &str) -> Result<()> {
    let billing = open_billing(cfg_dir)?;
    let invoice = billing.invoice(invoice_id)?;

    println!("Invoice {}", invoice.invoice_number);
    println!("  Client:   {} ({})", invoice.client_name, invoice.client_id);
    println!("  Issued:   {}", invoice.issue_date);
    println!("  Due:      {}", invoice.due_date);
    println!("  Status:   {}", invoice.status);
    for item in &invoice.line_items {
        println!(
            "    {} x {} @ {} = {}",
            item.description,
            item.quantity,
            format_amount(item.rate),
            format_amount(item.amount)
        );
    }
    println!("  Subtotal: {}", format_amount(invoice.subtotal));
    println!("  Tax:      {}", format_amount(invoice.tax_amount));
    println!("  Discount: {}", format_amount(invoice.discount));
    println!("  Total:    {}", format_amount(invoice.total));
    println!("  Paid:     {}", format_amount(invoice.paid_amount));
    if let Some(notes) = &invoice.notes {
        println!("  Notes:    {notes}");
    }

    Ok(())
}

fn cmd_set_status(
    cfg_dir: &PathBuf,
    invoice_id: &str,
    status: &str,
    notes: Option<&str>,
) -> Result<()> {
    let mut billing = open_billing(cfg_dir)?;
    let status: InvoiceStatus = status.parse()?;
    let invoice = billing.update_invoice_status(invoice_id, status, notes)?;

    println!("Updated {} to {}", invoice.invoice_number, invoice.status);
    Ok(())
}

fn cmd_invoices(
    cfg_dir: &PathBuf,
    client: Option<String>,
    status: Option<String>,
    overdue: bool,
) -> Result<()> {
    let billing = open_billing(cfg_dir)?;
    let filter = InvoiceFilter {
        client_id: client,
        status: status.as_deref().map(str::parse).transpose()?,
        overdue_only: overdue,
    };
    let list = billing.list_invoices(&filter, Local::now().date_naive());

    if list.invoices.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    let rows: Vec<InvoiceRow> = list
        .invoices
        .iter()
        .map(|inv| InvoiceRow {
            id: inv.id.clone(),
            number: inv.invoice_number.clone(),
            issued: inv.issue_date.to_string(),
            due: inv.due_date.to_string(),
            total: format_amount(inv.total),
            paid: format_amount(inv.paid_amount),
            status: inv.status.to_string(),
            client: inv.client_name.clone(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    println!();
    println!("Total:       {} invoices", list.summary.total_invoices);
    println!("Billed:      {}", format_amount(list.summary.total_billed));
    println!("Paid:        {}", format_amount(list.summary.total_paid));
    println!("Outstanding: {}", format_amount(list.summary.total_outstanding));

    Ok(())
}

fn cmd_overdue(cfg_dir: &PathBuf) -> Result<()> {
    let billing = open_billing(cfg_dir)?;
    let report = billing.overdue_invoices(Local::now().date_naive());

    if report.overdue_invoices.is_empty() {
        println!("No overdue invoices.");
        return Ok(());
    }

    for entry in &report.overdue_invoices {
        println!(
            "{} {} - {} overdue {} days ({})",
            entry.invoice.invoice_number,
            entry.invoice.client_name,
            format_amount(entry.invoice.outstanding()),
            entry.days_overdue,
            entry.aging_bucket
        );
    }

    println!();
    println!("Overdue: {} invoices, {}", report.count, format_amount(report.total_overdue));

    Ok(())
}

fn cmd_add_payment(
    cfg_dir: &PathBuf,
    invoice_id: &str,
    amount: f64,
    date: Option<String>,
    method: &str,
    transaction_id: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let mut billing = open_billing(cfg_dir)?;
    let method: PaymentMethod = method.parse()?;

    let outcome = billing.record_payment(PaymentRequest {
        invoice_id: invoice_id.to_string(),
        amount,
        payment_date: parse_opt_date(date)?,
        method,
        transaction_id,
        notes,
    })?;

    let invoice = &outcome.invoice;
    if invoice.status == InvoiceStatus::Paid {
        println!(
            "Recorded {} payment for {} (fully paid)",
            format_amount(amount),
            invoice.invoice_number
        );
    } else {
        println!(
            "Recorded {} payment for {} ({} remaining)",
            format_amount(amount),
            invoice.invoice_number,
            format_amount(invoice.outstanding())
        );
    }

    Ok(())
}

fn cmd_payments(cfg_dir: &PathBuf, invoice_id: &str) -> Result<()> {
    let billing = open_billing(cfg_dir)?;
    let invoice = billing.invoice(invoice_id)?;
    let payments = billing.payments_for(invoice_id);

    println!("Payments for {}", invoice.invoice_number);

    if payments.is_empty() {
        println!("  No payments recorded.");
    } else {
        let rows: Vec<PaymentRow> = payments
            .iter()
            .enumerate()
            .map(|(idx, p)| PaymentRow {
                index: idx + 1,
                date: p.payment_date.to_string(),
                amount: format_amount(p.amount),
                method: p.payment_method.to_string(),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    println!(
        "Total paid: {} / {} (Status: {})",
        format_amount(invoice.paid_amount),
        format_amount(invoice.total),
        invoice.status
    );

    Ok(())
}

fn cmd_reconcile(cfg_dir: &PathBuf, invoice_id: &str) -> Result<()> {
    let mut billing = open_billing(cfg_dir)?;
    let invoice = billing.reconcile_invoice(invoice_id)?;

    println!(
        "Reconciled {}: paid {} of {} ({})",
        invoice.invoice_number,
        format_amount(invoice.paid_amount),
        format_amount(invoice.total),
        invoice.status
    );

    Ok(())
}

fn cmd_remind(cfg_dir: &PathBuf, invoice_id: &str) -> Result<()> {
    let mut billing = open_billing(cfg_dir)?;
    let invoice = billing.send_payment_reminder(invoice_id)?;

    println!(
        "Payment reminder recorded for {} (total: {})",
        invoice.invoice_number, invoice.reminders_sent
    );

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_add_expense(
    cfg_dir: &PathBuf,
    description: String,
    amount: f64,
    category: &str,
    date: Option<String>,
    vendor: Option<String>,
    billable_to: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let mut billing = open_billing(cfg_dir)?;
    let category: ExpenseCategory = category.parse()?;

    let expense = billing.create_expense(ExpenseDraft {
        description,
        amount,
        category,
        expense_date: parse_opt_date(date)?,
        vendor,
        receipt_url: None,
        notes,
        billable_to_client: billable_to,
    })?;

    println!(
        "Recorded expense {} - {} ({})",
        expense.description,
        format_amount(expense.amount),
        expense.category
    );

    Ok(())
}

fn cmd_expenses(
    cfg_dir: &PathBuf,
    category: Option<String>,
    from: Option<String>,
    to: Option<String>,
    year: Option<i32>,
) -> Result<()> {
    let billing = open_billing(cfg_dir)?;
    let filter = ExpenseFilter {
        category: category.as_deref().map(str::parse).transpose()?,
        start_date: parse_opt_date(from)?,
        end_date: parse_opt_date(to)?,
        tax_year: year,
    };
    let list = billing.list_expenses(&filter);

    if list.expenses.is_empty() {
        println!("No expenses found.");
        return Ok(());
    }

    let rows: Vec<ExpenseRow> = list
        .expenses
        .iter()
        .map(|e| ExpenseRow {
            date: e.expense_date.to_string(),
            description: e.description.clone(),
            category: e.category.to_string(),
            amount: format_amount(e.amount),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    println!();
    println!("Total:    {}", format_amount(list.summary.total_amount));
    println!("Billable: {}", format_amount(list.summary.billable_expenses));

    Ok(())
}

fn cmd_revenue(
    cfg_dir: &PathBuf,
    period: &str,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let billing = open_billing(cfg_dir)?;

    let period = match (parse_opt_date(from)?, parse_opt_date(to)?) {
        (Some(start), Some(end)) => Period::Custom { start, end },
        _ => period.parse()?,
    };
    let report = billing.revenue_report(period, Local::now().date_naive());

    println!("Revenue report ({})", report.period);
    println!("  Range:           {} to {}", report.start_date, report.end_date);
    println!("  Invoices:        {}", report.summary.invoice_count);
    println!("  Total revenue:   {}", format_amount(report.summary.total_revenue));
    println!("  Paid revenue:    {}", format_amount(report.summary.paid_revenue));
    println!("  Outstanding:     {}", format_amount(report.summary.outstanding));
    println!("  Collection rate: {:.2}%", report.summary.collection_rate);

    if !report.by_client.is_empty() {
        println!();
        println!("By client:");
        let rows: Vec<BreakdownRow> = report
            .by_client
            .iter()
            .map(|(k, v)| BreakdownRow {
                key: k.clone(),
                amount: format_amount(*v),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));

        println!();
        println!("By month:");
        let rows: Vec<BreakdownRow> = report
            .by_month
            .iter()
            .map(|(k, v)| BreakdownRow {
                key: k.clone(),
                amount: format_amount(*v),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    Ok(())
}

fn cmd_profit(cfg_dir: &PathBuf, from: Option<String>, to: Option<String>) -> Result<()> {
    let billing = open_billing(cfg_dir)?;
    let report = billing.profit_margin(
        parse_opt_date(from)?,
        parse_opt_date(to)?,
        Local::now().date_naive(),
    );

    println!("Profit margin");
    println!("  Range:    {} to {}", report.start_date, report.end_date);
    println!("  Revenue:  {}", format_amount(report.revenue));
    println!("  Expenses: {}", format_amount(report.expenses));
    println!("  Profit:   {}", format_amount(report.gross_profit));
    println!("  Margin:   {:.2}%", report.profit_margin_percent);

    Ok(())
}

fn cmd_tax_estimate(
    cfg_dir: &PathBuf,
    quarter: u32,
    year: Option<i32>,
    revenue: f64,
    expenses: f64,
) -> Result<()> {
    use chrono::Datelike;

    let billing = open_billing(cfg_dir)?;
    let year = year.unwrap_or_else(|| Local::now().year());
    let estimate = billing.quarterly_estimate(quarter, year, revenue, expenses)?;

    println!("Estimated taxes for Q{} {}", estimate.quarter, estimate.year);
    println!("  Net income:          {}", format_amount(estimate.net_income));
    println!("  Self-employment tax: {}", format_amount(estimate.self_employment_tax));
    println!("  Income tax:          {}", format_amount(estimate.income_tax));
    println!("  Quarterly payment:   {}", format_amount(estimate.quarterly_payment));
    println!();
    println!("This is a simplified estimate, not tax advice.");

    Ok(())
}

fn cmd_stats(cfg_dir: &PathBuf) -> Result<()> {
    let billing = open_billing(cfg_dir)?;
    let stats = billing.store().stats();

    println!("Data file: {}", billing.store().path().display());
    if stats.is_empty() {
        println!("No collections yet.");
    } else {
        for (collection, count) in stats {
            println!("  {collection}: {count}");
        }
    }

    Ok(())
}

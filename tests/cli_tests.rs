use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn solobooks(cfg_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("solobooks").unwrap();
    cmd.arg("-C").arg(cfg_dir);
    cmd
}

fn init_config(dir: &TempDir) -> PathBuf {
    let cfg_dir = dir.path().join("config");
    solobooks(&cfg_dir).arg("init").assert().success();
    cfg_dir
}

fn create_invoice(cfg_dir: &Path, args: &[&str]) -> (String, String) {
    let output = solobooks(cfg_dir)
        .arg("create-invoice")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    let number = stdout
        .lines()
        .find_map(|l| l.strip_prefix("Created "))
        .expect("created line")
        .trim()
        .to_string();
    let id = stdout
        .lines()
        .find_map(|l| l.trim().strip_prefix("Id:"))
        .expect("id line")
        .trim()
        .to_string();
    (id, number)
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("solobooks")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create-invoice"))
        .stdout(predicate::str::contains("add-payment"))
        .stdout(predicate::str::contains("add-expense"))
        .stdout(predicate::str::contains("revenue"))
        .stdout(predicate::str::contains("tax-estimate"));
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("solobooks")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("solobooks"));
}

#[test]
fn init_creates_config_and_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = dir.path().join("config");

    solobooks(&cfg_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized solobooks config at:"));

    assert!(cfg_dir.join("config.toml").exists());
    assert!(cfg_dir.join("data").is_dir());

    solobooks(&cfg_dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn commands_require_an_initialized_config() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = dir.path().join("nope");

    solobooks(&cfg_dir)
        .arg("invoices")
        .assert()
        .failure()
        .stderr(predicate::str::contains("solobooks init"));
}

#[test]
fn invoice_lifecycle_end_to_end() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = init_config(&dir);

    let (id, number) = create_invoice(
        &cfg_dir,
        &[
            "--client-id",
            "acme",
            "--client-name",
            "Acme Corp",
            "--item",
            "Development:10:150",
            "--tax-rate",
            "0.08",
            "--issue-date",
            "2026-03-01",
        ],
    );
    assert_eq!(number, "2026-0001");

    solobooks(&cfg_dir)
        .args(["show-invoice", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Invoice 2026-0001"))
        .stdout(predicate::str::contains("Total:    1,620.00"));

    solobooks(&cfg_dir)
        .args(["set-status", &id, "sent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 2026-0001 to sent"));

    solobooks(&cfg_dir)
        .args(["add-payment", &id, "800", "--date", "2026-03-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("820.00 remaining"));

    solobooks(&cfg_dir)
        .args(["add-payment", &id, "820", "--date", "2026-03-20", "--method", "wire"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fully paid"));

    solobooks(&cfg_dir)
        .args(["payments", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Payments for 2026-0001"))
        .stdout(predicate::str::contains("Total paid: 1,620.00 / 1,620.00 (Status: paid)"));

    solobooks(&cfg_dir)
        .args(["reconcile", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reconciled 2026-0001: paid 1,620.00 of 1,620.00 (paid)"));

    solobooks(&cfg_dir)
        .arg("invoices")
        .assert()
        .success()
        .stdout(predicate::str::contains("2026-0001"))
        .stdout(predicate::str::contains("Total:       1 invoices"));

    solobooks(&cfg_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("invoices: 1"))
        .stdout(predicate::str::contains("payments: 2"));
}

#[test]
fn reminders_are_rejected_once_paid() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = init_config(&dir);

    let (id, _) = create_invoice(
        &cfg_dir,
        &["--client-id", "acme", "--client-name", "Acme", "--item", "Work:1:100"],
    );

    solobooks(&cfg_dir)
        .args(["remind", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("(total: 1)"));

    solobooks(&cfg_dir)
        .args(["add-payment", &id, "100"])
        .assert()
        .success();

    solobooks(&cfg_dir)
        .args(["remind", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already paid"));
}

#[test]
fn item_descriptions_may_contain_colons() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = init_config(&dir);

    let (id, _) = create_invoice(
        &cfg_dir,
        &[
            "--client-id",
            "acme",
            "--client-name",
            "Acme",
            "--item",
            "Phase 1: discovery:2:500",
        ],
    );

    solobooks(&cfg_dir)
        .args(["show-invoice", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Phase 1: discovery x 2 @ 500.00 = 1,000.00"));
}

#[test]
fn malformed_inputs_are_reported() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = init_config(&dir);

    solobooks(&cfg_dir)
        .args([
            "create-invoice",
            "--client-id",
            "acme",
            "--client-name",
            "Acme",
            "--item",
            "just-a-description",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected 'description:quantity:rate'"));

    solobooks(&cfg_dir)
        .args(["set-status", "inv-1", "shipped"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid status 'shipped'"));

    solobooks(&cfg_dir)
        .args(["add-payment", "inv-1", "100", "--method", "bitcoin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid payment method 'bitcoin'"));

    solobooks(&cfg_dir)
        .args(["add-expense", "Lunch", "40", "--category", "snacks"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid expense category 'snacks'"));

    solobooks(&cfg_dir)
        .args(["show-invoice", "inv-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn expenses_are_recorded_and_listed() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = init_config(&dir);

    solobooks(&cfg_dir)
        .arg("expenses")
        .assert()
        .success()
        .stdout(predicate::str::contains("No expenses found."));

    solobooks(&cfg_dir)
        .args([
            "add-expense",
            "Laptop",
            "1999.99",
            "--category",
            "office_expense",
            "--date",
            "2026-01-10",
            "--vendor",
            "Framework",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded expense Laptop - 1,999.99 (office_expense)"));

    solobooks(&cfg_dir)
        .args(["expenses", "--year", "2026"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Laptop"))
        .stdout(predicate::str::contains("Total:    1,999.99"));

    solobooks(&cfg_dir)
        .args(["expenses", "--year", "1999"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No expenses found."));
}

#[test]
fn revenue_report_accepts_a_custom_range() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = init_config(&dir);

    create_invoice(
        &cfg_dir,
        &[
            "--client-id",
            "acme",
            "--client-name",
            "Acme",
            "--item",
            "Work:1:1000",
            "--issue-date",
            "2026-02-01",
        ],
    );

    solobooks(&cfg_dir)
        .args(["revenue", "--from", "2026-01-01", "--to", "2026-12-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Revenue report (custom)"))
        .stdout(predicate::str::contains("Invoices:        1"))
        .stdout(predicate::str::contains("Total revenue:   1,000.00"))
        .stdout(predicate::str::contains("Collection rate: 0.00%"));

    solobooks(&cfg_dir)
        .args(["revenue", "--period", "bad_period"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid period"));
}

#[test]
fn tax_estimate_prints_the_breakdown() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = init_config(&dir);

    solobooks(&cfg_dir)
        .args([
            "tax-estimate",
            "2",
            "--year",
            "2026",
            "--revenue",
            "50000",
            "--expenses",
            "10000",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Estimated taxes for Q2 2026"))
        .stdout(predicate::str::contains("Net income:          40,000.00"))
        .stdout(predicate::str::contains("Self-employment tax: 5,651.82"))
        .stdout(predicate::str::contains("Income tax:          12,000.00"))
        .stdout(predicate::str::contains("Quarterly payment:   4,412.96"))
        .stdout(predicate::str::contains("not tax advice"));

    solobooks(&cfg_dir)
        .args(["tax-estimate", "7", "--revenue", "1", "--expenses", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 4"));
}

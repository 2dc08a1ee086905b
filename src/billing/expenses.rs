use chrono::{Datelike, Local, NaiveDate};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{from_record, money_input, to_record, Billing, EXPENSES};
use crate::error::{LedgerError, Result};
use crate::money::{dec, to_f64};
use crate::store::Record;

/// Closed set of deductible business-expense categories (Schedule C lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Advertising,
    CarAndTruck,
    CommissionsAndFees,
    ContractLabor,
    Depletion,
    Depreciation,
    EmployeeBenefits,
    Insurance,
    Interest,
    LegalAndProfessional,
    OfficeExpense,
    PensionAndProfitSharing,
    RentOrLease,
    RepairsAndMaintenance,
    Supplies,
    TaxesAndLicenses,
    Travel,
    Meals,
    Utilities,
    Wages,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 21] = [
        ExpenseCategory::Advertising,
        ExpenseCategory::CarAndTruck,
        ExpenseCategory::CommissionsAndFees,
        ExpenseCategory::ContractLabor,
        ExpenseCategory::Depletion,
        ExpenseCategory::Depreciation,
        ExpenseCategory::EmployeeBenefits,
        ExpenseCategory::Insurance,
        ExpenseCategory::Interest,
        ExpenseCategory::LegalAndProfessional,
        ExpenseCategory::OfficeExpense,
        ExpenseCategory::PensionAndProfitSharing,
        ExpenseCategory::RentOrLease,
        ExpenseCategory::RepairsAndMaintenance,
        ExpenseCategory::Supplies,
        ExpenseCategory::TaxesAndLicenses,
        ExpenseCategory::Travel,
        ExpenseCategory::Meals,
        ExpenseCategory::Utilities,
        ExpenseCategory::Wages,
        ExpenseCategory::Other,
    ];

    fn as_str(self) -> &'static str {
        match self {
            ExpenseCategory::Advertising => "advertising",
            ExpenseCategory::CarAndTruck => "car_and_truck",
            ExpenseCategory::CommissionsAndFees => "commissions_and_fees",
            ExpenseCategory::ContractLabor => "contract_labor",
            ExpenseCategory::Depletion => "depletion",
            ExpenseCategory::Depreciation => "depreciation",
            ExpenseCategory::EmployeeBenefits => "employee_benefits",
            ExpenseCategory::Insurance => "insurance",
            ExpenseCategory::Interest => "interest",
            ExpenseCategory::LegalAndProfessional => "legal_and_professional",
            ExpenseCategory::OfficeExpense => "office_expense",
            ExpenseCategory::PensionAndProfitSharing => "pension_and_profit_sharing",
            ExpenseCategory::RentOrLease => "rent_or_lease",
            ExpenseCategory::RepairsAndMaintenance => "repairs_and_maintenance",
            ExpenseCategory::Supplies => "supplies",
            ExpenseCategory::TaxesAndLicenses => "taxes_and_licenses",
            ExpenseCategory::Travel => "travel",
            ExpenseCategory::Meals => "meals",
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Wages => "wages",
            ExpenseCategory::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<ExpenseCategory> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    pub expense_date: NaiveDate,
    pub tax_year: i32,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub billable_to_client: Option<String>,
    #[serde(default)]
    pub reimbursed: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    /// Defaults to today; `tax_year` is derived from it.
    pub expense_date: Option<NaiveDate>,
    pub vendor: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub billable_to_client: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub category: Option<ExpenseCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tax_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSummary {
    pub total_expenses: usize,
    pub by_category: BTreeMap<String, f64>,
    pub total_amount: f64,
    pub billable_expenses: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseList {
    pub expenses: Vec<Expense>,
    pub summary: ExpenseSummary,
}

impl Billing {
    /// Record a business expense.
    pub fn create_expense(&mut self, draft: ExpenseDraft) -> Result<Expense> {
        if draft.amount <= 0.0 {
            return Err(LedgerError::InvalidAmount);
        }
        let amount = money_input(draft.amount)?;

        let expense_date = draft
            .expense_date
            .unwrap_or_else(|| Local::now().date_naive());

        let expense = Expense {
            id: String::new(),
            description: draft.description,
            amount: to_f64(amount),
            category: draft.category,
            expense_date,
            tax_year: expense_date.year(),
            vendor: draft.vendor,
            receipt_url: draft.receipt_url,
            notes: draft.notes,
            billable_to_client: draft.billable_to_client,
            reimbursed: false,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let id = self.next_id(EXPENSES, "expense");
        let record = self.store_mut().create(EXPENSES, &id, to_record(&expense))?;
        let created: Expense = from_record(EXPENSES, record)?;
        info!(
            "recorded expense: {} - {:.2}",
            created.description, created.amount
        );
        Ok(created)
    }

    /// List expenses newest first, with category breakdown and totals.
    pub fn list_expenses(&self, filter: &ExpenseFilter) -> ExpenseList {
        let predicate = |record: &Record| -> bool {
            let Ok(expense) = from_record::<Expense>(EXPENSES, record.clone()) else {
                return false;
            };
            if let Some(category) = filter.category {
                if expense.category != category {
                    return false;
                }
            }
            if let Some(start) = filter.start_date {
                if expense.expense_date < start {
                    return false;
                }
            }
            if let Some(end) = filter.end_date {
                if expense.expense_date > end {
                    return false;
                }
            }
            if let Some(year) = filter.tax_year {
                if expense.tax_year != year {
                    return false;
                }
            }
            true
        };

        let expenses: Vec<Expense> = self
            .store()
            .list(EXPENSES, Some(&predicate), Some("expense_date"), true)
            .into_iter()
            .filter_map(|r| from_record(EXPENSES, r).ok())
            .collect();

        let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut total = Decimal::ZERO;
        let mut billable = Decimal::ZERO;
        for expense in &expenses {
            *by_category
                .entry(expense.category.to_string())
                .or_insert(Decimal::ZERO) += dec(expense.amount);
            total += dec(expense.amount);
            if expense.billable_to_client.is_some() {
                billable += dec(expense.amount);
            }
        }

        let summary = ExpenseSummary {
            total_expenses: expenses.len(),
            by_category: by_category.into_iter().map(|(k, v)| (k, to_f64(v))).collect(),
            total_amount: to_f64(total),
            billable_expenses: to_f64(billable),
        };

        ExpenseList { expenses, summary }
    }
}

//! serializable views and dashboard figures
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::interest::AccrualResult;
use crate::loans::LoanOrCreditLine;
use crate::sales::SaleLine;
use crate::settlement::{Distribution, Settlement, SettlementTotals};
use crate::types::{
    BankReceipt, ExpenseKind, LoanId, LoanKind, SettlementId, SettlementStatus,
};

/// headline figures of a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DashboardTotals {
    pub sales_count: usize,
    pub pending_count: usize,
    pub total_sales: Money,
    /// sale value of paid lines
    pub total_received: Money,
    pub total_receivable: Money,
    pub total_profit: Money,
    pub total_taxes: Money,
    /// profit net of every settlement's shared and individual expenses
    pub net_profit: Money,
}

impl DashboardTotals {
    pub fn compute<'a, L, S>(lines: L, settlements: S) -> Self
    where
        L: IntoIterator<Item = &'a SaleLine>,
        S: IntoIterator<Item = &'a Settlement>,
    {
        let mut totals = Self::default();
        for line in lines {
            totals.sales_count += 1;
            totals.total_sales += line.sale_value();
            totals.total_profit += line.profit_amount();
            totals.total_taxes += line.tax_amount();
            if line.is_paid() {
                totals.total_received += line.sale_value();
            } else {
                totals.pending_count += 1;
            }
        }
        totals.total_receivable = totals.total_sales - totals.total_received;

        let settlement_expenses: Money = settlements
            .into_iter()
            .map(|s| s.totals().total_shared_expenses + s.totals().total_individual_expenses)
            .sum();
        totals.net_profit = totals.total_profit - settlement_expenses;
        totals
    }
}

/// one calendar month of the dashboard series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MonthlyFigures {
    /// 1 to 12
    pub month: u32,
    pub sales: Money,
    pub profit: Money,
    pub taxes: Money,
    /// shared plus individual expenses of settlements dated in the month
    pub expenses: Money,
    pub net_profit: Money,
}

/// month-by-month figures of one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSeries {
    pub year: i32,
    pub months: Vec<MonthlyFigures>,
}

impl DashboardSeries {
    /// Bucket lines by order date and settlement expenses by settlement date.
    ///
    /// Always twelve entries; records outside `year` are skipped.
    pub fn compute<'a, L, S>(lines: L, settlements: S, year: i32) -> Self
    where
        L: IntoIterator<Item = &'a SaleLine>,
        S: IntoIterator<Item = &'a Settlement>,
    {
        let mut months: Vec<MonthlyFigures> = (1..=12)
            .map(|month| MonthlyFigures {
                month,
                ..Default::default()
            })
            .collect();

        for line in lines {
            if line.order_date.year() != year {
                continue;
            }
            let bucket = &mut months[line.order_date.month0() as usize];
            bucket.sales += line.sale_value();
            bucket.profit += line.profit_amount();
            bucket.taxes += line.tax_amount();
        }
        for settlement in settlements {
            let date = settlement.date();
            if date.year() != year {
                continue;
            }
            let totals = settlement.totals();
            months[date.month0() as usize].expenses +=
                totals.total_shared_expenses + totals.total_individual_expenses;
        }
        for bucket in &mut months {
            bucket.net_profit = bucket.profit - bucket.expenses;
        }

        tracing::debug!(year, "dashboard series computed");
        DashboardSeries { year, months }
    }

    pub fn month(&self, month: u32) -> Option<&MonthlyFigures> {
        self.months.iter().find(|m| m.month == month)
    }
}

/// serializable view of a settlement
#[derive(Debug, Serialize, Deserialize)]
pub struct SettlementView {
    pub id: SettlementId,
    pub date: NaiveDate,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub status: SettlementStatus,
    pub line_count: usize,
    pub totals: SettlementTotals,
    pub distributions: Vec<Distribution>,
    pub expenses: Vec<ExpenseView>,
    pub bank_receipt: Option<BankReceipt>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpenseView {
    pub description: String,
    pub amount: Money,
    pub kind: ExpenseKind,
}

impl SettlementView {
    pub fn from_settlement(settlement: &Settlement) -> Self {
        SettlementView {
            id: settlement.id,
            date: settlement.date(),
            title: settlement.title.clone(),
            notes: settlement.notes.clone(),
            status: settlement.status(),
            line_count: settlement.line_ids().len(),
            totals: *settlement.totals(),
            distributions: settlement.distributions().to_vec(),
            expenses: settlement
                .expenses()
                .iter()
                .map(|e| ExpenseView {
                    description: e.description.clone(),
                    amount: e.amount(),
                    kind: e.kind,
                })
                .collect(),
            bank_receipt: settlement.bank_receipt.clone(),
            created_at: settlement.created_at,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// serializable view of a loan with its accrual as of a date
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub counterparty: String,
    pub kind: LoanKind,
    pub principal: Money,
    pub start_date: NaiveDate,
    pub monthly_rate: Option<Rate>,
    pub interest_active: bool,
    pub payment_count: usize,
    pub total_paid: Money,
    pub as_of: NaiveDate,
    pub accrual: AccrualResult,
}

impl LoanView {
    pub fn from_loan(loan: &LoanOrCreditLine, as_of: NaiveDate) -> Self {
        LoanView {
            id: loan.id,
            counterparty: loan.counterparty.clone(),
            kind: loan.kind,
            principal: loan.principal(),
            start_date: loan.start_date,
            monthly_rate: loan.monthly_rate,
            interest_active: loan.interest_active,
            payment_count: loan.payments().len(),
            total_paid: loan.total_paid(),
            as_of,
            accrual: loan.accrue(as_of).rounded(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::sales::{SaleLineInput, SaleLinePatch};
    use crate::settlement::{Allocation, Expense};
    use crate::events::EventStore;
    use crate::types::PaymentStatus;
    use chrono::TimeZone;
    use hourglass_rs::{SafeTimeProvider, TimeSource};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap(),
        ))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(company: Uuid, value: i64, cost: i64) -> SaleLine {
        SaleLine::new(
            company,
            date(2024, 6, 10),
            SaleLineInput::new(
                Money::from_major(value),
                Rate::from_percentage(3),
                Rate::from_percentage(10),
                Money::from_major(cost),
            ),
            &clock(),
        )
    }

    fn closed_settlement(company: Uuid, lines: &[SaleLine]) -> Settlement {
        closed_settlement_on(company, lines, date(2024, 6, 30))
    }

    fn closed_settlement_on(company: Uuid, lines: &[SaleLine], on: NaiveDate) -> Settlement {
        let mut settlement = Settlement::open(company, on, &clock()).with_title("Junho");
        for line in lines {
            settlement.include_line(line).unwrap();
        }
        settlement
            .add_expense(Expense::shared(company, "aluguel", Money::from_major(50)).unwrap())
            .unwrap();
        settlement
            .add_expense(
                Expense::individual(company, "combustível", Money::from_major(20), Uuid::new_v4())
                    .unwrap(),
            )
            .unwrap();
        settlement
            .set_allocations(
                vec![Allocation::new(Uuid::new_v4(), Rate::ONE)],
                &LedgerConfig::for_company(company),
            )
            .unwrap();
        settlement
            .close(lines, &LedgerConfig::for_company(company), &clock())
            .unwrap();
        settlement
    }

    #[test]
    fn test_dashboard_totals() {
        let company = Uuid::new_v4();
        let mut paid = sale(company, 1_000, 500);
        paid.apply_patch(
            SaleLinePatch {
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
            &mut EventStore::new(),
        )
        .unwrap();
        let lines = vec![paid, sale(company, 500, 305)];
        let settlement = closed_settlement(company, &lines);

        let totals = DashboardTotals::compute(&lines, [&settlement]);
        assert_eq!(totals.sales_count, 2);
        assert_eq!(totals.pending_count, 1);
        assert_eq!(totals.total_sales, Money::from_major(1_500));
        assert_eq!(totals.total_received, Money::from_major(1_000));
        assert_eq!(totals.total_receivable, Money::from_major(500));
        assert_eq!(totals.total_profit, Money::from_major(500));
        assert_eq!(totals.total_taxes, Money::from_major(150));
        assert_eq!(totals.net_profit, Money::from_major(430));
    }

    #[test]
    fn test_dashboard_empty() {
        let totals = DashboardTotals::compute(&Vec::<SaleLine>::new(), &Vec::<Settlement>::new());
        assert_eq!(totals, DashboardTotals::default());
    }

    #[test]
    fn test_dashboard_series_two_months() {
        let company = Uuid::new_v4();
        let mut may = sale(company, 500, 305);
        may.apply_patch(
            SaleLinePatch {
                order_date: Some(date(2024, 5, 20)),
                ..Default::default()
            },
            &mut EventStore::new(),
        )
        .unwrap();
        let june = sale(company, 1_000, 500);
        let mut last_year = sale(company, 2_000, 100);
        last_year
            .apply_patch(
                SaleLinePatch {
                    order_date: Some(date(2023, 6, 10)),
                    ..Default::default()
                },
                &mut EventStore::new(),
            )
            .unwrap();
        let lines = vec![may, june, last_year];
        let settlement = closed_settlement_on(company, &lines[1..2], date(2024, 6, 30));

        let series = DashboardSeries::compute(&lines, [&settlement], 2024);
        assert_eq!(series.months.len(), 12);

        let may = series.month(5).unwrap();
        assert_eq!(may.sales, Money::from_major(500));
        // 500 - 15 fee - 50 tax - 305 cost
        assert_eq!(may.profit, Money::from_major(130));
        assert_eq!(may.taxes, Money::from_major(50));
        assert_eq!(may.expenses, Money::ZERO);
        assert_eq!(may.net_profit, Money::from_major(130));

        let june = series.month(6).unwrap();
        assert_eq!(june.sales, Money::from_major(1_000));
        assert_eq!(june.profit, Money::from_major(370));
        assert_eq!(june.taxes, Money::from_major(100));
        assert_eq!(june.expenses, Money::from_major(70));
        assert_eq!(june.net_profit, Money::from_major(300));

        assert_eq!(series.month(1).unwrap().sales, Money::ZERO);
        assert!(series.month(13).is_none());
    }

    #[test]
    fn test_settlement_view_json() {
        let company = Uuid::new_v4();
        let lines = vec![sale(company, 1_000, 500)];
        let settlement = closed_settlement(company, &lines);

        let view = SettlementView::from_settlement(&settlement);
        assert_eq!(view.line_count, 1);
        assert_eq!(view.expenses.len(), 2);
        assert_eq!(view.totals.net_distributable, Money::from_major(300));

        let json = view.to_json_pretty().unwrap();
        assert!(json.contains("\"title\": \"Junho\""));
        assert!(json.contains("\"Closed\""));
    }

    #[test]
    fn test_loan_view_rounds_accrual() {
        let loan = LoanOrCreditLine::builder()
            .company(Uuid::new_v4())
            .counterparty("Clara")
            .principal(Money::from_major(1_000))
            .monthly_rate(Rate::from_percentage(2))
            .start_date(date(2024, 1, 10))
            .build_with_time(&clock())
            .unwrap();

        let view = LoanView::from_loan(&loan, date(2024, 4, 10));
        assert_eq!(view.accrual.interest_accrued, Money::from_decimal(dec!(61.21)));
        assert!(view.to_json_pretty().unwrap().contains("Clara"));
    }
}

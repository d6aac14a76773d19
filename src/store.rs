use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::errors::{LedgerError, Result};
use crate::loans::{LoanOrCreditLine, Payment};
use crate::sales::SaleLine;
use crate::settlement::{Expense, Settlement, SettlementCommit, SettlementReversal};
use crate::types::{
    CompanyId, DateRange, ExpenseId, ExpenseStatus, LoanId, SaleLineId, SettlementId,
    SettlementStatus,
};

/// Persistence collaborator of the ledger.
///
/// Every call names its company explicitly. Settlement commits and
/// reversals are all-or-nothing.
pub trait LedgerStore {
    fn insert_line(&self, company_id: CompanyId, line: SaleLine) -> Result<()>;

    fn insert_expense(&self, company_id: CompanyId, expense: Expense) -> Result<()>;

    fn insert_loan(&self, company_id: CompanyId, loan: LoanOrCreditLine) -> Result<()>;

    /// persist an open settlement
    fn save_settlement(&self, company_id: CompanyId, settlement: &Settlement) -> Result<()>;

    fn lines(&self, company_id: CompanyId) -> Result<Vec<SaleLine>>;

    /// lines not yet consumed by a settlement, by order date
    fn unsettled_lines(&self, company_id: CompanyId, range: Option<DateRange>) -> Result<Vec<SaleLine>>;

    fn pending_expenses(&self, company_id: CompanyId) -> Result<Vec<Expense>>;

    /// mark lines settled, expenses used and store the closed settlement in one step
    fn commit_settlement(&self, company_id: CompanyId, commit: &SettlementCommit) -> Result<()>;

    /// undo a commit in one step
    fn revert_settlement(&self, company_id: CompanyId, reversal: &SettlementReversal) -> Result<()>;

    fn settlement(&self, company_id: CompanyId, id: SettlementId) -> Result<Settlement>;

    fn settlements(&self, company_id: CompanyId) -> Result<Vec<Settlement>>;

    fn loan(&self, company_id: CompanyId, id: LoanId) -> Result<LoanOrCreditLine>;

    fn loans(&self, company_id: CompanyId) -> Result<Vec<LoanOrCreditLine>>;

    /// append a payment, keeping the loan's date order
    fn append_payment(&self, company_id: CompanyId, loan_id: LoanId, payment: Payment) -> Result<()>;
}

#[derive(Debug, Default)]
struct Tables {
    lines: HashMap<SaleLineId, SaleLine>,
    expenses: HashMap<ExpenseId, Expense>,
    settlements: HashMap<SettlementId, Settlement>,
    loans: HashMap<LoanId, LoanOrCreditLine>,
}

/// in-memory store; one lock serializes every write
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| LedgerError::InconsistentState {
            message: "store lock poisoned".to_string(),
        })
    }
}

fn ensure_company(expected: CompanyId, found: CompanyId) -> Result<()> {
    if expected != found {
        return Err(LedgerError::CompanyMismatch { expected, found });
    }
    Ok(())
}

impl Tables {
    fn line(&self, company_id: CompanyId, id: SaleLineId) -> Result<&SaleLine> {
        self.lines
            .get(&id)
            .filter(|l| l.company_id == company_id)
            .ok_or(LedgerError::SaleLineNotFound { id })
    }

    fn expense(&self, company_id: CompanyId, id: ExpenseId) -> Result<&Expense> {
        self.expenses
            .get(&id)
            .filter(|e| e.company_id == company_id)
            .ok_or(LedgerError::ExpenseNotFound { id })
    }

    fn check_commit(&self, company_id: CompanyId, commit: &SettlementCommit) -> Result<()> {
        let settlement = &commit.settlement;
        ensure_company(company_id, settlement.company_id)?;
        if settlement.status() != SettlementStatus::Closed {
            return Err(LedgerError::InconsistentState {
                message: format!("settlement {} is not closed", settlement.id),
            });
        }
        if let Some(stored) = self.settlements.get(&settlement.id) {
            ensure_company(company_id, stored.company_id)?;
            if stored.status() == SettlementStatus::Closed {
                return Err(LedgerError::SettlementClosed { id: settlement.id });
            }
        }

        for id in &commit.line_ids {
            let line = self.line(company_id, *id)?;
            if let Some(other) = line.settlement_id() {
                if other != settlement.id {
                    return Err(LedgerError::InconsistentState {
                        message: format!("sale line {} was settled by settlement {}", id, other),
                    });
                }
            }
        }
        for id in &commit.expense_ids {
            let expense = self.expense(company_id, *id)?;
            if let ExpenseStatus::Used { settlement_id } = expense.status {
                if settlement_id != settlement.id {
                    return Err(LedgerError::InconsistentState {
                        message: format!("expense {} was used by settlement {}", id, settlement_id),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_reversal(&self, company_id: CompanyId, reversal: &SettlementReversal) -> Result<()> {
        let settlement_id = reversal.settlement.id;
        ensure_company(company_id, reversal.settlement.company_id)?;
        let stored = self
            .settlements
            .get(&settlement_id)
            .filter(|s| s.company_id == company_id)
            .ok_or_else(|| LedgerError::NotFound {
                entity: "settlement",
                id: settlement_id.to_string(),
            })?;
        if stored.status() != SettlementStatus::Closed {
            return Err(LedgerError::SettlementNotClosed {
                id: settlement_id,
                status: stored.status(),
            });
        }

        for id in &reversal.line_ids {
            let line = self.line(company_id, *id)?;
            if line.settlement_id() != Some(settlement_id) {
                return Err(LedgerError::InconsistentState {
                    message: format!("sale line {} is not settled by {}", id, settlement_id),
                });
            }
        }
        for id in &reversal.expense_ids {
            let expense = self.expense(company_id, *id)?;
            if expense.status != (ExpenseStatus::Used { settlement_id }) {
                return Err(LedgerError::InconsistentState {
                    message: format!("expense {} is not used by {}", id, settlement_id),
                });
            }
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn insert_line(&self, company_id: CompanyId, line: SaleLine) -> Result<()> {
        ensure_company(company_id, line.company_id)?;
        let mut tables = self.lock()?;
        if tables.lines.contains_key(&line.id) {
            return Err(LedgerError::DuplicateSaleLine { id: line.id });
        }
        tables.lines.insert(line.id, line);
        Ok(())
    }

    fn insert_expense(&self, company_id: CompanyId, expense: Expense) -> Result<()> {
        ensure_company(company_id, expense.company_id)?;
        self.lock()?.expenses.insert(expense.id, expense);
        Ok(())
    }

    fn insert_loan(&self, company_id: CompanyId, mut loan: LoanOrCreditLine) -> Result<()> {
        ensure_company(company_id, loan.company_id)?;
        loan.events.clear();
        self.lock()?.loans.insert(loan.id, loan);
        Ok(())
    }

    fn save_settlement(&self, company_id: CompanyId, settlement: &Settlement) -> Result<()> {
        ensure_company(company_id, settlement.company_id)?;
        if !settlement.is_open() {
            return Err(LedgerError::SettlementClosed { id: settlement.id });
        }
        let mut tables = self.lock()?;
        if let Some(stored) = tables.settlements.get(&settlement.id) {
            if !stored.is_open() {
                return Err(LedgerError::SettlementClosed { id: settlement.id });
            }
        }
        let mut snapshot = settlement.clone();
        snapshot.events.clear();
        tables.settlements.insert(snapshot.id, snapshot);
        Ok(())
    }

    fn lines(&self, company_id: CompanyId) -> Result<Vec<SaleLine>> {
        let tables = self.lock()?;
        let mut lines: Vec<SaleLine> = tables
            .lines
            .values()
            .filter(|l| l.company_id == company_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| (l.order_date, l.created_at));
        Ok(lines)
    }

    fn unsettled_lines(&self, company_id: CompanyId, range: Option<DateRange>) -> Result<Vec<SaleLine>> {
        Ok(self
            .lines(company_id)?
            .into_iter()
            .filter(|l| !l.is_settled())
            .filter(|l| range.map_or(true, |r| r.contains(l.order_date)))
            .collect())
    }

    fn pending_expenses(&self, company_id: CompanyId) -> Result<Vec<Expense>> {
        let tables = self.lock()?;
        Ok(tables
            .expenses
            .values()
            .filter(|e| e.company_id == company_id && e.is_pending())
            .cloned()
            .collect())
    }

    fn commit_settlement(&self, company_id: CompanyId, commit: &SettlementCommit) -> Result<()> {
        let mut tables = self.lock()?;
        tables.check_commit(company_id, commit)?;

        let settlement_id = commit.settlement.id;
        for id in &commit.line_ids {
            if let Some(line) = tables.lines.get_mut(id) {
                line.mark_settled(settlement_id)?;
            }
        }
        for id in &commit.expense_ids {
            if let Some(expense) = tables.expenses.get_mut(id) {
                expense.mark_used(settlement_id)?;
            }
        }
        tables
            .settlements
            .insert(settlement_id, commit.settlement.clone());

        tracing::debug!(
            company_id = %company_id,
            settlement_id = %settlement_id,
            lines = commit.line_ids.len(),
            "settlement committed"
        );
        Ok(())
    }

    fn revert_settlement(&self, company_id: CompanyId, reversal: &SettlementReversal) -> Result<()> {
        let mut tables = self.lock()?;
        tables.check_reversal(company_id, reversal)?;

        let settlement_id = reversal.settlement.id;
        for id in &reversal.line_ids {
            if let Some(line) = tables.lines.get_mut(id) {
                line.clear_settlement(settlement_id)?;
            }
        }
        for id in &reversal.expense_ids {
            if let Some(expense) = tables.expenses.get_mut(id) {
                expense.release(settlement_id)?;
            }
        }
        tables
            .settlements
            .insert(settlement_id, reversal.settlement.clone());

        tracing::debug!(
            company_id = %company_id,
            settlement_id = %settlement_id,
            "settlement reverted"
        );
        Ok(())
    }

    fn settlement(&self, company_id: CompanyId, id: SettlementId) -> Result<Settlement> {
        self.lock()?
            .settlements
            .get(&id)
            .filter(|s| s.company_id == company_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                entity: "settlement",
                id: id.to_string(),
            })
    }

    fn settlements(&self, company_id: CompanyId) -> Result<Vec<Settlement>> {
        let tables = self.lock()?;
        let mut settlements: Vec<Settlement> = tables
            .settlements
            .values()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        settlements.sort_by_key(|s| (s.date(), s.created_at));
        Ok(settlements)
    }

    fn loan(&self, company_id: CompanyId, id: LoanId) -> Result<LoanOrCreditLine> {
        self.lock()?
            .loans
            .get(&id)
            .filter(|l| l.company_id == company_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                entity: "loan",
                id: id.to_string(),
            })
    }

    fn loans(&self, company_id: CompanyId) -> Result<Vec<LoanOrCreditLine>> {
        let tables = self.lock()?;
        let mut loans: Vec<LoanOrCreditLine> = tables
            .loans
            .values()
            .filter(|l| l.company_id == company_id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| (l.start_date, l.created_at));
        Ok(loans)
    }

    fn append_payment(&self, company_id: CompanyId, loan_id: LoanId, payment: Payment) -> Result<()> {
        let mut tables = self.lock()?;
        let loan = tables
            .loans
            .get_mut(&loan_id)
            .filter(|l| l.company_id == company_id)
            .ok_or_else(|| LedgerError::NotFound {
                entity: "loan",
                id: loan_id.to_string(),
            })?;
        loan.record_payment(payment)?;
        loan.events.clear();
        Ok(())
    }
}

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::sales::SaleLine;
use crate::types::{
    BankReceipt, CompanyId, ExpenseId, SaleLineId, SettlementId, SettlementStatus,
};

use super::allocation::{self, Allocation};
use super::distributor::{Distribution, DistributionResult, SettlementDistributor, SettlementTotals};
use super::expense::Expense;

/// a settlement (acerto): sale lines, expenses and allocations for one date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub company_id: CompanyId,
    date: NaiveDate,
    pub title: Option<String>,
    pub notes: Option<String>,
    line_ids: Vec<SaleLineId>,
    expenses: Vec<Expense>,
    allocations: Vec<Allocation>,
    totals: SettlementTotals,
    distributions: Vec<Distribution>,
    pub bank_receipt: Option<BankReceipt>,
    status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub events: EventStore,
}

/// metadata edits allowed in any state; `Some(None)` clears a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementMetadataPatch {
    pub title: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub bank_receipt: Option<Option<BankReceipt>>,
    pub date: Option<NaiveDate>,
}

/// writes that must commit together when a settlement closes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCommit {
    pub settlement: Settlement,
    pub line_ids: Vec<SaleLineId>,
    pub expense_ids: Vec<ExpenseId>,
}

/// writes that must commit together when a settlement is cancelled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReversal {
    pub settlement: Settlement,
    pub line_ids: Vec<SaleLineId>,
    pub expense_ids: Vec<ExpenseId>,
}

impl Settlement {
    /// open an empty settlement
    pub fn open(company_id: CompanyId, date: NaiveDate, time_provider: &SafeTimeProvider) -> Self {
        let id = Uuid::new_v4();
        let now = time_provider.now();
        let mut events = EventStore::new();
        events.emit(Event::SettlementOpened {
            settlement_id: id,
            company_id,
            date,
            timestamp: now,
        });

        Self {
            id,
            company_id,
            date,
            title: None,
            notes: None,
            line_ids: Vec::new(),
            expenses: Vec::new(),
            allocations: Vec::new(),
            totals: SettlementTotals::default(),
            distributions: Vec::new(),
            bank_receipt: None,
            status: SettlementStatus::Open,
            created_at: now,
            events,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn status(&self) -> SettlementStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == SettlementStatus::Open
    }

    pub fn line_ids(&self) -> &[SaleLineId] {
        &self.line_ids
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn totals(&self) -> &SettlementTotals {
        &self.totals
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.is_open() {
            return Err(LedgerError::SettlementClosed { id: self.id });
        }
        Ok(())
    }

    fn ensure_company(&self, company_id: CompanyId) -> Result<()> {
        if company_id != self.company_id {
            return Err(LedgerError::CompanyMismatch {
                expected: self.company_id,
                found: company_id,
            });
        }
        Ok(())
    }

    /// add an unsettled sale line of the same company
    pub fn include_line(&mut self, line: &SaleLine) -> Result<()> {
        self.ensure_open()?;
        self.ensure_company(line.company_id)?;
        if let Some(settlement_id) = line.settlement_id() {
            return Err(LedgerError::SaleLineSettled {
                id: line.id,
                settlement_id,
            });
        }
        if self.line_ids.contains(&line.id) {
            return Err(LedgerError::DuplicateSaleLine { id: line.id });
        }

        self.line_ids.push(line.id);
        self.events.emit(Event::SaleLineIncluded {
            settlement_id: self.id,
            line_id: line.id,
        });
        Ok(())
    }

    pub fn remove_line(&mut self, line_id: SaleLineId) -> Result<()> {
        self.ensure_open()?;
        let position = self
            .line_ids
            .iter()
            .position(|id| *id == line_id)
            .ok_or(LedgerError::SaleLineNotFound { id: line_id })?;

        self.line_ids.remove(position);
        self.events.emit(Event::SaleLineRemoved {
            settlement_id: self.id,
            line_id,
        });
        Ok(())
    }

    /// attach a pending expense of the same company
    pub fn add_expense(&mut self, expense: Expense) -> Result<()> {
        self.ensure_open()?;
        self.ensure_company(expense.company_id)?;
        expense.ensure_pending()?;
        if self.expenses.iter().any(|e| e.id == expense.id) {
            return Err(LedgerError::InconsistentState {
                message: format!("expense {} already attached to settlement {}", expense.id, self.id),
            });
        }

        self.events.emit(Event::ExpenseAttached {
            settlement_id: self.id,
            expense_id: expense.id,
            amount: expense.amount(),
        });
        self.expenses.push(expense);
        Ok(())
    }

    pub fn remove_expense(&mut self, expense_id: ExpenseId) -> Result<Expense> {
        self.ensure_open()?;
        let position = self
            .expenses
            .iter()
            .position(|e| e.id == expense_id)
            .ok_or(LedgerError::ExpenseNotFound { id: expense_id })?;

        self.events.emit(Event::ExpenseDetached {
            settlement_id: self.id,
            expense_id,
        });
        Ok(self.expenses.remove(position))
    }

    /// replace the allocations after checking them against `config`
    pub fn set_allocations(&mut self, allocations: Vec<Allocation>, config: &LedgerConfig) -> Result<()> {
        self.ensure_open()?;
        allocation::validate(&allocations, config.allocation_policy)?;
        self.allocations = allocations;
        Ok(())
    }

    /// Rerun the distribution over the included lines.
    ///
    /// `lines` may hold more lines than the settlement includes; every
    /// included id must be present and not settled elsewhere.
    pub fn recompute(&mut self, lines: &[SaleLine]) -> Result<&SettlementTotals> {
        self.ensure_open()?;
        let by_id: HashMap<SaleLineId, &SaleLine> = lines.iter().map(|l| (l.id, l)).collect();

        let mut included = Vec::with_capacity(self.line_ids.len());
        for line_id in &self.line_ids {
            let line = by_id
                .get(line_id)
                .ok_or(LedgerError::SaleLineNotFound { id: *line_id })?;
            match line.settlement_id() {
                Some(settlement_id) if settlement_id != self.id => {
                    return Err(LedgerError::SaleLineSettled {
                        id: line.id,
                        settlement_id,
                    });
                }
                _ => included.push(*line),
            }
        }

        let DistributionResult {
            totals,
            distributions,
        } = SettlementDistributor::distribute(included, &self.expenses, &self.allocations);

        self.events.emit(Event::SettlementDistributed {
            settlement_id: self.id,
            net_distributable: totals.net_distributable,
            participants: distributions.len(),
        });
        self.totals = totals;
        self.distributions = distributions;
        Ok(&self.totals)
    }

    /// Close the settlement.
    ///
    /// Returns the unit of work the store must apply in one transaction:
    /// the closed settlement, the lines to mark settled and the expenses to
    /// mark used. On error the settlement stays open.
    ///
    /// The aggregate is Closed as soon as this returns. If the store then
    /// rejects the commit, call [`Settlement::cancel`] and drop the reversal
    /// to get back an open settlement whose expenses are pending.
    pub fn close(
        &mut self,
        lines: &[SaleLine],
        config: &LedgerConfig,
        time_provider: &SafeTimeProvider,
    ) -> Result<SettlementCommit> {
        self.ensure_open()?;
        allocation::validate(&self.allocations, config.allocation_policy)?;
        self.recompute(lines)?;

        let now = time_provider.now();
        for expense in &mut self.expenses {
            expense.mark_used(self.id)?;
        }
        self.status = SettlementStatus::Closed;

        self.events.emit(Event::StatusChanged {
            settlement_id: self.id,
            old_status: SettlementStatus::Open,
            new_status: SettlementStatus::Closed,
            timestamp: now,
        });
        self.events.emit(Event::SettlementClosed {
            settlement_id: self.id,
            line_count: self.line_ids.len(),
            net_distributable: self.totals.net_distributable,
            timestamp: now,
        });
        tracing::info!(
            settlement_id = %self.id,
            lines = self.line_ids.len(),
            net_distributable = %self.totals.net_distributable,
            "settlement closed"
        );

        let mut snapshot = self.clone();
        snapshot.events.clear();
        Ok(SettlementCommit {
            line_ids: self.line_ids.clone(),
            expense_ids: self.expenses.iter().map(|e| e.id).collect(),
            settlement: snapshot,
        })
    }

    /// Reopen a closed settlement.
    ///
    /// The distribution records are discarded and the returned reversal
    /// lists the lines to return to the unsettled pool and the expenses to
    /// return to pending.
    pub fn cancel(&mut self, time_provider: &SafeTimeProvider) -> Result<SettlementReversal> {
        if self.status != SettlementStatus::Closed {
            return Err(LedgerError::SettlementNotClosed {
                id: self.id,
                status: self.status,
            });
        }

        let now = time_provider.now();
        for expense in &mut self.expenses {
            expense.release(self.id)?;
        }
        self.status = SettlementStatus::Open;
        self.totals = SettlementTotals::default();
        self.distributions.clear();

        self.events.emit(Event::StatusChanged {
            settlement_id: self.id,
            old_status: SettlementStatus::Closed,
            new_status: SettlementStatus::Open,
            timestamp: now,
        });
        self.events.emit(Event::SettlementCancelled {
            settlement_id: self.id,
            released_lines: self.line_ids.len(),
            timestamp: now,
        });
        tracing::info!(settlement_id = %self.id, "settlement cancelled");

        let mut snapshot = self.clone();
        snapshot.events.clear();
        Ok(SettlementReversal {
            line_ids: self.line_ids.clone(),
            expense_ids: self.expenses.iter().map(|e| e.id).collect(),
            settlement: snapshot,
        })
    }

    pub fn update_metadata(&mut self, patch: SettlementMetadataPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(bank_receipt) = patch.bank_receipt {
            self.bank_receipt = bank_receipt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AllocationPolicy;
    use crate::decimal::{Money, Rate};
    use crate::sales::SaleLineInput;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap(),
        ))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(company: CompanyId, value: i64, cost: i64) -> SaleLine {
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

    struct Fixture {
        company: CompanyId,
        a: Uuid,
        b: Uuid,
        lines: Vec<SaleLine>,
        settlement: Settlement,
        config: LedgerConfig,
    }

    // lines with profit 370 and 130, shared 50, individual 20 for A, 60/40
    fn fixture() -> Fixture {
        let company = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let config = LedgerConfig::for_company(company);
        let time = clock();

        let lines = vec![sale(company, 1_000, 500), sale(company, 500, 305)];
        let mut settlement = Settlement::open(company, date(2024, 6, 30), &time).with_title("Junho");
        for line in &lines {
            settlement.include_line(line).unwrap();
        }
        settlement
            .add_expense(Expense::shared(company, "aluguel", Money::from_major(50)).unwrap())
            .unwrap();
        settlement
            .add_expense(Expense::individual(company, "combustível", Money::from_major(20), a).unwrap())
            .unwrap();
        settlement
            .set_allocations(
                vec![
                    Allocation::new(a, Rate::from_percentage(60)),
                    Allocation::new(b, Rate::from_percentage(40)),
                ],
                &config,
            )
            .unwrap();

        Fixture {
            company,
            a,
            b,
            lines,
            settlement,
            config,
        }
    }

    #[test]
    fn test_fixture_profits() {
        let f = fixture();
        assert_eq!(f.lines[0].profit_amount(), Money::from_major(370));
        // 500: fee 15, tax 50, cost 370 -> profit 130
        assert_eq!(f.lines[1].profit_amount(), Money::from_major(130));
    }

    #[test]
    fn test_close_produces_commit() {
        let mut f = fixture();
        let commit = f.settlement.close(&f.lines, &f.config, &clock()).unwrap();

        assert_eq!(f.settlement.status(), SettlementStatus::Closed);
        assert_eq!(commit.line_ids, vec![f.lines[0].id, f.lines[1].id]);
        assert_eq!(commit.expense_ids.len(), 2);
        assert_eq!(commit.settlement.status(), SettlementStatus::Closed);
        assert!(commit.settlement.events.events().is_empty());

        let totals = f.settlement.totals();
        assert_eq!(totals.net_distributable, Money::from_decimal(dec!(430.00)));
        let payouts: Vec<_> = f
            .settlement
            .distributions()
            .iter()
            .map(|d| (d.participant_id, d.net_payout))
            .collect();
        assert_eq!(
            payouts,
            vec![(f.a, Money::from_major(238)), (f.b, Money::from_major(172))]
        );
        assert!(f
            .settlement
            .expenses()
            .iter()
            .all(|e| e.status == crate::types::ExpenseStatus::Used { settlement_id: f.settlement.id }));
    }

    #[test]
    fn test_closed_settlement_rejects_mutation() {
        let mut f = fixture();
        f.settlement.close(&f.lines, &f.config, &clock()).unwrap();

        let extra = sale(f.company, 100, 10);
        assert!(matches!(
            f.settlement.include_line(&extra),
            Err(LedgerError::SettlementClosed { .. })
        ));
        assert!(matches!(
            f.settlement.remove_line(f.lines[0].id),
            Err(LedgerError::SettlementClosed { .. })
        ));
        assert!(matches!(
            f.settlement.close(&f.lines, &f.config, &clock()),
            Err(LedgerError::SettlementClosed { .. })
        ));

        // metadata stays editable
        f.settlement.update_metadata(SettlementMetadataPatch {
            notes: Some(Some("pago via pix".to_string())),
            date: Some(date(2024, 7, 1)),
            ..Default::default()
        });
        assert_eq!(f.settlement.notes.as_deref(), Some("pago via pix"));
        assert_eq!(f.settlement.date(), date(2024, 7, 1));
    }

    #[test]
    fn test_include_rules() {
        let mut f = fixture();

        assert!(matches!(
            f.settlement.include_line(&f.lines[0]),
            Err(LedgerError::DuplicateSaleLine { .. })
        ));

        let foreign = sale(Uuid::new_v4(), 100, 10);
        assert!(matches!(
            f.settlement.include_line(&foreign),
            Err(LedgerError::CompanyMismatch { .. })
        ));

        let mut settled = sale(f.company, 100, 10);
        settled.mark_settled(Uuid::new_v4()).unwrap();
        assert!(matches!(
            f.settlement.include_line(&settled),
            Err(LedgerError::SaleLineSettled { .. })
        ));
    }

    #[test]
    fn test_recompute_after_removing_line() {
        let mut f = fixture();
        f.settlement.remove_line(f.lines[1].id).unwrap();
        let totals = *f.settlement.recompute(&f.lines).unwrap();

        // 370 - 50 - 20
        assert_eq!(totals.net_distributable, Money::from_major(300));
        assert!(matches!(
            f.settlement.remove_line(f.lines[1].id),
            Err(LedgerError::SaleLineNotFound { .. })
        ));
    }

    #[test]
    fn test_recompute_requires_every_line() {
        let mut f = fixture();
        let only_first = vec![f.lines[0].clone()];
        assert!(matches!(
            f.settlement.recompute(&only_first),
            Err(LedgerError::SaleLineNotFound { .. })
        ));
    }

    #[test]
    fn test_close_checks_allocations() {
        let company = Uuid::new_v4();
        let line = sale(company, 1_000, 500);
        let mut settlement = Settlement::open(company, date(2024, 6, 30), &clock());
        settlement.include_line(&line).unwrap();

        let strict = LedgerConfig::for_company(company);
        let result = settlement.close(std::slice::from_ref(&line), &strict, &clock());
        assert!(matches!(result, Err(LedgerError::AllocationSumMismatch { .. })));
        assert!(settlement.is_open());

        let permissive = strict.with_allocation_policy(AllocationPolicy::Permissive);
        let commit = settlement
            .close(std::slice::from_ref(&line), &permissive, &clock())
            .unwrap();
        assert!(commit.settlement.distributions().is_empty());
        assert_eq!(commit.settlement.totals().total_profit, Money::from_major(370));
    }

    #[test]
    fn test_cancel_reopens_and_clears_distribution() {
        let mut f = fixture();
        f.settlement.close(&f.lines, &f.config, &clock()).unwrap();

        let reversal = f.settlement.cancel(&clock()).unwrap();
        assert!(reversal.settlement.is_open());
        assert_eq!(reversal.line_ids.len(), 2);
        assert_eq!(reversal.expense_ids.len(), 2);
        assert!(f.settlement.is_open());
        assert!(f.settlement.distributions().is_empty());
        assert_eq!(*f.settlement.totals(), SettlementTotals::default());
        assert!(f.settlement.expenses().iter().all(|e| e.is_pending()));

        assert!(matches!(
            f.settlement.cancel(&clock()),
            Err(LedgerError::SettlementNotClosed { .. })
        ));
    }

    #[test]
    fn test_used_expense_cannot_be_attached() {
        let mut f = fixture();
        let mut used = Expense::shared(f.company, "taxa", Money::from_major(5)).unwrap();
        used.mark_used(Uuid::new_v4()).unwrap();
        assert!(matches!(
            f.settlement.add_expense(used),
            Err(LedgerError::ExpenseAlreadyUsed { .. })
        ));

        let shared_id = f.settlement.expenses()[0].id;
        let removed = f.settlement.remove_expense(shared_id).unwrap();
        assert_eq!(removed.amount(), Money::from_major(50));
        let totals = *f.settlement.recompute(&f.lines).unwrap();
        assert_eq!(totals.net_distributable, Money::from_major(480));
    }

    #[test]
    fn test_events_trace_lifecycle() {
        let mut f = fixture();
        f.settlement.close(&f.lines, &f.config, &clock()).unwrap();
        let events = f.settlement.events.take_events();

        assert!(matches!(events.first(), Some(Event::SettlementOpened { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SettlementClosed { line_count: 2, .. })));
    }
}

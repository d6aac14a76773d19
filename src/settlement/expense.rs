use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{CompanyId, ExpenseId, ExpenseKind, ExpenseStatus, ParticipantId, SettlementId};

/// an expense waiting for, or consumed by, a settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub company_id: CompanyId,
    pub description: String,
    amount: Money,
    pub kind: ExpenseKind,
    pub status: ExpenseStatus,
}

/// enumerated update of a pending expense
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub kind: Option<ExpenseKind>,
}

impl Expense {
    /// create a pending expense; the amount must be positive
    pub fn new(
        company_id: CompanyId,
        description: impl Into<String>,
        amount: Money,
        kind: ExpenseKind,
    ) -> Result<Self> {
        validate_amount(amount)?;
        Ok(Self {
            id: Uuid::new_v4(),
            company_id,
            description: description.into(),
            amount,
            kind,
            status: ExpenseStatus::Pending,
        })
    }

    /// rateio shared by every participant
    pub fn shared(company_id: CompanyId, description: impl Into<String>, amount: Money) -> Result<Self> {
        Self::new(company_id, description, amount, ExpenseKind::Shared)
    }

    /// expense borne by one participant
    pub fn individual(
        company_id: CompanyId,
        description: impl Into<String>,
        amount: Money,
        participant_id: ParticipantId,
    ) -> Result<Self> {
        Self::new(company_id, description, amount, ExpenseKind::Individual { participant_id })
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.kind, ExpenseKind::Shared)
    }

    pub fn participant_id(&self) -> Option<ParticipantId> {
        match self.kind {
            ExpenseKind::Shared => None,
            ExpenseKind::Individual { participant_id } => Some(participant_id),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ExpenseStatus::Pending
    }

    /// fail unless the expense can still be attached to a settlement
    pub fn ensure_pending(&self) -> Result<()> {
        match self.status {
            ExpenseStatus::Pending => Ok(()),
            ExpenseStatus::Used { settlement_id } => Err(LedgerError::ExpenseAlreadyUsed {
                id: self.id,
                settlement_id,
            }),
        }
    }

    pub fn mark_used(&mut self, settlement_id: SettlementId) -> Result<()> {
        match self.status {
            ExpenseStatus::Used { settlement_id: existing } if existing != settlement_id => {
                Err(LedgerError::ExpenseAlreadyUsed {
                    id: self.id,
                    settlement_id: existing,
                })
            }
            _ => {
                self.status = ExpenseStatus::Used { settlement_id };
                Ok(())
            }
        }
    }

    /// return to pending; the expense must be used by `settlement_id`
    pub fn release(&mut self, settlement_id: SettlementId) -> Result<()> {
        if self.status != (ExpenseStatus::Used { settlement_id }) {
            return Err(LedgerError::InconsistentState {
                message: format!("expense {} is not used by settlement {}", self.id, settlement_id),
            });
        }
        self.status = ExpenseStatus::Pending;
        Ok(())
    }

    /// edit a pending expense
    pub fn apply_patch(&mut self, patch: ExpensePatch) -> Result<()> {
        self.ensure_pending()?;
        if let Some(amount) = patch.amount {
            validate_amount(amount)?;
            self.amount = amount;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        Ok(())
    }
}

fn validate_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        let company = Uuid::new_v4();
        assert!(matches!(
            Expense::shared(company, "frete", Money::ZERO),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            Expense::shared(company, "frete", Money::from_major(-3)),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(Expense::shared(company, "frete", Money::CENT).is_ok());
    }

    #[test]
    fn test_kind_accessors() {
        let company = Uuid::new_v4();
        let participant = Uuid::new_v4();
        let shared = Expense::shared(company, "aluguel", Money::from_major(50)).unwrap();
        let individual =
            Expense::individual(company, "combustível", Money::from_major(20), participant).unwrap();

        assert!(shared.is_shared());
        assert_eq!(shared.participant_id(), None);
        assert!(!individual.is_shared());
        assert_eq!(individual.participant_id(), Some(participant));
    }

    #[test]
    fn test_use_and_release() {
        let mut expense = Expense::shared(Uuid::new_v4(), "taxa", Money::from_major(10)).unwrap();
        let settlement = Uuid::new_v4();

        expense.mark_used(settlement).unwrap();
        assert!(!expense.is_pending());
        assert!(matches!(
            expense.ensure_pending(),
            Err(LedgerError::ExpenseAlreadyUsed { .. })
        ));
        assert!(matches!(
            expense.mark_used(Uuid::new_v4()),
            Err(LedgerError::ExpenseAlreadyUsed { .. })
        ));
        assert!(matches!(
            expense.release(Uuid::new_v4()),
            Err(LedgerError::InconsistentState { .. })
        ));

        expense.release(settlement).unwrap();
        assert!(expense.is_pending());
    }

    #[test]
    fn test_patch_only_while_pending() {
        let mut expense = Expense::shared(Uuid::new_v4(), "taxa", Money::from_major(10)).unwrap();
        expense
            .apply_patch(ExpensePatch {
                amount: Some(Money::from_major(12)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(expense.amount(), Money::from_major(12));

        assert!(expense
            .apply_patch(ExpensePatch {
                amount: Some(Money::ZERO),
                ..Default::default()
            })
            .is_err());

        expense.mark_used(Uuid::new_v4()).unwrap();
        assert!(expense
            .apply_patch(ExpensePatch {
                description: Some("outra".to_string()),
                ..Default::default()
            })
            .is_err());
    }
}

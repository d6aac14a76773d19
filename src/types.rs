use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// tenant (company) identifier; every ledger call is scoped by one
pub type CompanyId = Uuid;

/// unique identifier for a sale line
pub type SaleLineId = Uuid;

/// unique identifier for a settlement participant
pub type ParticipantId = Uuid;

/// unique identifier for a settlement (acerto)
pub type SettlementId = Uuid;

/// unique identifier for an expense
pub type ExpenseId = Uuid;

/// unique identifier for a loan or credit sale
pub type LoanId = Uuid;

/// unique identifier for a partial payment
pub type PaymentId = Uuid;

/// unique identifier for a client
pub type ClientId = Uuid;

/// unique identifier for a vale movement
pub type MovementId = Uuid;

/// payment status of a sale line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// not yet received from the client
    #[default]
    Pending,
    /// received
    Paid,
}

/// settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SettlementStatus {
    /// lines and expenses may still be added or removed
    #[default]
    Open,
    /// distribution fixed, lines marked as settled
    Closed,
}

/// how an expense is borne
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseKind {
    /// rateio: taken from the common pool before allocation
    Shared,
    /// charged against one participant's share only
    Individual { participant_id: ParticipantId },
}

/// whether an expense is still waiting for a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Used { settlement_id: SettlementId },
}

/// kind of informal business recorded as a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LoanKind {
    /// money lent
    #[default]
    Loan,
    /// goods sold on credit
    CreditSale,
}

/// direction of a vale (store credit) movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValeMovementKind {
    Credit,
    Debit,
}

/// last bank receipt a settlement refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BankReceipt {
    pub name: Option<String>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub bank: Option<String>,
}

/// inclusive date range filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

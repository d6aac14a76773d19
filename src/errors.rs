use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::{
    CompanyId, ExpenseId, LoanId, ParticipantId, PaymentId, SaleLineId, SettlementId,
    SettlementStatus,
};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid allocation for participant {participant_id}: share {share}")]
    InvalidAllocation {
        participant_id: ParticipantId,
        share: Rate,
    },

    #[error("allocation shares must sum to 100%, got {total}")]
    AllocationSumMismatch {
        total: Rate,
    },

    #[error("participant {participant_id} allocated more than once")]
    DuplicateParticipant {
        participant_id: ParticipantId,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("settlement {id} is closed")]
    SettlementClosed {
        id: SettlementId,
    },

    #[error("settlement {id} is not closed: current status is {status:?}")]
    SettlementNotClosed {
        id: SettlementId,
        status: SettlementStatus,
    },

    #[error("sale line {id} already belongs to settlement {settlement_id}")]
    SaleLineSettled {
        id: SaleLineId,
        settlement_id: SettlementId,
    },

    #[error("sale line {id} already included")]
    DuplicateSaleLine {
        id: SaleLineId,
    },

    #[error("sale line not found: {id}")]
    SaleLineNotFound {
        id: SaleLineId,
    },

    #[error("expense {id} already used by settlement {settlement_id}")]
    ExpenseAlreadyUsed {
        id: ExpenseId,
        settlement_id: SettlementId,
    },

    #[error("expense not found: {id}")]
    ExpenseNotFound {
        id: ExpenseId,
    },

    #[error("payment {payment_id} not found on loan {loan_id}")]
    PaymentNotFound {
        loan_id: LoanId,
        payment_id: PaymentId,
    },

    #[error("payment dated {date} precedes loan start {start}")]
    PaymentBeforeStart {
        date: NaiveDate,
        start: NaiveDate,
    },

    #[error("company mismatch: expected {expected}, found {found}")]
    CompanyMismatch {
        expected: CompanyId,
        found: CompanyId,
    },

    #[error("inconsistent state: {message}")]
    InconsistentState {
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

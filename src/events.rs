use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    ClientId, CompanyId, ExpenseId, LoanId, PaymentId, SaleLineId, SettlementId, SettlementStatus,
};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // sale line events
    SaleLineRecomputed {
        line_id: SaleLineId,
        profit_amount: Money,
        total_cost: Money,
    },

    // settlement events
    SettlementOpened {
        settlement_id: SettlementId,
        company_id: CompanyId,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    SaleLineIncluded {
        settlement_id: SettlementId,
        line_id: SaleLineId,
    },
    SaleLineRemoved {
        settlement_id: SettlementId,
        line_id: SaleLineId,
    },
    ExpenseAttached {
        settlement_id: SettlementId,
        expense_id: ExpenseId,
        amount: Money,
    },
    ExpenseDetached {
        settlement_id: SettlementId,
        expense_id: ExpenseId,
    },
    SettlementDistributed {
        settlement_id: SettlementId,
        net_distributable: Money,
        participants: usize,
    },
    SettlementClosed {
        settlement_id: SettlementId,
        line_count: usize,
        net_distributable: Money,
        timestamp: DateTime<Utc>,
    },
    SettlementCancelled {
        settlement_id: SettlementId,
        released_lines: usize,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        settlement_id: SettlementId,
        old_status: SettlementStatus,
        new_status: SettlementStatus,
        timestamp: DateTime<Utc>,
    },

    // loan events
    PaymentRecorded {
        loan_id: LoanId,
        payment_id: PaymentId,
        amount: Money,
        date: NaiveDate,
    },
    PaymentRemoved {
        loan_id: LoanId,
        payment_id: PaymentId,
    },

    // vale events
    ValeCredited {
        client_id: ClientId,
        amount: Money,
        balance: Money,
    },
    ValeDebited {
        client_id: ClientId,
        amount: Money,
        balance: Money,
    },
    ValeOverdrawn {
        client_id: ClientId,
        signed_balance: Money,
        masked_amount: Money,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

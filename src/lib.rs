pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod loans;
pub mod reports;
pub mod sales;
pub mod settlement;
pub mod store;
pub mod types;
pub mod vale;

// re-export key types
pub use config::{AllocationPolicy, CompanyDefaults, LedgerConfig, ValeBalancePolicy};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use interest::{AccrualEngine, AccrualResult};
pub use loans::{LoanBuilder, LoanOrCreditLine, LoanPatch, Payment, PortfolioTotals};
pub use reports::{DashboardSeries, DashboardTotals, LoanView, MonthlyFigures, SettlementView};
pub use sales::{LineItemCalculator, SaleLine, SaleLineComputed, SaleLineInput, SaleLinePatch};
pub use settlement::{
    Allocation, Distribution, DistributionResult, Expense, ExpensePatch, Participant, Settlement,
    SettlementCommit, SettlementDistributor, SettlementMetadataPatch, SettlementReversal,
    SettlementTotals,
};
pub use store::{LedgerStore, MemoryStore};
pub use types::{
    BankReceipt, ClientId, CompanyId, DateRange, ExpenseId, ExpenseKind, ExpenseStatus, LoanId,
    LoanKind, MovementId, ParticipantId, PaymentId, PaymentStatus, SaleLineId, SettlementId,
    SettlementStatus, ValeMovementKind,
};
pub use vale::{ValeLedger, ValeMovement};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

pub mod allocation;
pub mod distributor;
pub mod expense;
pub mod lifecycle;

pub use allocation::{Allocation, Participant};
pub use distributor::{Distribution, DistributionResult, SettlementDistributor, SettlementTotals};
pub use expense::{Expense, ExpensePatch};
pub use lifecycle::{Settlement, SettlementCommit, SettlementMetadataPatch, SettlementReversal};

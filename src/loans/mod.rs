pub mod loan;
pub mod portfolio;

pub use loan::{LoanBuilder, LoanOrCreditLine, LoanPatch, Payment};
pub use portfolio::{counterparties, totals, totals_now, PortfolioTotals};

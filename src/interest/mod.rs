pub mod accrual;
pub mod calendar;
pub mod compound;

pub use accrual::{AccrualEngine, AccrualResult};
pub use calendar::{months_between_iso, parse_iso_date, whole_months_between};
pub use compound::{compound_factor, compound_monthly, effective_rate};

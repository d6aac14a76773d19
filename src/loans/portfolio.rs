use std::collections::BTreeSet;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;

use super::loan::LoanOrCreditLine;

/// aggregate position of a set of loans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PortfolioTotals {
    pub total_principal: Money,
    /// payments, capped at each loan's principal
    pub principal_paid: Money,
    pub pending_interest: Money,
    pub open_balance_with_interest: Money,
}

impl PortfolioTotals {
    pub fn rounded(&self) -> Self {
        Self {
            total_principal: self.total_principal.round_cents(),
            principal_paid: self.principal_paid.round_cents(),
            pending_interest: self.pending_interest.round_cents(),
            open_balance_with_interest: self.open_balance_with_interest.round_cents(),
        }
    }
}

/// totals of `loans` as of a date
pub fn totals<'a, I>(loans: I, as_of: NaiveDate) -> PortfolioTotals
where
    I: IntoIterator<Item = &'a LoanOrCreditLine>,
{
    let mut totals = PortfolioTotals::default();
    for loan in loans {
        totals.total_principal += loan.principal();
        totals.principal_paid += loan.principal().min(loan.total_paid());

        let accrual = loan.accrue(as_of);
        if accrual.balance_with_interest.is_positive() {
            totals.open_balance_with_interest += accrual.balance_with_interest;
            totals.pending_interest += accrual.pending_interest();
        }
    }
    totals
}

/// totals as of the provider's current date
pub fn totals_now<'a, I>(loans: I, time_provider: &SafeTimeProvider) -> PortfolioTotals
where
    I: IntoIterator<Item = &'a LoanOrCreditLine>,
{
    totals(loans, time_provider.now().date_naive())
}

/// unique counterparty names, sorted
pub fn counterparties<'a, I>(loans: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a LoanOrCreditLine>,
{
    loans
        .into_iter()
        .map(|loan| loan.counterparty.trim())
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

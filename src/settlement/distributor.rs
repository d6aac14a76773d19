use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::sales::SaleLine;
use crate::types::ParticipantId;

use super::allocation::Allocation;
use super::expense::Expense;

/// pooled totals of one settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SettlementTotals {
    pub total_profit: Money,
    pub total_shared_expenses: Money,
    pub total_individual_expenses: Money,
    pub net_distributable: Money,
}

/// one participant's payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub participant_id: ParticipantId,
    pub share: Rate,
    pub gross_share: Money,
    pub individual_deduction: Money,
    /// may be negative: the participant owes money back
    pub net_payout: Money,
}

/// result of distributing one settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DistributionResult {
    pub totals: SettlementTotals,
    pub distributions: Vec<Distribution>,
}

impl DistributionResult {
    pub fn total_gross(&self) -> Money {
        self.distributions.iter().map(|d| d.gross_share).sum()
    }

    pub fn total_net(&self) -> Money {
        self.distributions.iter().map(|d| d.net_payout).sum()
    }

    pub fn for_participant(&self, participant_id: ParticipantId) -> Option<&Distribution> {
        self.distributions
            .iter()
            .find(|d| d.participant_id == participant_id)
    }
}

/// splits settlement profit among participants
pub struct SettlementDistributor;

impl SettlementDistributor {
    /// distribute the profit of `lines` net of `expenses` according to `allocations`
    pub fn distribute<'a, I>(lines: I, expenses: &[Expense], allocations: &[Allocation]) -> DistributionResult
    where
        I: IntoIterator<Item = &'a SaleLine>,
    {
        Self::distribute_profits(
            lines.into_iter().map(|line| line.profit_amount()),
            expenses,
            allocations,
        )
    }

    /// Distribute a set of line profits.
    ///
    /// Individual expenses shrink the common pool once and are then charged
    /// again against the owning participant's gross share. Both steps are
    /// part of the settlement arithmetic and must not be collapsed.
    ///
    /// Shares are taken as given: they are not normalized and not required
    /// to sum to 100%. Rows are independent and keep the input order.
    pub fn distribute_profits<I>(profits: I, expenses: &[Expense], allocations: &[Allocation]) -> DistributionResult
    where
        I: IntoIterator<Item = Money>,
    {
        let total_profit = profits.into_iter().sum::<Money>().round_cents();

        let mut shared = Money::ZERO;
        let mut individual = Money::ZERO;
        let mut individual_by_participant: HashMap<ParticipantId, Money> = HashMap::new();
        for expense in expenses {
            match expense.participant_id() {
                None => shared += expense.amount(),
                Some(participant_id) => {
                    individual += expense.amount();
                    *individual_by_participant
                        .entry(participant_id)
                        .or_insert(Money::ZERO) += expense.amount();
                }
            }
        }

        let total_shared_expenses = shared.round_cents();
        let net_distributable = (total_profit - total_shared_expenses - individual).round_cents();

        let distributions = allocations
            .iter()
            .map(|allocation| {
                let gross_share = net_distributable.percentage(allocation.share).round_cents();
                let individual_deduction = individual_by_participant
                    .get(&allocation.participant_id)
                    .copied()
                    .unwrap_or(Money::ZERO);

                Distribution {
                    participant_id: allocation.participant_id,
                    share: allocation.share,
                    gross_share,
                    individual_deduction,
                    net_payout: (gross_share - individual_deduction).round_cents(),
                }
            })
            .collect::<Vec<_>>();

        let totals = SettlementTotals {
            total_profit,
            total_shared_expenses,
            total_individual_expenses: individual.round_cents(),
            net_distributable,
        };

        tracing::debug!(
            total_profit = %totals.total_profit,
            net_distributable = %totals.net_distributable,
            participants = distributions.len(),
            "settlement distributed"
        );

        DistributionResult {
            totals,
            distributions,
        }
    }
}

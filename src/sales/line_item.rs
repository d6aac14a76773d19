use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::CompanyDefaults;
use crate::decimal::{Money, Rate};

/// financial inputs of one sale line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SaleLineInput {
    pub sale_value: Money,
    pub capital_rate: Rate,
    pub tax_rate: Rate,
    pub merchandise_cost: Money,
}

impl SaleLineInput {
    pub fn new(sale_value: Money, capital_rate: Rate, tax_rate: Rate, merchandise_cost: Money) -> Self {
        Self {
            sale_value,
            capital_rate,
            tax_rate,
            merchandise_cost,
        }
    }

    /// build an input, taking absent rates from the company defaults (or zero)
    pub fn with_defaults(
        sale_value: Money,
        capital_rate: Option<Rate>,
        tax_rate: Option<Rate>,
        merchandise_cost: Money,
        defaults: &CompanyDefaults,
    ) -> Self {
        Self {
            sale_value,
            capital_rate: capital_rate.or(defaults.capital_rate).unwrap_or(Rate::ZERO),
            tax_rate: tax_rate.or(defaults.tax_rate).unwrap_or(Rate::ZERO),
            merchandise_cost,
        }
    }
}

/// derived figures of one sale line, every field rounded to cents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SaleLineComputed {
    pub sale_value: Money,
    pub capital_rate: Rate,
    pub capital_fee_amount: Money,
    pub tax_rate: Rate,
    pub tax_amount: Money,
    pub merchandise_cost: Money,
    pub total_cost: Money,
    pub profit_amount: Money,
    /// percentage points, rounded to 2 decimals
    pub profit_percent: Decimal,
}

/// costing of a single sale line
pub struct LineItemCalculator;

impl LineItemCalculator {
    /// Derive fee, tax, cost and profit for one sale line.
    ///
    /// Each derived amount is rounded to cents before it feeds the next one:
    /// the fee and the tax are rounded independently, then summed into the
    /// total cost, then profit is taken from that. Rounding only the final
    /// figure gives different cents and is not equivalent.
    ///
    /// Total over its inputs: negative values propagate arithmetically and
    /// a zero sale value yields a zero profit percent.
    pub fn compute(
        sale_value: Money,
        capital_rate: Rate,
        tax_rate: Rate,
        merchandise_cost: Money,
    ) -> SaleLineComputed {
        let capital_fee_amount = sale_value.percentage(capital_rate).round_cents();
        let tax_amount = sale_value.percentage(tax_rate).round_cents();
        let total_cost = (merchandise_cost + capital_fee_amount + tax_amount).round_cents();
        let profit_amount = (sale_value - total_cost).round_cents();
        let profit_percent = profit_percent(profit_amount, sale_value);

        SaleLineComputed {
            sale_value,
            capital_rate,
            capital_fee_amount,
            tax_rate,
            tax_amount,
            merchandise_cost,
            total_cost,
            profit_amount,
            profit_percent,
        }
    }

    pub fn compute_input(input: &SaleLineInput) -> SaleLineComputed {
        Self::compute(
            input.sale_value,
            input.capital_rate,
            input.tax_rate,
            input.merchandise_cost,
        )
    }
}

fn profit_percent(profit_amount: Money, sale_value: Money) -> Decimal {
    if sale_value.is_zero() {
        return Decimal::ZERO;
    }
    let ratio = profit_amount.as_decimal() / sale_value.as_decimal() * Decimal::ONE_HUNDRED;
    Money::from_decimal(ratio).round_cents().as_decimal()
}

use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};

/// `(1 + rate)^months` by iteration; `None` on overflow
pub fn compound_factor(monthly_rate: Rate, months: u32) -> Option<Decimal> {
    let base = Decimal::ONE.checked_add(monthly_rate.as_decimal())?;
    let mut factor = Decimal::ONE;
    for _ in 0..months {
        factor = factor.checked_mul(base)?;
    }
    Some(factor)
}

/// Grow `balance` by `months` of monthly compounding at full precision.
///
/// Saturates at the largest representable amount instead of failing.
pub fn compound_monthly(balance: Money, monthly_rate: Rate, months: u32) -> Money {
    match compound_factor(monthly_rate, months).and_then(|factor| balance.checked_mul(factor)) {
        Some(grown) => grown,
        None => {
            tracing::warn!(
                balance = %balance,
                rate = %monthly_rate,
                months,
                "compounding overflowed, saturating balance"
            );
            Money::from_decimal(Decimal::MAX)
        }
    }
}

/// effective rate of `months` of monthly compounding
pub fn effective_rate(monthly_rate: Rate, months: u32) -> Option<Rate> {
    compound_factor(monthly_rate, months).map(|factor| Rate::from_decimal(factor - Decimal::ONE))
}

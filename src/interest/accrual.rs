use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::loans::{LoanOrCreditLine, Payment};

use super::calendar::whole_months_between;
use super::compound::compound_monthly;

/// interest position of a loan as of a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccrualResult {
    /// whole months walked, including periods with no interest
    pub months_elapsed: u32,
    pub interest_accrued: Money,
    /// outstanding balance with compounded interest, never negative
    pub balance_with_interest: Money,
    /// principal minus all payments, never negative
    pub principal_remaining: Money,
}

impl AccrualResult {
    /// report figures rounded to cents
    pub fn rounded(&self) -> Self {
        Self {
            months_elapsed: self.months_elapsed,
            interest_accrued: self.interest_accrued.round_cents(),
            balance_with_interest: self.balance_with_interest.round_cents(),
            principal_remaining: self.principal_remaining.round_cents(),
        }
    }

    /// part of the open balance that is interest
    pub fn pending_interest(&self) -> Money {
        (self.balance_with_interest - self.principal_remaining).clamp_non_negative()
    }

    pub fn is_settled(&self) -> bool {
        !self.balance_with_interest.is_positive()
    }
}

/// compound interest over an irregular partial-payment schedule
pub struct AccrualEngine;

impl AccrualEngine {
    /// Accrue monthly compound interest on the outstanding balance.
    ///
    /// The balance compounds over the whole months between consecutive
    /// events (start, each payment in date order, `as_of`) and each payment
    /// is then taken off it, floored at zero. Once the balance reaches zero
    /// the remaining payments are ignored.
    ///
    /// A payment dated before the current cursor counts zero months and does
    /// not move the cursor back. A missing or non-positive rate accrues no
    /// interest but months are still counted.
    pub fn accrue(
        principal: Money,
        monthly_rate: Option<Rate>,
        start_date: NaiveDate,
        payments: &[Payment],
        as_of: NaiveDate,
    ) -> AccrualResult {
        let rate = monthly_rate.filter(|r| r.is_positive());

        let mut ordered: Vec<&Payment> = payments.iter().collect();
        ordered.sort_by_key(|p| p.date);

        let mut balance = principal;
        let mut interest = Money::ZERO;
        let mut months_elapsed = 0u32;
        let mut cursor = start_date;

        for payment in ordered {
            if !balance.is_positive() {
                break;
            }
            let months = whole_months_between(cursor, payment.date);
            months_elapsed = months_elapsed.saturating_add(months);
            if let Some(rate) = rate {
                if months > 0 {
                    let before = balance;
                    balance = compound_monthly(balance, rate, months);
                    interest = add_interest(interest, balance - before);
                }
            }
            balance = (balance - payment.amount).clamp_non_negative();
            cursor = cursor.max(payment.date);
        }

        let months = whole_months_between(cursor, as_of);
        months_elapsed = months_elapsed.saturating_add(months);
        if let Some(rate) = rate {
            if months > 0 && balance.is_positive() {
                let before = balance;
                balance = compound_monthly(balance, rate, months);
                interest = add_interest(interest, balance - before);
            }
        }

        let paid: Money = payments.iter().map(|p| p.amount).sum();
        let result = AccrualResult {
            months_elapsed,
            interest_accrued: interest,
            balance_with_interest: balance.clamp_non_negative(),
            principal_remaining: (principal - paid).clamp_non_negative(),
        };

        tracing::debug!(
            principal = %principal,
            months = result.months_elapsed,
            interest = %result.interest_accrued,
            balance = %result.balance_with_interest,
            "interest accrued"
        );
        result
    }

    /// accrue a loan, honouring its interest switch
    pub fn accrue_loan(loan: &LoanOrCreditLine, as_of: NaiveDate) -> AccrualResult {
        let rate = if loan.interest_active {
            loan.monthly_rate
        } else {
            None
        };
        Self::accrue(loan.principal(), rate, loan.start_date, loan.payments(), as_of)
    }
}

fn add_interest(total: Money, increment: Money) -> Money {
    Money::from_decimal(total.as_decimal().saturating_add(increment.as_decimal()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(d: NaiveDate, amount: i64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            date: d,
            amount: Money::from_major(amount),
        }
    }

    #[test]
    fn test_reference_accrual() {
        let result = AccrualEngine::accrue(
            Money::from_major(1_000),
            Some(Rate::from_percentage(2)),
            date(2024, 1, 10),
            &[],
            date(2024, 4, 10),
        );

        assert_eq!(result.months_elapsed, 3);
        assert_eq!(result.balance_with_interest, Money::from_decimal(dec!(1061.208)));

        let rounded = result.rounded();
        assert_eq!(rounded.balance_with_interest, Money::from_decimal(dec!(1061.21)));
        assert_eq!(rounded.interest_accrued, Money::from_decimal(dec!(61.21)));
        assert_eq!(rounded.principal_remaining, Money::from_major(1_000));
    }

    #[test]
    fn test_partial_payment_reduces_compounding_base() {
        let payments = vec![payment(date(2024, 3, 1), 500)];
        let result = AccrualEngine::accrue(
            Money::from_major(1_000),
            Some(Rate::from_percentage(10)),
            date(2024, 1, 1),
            &payments,
            date(2024, 4, 1),
        );

        // 1000 -> 1210, pay 500 -> 710, -> 781
        assert_eq!(result.months_elapsed, 3);
        assert_eq!(result.balance_with_interest, Money::from_major(781));
        assert_eq!(result.interest_accrued, Money::from_major(281));
        assert_eq!(result.principal_remaining, Money::from_major(500));
        assert_eq!(result.pending_interest(), Money::from_major(281));
    }

    #[test]
    fn test_stops_once_paid_off() {
        let payments = vec![
            payment(date(2024, 2, 1), 1_200),
            payment(date(2024, 3, 1), 100),
        ];
        let result = AccrualEngine::accrue(
            Money::from_major(1_000),
            Some(Rate::from_percentage(10)),
            date(2024, 1, 1),
            &payments,
            date(2024, 6, 1),
        );

        assert!(result.is_settled());
        assert_eq!(result.balance_with_interest, Money::ZERO);
        assert_eq!(result.interest_accrued, Money::from_major(100));
        assert_eq!(result.principal_remaining, Money::ZERO);
        // one month to the payoff, four more to as_of
        assert_eq!(result.months_elapsed, 5);
    }

    #[test]
    fn test_zero_rate_matches_principal_remaining() {
        let payments = vec![
            payment(date(2024, 2, 20), 150),
            payment(date(2024, 5, 2), 300),
        ];
        for rate in [None, Some(Rate::ZERO), Some(Rate::from_percent(dec!(-1)))] {
            let result = AccrualEngine::accrue(
                Money::from_major(1_000),
                rate,
                date(2024, 1, 5),
                &payments,
                date(2024, 9, 5),
            );
            assert_eq!(result.interest_accrued, Money::ZERO);
            assert_eq!(result.balance_with_interest, result.principal_remaining);
            assert_eq!(result.balance_with_interest, Money::from_major(550));
            assert_eq!(result.months_elapsed, 7);
        }
    }

    #[test]
    fn test_payment_order_does_not_matter() {
        let sorted = vec![
            payment(date(2024, 2, 1), 100),
            payment(date(2024, 4, 1), 200),
        ];
        let reversed: Vec<_> = sorted.iter().rev().cloned().collect();
        let rate = Some(Rate::from_percent(dec!(3.5)));

        let a = AccrualEngine::accrue(Money::from_major(900), rate, date(2024, 1, 1), &sorted, date(2024, 8, 1));
        let b = AccrualEngine::accrue(Money::from_major(900), rate, date(2024, 1, 1), &reversed, date(2024, 8, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_payment_before_start_keeps_cursor() {
        let payments = vec![payment(date(2024, 1, 15), 200)];
        let result = AccrualEngine::accrue(
            Money::from_major(1_000),
            Some(Rate::from_percentage(10)),
            date(2024, 3, 1),
            &payments,
            date(2024, 5, 1),
        );

        // 1000 - 200 = 800 compounds from March 1st: 800 * 1.21
        assert_eq!(result.months_elapsed, 2);
        assert_eq!(result.balance_with_interest, Money::from_major(968));
    }

    #[test]
    fn test_idempotent() {
        let payments = vec![payment(date(2024, 2, 10), 250)];
        let run = || {
            AccrualEngine::accrue(
                Money::from_major(2_000),
                Some(Rate::from_percent(dec!(1.5))),
                date(2023, 12, 10),
                &payments,
                date(2024, 7, 9),
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_interest_non_decreasing_in_as_of() {
        let payments = vec![payment(date(2024, 6, 10), 300)];
        let start = date(2024, 1, 10);
        let mut previous = Money::ZERO;
        let mut as_of = date(2023, 12, 1);
        while as_of <= date(2025, 12, 31) {
            let result = AccrualEngine::accrue(
                Money::from_major(1_000),
                Some(Rate::from_percentage(2)),
                start,
                &payments,
                as_of,
            );
            assert!(
                result.interest_accrued >= previous,
                "interest fell at {}: {} < {}",
                as_of,
                result.interest_accrued,
                previous
            );
            previous = result.interest_accrued;
            as_of += chrono::Duration::days(5);
        }
        assert!(previous.is_positive());
    }

    #[test]
    fn test_as_of_before_start() {
        let result = AccrualEngine::accrue(
            Money::from_major(1_000),
            Some(Rate::from_percentage(2)),
            date(2024, 6, 1),
            &[],
            date(2024, 1, 1),
        );
        assert_eq!(result.months_elapsed, 0);
        assert_eq!(result.balance_with_interest, Money::from_major(1_000));
    }
}

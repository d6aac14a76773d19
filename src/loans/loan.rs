use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::interest::{AccrualEngine, AccrualResult};
use crate::types::{CompanyId, LoanId, LoanKind, PaymentId};

/// partial payment against a loan or credit sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub date: NaiveDate,
    pub amount: Money,
}

impl Payment {
    pub fn new(date: NaiveDate, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            amount,
        }
    }
}

/// informal loan or goods sold on credit (outro negócio)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanOrCreditLine {
    pub id: LoanId,
    pub company_id: CompanyId,
    pub counterparty: String,
    pub kind: LoanKind,
    pub description: Option<String>,
    principal: Money,
    pub start_date: NaiveDate,
    pub interest_active: bool,
    /// monthly rate, used only while `interest_active`
    pub monthly_rate: Option<Rate>,
    /// non-decreasing by date
    payments: Vec<Payment>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub events: EventStore,
}

/// enumerated update of a loan; `Some(None)` clears an optional field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanPatch {
    pub counterparty: Option<String>,
    pub kind: Option<LoanKind>,
    pub description: Option<Option<String>>,
    pub principal: Option<Money>,
    pub start_date: Option<NaiveDate>,
    pub interest_active: Option<bool>,
    pub monthly_rate: Option<Option<Rate>>,
}

impl LoanOrCreditLine {
    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// interest position as of `as_of`
    pub fn accrue(&self, as_of: NaiveDate) -> AccrualResult {
        AccrualEngine::accrue_loan(self, as_of)
    }

    /// record a partial payment, keeping payments ordered by date
    pub fn add_payment(&mut self, date: NaiveDate, amount: Money) -> Result<PaymentId> {
        let payment = Payment::new(date, amount);
        self.record_payment(payment)?;
        Ok(payment.id)
    }

    /// Insert an already identified payment.
    ///
    /// Payments sharing a date keep their insertion order.
    pub fn record_payment(&mut self, payment: Payment) -> Result<()> {
        if !payment.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: payment.amount,
            });
        }
        if payment.date < self.start_date {
            return Err(LedgerError::PaymentBeforeStart {
                date: payment.date,
                start: self.start_date,
            });
        }

        let position = self.payments.partition_point(|p| p.date <= payment.date);
        self.payments.insert(position, payment);

        self.events.emit(Event::PaymentRecorded {
            loan_id: self.id,
            payment_id: payment.id,
            amount: payment.amount,
            date: payment.date,
        });
        tracing::debug!(
            loan_id = %self.id,
            amount = %payment.amount,
            date = %payment.date,
            "payment recorded"
        );
        Ok(())
    }

    pub fn remove_payment(&mut self, payment_id: PaymentId) -> Result<Payment> {
        let position = self
            .payments
            .iter()
            .position(|p| p.id == payment_id)
            .ok_or(LedgerError::PaymentNotFound {
                loan_id: self.id,
                payment_id,
            })?;

        let payment = self.payments.remove(position);
        self.events.emit(Event::PaymentRemoved {
            loan_id: self.id,
            payment_id,
        });
        Ok(payment)
    }

    pub fn apply_patch(&mut self, patch: LoanPatch) -> Result<()> {
        if let Some(principal) = patch.principal {
            validate_principal(principal)?;
        }
        if let Some(Some(rate)) = patch.monthly_rate {
            validate_rate(rate)?;
        }
        if let Some(start_date) = patch.start_date {
            if let Some(first) = self.payments.first() {
                if first.date < start_date {
                    return Err(LedgerError::PaymentBeforeStart {
                        date: first.date,
                        start: start_date,
                    });
                }
            }
            self.start_date = start_date;
        }

        if let Some(principal) = patch.principal {
            self.principal = principal;
        }
        if let Some(monthly_rate) = patch.monthly_rate {
            self.monthly_rate = monthly_rate;
        }
        if let Some(counterparty) = patch.counterparty {
            self.counterparty = counterparty;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(interest_active) = patch.interest_active {
            self.interest_active = interest_active;
        }
        Ok(())
    }
}

fn validate_principal(principal: Money) -> Result<()> {
    if !principal.is_positive() {
        return Err(LedgerError::InvalidAmount { amount: principal });
    }
    Ok(())
}

fn validate_rate(rate: Rate) -> Result<()> {
    if rate.is_negative() {
        return Err(LedgerError::InvalidConfiguration {
            message: format!("monthly rate must not be negative, got {}", rate),
        });
    }
    Ok(())
}

/// builder for loans and credit sales
#[derive(Debug, Clone, Default)]
pub struct LoanBuilder {
    company_id: Option<CompanyId>,
    counterparty: Option<String>,
    kind: LoanKind,
    description: Option<String>,
    principal: Option<Money>,
    start_date: Option<NaiveDate>,
    interest_active: Option<bool>,
    monthly_rate: Option<Rate>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn counterparty(mut self, name: impl Into<String>) -> Self {
        self.counterparty = Some(name.into());
        self
    }

    pub fn kind(mut self, kind: LoanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// monthly rate; switches interest on unless told otherwise
    pub fn monthly_rate(mut self, rate: Rate) -> Self {
        self.monthly_rate = Some(rate);
        self
    }

    pub fn interest_active(mut self, active: bool) -> Self {
        self.interest_active = Some(active);
        self
    }

    /// Build with system time
    pub fn build_now(self) -> Result<LoanOrCreditLine> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.build_with_time(&time)
    }

    /// build, taking the creation time and default start date from `time_provider`
    pub fn build_with_time(self, time_provider: &SafeTimeProvider) -> Result<LoanOrCreditLine> {
        let company_id = self.company_id.ok_or(LedgerError::InvalidConfiguration {
            message: "Company required".to_string(),
        })?;

        let counterparty = self
            .counterparty
            .filter(|name| !name.trim().is_empty())
            .ok_or(LedgerError::InvalidConfiguration {
                message: "Counterparty required".to_string(),
            })?;

        let principal = self.principal.ok_or(LedgerError::InvalidConfiguration {
            message: "Principal required".to_string(),
        })?;
        validate_principal(principal)?;

        if let Some(rate) = self.monthly_rate {
            validate_rate(rate)?;
        }

        let now = time_provider.now();
        Ok(LoanOrCreditLine {
            id: Uuid::new_v4(),
            company_id,
            counterparty,
            kind: self.kind,
            description: self.description,
            principal,
            start_date: self.start_date.unwrap_or_else(|| now.date_naive()),
            interest_active: self
                .interest_active
                .unwrap_or_else(|| self.monthly_rate.is_some()),
            monthly_rate: self.monthly_rate,
            payments: Vec::new(),
            created_at: now,
            events: EventStore::new(),
        })
    }
}

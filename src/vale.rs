use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ValeBalancePolicy;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::types::{ClientId, CompanyId, MovementId, ValeMovementKind};

/// one store-credit movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValeMovement {
    pub id: MovementId,
    pub company_id: CompanyId,
    pub client_id: ClientId,
    pub date: DateTime<Utc>,
    pub kind: ValeMovementKind,
    /// never negative
    amount: Money,
    pub description: Option<String>,
    /// sale or receipt this movement came from
    pub reference_id: Option<Uuid>,
}

impl ValeMovement {
    /// Create a movement dated now.
    ///
    /// Negative amounts are floored at zero and blank descriptions dropped.
    pub fn new(
        company_id: CompanyId,
        client_id: ClientId,
        kind: ValeMovementKind,
        amount: Money,
        description: Option<&str>,
        time_provider: &SafeTimeProvider,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            client_id,
            date: time_provider.now(),
            kind,
            amount: amount.clamp_non_negative(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            reference_id: None,
        }
    }

    pub fn credit(
        company_id: CompanyId,
        client_id: ClientId,
        amount: Money,
        description: Option<&str>,
        time_provider: &SafeTimeProvider,
    ) -> Self {
        Self::new(company_id, client_id, ValeMovementKind::Credit, amount, description, time_provider)
    }

    pub fn debit(
        company_id: CompanyId,
        client_id: ClientId,
        amount: Money,
        description: Option<&str>,
        time_provider: &SafeTimeProvider,
    ) -> Self {
        Self::new(company_id, client_id, ValeMovementKind::Debit, amount, description, time_provider)
    }

    pub fn with_reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    /// signed effect on the client's balance
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            ValeMovementKind::Credit => self.amount,
            ValeMovementKind::Debit => -self.amount,
        }
    }
}

/// one company's store-credit movements and the balances folded from them
#[derive(Debug, Clone)]
pub struct ValeLedger {
    pub company_id: CompanyId,
    policy: ValeBalancePolicy,
    movements: Vec<ValeMovement>,
    pub events: EventStore,
}

impl ValeLedger {
    pub fn new(company_id: CompanyId, policy: ValeBalancePolicy) -> Self {
        Self {
            company_id,
            policy,
            movements: Vec::new(),
            events: EventStore::new(),
        }
    }

    /// ledger over already persisted movements of the company
    pub fn from_movements(
        company_id: CompanyId,
        policy: ValeBalancePolicy,
        movements: Vec<ValeMovement>,
    ) -> Result<Self> {
        for movement in &movements {
            ensure_company(company_id, movement.company_id)?;
        }
        Ok(Self {
            company_id,
            policy,
            movements,
            events: EventStore::new(),
        })
    }

    pub fn policy(&self) -> ValeBalancePolicy {
        self.policy
    }

    pub fn movements(&self) -> &[ValeMovement] {
        &self.movements
    }

    /// Record a movement and return the client's displayed balance.
    ///
    /// A debit leaving the signed balance below zero is logged and emits
    /// [`Event::ValeOverdrawn`], even when the policy hides it.
    pub fn record(&mut self, movement: ValeMovement) -> Result<Money> {
        ensure_company(self.company_id, movement.company_id)?;
        if self.movements.iter().any(|m| m.id == movement.id) {
            return Err(LedgerError::InconsistentState {
                message: format!("vale movement {} already recorded", movement.id),
            });
        }

        let client_id = movement.client_id;
        let kind = movement.kind;
        let amount = movement.amount;
        self.movements.push(movement);

        let signed = self.signed_balance(client_id);
        let displayed = self.display(signed);
        match kind {
            ValeMovementKind::Credit => self.events.emit(Event::ValeCredited {
                client_id,
                amount,
                balance: displayed,
            }),
            ValeMovementKind::Debit => {
                self.events.emit(Event::ValeDebited {
                    client_id,
                    amount,
                    balance: displayed,
                });
                if signed.is_negative() {
                    // only the part of this debit that went past zero
                    let masked_amount = amount.min(-signed);
                    tracing::warn!(
                        client_id = %client_id,
                        signed_balance = %signed,
                        masked_amount = %masked_amount,
                        "vale debit exceeds available credit"
                    );
                    self.events.emit(Event::ValeOverdrawn {
                        client_id,
                        signed_balance: signed,
                        masked_amount,
                    });
                }
            }
        }
        Ok(displayed)
    }

    /// a client's movements, newest first
    pub fn movements_for(&self, client_id: ClientId) -> Vec<&ValeMovement> {
        let mut movements: Vec<&ValeMovement> = self
            .movements
            .iter()
            .rev()
            .filter(|m| m.client_id == client_id)
            .collect();
        movements.sort_by(|a, b| b.date.cmp(&a.date));
        movements
    }

    pub fn remove(&mut self, movement_id: MovementId) -> Result<ValeMovement> {
        let position = self
            .movements
            .iter()
            .position(|m| m.id == movement_id)
            .ok_or_else(|| LedgerError::NotFound {
                entity: "vale movement",
                id: movement_id.to_string(),
            })?;
        Ok(self.movements.remove(position))
    }

    /// exact fold of a client's movements
    pub fn signed_balance(&self, client_id: ClientId) -> Money {
        self.movements
            .iter()
            .filter(|m| m.client_id == client_id)
            .map(ValeMovement::signed_amount)
            .sum()
    }

    /// balance as displayed under the ledger's policy
    pub fn balance(&self, client_id: ClientId) -> Money {
        self.display(self.signed_balance(client_id))
    }

    /// displayed balance of every client with movements
    pub fn balances(&self) -> BTreeMap<ClientId, Money> {
        let mut signed: BTreeMap<ClientId, Money> = BTreeMap::new();
        for movement in &self.movements {
            *signed.entry(movement.client_id).or_insert(Money::ZERO) += movement.signed_amount();
        }
        signed
            .into_iter()
            .map(|(client_id, balance)| (client_id, self.display(balance)))
            .collect()
    }

    fn display(&self, signed: Money) -> Money {
        match self.policy {
            ValeBalancePolicy::ClampAtZero => signed.clamp_non_negative(),
            ValeBalancePolicy::Signed => signed,
        }
    }
}

fn ensure_company(expected: CompanyId, found: CompanyId) -> Result<()> {
    if expected != found {
        return Err(LedgerError::CompanyMismatch { expected, found });
    }
    Ok(())
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AllocationPolicy;
use crate::decimal::Rate;
use crate::errors::{LedgerError, Result};
use crate::types::ParticipantId;

/// a person or entity sharing in settlement payouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub active: bool,
    /// suggested share for new settlements, never enforced
    pub default_share: Option<Rate>,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            active: true,
            default_share: None,
        }
    }

    pub fn with_default_share(mut self, share: Rate) -> Self {
        self.default_share = Some(share);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// one participant's share of a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub participant_id: ParticipantId,
    pub share: Rate,
}

impl Allocation {
    pub fn new(participant_id: ParticipantId, share: Rate) -> Self {
        Self {
            participant_id,
            share,
        }
    }
}

/// sum of all shares
pub fn total_share(allocations: &[Allocation]) -> Rate {
    allocations.iter().map(|a| a.share).sum()
}

/// check allocations against the configured policy
pub fn validate(allocations: &[Allocation], policy: AllocationPolicy) -> Result<()> {
    if policy == AllocationPolicy::Permissive {
        return Ok(());
    }

    let mut seen = HashSet::with_capacity(allocations.len());
    for allocation in allocations {
        if allocation.share.is_negative() {
            return Err(LedgerError::InvalidAllocation {
                participant_id: allocation.participant_id,
                share: allocation.share,
            });
        }
        if !seen.insert(allocation.participant_id) {
            return Err(LedgerError::DuplicateParticipant {
                participant_id: allocation.participant_id,
            });
        }
    }

    let total = total_share(allocations);
    if total != Rate::ONE {
        return Err(LedgerError::AllocationSumMismatch { total });
    }
    Ok(())
}

/// allocations pre-filled from active participants' default shares
pub fn from_defaults(participants: &[Participant]) -> Vec<Allocation> {
    participants
        .iter()
        .filter(|p| p.active)
        .map(|p| Allocation::new(p.id, p.default_share.unwrap_or(Rate::ZERO)))
        .collect()
}

//! Claim Vesting Queue
//!
//! Pending reward becomes a time-locked claim. Each beneficiary keeps a set
//! of outstanding claim ids backed by an index-tracked vector, so membership
//! checks and removals are O(1). Removal swaps the last id into the freed
//! slot.

use std::collections::{BTreeMap, HashMap};

use leverager_common::{
    errors::{ClaimErrorReason, LeveragerError, LeveragerResult},
    types::{Address, Claim, ClaimId},
};

// ============ Outstanding Set ============

/// Claim ids awaiting settlement for one beneficiary
#[derive(Debug, Clone, Default)]
pub struct OutstandingSet {
    ids: Vec<ClaimId>,
    positions: HashMap<ClaimId, usize>,
}

impl OutstandingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `id` was already present
    pub fn insert(&mut self, id: ClaimId) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }
        self.positions.insert(id, self.ids.len());
        self.ids.push(id);
        true
    }

    /// Returns false if `id` was not present
    pub fn remove(&mut self, id: ClaimId) -> bool {
        let Some(index) = self.positions.remove(&id) else {
            return false;
        };
        self.ids.swap_remove(index);
        if let Some(moved) = self.ids.get(index) {
            self.positions.insert(*moved, index);
        }
        true
    }

    pub fn as_slice(&self) -> &[ClaimId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<ClaimId> for OutstandingSet {
    fn from_iter<I: IntoIterator<Item = ClaimId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

// ============ Claim Book ============

/// Every claim ever created plus per-beneficiary outstanding sets
#[derive(Debug, Clone, Default)]
pub struct ClaimBook {
    claims: BTreeMap<ClaimId, Claim>,
    outstanding: BTreeMap<Address, OutstandingSet>,
}

impl ClaimBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a book from persisted parts
    pub fn from_parts(
        claims: impl IntoIterator<Item = (ClaimId, Claim)>,
        outstanding: impl IntoIterator<Item = (Address, Vec<ClaimId>)>,
    ) -> Self {
        Self {
            claims: claims.into_iter().collect(),
            outstanding: outstanding
                .into_iter()
                .map(|(beneficiary, ids)| (beneficiary, ids.into_iter().collect()))
                .collect(),
        }
    }

    /// Record a new claim under `id` and mark it outstanding
    pub fn create(
        &mut self,
        id: ClaimId,
        beneficiary: Address,
        amount: u128,
        unlock_time: u64,
    ) -> LeveragerResult<Claim> {
        if amount == 0 {
            return Err(LeveragerError::InvalidAmount { amount });
        }
        let claim = Claim {
            amount,
            beneficiary,
            settled: false,
            unlock_time,
        };
        self.claims.insert(id, claim);
        self.outstanding.entry(beneficiary).or_default().insert(id);
        Ok(claim)
    }

    /// Mark a vested claim settled and drop it from the outstanding set
    ///
    /// Returns the settled claim; paying it out is the caller's job.
    pub fn settle(&mut self, id: ClaimId, now: u64) -> LeveragerResult<Claim> {
        let invalid = |reason| LeveragerError::InvalidClaim { claim_id: id, reason };

        let claim = self
            .claims
            .get_mut(&id)
            .ok_or(invalid(ClaimErrorReason::NotFound))?;
        if claim.settled {
            return Err(invalid(ClaimErrorReason::AlreadySettled));
        }
        if !claim.is_unlocked(now) {
            return Err(invalid(ClaimErrorReason::StillVesting {
                unlock_time: claim.unlock_time,
                now,
            }));
        }

        let removed = self
            .outstanding
            .get_mut(&claim.beneficiary)
            .map(|set| set.remove(id))
            .unwrap_or(false);
        if !removed {
            return Err(invalid(ClaimErrorReason::NotOutstanding));
        }

        claim.settled = true;
        Ok(*claim)
    }

    pub fn get(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.get(&id)
    }

    /// Outstanding ids of `beneficiary`, in set order
    pub fn outstanding(&self, beneficiary: &Address) -> &[ClaimId] {
        self.outstanding
            .get(beneficiary)
            .map(OutstandingSet::as_slice)
            .unwrap_or(&[])
    }

    /// Outstanding ids of `beneficiary` whose unlock time has passed
    pub fn claimable(&self, beneficiary: &Address, now: u64) -> Vec<ClaimId> {
        self.outstanding(beneficiary)
            .iter()
            .copied()
            .filter(|id| self.claims.get(id).is_some_and(|c| c.is_unlocked(now)))
            .collect()
    }

    pub fn claims(&self) -> impl Iterator<Item = (&ClaimId, &Claim)> {
        self.claims.iter()
    }

    /// Outstanding sets, skipping beneficiaries with nothing left
    pub fn outstanding_sets(&self) -> impl Iterator<Item = (&Address, &OutstandingSet)> {
        self.outstanding.iter().filter(|(_, set)| !set.is_empty())
    }
}

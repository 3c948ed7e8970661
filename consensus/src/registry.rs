//! The consensus registry.
//!
//! Every element seen is filed under `(holder, nonce)`. A slot normally holds
//! one element; a second, different element at the same slot is kept as
//! pending conflict evidence. A holder is only removed once a valid
//! [`MeritRemoval`] proving the conflict is added.
//!
//! Elements inside a slot are kept sorted by hash, so the slot's aggregate
//! signature and Merkle root do not depend on arrival order.
//!
//! A slot finalized by a block keeps accepting elements, since a holder can
//! still equivocate on it. The Merkle root the block committed is stored
//! with the archive entry and does not move.

use std::collections::{BTreeMap, BTreeSet};

use merit_crypto::{merkle_root, prove, MerkleProof, SignatureScheme};
use merit_types::{Hash, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::conflict::conflicts;
use crate::element::{Element, Evidence, MeritRemoval, SignedElement};
use crate::ConsensusError;

type Slots = BTreeMap<u64, Vec<SignedElement>>;

/// Result of a successful [`Consensus::add`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new element in a slot without conflicts.
    Added,
    /// The element was already registered; nothing changed.
    Duplicate,
    /// Registered, and it conflicts with an element already at its slot.
    PendingConflict,
    /// A Merit Removal was accepted and `offender` is now removed.
    Removed { offender: PublicKey },
    /// Registered, but its holder has already been removed.
    FromRemovedSigner,
}

/// Every element seen, by holder and nonce, plus the removed holders and the
/// slots already finalized on chain with the Merkle root each was finalized at.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ConsensusRecord")]
pub struct Consensus {
    holders: BTreeMap<PublicKey, Slots>,
    removed: BTreeSet<PublicKey>,
    archived: BTreeMap<PublicKey, BTreeMap<u64, Hash>>,
}

impl Consensus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements at `(holder, nonce)`, sorted by hash. Empty if none.
    pub fn elements(&self, holder: &PublicKey, nonce: u64) -> &[SignedElement] {
        self.holders
            .get(holder)
            .and_then(|slots| slots.get(&nonce))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn find(&self, holder: &PublicKey, nonce: u64, hash: &Hash) -> Option<&SignedElement> {
        self.elements(holder, nonce).iter().find(|e| e.hash() == *hash)
    }

    pub fn contains(&self, holder: &PublicKey, nonce: u64, hash: &Hash) -> bool {
        self.find(holder, nonce, hash).is_some()
    }

    pub fn is_removed(&self, holder: &PublicKey) -> bool {
        self.removed.contains(holder)
    }

    pub fn removed(&self) -> impl Iterator<Item = &PublicKey> {
        self.removed.iter()
    }

    /// Every occupied `(holder, nonce)` slot, ordered by holder then nonce.
    pub fn slots(&self) -> impl Iterator<Item = (&PublicKey, u64)> {
        self.holders
            .iter()
            .flat_map(|(holder, slots)| slots.keys().map(move |nonce| (holder, *nonce)))
    }

    /// One past the highest nonce registered for `holder`.
    pub fn next_nonce(&self, holder: &PublicKey) -> u64 {
        self.holders
            .get(holder)
            .and_then(|slots| slots.keys().next_back())
            .map_or(0, |n| n + 1)
    }

    /// Register a signed element.
    ///
    /// Validation completes before anything is written, so an error leaves
    /// the registry untouched.
    pub fn add<S: SignatureScheme>(
        &mut self,
        scheme: &S,
        element: SignedElement,
    ) -> Result<AddOutcome, ConsensusError> {
        let holder = element.holder().clone();
        let nonce = element.nonce();
        let hash = element.hash();

        if !element.verify(scheme) {
            return Err(ConsensusError::InvalidSignature { holder, nonce });
        }

        if self.contains(&holder, nonce, &hash) {
            tracing::trace!(%holder, nonce, %hash, "duplicate element");
            return Ok(AddOutcome::Duplicate);
        }

        if let Some(removal) = element.as_removal() {
            let mut evidence = Vec::new();
            self.check_removal(removal, &mut evidence)?;
            let offender = removal.offender().clone();
            for e in evidence {
                if let Some(nested) = e.as_removal() {
                    let nested_offender = nested.offender().clone();
                    tracing::warn!(offender = %nested_offender, "merit removal accepted as evidence");
                    self.removed.insert(nested_offender);
                }
                self.insert(e);
            }
            self.insert(element);
            self.removed.insert(offender.clone());
            tracing::warn!(%offender, reporter = %holder, nonce, "merit removal accepted");
            return Ok(AddOutcome::Removed { offender });
        }

        let outcome = if self.removed.contains(&holder) {
            AddOutcome::FromRemovedSigner
        } else if self
            .elements(&holder, nonce)
            .iter()
            .any(|existing| conflicts(&existing.element, &element.element))
        {
            AddOutcome::PendingConflict
        } else {
            AddOutcome::Added
        };

        match outcome {
            AddOutcome::FromRemovedSigner => {
                tracing::warn!(%holder, nonce, "element from removed holder")
            }
            AddOutcome::PendingConflict => {
                tracing::warn!(%holder, nonce, "conflicting element registered")
            }
            _ => tracing::debug!(%holder, nonce, %hash, "element added"),
        }

        self.insert(element);
        Ok(outcome)
    }

    /// Resolve and check a removal's evidence, collecting into `fresh` the
    /// evidence elements carried in full that are not registered yet.
    ///
    /// Evidence that is itself a Merit Removal must pass the same checks.
    fn check_removal(
        &self,
        removal: &MeritRemoval,
        fresh: &mut Vec<SignedElement>,
    ) -> Result<(), ConsensusError> {
        let e1 = self.resolve(&removal.e1)?;
        let e2 = self.resolve(&removal.e2)?;

        if !conflicts(&e1.element, &e2.element) {
            return Err(ConsensusError::NotAConflict {
                holder: e1.holder().clone(),
                nonce: e1.nonce(),
            });
        }

        for evidence in [&removal.e1, &removal.e2] {
            let Evidence::Signed(element) = evidence else {
                continue;
            };
            if self.contains(element.holder(), element.nonce(), &element.hash()) {
                continue;
            }
            if let Some(nested) = element.as_removal() {
                self.check_removal(nested, fresh)?;
            }
            fresh.push((**element).clone());
        }
        Ok(())
    }

    fn resolve<'a>(&'a self, evidence: &'a Evidence) -> Result<&'a SignedElement, ConsensusError> {
        match evidence {
            Evidence::Signed(element) => Ok(&**element),
            Evidence::Reference(r) => self.find(&r.holder, r.nonce, &r.hash).ok_or_else(|| {
                ConsensusError::UnknownReferencedElement {
                    holder: r.holder.clone(),
                    nonce: r.nonce,
                    hash: r.hash,
                }
            }),
        }
    }

    fn insert(&mut self, element: SignedElement) {
        let slot = self
            .holders
            .entry(element.holder().clone())
            .or_default()
            .entry(element.nonce())
            .or_default();
        let hash = element.hash();
        if let Err(pos) = slot.binary_search_by_key(&hash, SignedElement::hash) {
            slot.insert(pos, element);
        }
    }

    fn slot(&self, holder: &PublicKey, nonce: u64) -> Result<&[SignedElement], ConsensusError> {
        let elements = self.elements(holder, nonce);
        if elements.is_empty() {
            return Err(ConsensusError::MissingElement {
                holder: holder.clone(),
                nonce,
            });
        }
        Ok(elements)
    }

    /// Aggregate signature over every element at each listed slot.
    ///
    /// This is what a block header commits to. No entries yields the empty
    /// signature.
    pub fn get_aggregate<S: SignatureScheme>(
        &self,
        scheme: &S,
        entries: &[(PublicKey, u64)],
    ) -> Result<Signature, ConsensusError> {
        let mut signatures = Vec::new();
        for (holder, nonce) in entries {
            signatures.extend(self.slot(holder, *nonce)?.iter().map(|e| e.signature.clone()));
        }
        if signatures.is_empty() {
            return Ok(Signature::default());
        }
        Ok(scheme.aggregate(&signatures)?)
    }

    fn leaves(&self, holder: &PublicKey, nonce: u64) -> Result<Vec<Hash>, ConsensusError> {
        Ok(self.slot(holder, nonce)?.iter().map(SignedElement::hash).collect())
    }

    /// Merkle root over the hashes of the elements at `(holder, nonce)`.
    pub fn get_merkle(&self, holder: &PublicKey, nonce: u64) -> Result<Hash, ConsensusError> {
        Ok(merkle_root(&self.leaves(holder, nonce)?))
    }

    /// Proof that the element `hash` sits under `get_merkle(holder, nonce)`.
    pub fn prove_inclusion(
        &self,
        holder: &PublicKey,
        nonce: u64,
        hash: &Hash,
    ) -> Result<MerkleProof, ConsensusError> {
        let leaves = self.leaves(holder, nonce)?;
        leaves
            .iter()
            .position(|leaf| leaf == hash)
            .and_then(|index| prove(&leaves, index))
            .ok_or_else(|| ConsensusError::MissingElement {
                holder: holder.clone(),
                nonce,
            })
    }

    /// Slots that hold at least one conflicting pair.
    pub fn pending_conflicts(&self) -> Vec<(PublicKey, u64)> {
        self.holders
            .iter()
            .flat_map(|(holder, slots)| {
                slots
                    .keys()
                    .filter(|nonce| self.conflicting_pair(holder, **nonce).is_some())
                    .map(move |nonce| (holder.clone(), *nonce))
            })
            .collect()
    }

    /// The first conflicting pair at `(holder, nonce)`, ready to wrap in a
    /// [`MeritRemoval`].
    pub fn conflicting_pair(
        &self,
        holder: &PublicKey,
        nonce: u64,
    ) -> Option<(&SignedElement, &SignedElement)> {
        let elements = self.elements(holder, nonce);
        elements.iter().enumerate().find_map(|(i, a)| {
            elements[i + 1..]
                .iter()
                .find(|b| conflicts(&a.element, &b.element))
                .map(|b| (a, b))
        })
    }

    pub fn is_archived(&self, holder: &PublicKey, nonce: u64) -> bool {
        self.archived_merkle(holder, nonce).is_some()
    }

    /// The Merkle root `(holder, nonce)` was finalized at, if it was.
    pub fn archived_merkle(&self, holder: &PublicKey, nonce: u64) -> Option<Hash> {
        self.archived.get(holder).and_then(|nonces| nonces.get(&nonce)).copied()
    }

    /// Every finalized slot, ordered by holder then nonce.
    pub fn archived_slots(&self) -> impl Iterator<Item = (&PublicKey, u64)> {
        self.archived
            .iter()
            .flat_map(|(holder, nonces)| nonces.keys().map(move |nonce| (holder, *nonce)))
    }

    /// Record `(holder, nonce)` as finalized by an appended block that
    /// committed to `merkle`.
    pub fn archive(&mut self, holder: &PublicKey, nonce: u64, merkle: Hash) {
        self.archived.entry(holder.clone()).or_default().insert(nonce, merkle);
    }

    /// Whether every element at `(holder, nonce)` is a Merit Removal.
    pub fn only_removals(&self, holder: &PublicKey, nonce: u64) -> bool {
        let elements = self.elements(holder, nonce);
        !elements.is_empty() && elements.iter().all(|e| e.as_removal().is_some())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, ConsensusError> {
        serde_json::to_value(self).map_err(|e| ConsensusError::MalformedRecord(e.to_string()))
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConsensusError> {
        Self::deserialize(value).map_err(|e| ConsensusError::MalformedRecord(e.to_string()))
    }
}

/// Wire form of [`Consensus`], checked before it becomes one.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConsensusRecord {
    holders: BTreeMap<PublicKey, Slots>,
    #[serde(default)]
    removed: BTreeSet<PublicKey>,
    #[serde(default)]
    archived: BTreeMap<PublicKey, BTreeMap<u64, Hash>>,
}

impl TryFrom<ConsensusRecord> for Consensus {
    type Error = ConsensusError;

    fn try_from(record: ConsensusRecord) -> Result<Self, Self::Error> {
        let malformed = |msg: String| -> Result<Self, ConsensusError> {
            Err(ConsensusError::MalformedRecord(msg))
        };

        for (holder, slots) in &record.holders {
            for (nonce, elements) in slots {
                if elements.is_empty() {
                    return malformed(format!("empty slot {holder}/{nonce}"));
                }
                for element in elements {
                    if element.holder() != holder || element.nonce() != *nonce {
                        return malformed(format!("element {} filed under {holder}/{nonce}", element.hash()));
                    }
                }
                let sorted = elements.windows(2).all(|w| w[0].hash() < w[1].hash());
                if !sorted {
                    return malformed(format!("slot {holder}/{nonce} not in canonical order"));
                }
            }
        }

        for offender in &record.removed {
            let justified = record.holders.values().flat_map(|slots| slots.values()).flatten().any(|e| {
                matches!(&e.element, Element::MeritRemoval(r) if r.offender() == offender)
            });
            if !justified {
                return malformed(format!("removed holder {offender} has no merit removal"));
            }
        }

        for (holder, nonces) in &record.archived {
            for nonce in nonces.keys() {
                let known = record
                    .holders
                    .get(holder)
                    .is_some_and(|slots| slots.contains_key(nonce));
                if !known {
                    return malformed(format!("archived slot {holder}/{nonce} has no elements"));
                }
            }
        }

        Ok(Self {
            holders: record.holders,
            removed: record.removed,
            archived: record.archived,
        })
    }
}

//! Signed consensus elements.
//!
//! An element is one statement by one validator (its *holder*) at one of the
//! holder's nonces. Two kinds exist:
//!
//! - [`Verification`]: "I attest to block B".
//! - [`MeritRemoval`]: "these two elements by the same holder conflict".
//!
//! The signed message is the element hash, which covers kind, holder, nonce
//! and content but not the signature itself.

use merit_crypto::{hash_parts, CryptoError, SignatureScheme};
use merit_types::{Hash, PrivateKey, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::ConsensusError;

/// Discriminant of an [`Element`], also the first byte of its hash preimage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Verification = 0,
    MeritRemoval = 1,
}

/// A holder's attestation to a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub holder: PublicKey,
    pub nonce: u64,
    pub block: Hash,
}

impl Verification {
    pub fn new(holder: PublicKey, nonce: u64, block: Hash) -> Self {
        Self {
            holder,
            nonce,
            block,
        }
    }

    pub fn sign<S: SignatureScheme>(
        self,
        scheme: &S,
        private_key: &PrivateKey,
    ) -> Result<SignedElement, CryptoError> {
        Element::from(self).sign(scheme, private_key)
    }
}

/// Pointer to an element the registry already holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    pub holder: PublicKey,
    pub nonce: u64,
    pub hash: Hash,
}

/// One side of a Merit Removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Evidence {
    /// The conflicting element, carried in full.
    Signed(Box<SignedElement>),
    /// An element already registered; only its identity travels.
    Reference(ElementRef),
}

impl Evidence {
    pub fn holder(&self) -> &PublicKey {
        match self {
            Evidence::Signed(element) => element.holder(),
            Evidence::Reference(r) => &r.holder,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Evidence::Signed(element) => element.nonce(),
            Evidence::Reference(r) => r.nonce,
        }
    }

    pub fn hash(&self) -> Hash {
        match self {
            Evidence::Signed(element) => element.hash(),
            Evidence::Reference(r) => r.hash,
        }
    }
}

impl From<SignedElement> for Evidence {
    fn from(element: SignedElement) -> Self {
        Evidence::Signed(Box::new(element))
    }
}

impl From<ElementRef> for Evidence {
    fn from(r: ElementRef) -> Self {
        Evidence::Reference(r)
    }
}

/// Proof that `e1` and `e2`'s holder signed two conflicting statements.
///
/// `holder` and `nonce` belong to the reporter, who may be the offender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeritRemoval {
    pub holder: PublicKey,
    pub nonce: u64,
    pub e1: Evidence,
    pub e2: Evidence,
}

impl MeritRemoval {
    pub fn new(holder: PublicKey, nonce: u64, e1: impl Into<Evidence>, e2: impl Into<Evidence>) -> Self {
        Self {
            holder,
            nonce,
            e1: e1.into(),
            e2: e2.into(),
        }
    }

    /// The holder being accused.
    pub fn offender(&self) -> &PublicKey {
        self.e1.holder()
    }

    /// Sign as the reporter.
    pub fn sign<S: SignatureScheme>(
        self,
        scheme: &S,
        private_key: &PrivateKey,
    ) -> Result<SignedElement, CryptoError> {
        Element::from(self).sign(scheme, private_key)
    }
}

/// The closed set of element kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Element {
    Verification(Verification),
    MeritRemoval(MeritRemoval),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Verification(_) => ElementKind::Verification,
            Element::MeritRemoval(_) => ElementKind::MeritRemoval,
        }
    }

    pub fn holder(&self) -> &PublicKey {
        match self {
            Element::Verification(v) => &v.holder,
            Element::MeritRemoval(r) => &r.holder,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Element::Verification(v) => v.nonce,
            Element::MeritRemoval(r) => r.nonce,
        }
    }

    /// What the element says, independent of who says it and when.
    pub fn content(&self) -> Vec<u8> {
        match self {
            Element::Verification(v) => v.block.as_bytes().to_vec(),
            Element::MeritRemoval(r) => {
                // Evidence order carries no meaning.
                let (e1, e2) = (r.e1.hash(), r.e2.hash());
                let (low, high) = if e1 <= e2 { (e1, e2) } else { (e2, e1) };
                let mut content = Vec::with_capacity(64);
                content.extend_from_slice(low.as_bytes());
                content.extend_from_slice(high.as_bytes());
                content
            }
        }
    }

    /// Identity hash and signing message.
    pub fn hash(&self) -> Hash {
        let holder = self.holder().as_bytes();
        let holder_len = (holder.len() as u32).to_be_bytes();
        hash_parts(&[
            &[self.kind() as u8],
            &holder_len,
            holder,
            &self.nonce().to_be_bytes(),
            &self.content(),
        ])
    }

    /// Sign this element as its holder.
    pub fn sign<S: SignatureScheme>(
        self,
        scheme: &S,
        private_key: &PrivateKey,
    ) -> Result<SignedElement, CryptoError> {
        let signature = scheme.sign(private_key, self.hash().as_bytes())?;
        Ok(SignedElement {
            element: self,
            signature,
        })
    }
}

impl From<Verification> for Element {
    fn from(v: Verification) -> Self {
        Element::Verification(v)
    }
}

impl From<MeritRemoval> for Element {
    fn from(r: MeritRemoval) -> Self {
        Element::MeritRemoval(r)
    }
}

/// An element plus its holder's signature. Immutable once signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedElement {
    pub element: Element,
    pub signature: Signature,
}

impl SignedElement {
    pub fn hash(&self) -> Hash {
        self.element.hash()
    }

    pub fn holder(&self) -> &PublicKey {
        self.element.holder()
    }

    pub fn nonce(&self) -> u64 {
        self.element.nonce()
    }

    pub fn kind(&self) -> ElementKind {
        self.element.kind()
    }

    pub fn as_removal(&self) -> Option<&MeritRemoval> {
        match &self.element {
            Element::MeritRemoval(r) => Some(r),
            Element::Verification(_) => None,
        }
    }

    /// Whether the signature is valid, and for a Merit Removal, whether every
    /// evidence element carried in full is too.
    ///
    /// Referenced evidence cannot be checked here; the registry resolves it.
    pub fn verify<S: SignatureScheme>(&self, scheme: &S) -> bool {
        if !scheme.verify(self.holder(), self.hash().as_bytes(), &self.signature) {
            return false;
        }
        match &self.element {
            Element::Verification(_) => true,
            Element::MeritRemoval(r) => [&r.e1, &r.e2].iter().all(|evidence| match evidence {
                Evidence::Signed(element) => element.verify(scheme),
                Evidence::Reference(_) => true,
            }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ConsensusError> {
        bincode::serialize(self).map_err(|e| ConsensusError::MalformedRecord(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConsensusError> {
        bincode::deserialize(bytes).map_err(|e| ConsensusError::MalformedRecord(e.to_string()))
    }

    /// A [`ElementRef`] pointing at this element.
    pub fn to_ref(&self) -> ElementRef {
        ElementRef {
            holder: self.holder().clone(),
            nonce: self.nonce(),
            hash: self.hash(),
        }
    }
}

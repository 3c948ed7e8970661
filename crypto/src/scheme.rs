//! The signature capability the engine is written against.

use merit_types::{PrivateKey, PublicKey, Signature};

use crate::CryptoError;

/// Sign, verify and aggregate.
///
/// Consensus and the chain never touch curve arithmetic directly; they are
/// generic over any implementation of this trait.
pub trait SignatureScheme: Send + Sync {
    /// Sign `message` with `private_key`.
    fn sign(&self, private_key: &PrivateKey, message: &[u8]) -> Result<Signature, CryptoError>;

    /// Whether `signature` is a valid signature of `message` under `public_key`.
    ///
    /// Malformed keys or signatures verify as `false`.
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool;

    /// Combine several signatures into one.
    ///
    /// Order is significant only insofar as the byte encoding of the result
    /// must be reproducible; callers feed signatures in a canonical order.
    fn aggregate(&self, signatures: &[Signature]) -> Result<Signature, CryptoError>;

    /// Derive the public key for `private_key`.
    fn public_key(&self, private_key: &PrivateKey) -> Result<PublicKey, CryptoError>;
}

impl<S: SignatureScheme + ?Sized> SignatureScheme for &S {
    fn sign(&self, private_key: &PrivateKey, message: &[u8]) -> Result<Signature, CryptoError> {
        (**self).sign(private_key, message)
    }

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        (**self).verify(public_key, message, signature)
    }

    fn aggregate(&self, signatures: &[Signature]) -> Result<Signature, CryptoError> {
        (**self).aggregate(signatures)
    }

    fn public_key(&self, private_key: &PrivateKey) -> Result<PublicKey, CryptoError> {
        (**self).public_key(private_key)
    }
}

//! BLS12-381 signatures via `blst`.
//!
//! Uses the minimal-pubkey-size variant: public keys are compressed G1 points
//! (48 bytes) and signatures are compressed G2 points (96 bytes). Aggregating
//! any number of element signatures yields one 96-byte signature, which is
//! what a block header commits to.

use blst::min_pk::{AggregateSignature, PublicKey as BlsPublicKey, SecretKey, Signature as BlsSignature};
use blst::BLST_ERROR;
use merit_types::{KeyPair, PrivateKey, PublicKey, Signature};

use crate::{CryptoError, SignatureScheme};

/// Domain separation tag for element signatures.
const MERIT_DST: &[u8] = b"MERIT_BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_";

/// BLS12-381 implementation of [`SignatureScheme`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BlsScheme;

impl BlsScheme {
    fn secret_key(private_key: &PrivateKey) -> Result<SecretKey, CryptoError> {
        SecretKey::from_bytes(&private_key.0).map_err(|_| CryptoError::InvalidPrivateKey)
    }
}

impl SignatureScheme for BlsScheme {
    fn sign(&self, private_key: &PrivateKey, message: &[u8]) -> Result<Signature, CryptoError> {
        let sk = Self::secret_key(private_key)?;
        let sig = sk.sign(message, MERIT_DST, &[]);
        Ok(Signature(sig.to_bytes().to_vec()))
    }

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        let Ok(pk) = BlsPublicKey::from_bytes(public_key.as_bytes()) else {
            return false;
        };
        let Ok(sig) = BlsSignature::from_bytes(signature.as_bytes()) else {
            return false;
        };
        sig.verify(true, message, MERIT_DST, &[], &pk, true) == BLST_ERROR::BLST_SUCCESS
    }

    fn aggregate(&self, signatures: &[Signature]) -> Result<Signature, CryptoError> {
        if signatures.is_empty() {
            return Err(CryptoError::EmptyAggregate);
        }
        let parsed = signatures
            .iter()
            .map(|s| BlsSignature::from_bytes(s.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CryptoError::InvalidSignature(format!("G2 point deserialization: {e:?}")))?;
        let refs: Vec<&BlsSignature> = parsed.iter().collect();
        let aggregate = AggregateSignature::aggregate(&refs, true)
            .map_err(|e| CryptoError::InvalidSignature(format!("aggregation: {e:?}")))?;
        Ok(Signature(aggregate.to_signature().to_bytes().to_vec()))
    }

    fn public_key(&self, private_key: &PrivateKey) -> Result<PublicKey, CryptoError> {
        let sk = Self::secret_key(private_key)?;
        Ok(PublicKey(sk.sk_to_pk().to_bytes().to_vec()))
    }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> Result<KeyPair, CryptoError> {
    let sk = SecretKey::key_gen(seed, &[]).map_err(|_| CryptoError::InvalidPrivateKey)?;
    Ok(KeyPair {
        public: PublicKey(sk.sk_to_pk().to_bytes().to_vec()),
        private: PrivateKey(sk.to_bytes().to_vec()),
    })
}

/// Generate a new key pair from OS entropy.
pub fn generate_keypair() -> Result<KeyPair, CryptoError> {
    let mut seed = [0u8; 32];
    getrandom::getrandom(&mut seed).map_err(|e| CryptoError::Entropy(e.to_string()))?;
    keypair_from_seed(&seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = keypair_from_seed(&[7u8; 32]).unwrap();
        let sig = BlsScheme.sign(&kp.private, b"attest").unwrap();
        assert_eq!(sig.as_bytes().len(), 96);
        assert_eq!(kp.public.as_bytes().len(), 48);
        assert!(BlsScheme.verify(&kp.public, b"attest", &sig));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = keypair_from_seed(&[7u8; 32]).unwrap();
        let sig = BlsScheme.sign(&kp.private, b"correct").unwrap();
        assert!(!BlsScheme.verify(&kp.public, b"wrong", &sig));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = keypair_from_seed(&[1u8; 32]).unwrap();
        let kp2 = keypair_from_seed(&[2u8; 32]).unwrap();
        let sig = BlsScheme.sign(&kp1.private, b"msg").unwrap();
        assert!(!BlsScheme.verify(&kp2.public, b"msg", &sig));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        let kp = keypair_from_seed(&[3u8; 32]).unwrap();
        assert!(!BlsScheme.verify(&kp.public, b"msg", &Signature(vec![0xAB; 96])));
        assert!(!BlsScheme.verify(&kp.public, b"msg", &Signature::default()));
    }

    #[test]
    fn signing_is_deterministic() {
        let kp = keypair_from_seed(&[9u8; 32]).unwrap();
        let a = BlsScheme.sign(&kp.private, b"same").unwrap();
        let b = BlsScheme.sign(&kp.private, b"same").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn public_key_derivation_matches_keypair() {
        let kp = keypair_from_seed(&[4u8; 32]).unwrap();
        assert_eq!(BlsScheme.public_key(&kp.private).unwrap(), kp.public);
    }

    #[test]
    fn aggregate_of_one_is_identity() {
        let kp = keypair_from_seed(&[5u8; 32]).unwrap();
        let sig = BlsScheme.sign(&kp.private, b"one").unwrap();
        assert_eq!(BlsScheme.aggregate(&[sig.clone()]).unwrap(), sig);
    }

    #[test]
    fn aggregate_depends_on_inputs() {
        let kp1 = keypair_from_seed(&[1u8; 32]).unwrap();
        let kp2 = keypair_from_seed(&[2u8; 32]).unwrap();
        let s1 = BlsScheme.sign(&kp1.private, b"a").unwrap();
        let s2 = BlsScheme.sign(&kp2.private, b"b").unwrap();
        let agg = BlsScheme.aggregate(&[s1.clone(), s2.clone()]).unwrap();
        assert_eq!(agg.as_bytes().len(), 96);
        assert_ne!(agg, s1);
        assert_eq!(agg, BlsScheme.aggregate(&[s2, s1]).unwrap());
    }

    #[test]
    fn empty_aggregate_is_an_error() {
        assert!(matches!(
            BlsScheme.aggregate(&[]),
            Err(CryptoError::EmptyAggregate)
        ));
    }

    #[test]
    fn generated_keys_differ() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        assert_ne!(a.public, b.public);
    }
}

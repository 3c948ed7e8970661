use proptest::prelude::*;

use merit_consensus::{AddOutcome, Consensus, Element, MeritRemoval, SignedElement, Verification};
use merit_crypto::{keypair_from_seed, BlsScheme};
use merit_types::{Hash, KeyPair};

fn keypair(seed: u8) -> KeyPair {
    keypair_from_seed(&[seed; 32]).unwrap()
}

fn verification(kp: &KeyPair, nonce: u64, block: u8) -> SignedElement {
    Element::from(Verification::new(kp.public.clone(), nonce, Hash::new([block; 32])))
        .sign(&BlsScheme, &kp.private)
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Arrival order changes neither the registry nor its commitments.
    #[test]
    fn order_independent(blocks in prop::collection::btree_set(any::<u8>(), 1..5), seed in 1u8..50) {
        let kp = keypair(seed);
        let elements: Vec<_> = blocks.iter().map(|b| verification(&kp, 0, *b)).collect();

        let mut forward = Consensus::new();
        for e in &elements {
            forward.add(&BlsScheme, e.clone()).unwrap();
        }
        let mut backward = Consensus::new();
        for e in elements.iter().rev() {
            backward.add(&BlsScheme, e.clone()).unwrap();
        }

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(
            forward.get_merkle(&kp.public, 0).unwrap(),
            backward.get_merkle(&kp.public, 0).unwrap()
        );
        prop_assert_eq!(
            forward.get_aggregate(&BlsScheme, &[(kp.public.clone(), 0)]).unwrap(),
            backward.get_aggregate(&BlsScheme, &[(kp.public.clone(), 0)]).unwrap()
        );
        prop_assert_eq!(forward.elements(&kp.public, 0).len(), blocks.len());
    }

    /// Re-adding anything already registered is a no-op.
    #[test]
    fn readd_is_duplicate(block in any::<u8>(), nonce in 0u64..1000, seed in 1u8..50) {
        let kp = keypair(seed);
        let v = verification(&kp, nonce, block);
        let mut consensus = Consensus::new();
        prop_assert_eq!(consensus.add(&BlsScheme, v.clone()).unwrap(), AddOutcome::Added);
        let before = consensus.clone();
        prop_assert_eq!(consensus.add(&BlsScheme, v).unwrap(), AddOutcome::Duplicate);
        prop_assert_eq!(consensus, before);
    }

    /// Any two distinct blocks at one slot are enough to remove the holder,
    /// and only that holder.
    #[test]
    fn distinct_pair_removes_holder(a in any::<u8>(), b in any::<u8>(), nonce in 0u64..100, seed in 1u8..50) {
        prop_assume!(a != b);
        let offender = keypair(seed);
        let reporter = keypair(seed.wrapping_add(100));
        let v1 = verification(&offender, nonce, a);
        let v2 = verification(&offender, nonce, b);

        let mut consensus = Consensus::new();
        consensus.add(&BlsScheme, v1.clone()).unwrap();
        prop_assert_eq!(consensus.add(&BlsScheme, v2.clone()).unwrap(), AddOutcome::PendingConflict);
        prop_assert!(!consensus.is_removed(&offender.public));

        let removal = Element::from(MeritRemoval::new(reporter.public.clone(), 0, v1.to_ref(), v2.to_ref()))
            .sign(&BlsScheme, &reporter.private)
            .unwrap();
        let outcome = consensus.add(&BlsScheme, removal).unwrap();
        prop_assert_eq!(outcome, AddOutcome::Removed { offender: offender.public.clone() });
        prop_assert!(consensus.is_removed(&offender.public));
        prop_assert!(!consensus.is_removed(&reporter.public));
    }

    /// The JSON form restores an equal registry.
    #[test]
    fn json_restores_registry(blocks in prop::collection::vec(any::<u8>(), 1..4), seed in 1u8..50) {
        let kp = keypair(seed);
        let mut consensus = Consensus::new();
        for (nonce, block) in blocks.iter().enumerate() {
            consensus.add(&BlsScheme, verification(&kp, nonce as u64, *block)).unwrap();
        }
        let merkle = consensus.get_merkle(&kp.public, 0).unwrap();
        consensus.archive(&kp.public, 0, merkle);
        let restored = Consensus::from_json(&consensus.to_json().unwrap()).unwrap();
        prop_assert_eq!(restored, consensus);
    }
}

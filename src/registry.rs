use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::suites::{KeyType, SignatureSuite, VerificationSuite};

/// The signature suites a verifier is configured with.
///
/// Built once and shared read-only. Lookups return the first registered suite
/// when several match.
#[derive(Clone, Default)]
pub struct SuiteRegistry {
    suites: Vec<Arc<dyn SignatureSuite>>,
    by_proof_type: HashMap<&'static str, usize>,
}

impl fmt::Debug for SuiteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.suites.iter().map(|suite| suite.proof_type()))
            .finish()
    }
}

impl SuiteRegistry {
    pub fn new(suites: Vec<Arc<dyn SignatureSuite>>) -> Self {
        suites
            .into_iter()
            .fold(Self::default(), |registry, suite| registry.with_suite(suite))
    }

    pub fn with_suite(mut self, suite: Arc<dyn SignatureSuite>) -> Self {
        self.by_proof_type
            .entry(suite.proof_type())
            .or_insert(self.suites.len());
        self.suites.push(suite);
        self
    }

    /// Suites in registration order.
    pub fn all(&self) -> &[Arc<dyn SignatureSuite>] {
        &self.suites
    }

    pub fn by_key_type(&self, key_type: KeyType) -> Option<&Arc<dyn SignatureSuite>> {
        self.suites.iter().find(|suite| suite.key_type() == key_type)
    }

    pub fn by_proof_type(&self, proof_type: &str) -> Option<&Arc<dyn SignatureSuite>> {
        self.by_proof_type
            .get(proof_type)
            .and_then(|index| self.suites.get(*index))
    }

    pub fn verification_suites(&self) -> Vec<VerificationSuite> {
        self.suites
            .iter()
            .map(|suite| suite.verification_suite())
            .collect()
    }

    /// Contexts of the suites resolving keys as `verification_method_type`,
    /// in registration order and without duplicates.
    pub fn contexts_for_method_type(&self, verification_method_type: &str) -> Vec<&'static str> {
        let mut contexts = Vec::new();
        for suite in &self.suites {
            if suite.verification_method_type() == verification_method_type
                && !contexts.contains(&suite.context())
            {
                contexts.push(suite.context());
            }
        }
        contexts
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::tests::NoopVerifier;
    use crate::suites::{
        BbsBlsSignature2020, EcdsaSecp256k1RecoverySignature2020, Ed25519Signature2018,
        Ed25519Signature2020,
    };

    fn registry() -> SuiteRegistry {
        let verifier = Arc::new(NoopVerifier);
        SuiteRegistry::new(vec![
            Arc::new(BbsBlsSignature2020::new(verifier.clone())),
            Arc::new(EcdsaSecp256k1RecoverySignature2020::new(verifier.clone())),
            Arc::new(Ed25519Signature2018::new(verifier.clone())),
        ])
        .with_suite(Arc::new(Ed25519Signature2020::new(verifier)))
    }

    #[test]
    fn lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 4);
        let proof_types: Vec<_> = registry.all().iter().map(|s| s.proof_type()).collect();
        assert_eq!(
            proof_types,
            vec![
                "BbsBlsSignature2020",
                "EcdsaSecp256k1RecoverySignature2020",
                "Ed25519Signature2018",
                "Ed25519Signature2020"
            ]
        );
        assert_eq!(
            registry.by_key_type(KeyType::Bls12381G2).unwrap().proof_type(),
            "BbsBlsSignature2020"
        );
        // both Ed25519 suites share the key type; the first registered wins
        assert_eq!(
            registry.by_key_type(KeyType::Ed25519).unwrap().proof_type(),
            "Ed25519Signature2018"
        );
        assert_eq!(
            registry
                .by_proof_type("Ed25519Signature2020")
                .unwrap()
                .verification_method_type(),
            "Ed25519VerificationKey2020"
        );
        assert!(registry.by_proof_type("JsonWebSignature2020").is_none());
    }

    #[test]
    fn first_registration_wins() {
        let verifier = Arc::new(NoopVerifier);
        let first: Arc<dyn SignatureSuite> = Arc::new(Ed25519Signature2018::new(verifier.clone()));
        let registry = SuiteRegistry::new(vec![
            first.clone(),
            Arc::new(Ed25519Signature2018::new(verifier)),
        ]);
        assert!(Arc::ptr_eq(
            registry.by_proof_type("Ed25519Signature2018").unwrap(),
            &first
        ));
    }

    #[test]
    fn verification_forms_in_order() {
        let suites = registry().verification_suites();
        assert_eq!(suites.len(), 4);
        assert_eq!(suites[0].proof_type, "BbsBlsSignature2020");
        assert_eq!(suites[3].verification_method_types, &["Ed25519VerificationKey2020"]);
    }

    #[test]
    fn contexts_deduplicated() {
        let verifier = Arc::new(NoopVerifier);
        let registry = registry().with_suite(Arc::new(Ed25519Signature2018::new(verifier)));
        assert_eq!(
            registry.contexts_for_method_type("Ed25519VerificationKey2018"),
            vec!["https://w3id.org/security/suites/ed25519-2018/v1"]
        );
        assert!(registry.contexts_for_method_type("JsonWebKey2020").is_empty());
        assert!(SuiteRegistry::default().is_empty());
    }
}

use std::sync::Arc;

use serde_json::Value;

use crate::did::{Document, VerificationMethod};
use crate::error::Error;
use crate::jsonld::DIF_ESRS2020_CONTEXT;
use crate::vc::Credential;

use super::{
    check_key_type, DetachedJwsSigner, KeyManager, KeyPair, KeyType, ManagedKey, ProofVerifier,
    SignatureSuite, SigningSuite, VerificationSuite,
};

const ALGORITHM: &str = "ES256K-R";

const ACCEPTED_METHOD_TYPES: &[&str] = &[
    EcdsaSecp256k1RecoverySignature2020::VERIFICATION_METHOD_TYPE,
    "EcdsaSecp256k1VerificationKey2019",
    "JsonWebKey2020",
];

/// <https://identity.foundation/EcdsaSecp256k1RecoverySignature2020/>
pub struct EcdsaSecp256k1RecoverySignature2020 {
    verifier: Arc<dyn ProofVerifier>,
}

impl EcdsaSecp256k1RecoverySignature2020 {
    pub const PROOF_TYPE: &'static str = "EcdsaSecp256k1RecoverySignature2020";
    pub const VERIFICATION_METHOD_TYPE: &'static str = "EcdsaSecp256k1RecoveryMethod2020";

    pub fn new(verifier: Arc<dyn ProofVerifier>) -> Self {
        Self { verifier }
    }
}

/// Account address part of a `blockchainAccountId`: `0xabc@eip155:1` (legacy)
/// or `eip155:1:0xabc` (CAIP-10).
fn account_address(blockchain_account_id: &str) -> &str {
    match blockchain_account_id.rfind('@') {
        Some(at) => &blockchain_account_id[..at],
        None => blockchain_account_id
            .rsplit(':')
            .next()
            .unwrap_or(blockchain_account_id),
    }
}

impl SignatureSuite for EcdsaSecp256k1RecoverySignature2020 {
    fn verification_method_type(&self) -> &'static str {
        Self::VERIFICATION_METHOD_TYPE
    }

    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }

    fn proof_type(&self) -> &'static str {
        Self::PROOF_TYPE
    }

    fn context(&self) -> &'static str {
        DIF_ESRS2020_CONTEXT
    }

    fn signing_suite(
        &self,
        key: &ManagedKey,
        issuer_did: &str,
        verification_method_id: &str,
        key_manager: Arc<dyn KeyManager>,
    ) -> Result<SigningSuite, Error> {
        check_key_type(self, key)?;
        let key_pair = KeyPair {
            id: verification_method_id.to_string(),
            type_: Self::VERIFICATION_METHOD_TYPE.to_string(),
            controller: issuer_did.to_string(),
            public_key_hex: Some(key.public_key_hex.clone()),
            ..Default::default()
        };
        Ok(SigningSuite {
            proof_type: Self::PROOF_TYPE,
            verification_method: verification_method_id.to_string(),
            key: key_pair,
            signer: Some(Arc::new(DetachedJwsSigner::new(
                key_manager,
                &key.kid,
                ALGORITHM,
            ))),
        })
    }

    fn verification_suite(&self) -> VerificationSuite {
        VerificationSuite {
            proof_type: Self::PROOF_TYPE,
            verification_method_types: ACCEPTED_METHOD_TYPES,
            verifier: self.verifier.clone(),
        }
    }

    /// did:ethr documents list `blockchainAccountId`, which the recovery method
    /// does not understand; expose the address as `ethereumAddress`.
    fn pre_did_resolution(&self, did_url: &str, document: &mut Document) {
        if !did_url.to_lowercase().starts_with("did:ethr") {
            return;
        }
        for method in document.verification_method.iter_mut().flatten() {
            if let VerificationMethod::Map(vm) = method {
                let address = match vm.get_property("blockchainAccountId") {
                    Some(Value::String(account_id)) => account_address(account_id).to_string(),
                    _ => continue,
                };
                vm.set_property("ethereumAddress", Value::String(address));
            }
        }
    }

    fn pre_signing_credential(&self, credential: &mut Credential) {
        credential.add_context(DIF_ESRS2020_CONTEXT);
    }

    fn pre_verification_credential(&self, _credential: &mut Credential) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::tests::{NoopVerifier, RecordingKeyManager};
    use serde_json::json;

    fn ethr_document() -> Document {
        serde_json::from_value(json!({
            "@context": ["https://www.w3.org/ns/did/v1"],
            "id": "did:ethr:0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736",
            "verificationMethod": [
                {
                    "id": "did:ethr:0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736#controller",
                    "type": "EcdsaSecp256k1RecoveryMethod2020",
                    "controller": "did:ethr:0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736",
                    "blockchainAccountId": "0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736@eip155:1"
                },
                {
                    "id": "did:ethr:0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736#caip10",
                    "type": "EcdsaSecp256k1RecoveryMethod2020",
                    "controller": "did:ethr:0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736",
                    "blockchainAccountId": "eip155:1:0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn ethereum_address_from_account_id() {
        let suite = EcdsaSecp256k1RecoverySignature2020::new(Arc::new(NoopVerifier));
        let mut doc = ethr_document();
        suite.pre_did_resolution("did:ethr:0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736", &mut doc);
        let json = serde_json::to_value(&doc).unwrap();
        for vm in json["verificationMethod"].as_array().unwrap() {
            assert_eq!(vm["ethereumAddress"], "0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736");
        }
        // reapplying changes nothing
        let mut again = doc.clone();
        suite.pre_did_resolution("did:ethr:0x3b0BC51Ab9De1e5B7B6E34E5b960285805C41736", &mut again);
        assert_eq!(again, doc);
    }

    #[test]
    fn other_methods_untouched() {
        let suite = EcdsaSecp256k1RecoverySignature2020::new(Arc::new(NoopVerifier));
        let mut doc = ethr_document();
        let before = doc.clone();
        suite.pre_did_resolution("did:example:123", &mut doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn signing_context_added_once() {
        let suite = EcdsaSecp256k1RecoverySignature2020::new(Arc::new(NoopVerifier));
        let mut vc: Credential = serde_json::from_value(json!({
            "@context": "https://www.w3.org/2018/credentials/v1",
            "type": "VerifiableCredential",
            "issuer": {"id": "did:example:issuer", "name": "Issuer"},
            "issuanceDate": "2021-01-01T00:00:00Z",
            "credentialSubject": {"id": "did:example:subject"}
        }))
        .unwrap();
        suite.pre_signing_credential(&mut vc);
        suite.pre_signing_credential(&mut vc);
        let json = serde_json::to_value(&vc).unwrap();
        assert_eq!(
            json["@context"],
            json!(["https://www.w3.org/2018/credentials/v1", DIF_ESRS2020_CONTEXT])
        );
    }

    #[tokio::test]
    async fn signing_suite_uses_recoverable_jws() {
        let suite = EcdsaSecp256k1RecoverySignature2020::new(Arc::new(NoopVerifier));
        let key_manager = Arc::new(RecordingKeyManager::default());
        let key = ManagedKey {
            kid: "secp-1".to_string(),
            key_type: KeyType::Secp256k1,
            public_key_hex: "02a1b2".to_string(),
            private_key_hex: None,
        };
        let signing = suite
            .signing_suite(&key, "did:example:issuer", "did:example:issuer#secp", key_manager.clone())
            .unwrap();
        assert_eq!(signing.key.public_key_hex.as_deref(), Some("02a1b2"));
        assert_eq!(signing.proof_type, EcdsaSecp256k1RecoverySignature2020::PROOF_TYPE);
        let jws = signing.sign(b"canonical").await.unwrap();
        assert!(jws.ends_with("..c2lnbmF0dXJl"));
        let calls = key_manager.calls.lock().unwrap();
        assert_eq!(calls[0].0, "secp-1");
        assert_eq!(calls[0].1, "ES256K-R");
    }

    #[test]
    fn verification_accepts_related_key_types() {
        let suite = EcdsaSecp256k1RecoverySignature2020::new(Arc::new(NoopVerifier));
        let verification = suite.verification_suite();
        assert!(verification
            .verification_method_types
            .contains(&"EcdsaSecp256k1VerificationKey2019"));
    }
}

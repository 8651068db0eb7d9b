use std::sync::Arc;

use async_trait::async_trait;

use crate::did::Document;
use crate::error::Error;
use crate::jsonld::{W3ID_ED2018_V1_CONTEXT, W3ID_ED2020_V1_CONTEXT};
use crate::vc::Credential;

use super::{
    check_key_type, DetachedJwsSigner, Encoding, KeyManager, KeyPair, KeyType, ManagedKey,
    ProofVerifier, SignatureSuite, Signer, SigningSuite, VerificationSuite,
};

const ALGORITHM: &str = "EdDSA";

// multicodec ed25519-pub
const ED25519_PUB_PREFIX: [u8; 2] = [0xed, 0x01];

/// <https://w3c-ccg.github.io/lds-ed25519-2018/>
pub struct Ed25519Signature2018 {
    verifier: Arc<dyn ProofVerifier>,
}

impl Ed25519Signature2018 {
    pub const PROOF_TYPE: &'static str = "Ed25519Signature2018";
    pub const VERIFICATION_METHOD_TYPE: &'static str = "Ed25519VerificationKey2018";

    pub fn new(verifier: Arc<dyn ProofVerifier>) -> Self {
        Self { verifier }
    }
}

impl SignatureSuite for Ed25519Signature2018 {
    fn verification_method_type(&self) -> &'static str {
        Self::VERIFICATION_METHOD_TYPE
    }

    fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    fn proof_type(&self) -> &'static str {
        Self::PROOF_TYPE
    }

    fn context(&self) -> &'static str {
        W3ID_ED2018_V1_CONTEXT
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
            public_key_base58: Some(bs58::encode(hex::decode(&key.public_key_hex)?).into_string()),
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
            verification_method_types: &[Self::VERIFICATION_METHOD_TYPE],
            verifier: self.verifier.clone(),
        }
    }

    fn pre_did_resolution(&self, _did_url: &str, _document: &mut Document) {}

    fn pre_signing_credential(&self, credential: &mut Credential) {
        credential.add_context(self.context());
    }

    fn pre_verification_credential(&self, _credential: &mut Credential) {}
}

/// <https://w3c-ccg.github.io/di-eddsa-2020/>
pub struct Ed25519Signature2020 {
    verifier: Arc<dyn ProofVerifier>,
}

impl Ed25519Signature2020 {
    pub const PROOF_TYPE: &'static str = "Ed25519Signature2020";
    pub const VERIFICATION_METHOD_TYPE: &'static str = "Ed25519VerificationKey2020";

    pub fn new(verifier: Arc<dyn ProofVerifier>) -> Self {
        Self { verifier }
    }
}

/// Signer producing a multibase (base58btc) `proofValue`.
struct MultibaseSigner {
    key_manager: Arc<dyn KeyManager>,
    kid: String,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Signer for MultibaseSigner {
    async fn sign(&self, data: &[u8]) -> Result<String, Error> {
        let signature = self
            .key_manager
            .sign(&self.kid, ALGORITHM, &base64::encode(data), Encoding::Base64)
            .await?;
        let signature = base64::decode_config(&signature, base64::URL_SAFE_NO_PAD)?;
        Ok(multibase::encode(multibase::Base::Base58Btc, signature))
    }
}

impl SignatureSuite for Ed25519Signature2020 {
    fn verification_method_type(&self) -> &'static str {
        Self::VERIFICATION_METHOD_TYPE
    }

    fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    fn proof_type(&self) -> &'static str {
        Self::PROOF_TYPE
    }

    fn context(&self) -> &'static str {
        W3ID_ED2020_V1_CONTEXT
    }

    fn signing_suite(
        &self,
        key: &ManagedKey,
        issuer_did: &str,
        verification_method_id: &str,
        key_manager: Arc<dyn KeyManager>,
    ) -> Result<SigningSuite, Error> {
        check_key_type(self, key)?;
        let public_key = [&ED25519_PUB_PREFIX[..], &hex::decode(&key.public_key_hex)?[..]].concat();
        let key_pair = KeyPair {
            id: verification_method_id.to_string(),
            type_: Self::VERIFICATION_METHOD_TYPE.to_string(),
            controller: issuer_did.to_string(),
            public_key_multibase: Some(multibase::encode(multibase::Base::Base58Btc, public_key)),
            ..Default::default()
        };
        Ok(SigningSuite {
            proof_type: Self::PROOF_TYPE,
            verification_method: verification_method_id.to_string(),
            key: key_pair,
            signer: Some(Arc::new(MultibaseSigner {
                key_manager,
                kid: key.kid.clone(),
            })),
        })
    }

    fn verification_suite(&self) -> VerificationSuite {
        VerificationSuite {
            proof_type: Self::PROOF_TYPE,
            verification_method_types: &[Self::VERIFICATION_METHOD_TYPE],
            verifier: self.verifier.clone(),
        }
    }

    fn pre_did_resolution(&self, _did_url: &str, _document: &mut Document) {}

    fn pre_signing_credential(&self, credential: &mut Credential) {
        credential.add_context(self.context());
    }

    fn pre_verification_credential(&self, _credential: &mut Credential) {}
}

//! Linked Data signature suites.
//!
//! A suite adapts one signature scheme to JSON-LD documents: it names the proof
//! and verification method types involved, the context defining their terms,
//! and the document fixes needed before signing, verifying or handing a DID
//! document to the verifier. The cryptography itself is provided by a
//! [`ProofVerifier`] (and, for signing, a [`KeyManager`]) given to the suite.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::did::Document;
use crate::error::Error;
use crate::jsonld::DocumentLoader;
use crate::ldp::{Proof, ProofPurpose};
use crate::vc::{Credential, Presentation};

pub mod bbs;
pub mod ed25519;
pub mod secp256k1_recovery;

pub use bbs::BbsBlsSignature2020;
pub use ed25519::{Ed25519Signature2018, Ed25519Signature2020};
pub use secp256k1_recovery::EcdsaSecp256k1RecoverySignature2020;

/// Key types a suite can sign with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Bls12381G2,
    Ed25519,
    Secp256k1,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bls12381G2 => "Bls12381G2",
            Self::Ed25519 => "Ed25519",
            Self::Secp256k1 => "Secp256k1",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key held by a [`KeyManager`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedKey {
    pub kid: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub public_key_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_hex: Option<String>,
}

impl fmt::Debug for ManagedKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ManagedKey")
            .field("kid", &self.kid)
            .field("key_type", &self.key_type)
            .field("public_key_hex", &self.public_key_hex)
            .finish()
    }
}

/// Encoding of the `data` passed to [`KeyManager::sign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Base64,
    Hex,
}

/// Signs data with keys it holds.
///
/// Signatures are returned base64url-encoded without padding.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait KeyManager: Send + Sync {
    async fn sign(
        &self,
        key_ref: &str,
        algorithm: &str,
        data: &str,
        encoding: Encoding,
    ) -> Result<String, Error>;
}

/// Options handed to a [`ProofVerifier`] for one proof.
pub struct VerifyOptions<'a> {
    pub proof: &'a Proof,
    /// The verification method the proof refers to, dereferenced.
    pub verification_method: &'a Map<String, Value>,
    pub purpose: &'a ProofPurpose,
    /// Loader to use when canonicalizing the document.
    pub document_loader: &'a dyn DocumentLoader,
    pub compact_proof: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerifyOutcome {
    pub verified: bool,
    pub error: Option<String>,
}

impl VerifyOutcome {
    pub fn verified() -> Self {
        Self {
            verified: true,
            error: None,
        }
    }

    pub fn failed(error: &str) -> Self {
        Self {
            verified: false,
            error: Some(error.to_string()),
        }
    }
}

/// Cryptographic verification primitive of a suite: canonicalizes `document`
/// (without its proof) and checks the proof value against the verification
/// method.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ProofVerifier: Send + Sync {
    async fn verify(&self, document: &Value, options: VerifyOptions<'_>) -> VerifyOutcome;
}

/// A suite in the form used to verify proofs.
#[derive(Clone)]
pub struct VerificationSuite {
    pub proof_type: &'static str,
    /// Verification method types the proof type accepts.
    pub verification_method_types: &'static [&'static str],
    pub verifier: Arc<dyn ProofVerifier>,
}

impl fmt::Debug for VerificationSuite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VerificationSuite")
            .field("proof_type", &self.proof_type)
            .field("verification_method_types", &self.verification_method_types)
            .finish()
    }
}

/// Produces the signature value of a proof from the canonicalized signing
/// input.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Signer: Send + Sync {
    async fn sign(&self, data: &[u8]) -> Result<String, Error>;
}

/// Verification key description a signing suite is configured with.
#[derive(Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub controller: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    #[serde(skip_serializing)]
    pub private_key_base58: Option<String>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("id", &self.id)
            .field("type_", &self.type_)
            .field("controller", &self.controller)
            .field("private_key", &self.private_key_base58.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A suite configured for signing with one key.
#[derive(Clone)]
pub struct SigningSuite {
    pub proof_type: &'static str,
    pub verification_method: String,
    pub key: KeyPair,
    /// `None` when the suite primitive signs with the key pair itself, as
    /// BBS+ multi-message signing does.
    pub signer: Option<Arc<dyn Signer>>,
}

impl fmt::Debug for SigningSuite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SigningSuite")
            .field("proof_type", &self.proof_type)
            .field("verification_method", &self.verification_method)
            .field("key", &self.key)
            .finish()
    }
}

impl SigningSuite {
    pub async fn sign(&self, data: &[u8]) -> Result<String, Error> {
        match self.signer {
            Some(ref signer) => signer.sign(data).await,
            None => Err(Error::NotImplemented(
                "Suite signs with its key pair and has no detached signer",
            )),
        }
    }
}

/// Signature suite capability set: type information, signing and
/// verification forms, and the document hooks applied around them.
///
/// Hooks mutate in place and must give the same result when applied twice.
pub trait SignatureSuite: Send + Sync {
    /// Verification method type this suite resolves keys as.
    fn verification_method_type(&self) -> &'static str;

    fn key_type(&self) -> KeyType;

    fn proof_type(&self) -> &'static str;

    /// JSON-LD context defining the suite's terms.
    fn context(&self) -> &'static str;

    fn signing_suite(
        &self,
        key: &ManagedKey,
        issuer_did: &str,
        verification_method_id: &str,
        key_manager: Arc<dyn KeyManager>,
    ) -> Result<SigningSuite, Error>;

    fn verification_suite(&self) -> VerificationSuite;

    /// Fix up a resolved DID document before it is returned by the document
    /// loader.
    fn pre_did_resolution(&self, did_url: &str, document: &mut Document);

    fn pre_signing_credential(&self, credential: &mut Credential);

    fn pre_verification_credential(&self, credential: &mut Credential);

    /// Remove an empty `verifier` array, which presentation signing rejects.
    fn pre_signing_presentation(&self, presentation: &mut Presentation) {
        if let Some(props) = presentation.property_set.as_mut() {
            if matches!(props.get("verifier"), Some(Value::Array(verifiers)) if verifiers.is_empty())
            {
                props.remove("verifier");
            }
        }
    }
}

pub(crate) fn check_key_type(suite: &dyn SignatureSuite, key: &ManagedKey) -> Result<(), Error> {
    if key.key_type != suite.key_type() {
        return Err(Error::UnsupportedKeyType(key.key_type.to_string()));
    }
    Ok(())
}

/// Signer producing a JWS with detached, unencoded payload
/// (<https://www.rfc-editor.org/rfc/rfc7797>), signed through a key manager.
pub struct DetachedJwsSigner {
    key_manager: Arc<dyn KeyManager>,
    kid: String,
    algorithm: &'static str,
}

impl DetachedJwsSigner {
    pub fn new(key_manager: Arc<dyn KeyManager>, kid: &str, algorithm: &'static str) -> Self {
        Self {
            key_manager,
            kid: kid.to_string(),
            algorithm,
        }
    }

    pub fn header(&self) -> Result<String, Error> {
        let header = json!({
            "alg": self.algorithm,
            "b64": false,
            "crit": ["b64"],
        });
        Ok(base64::encode_config(
            serde_json::to_vec(&header)?,
            base64::URL_SAFE_NO_PAD,
        ))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Signer for DetachedJwsSigner {
    async fn sign(&self, data: &[u8]) -> Result<String, Error> {
        let header = self.header()?;
        let message = [header.as_bytes(), b".", data].concat();
        let signature = self
            .key_manager
            .sign(
                &self.kid,
                self.algorithm,
                &base64::encode(&message),
                Encoding::Base64,
            )
            .await?;
        Ok(format!("{}..{}", header, signature))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Key manager recording its calls and returning a fixed signature.
    #[derive(Default)]
    pub struct RecordingKeyManager {
        pub calls: Mutex<Vec<(String, String, String, Encoding)>>,
    }

    #[async_trait]
    impl KeyManager for RecordingKeyManager {
        async fn sign(
            &self,
            key_ref: &str,
            algorithm: &str,
            data: &str,
            encoding: Encoding,
        ) -> Result<String, Error> {
            self.calls.lock().unwrap().push((
                key_ref.to_string(),
                algorithm.to_string(),
                data.to_string(),
                encoding,
            ));
            Ok(base64::encode_config(b"signature", base64::URL_SAFE_NO_PAD))
        }
    }

    pub struct NoopVerifier;

    #[async_trait]
    impl ProofVerifier for NoopVerifier {
        async fn verify(&self, _document: &Value, _options: VerifyOptions<'_>) -> VerifyOutcome {
            VerifyOutcome::verified()
        }
    }

    #[tokio::test]
    async fn detached_jws() {
        let key_manager = Arc::new(RecordingKeyManager::default());
        let signer = DetachedJwsSigner::new(key_manager.clone(), "kid-1", "ES256K-R");
        let jws = signer.sign(b"payload").await.unwrap();
        let header = "eyJhbGciOiJFUzI1NkstUiIsImI2NCI6ZmFsc2UsImNyaXQiOlsiYjY0Il19";
        assert_eq!(signer.header().unwrap(), header);
        assert_eq!(jws, format!("{}..c2lnbmF0dXJl", header));
        let calls = key_manager.calls.lock().unwrap();
        let (kid, alg, data, encoding) = &calls[0];
        assert_eq!(kid, "kid-1");
        assert_eq!(alg, "ES256K-R");
        assert_eq!(*encoding, Encoding::Base64);
        assert_eq!(
            base64::decode(data).unwrap(),
            format!("{}.payload", header).into_bytes()
        );
    }

    #[test]
    fn empty_verifier_removed_before_signing() {
        let mut presentation: Presentation = serde_json::from_value(json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiablePresentation"],
            "verifier": []
        }))
        .unwrap();
        let suite = Ed25519Signature2018::new(Arc::new(NoopVerifier));
        suite.pre_signing_presentation(&mut presentation);
        let json = serde_json::to_value(&presentation).unwrap();
        assert!(json.get("verifier").is_none());

        let mut presentation: Presentation = serde_json::from_value(json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiablePresentation"],
            "verifier": ["did:example:verifier"]
        }))
        .unwrap();
        suite.pre_signing_presentation(&mut presentation);
        let json = serde_json::to_value(&presentation).unwrap();
        assert_eq!(json["verifier"], json!(["did:example:verifier"]));
    }
}

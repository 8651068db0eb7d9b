use std::sync::Arc;

use crate::did::Document;
use crate::error::Error;
use crate::jsonld::BBS_V1_CONTEXT;
use crate::vc::Credential;

use super::{
    check_key_type, KeyManager, KeyPair, KeyType, ManagedKey, ProofVerifier, SignatureSuite,
    SigningSuite, VerificationSuite,
};


/// BBS+ signatures over BLS12-381 (<https://w3c-ccg.github.io/ldp-bbs2020/>).
///
/// Signs each canonicalized statement as a separate message, so verification
/// goes through [`LinkedDataProofs::verify`](crate::ldp::LinkedDataProofs::verify)
/// with this suite alone.
pub struct BbsBlsSignature2020 {
    verifier: Arc<dyn ProofVerifier>,
}

impl BbsBlsSignature2020 {
    pub const PROOF_TYPE: &'static str = "BbsBlsSignature2020";
    pub const VERIFICATION_METHOD_TYPE: &'static str = "Bls12381G2Key2020";

    pub fn new(verifier: Arc<dyn ProofVerifier>) -> Self {
        Self { verifier }
    }
}

fn hex_to_base58(hex_key: &str) -> Result<String, Error> {
    Ok(bs58::encode(hex::decode(hex_key)?).into_string())
}

impl SignatureSuite for BbsBlsSignature2020 {
    fn verification_method_type(&self) -> &'static str {
        Self::VERIFICATION_METHOD_TYPE
    }

    fn key_type(&self) -> KeyType {
        KeyType::Bls12381G2
    }

    fn proof_type(&self) -> &'static str {
        Self::PROOF_TYPE
    }

    fn context(&self) -> &'static str {
        BBS_V1_CONTEXT
    }

    fn signing_suite(
        &self,
        key: &ManagedKey,
        issuer_did: &str,
        verification_method_id: &str,
        _key_manager: Arc<dyn KeyManager>,
    ) -> Result<SigningSuite, Error> {
        check_key_type(self, key)?;
        let private_key_hex = key.private_key_hex.as_deref().ok_or(Error::MissingPrivateKey)?;
        let key_pair = KeyPair {
            id: verification_method_id.to_string(),
            type_: Self::VERIFICATION_METHOD_TYPE.to_string(),
            controller: issuer_did.to_string(),
            public_key_base58: Some(hex_to_base58(&key.public_key_hex)?),
            private_key_base58: Some(hex_to_base58(private_key_hex)?),
            ..Default::default()
        };
        Ok(SigningSuite {
            proof_type: Self::PROOF_TYPE,
            verification_method: verification_method_id.to_string(),
            key: key_pair,
            signer: None,
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

    fn pre_signing_credential(&self, _credential: &mut Credential) {}

    /// BBS+ proofs need the BBS context to expand their terms; add it when a
    /// credential uses the suite without declaring it.
    fn pre_verification_credential(&self, credential: &mut Credential) {
        let serialized = match serde_json::to_string(credential) {
            Ok(serialized) => serialized,
            Err(err) => {
                log::warn!("Unable to serialize credential: {}", err);
                return;
            }
        };
        if serialized.contains(Self::PROOF_TYPE) && !serialized.contains(BBS_V1_CONTEXT) {
            credential.add_context(BBS_V1_CONTEXT);
        }
    }
}

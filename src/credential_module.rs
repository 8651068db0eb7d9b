//! Verification entry points for Linked Data credentials and presentations.

use std::sync::Arc;

use serde_json::Value;

use crate::did_resolve::Resolver;
use crate::document_loader::LdDocumentLoader;
use crate::error::Error;
use crate::jsonld::{ContextStore, DocumentLoader};
use crate::ldp::{LinkedDataProofs, Proof, ProofPurpose, VerificationResult};
use crate::one_or_many::OneOrMany;
use crate::registry::SuiteRegistry;
use crate::suites::{BbsBlsSignature2020, KeyType};
use crate::vc::{CheckStatus, Credential, Presentation};

/// Verifies credentials and presentations with the configured signature
/// suites, loading contexts and DID documents through an [`LdDocumentLoader`].
pub struct LdCredentialModule {
    registry: Arc<SuiteRegistry>,
    document_loader: LdDocumentLoader,
}

/// How a document carries its proof.
enum ProofShape<'a> {
    None,
    Single(&'a Proof),
    Chain,
}

fn proof_shape(proof: &Option<OneOrMany<Proof>>) -> ProofShape<'_> {
    match proof {
        None => ProofShape::None,
        Some(OneOrMany::One(proof)) => ProofShape::Single(proof),
        Some(OneOrMany::Many(_)) => ProofShape::Chain,
    }
}

impl LdCredentialModule {
    pub fn new(context_store: Arc<dyn ContextStore>, registry: Arc<SuiteRegistry>) -> Self {
        Self {
            document_loader: LdDocumentLoader::new(context_store, registry.clone()),
            registry,
        }
    }

    /// Loader for URLs that are neither DIDs nor known contexts.
    pub fn with_fallback_loader(mut self, fallback: Arc<dyn DocumentLoader>) -> Self {
        self.document_loader = self.document_loader.with_fallback(fallback);
        self
    }

    pub fn registry(&self) -> &SuiteRegistry {
        &self.registry
    }

    pub fn document_loader(&self) -> &LdDocumentLoader {
        &self.document_loader
    }

    /// Verify a credential's proof. `purpose` defaults to assertion.
    ///
    /// The suites' pre-verification hooks are applied to `credential` first.
    /// Any verification failure is reported as
    /// [`Error::CredentialVerification`], with the details logged at debug
    /// level.
    pub async fn verify_credential(
        &self,
        credential: &mut Credential,
        resolver: &dyn Resolver,
        fetch_remote_contexts: bool,
        purpose: Option<ProofPurpose>,
        check_status: Option<&dyn CheckStatus>,
    ) -> Result<bool, Error> {
        for suite in self.registry.all() {
            suite.pre_verification_credential(credential);
        }
        let shape = proof_shape(&credential.proof);
        if let ProofShape::Chain = shape {
            return Err(Error::NotImplemented(
                "LinkedDataProofChain is not implemented",
            ));
        }
        let purpose = purpose.unwrap_or_default();
        let loader = self
            .document_loader
            .loader(resolver, fetch_remote_contexts);

        let result = match shape {
            ProofShape::Single(proof) if proof.type_ == BbsBlsSignature2020::PROOF_TYPE => {
                self.verify_bbs(&*credential, &purpose, &loader).await
            }
            _ => {
                credential
                    .verify(
                        &self.registry.verification_suites(),
                        &purpose,
                        &loader,
                        false,
                        check_status,
                    )
                    .await
            }
        };
        if result.is_ok() {
            return Ok(true);
        }
        log_failure(&Error::CredentialVerification, &result);
        Err(Error::CredentialVerification)
    }

    /// Verify a presentation's proof and its embedded credentials.
    ///
    /// Without `purpose`, authentication bound to `challenge` and `domain` is
    /// required when either is given, assertion otherwise.
    pub async fn verify_presentation(
        &self,
        presentation: &Presentation,
        challenge: Option<&str>,
        domain: Option<&str>,
        resolver: &dyn Resolver,
        fetch_remote_contexts: bool,
        purpose: Option<ProofPurpose>,
        check_status: Option<&dyn CheckStatus>,
    ) -> Result<bool, Error> {
        let shape = proof_shape(&presentation.proof);
        if let ProofShape::Chain = shape {
            return Err(Error::NotImplemented(
                "LinkedDataProofChain is not implemented",
            ));
        }
        let purpose = purpose.unwrap_or_else(|| ProofPurpose::for_presentation(challenge, domain));
        let loader = self
            .document_loader
            .loader(resolver, fetch_remote_contexts);

        let result = match shape {
            ProofShape::Single(proof) if proof.type_ == BbsBlsSignature2020::PROOF_TYPE => {
                self.verify_bbs(presentation, &purpose, &loader).await
            }
            _ => {
                presentation
                    .verify(
                        &self.registry.verification_suites(),
                        &purpose,
                        &loader,
                        false,
                        check_status,
                    )
                    .await
            }
        };
        if result.is_ok() {
            return Ok(true);
        }
        log_failure(&Error::PresentationVerification, &result);
        Err(Error::PresentationVerification)
    }

    /// BBS+ proofs are checked by the BBS+ suite alone, without credential
    /// structure or status checks.
    async fn verify_bbs<T: serde::Serialize>(
        &self,
        document: &T,
        purpose: &ProofPurpose,
        loader: &dyn DocumentLoader,
    ) -> VerificationResult {
        let suite = match self.registry.by_key_type(KeyType::Bls12381G2) {
            Some(suite) => suite.verification_suite(),
            None => {
                return VerificationResult::error(
                    &Error::ProofTypeNotSupported(BbsBlsSignature2020::PROOF_TYPE.to_string()).to_string(),
                )
            }
        };
        let document: Value = match serde_json::to_value(document) {
            Ok(document) => document,
            Err(err) => return VerificationResult::error(&Error::Json(err).to_string()),
        };
        LinkedDataProofs::verify(&document, &[suite], purpose, loader, false).await
    }
}

fn log_failure(err: &Error, result: &VerificationResult) {
    match serde_json::to_string_pretty(result) {
        Ok(result) => log::debug!("{}: {}", err, result),
        Err(_) => log::debug!("{}: {:?}", err, result),
    }
}

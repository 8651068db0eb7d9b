//! Verification of [Linked Data Proofs][ld-proofs] on
//! [W3C Verifiable Credentials and Presentations][vc-data-model], with signer
//! keys resolved through [Decentralized Identifiers (DIDs)][dids].
//!
//! The [`LdCredentialModule`] is the entry point. It is configured with a
//! [`ContextStore`](jsonld::ContextStore) of known JSON-LD contexts and a
//! [`SuiteRegistry`] of [signature suites](suites), and verifies documents
//! against a caller-supplied DID [`Resolver`](did_resolve::Resolver).
//!
//! Signature suites do not implement cryptography themselves: each suite is
//! given a [`ProofVerifier`](suites::ProofVerifier) performing JSON-LD
//! canonicalization and signature checking for its proof type.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ssi_ld_credentials::did_resolve::{DIDResolutionAdapter, SeriesResolver};
//! use ssi_ld_credentials::jsonld::ContextLoader;
//! use ssi_ld_credentials::suites::{Ed25519Signature2018, ProofVerifier, SignatureSuite};
//! use ssi_ld_credentials::vc::Credential;
//! use ssi_ld_credentials::{LdCredentialModule, SuiteRegistry};
//!
//! # async fn verify(verifier: Arc<dyn ProofVerifier>, json: &str) -> Result<(), ssi_ld_credentials::error::Error> {
//! let suites: Vec<Arc<dyn SignatureSuite>> = vec![Arc::new(Ed25519Signature2018::new(verifier))];
//! let module = LdCredentialModule::new(
//!     Arc::new(ContextLoader::default()),
//!     Arc::new(SuiteRegistry::new(suites)),
//! );
//! let resolver = DIDResolutionAdapter::new(Arc::new(SeriesResolver { resolvers: vec![] }));
//! let mut credential = Credential::from_json(json)?;
//! module
//!     .verify_credential(&mut credential, &resolver, false, None, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! [ld-proofs]: <https://w3c-ccg.github.io/ld-proofs/>
//! [vc-data-model]: <https://www.w3.org/TR/vc-data-model/>
//! [dids]: <https://www.w3.org/TR/did-core/>

pub mod credential_module;
pub mod did;
pub mod did_resolve;
pub mod document_loader;
pub mod error;
pub mod jsonld;
pub mod ldp;
pub mod one_or_many;
pub mod registry;
pub mod suites;
pub mod vc;

pub use credential_module::LdCredentialModule;
pub use document_loader::{BoundLoader, LdDocumentLoader};
pub use error::Error;
pub use registry::SuiteRegistry;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn shared_components_are_thread_safe() {
        assert_send_sync::<LdCredentialModule>();
        assert_send_sync::<LdDocumentLoader>();
        assert_send_sync::<SuiteRegistry>();
        assert_send_sync::<Arc<dyn suites::SignatureSuite>>();
    }
}

//! Verification futures must be `Send` so they can be spawned on a
//! multi-threaded runtime. Async trait methods taking trait objects by
//! reference make this easy to break without noticing.
use std::future::Future;
use std::sync::Arc;

use ssi_ld_credentials::did_resolve::{DIDResolutionAdapter, SeriesResolver};
use ssi_ld_credentials::jsonld::{ContextLoader, DocumentLoader};
use ssi_ld_credentials::vc::{Credential, Presentation};
use ssi_ld_credentials::{LdCredentialModule, SuiteRegistry};

fn assert_send(f: impl Send + Future) {
    drop(f)
}

fn module() -> LdCredentialModule {
    LdCredentialModule::new(
        Arc::new(ContextLoader::default()),
        Arc::new(SuiteRegistry::default()),
    )
}

fn resolver() -> DIDResolutionAdapter {
    DIDResolutionAdapter::new(Arc::new(SeriesResolver { resolvers: vec![] }))
}

#[test]
fn verify_credential_is_send() {
    let module = module();
    let resolver = resolver();
    let mut credential: Credential = serde_json::from_value(serde_json::json!({
        "@context": "https://www.w3.org/2018/credentials/v1",
        "type": "VerifiableCredential",
        "issuer": "did:example:issuer",
        "credentialSubject": {}
    }))
    .unwrap();
    assert_send(module.verify_credential(&mut credential, &resolver, false, None, None));
}

#[test]
fn verify_presentation_is_send() {
    let module = module();
    let resolver = resolver();
    let presentation: Presentation = serde_json::from_value(serde_json::json!({
        "@context": "https://www.w3.org/2018/credentials/v1",
        "type": "VerifiablePresentation"
    }))
    .unwrap();
    assert_send(module.verify_presentation(
        &presentation,
        Some("challenge"),
        None,
        &resolver,
        true,
        None,
        None,
    ));
}

#[test]
fn bound_loader_is_send() {
    let module = module();
    let resolver = resolver();
    let loader = module.document_loader().loader(&resolver, true);
    assert_send(loader.load("https://www.w3.org/2018/credentials/v1"));
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::prelude::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// https://w3c-ccg.github.io/did-resolution/

use crate::did::{
    did_from_url, Document, DocumentSection, Service, VerificationMethod, VerificationMethodMap,
};
use crate::error::Error;
use crate::jsonld::DID_RESOLUTION_V1_CONTEXT;

pub const TYPE_DID_LD_JSON: &str = "application/did+ld+json";
pub const ERROR_INVALID_DID: &str = "invalidDid";
pub const ERROR_NOT_FOUND: &str = "notFound";
pub const ERROR_METHOD_NOT_SUPPORTED: &str = "methodNotSupported";
pub const ERROR_REPRESENTATION_NOT_SUPPORTED: &str = "representationNotSupported";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Metadata {
    String(String),
    Map(HashMap<String, Metadata>),
    List(Vec<Metadata>),
    Boolean(bool),
    Null,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInputMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_cache: Option<bool>,
    #[serde(flatten)]
    pub property_set: Option<HashMap<String, Metadata>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
/// <https://www.w3.org/TR/did-core/#did-resolution-metadata>
pub struct ResolutionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(flatten)]
    pub property_set: Option<HashMap<String, Metadata>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
/// <https://www.w3.org/TR/did-core/#did-document-metadata>
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
    #[serde(flatten)]
    pub property_set: Option<HashMap<String, Metadata>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
/// <https://w3c-ccg.github.io/did-resolution/#did-resolution-result>
pub struct ResolutionResult {
    #[serde(rename = "@context")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub did_document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_resolution_metadata: Option<ResolutionMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_document_metadata: Option<DocumentMetadata>,
    #[serde(flatten)]
    pub property_set: Option<HashMap<String, Value>>,
}

impl Default for ResolutionResult {
    fn default() -> Self {
        Self {
            context: Some(Value::String(DID_RESOLUTION_V1_CONTEXT.to_string())),
            did_document: None,
            did_resolution_metadata: None,
            did_document_metadata: None,
            property_set: None,
        }
    }
}

impl ResolutionMetadata {
    pub fn from_error(err: &str) -> Self {
        ResolutionMetadata {
            error: Some(err.to_string()),
            content_type: None,
            property_set: None,
        }
    }
}

/// A DID resolution backend: one DID method driver, a universal resolver
/// binding, or a combination of those.
///
/// A missing document is reported through the returned metadata, never by
/// panicking.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DIDResolver: Send + Sync {
    async fn resolve(
        &self,
        did: &str,
        input_metadata: &ResolutionInputMetadata,
    ) -> (
        ResolutionMetadata,
        Option<Document>,
        Option<DocumentMetadata>,
    );
}

/// Compose multiple DID resolvers in series. The first resolver that
/// supports the method of the requested DID is used.
pub struct SeriesResolver {
    pub resolvers: Vec<Arc<dyn DIDResolver>>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl DIDResolver for SeriesResolver {
    async fn resolve(
        &self,
        did: &str,
        input_metadata: &ResolutionInputMetadata,
    ) -> (
        ResolutionMetadata,
        Option<Document>,
        Option<DocumentMetadata>,
    ) {
        for resolver in &self.resolvers {
            let (res_meta, doc_opt, doc_meta_opt) = resolver.resolve(did, input_metadata).await;
            let method_supported = match res_meta.error {
                None => true,
                Some(ref err) => err != ERROR_METHOD_NOT_SUPPORTED,
            };
            if method_supported {
                return (res_meta, doc_opt, doc_meta_opt);
            }
        }
        (
            ResolutionMetadata::from_error(ERROR_METHOD_NOT_SUPPORTED),
            None,
            None,
        )
    }
}

/// DID resolver using the HTTP(S) binding of a DID resolution service such
/// as the Universal Resolver.
/// <https://w3c-ccg.github.io/did-resolution/#bindings-https>
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HTTPDIDResolver {
    pub endpoint: String,
}

#[cfg(feature = "http")]
impl HTTPDIDResolver {
    /// `url` is the resolver endpoint the DID is appended to, e.g.
    /// `https://dev.uniresolver.io/1.0/identifiers/`.
    pub fn new(url: &str) -> Self {
        Self {
            endpoint: url.to_string(),
        }
    }

    async fn fetch(
        &self,
        did: &str,
        input_metadata: &ResolutionInputMetadata,
    ) -> Result<(reqwest::StatusCode, ResolutionResult), String> {
        let querystring = serde_urlencoded::to_string(input_metadata).map_err(|err| {
            format!("Unable to serialize input metadata into query string: {}", err)
        })?;
        let did_urlencoded =
            percent_encoding::utf8_percent_encode(did, percent_encoding::CONTROLS).to_string();
        let mut url = self.endpoint.clone() + &did_urlencoded;
        if !querystring.is_empty() {
            url = url + "?" + &querystring;
        }
        let accept = input_metadata
            .accept
            .clone()
            .unwrap_or_else(|| "application/json".to_string());
        let resp = reqwest::Client::new()
            .get(&url)
            .header("Accept", accept)
            .send()
            .await
            .map_err(|err| format!("HTTP Error: {}", err))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| format!("Error reading HTTP response: {}", err))?;
        let result = match serde_json::from_slice::<ResolutionResult>(&bytes) {
            Ok(result)
                if result.did_document.is_some() || result.did_resolution_metadata.is_some() =>
            {
                result
            }
            // Some resolvers answer with the bare DID document.
            _ => match serde_json::from_slice::<Document>(&bytes) {
                Ok(doc) => ResolutionResult {
                    did_document: Some(doc),
                    ..Default::default()
                },
                Err(err) => ResolutionResult {
                    did_resolution_metadata: Some(ResolutionMetadata::from_error(&format!(
                        "JSON Error: {}",
                        err
                    ))),
                    ..Default::default()
                },
            },
        };
        Ok((status, result))
    }
}

#[cfg(feature = "http")]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl DIDResolver for HTTPDIDResolver {
    async fn resolve(
        &self,
        did: &str,
        input_metadata: &ResolutionInputMetadata,
    ) -> (
        ResolutionMetadata,
        Option<Document>,
        Option<DocumentMetadata>,
    ) {
        let (status, result) = match self.fetch(did, input_metadata).await {
            Ok(fetched) => fetched,
            Err(err) => return (ResolutionMetadata::from_error(&err), None, None),
        };
        let mut res_meta = result.did_resolution_metadata.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            res_meta.error = Some(ERROR_NOT_FOUND.to_string());
        } else if !status.is_success() && res_meta.error.is_none() {
            res_meta.error = Some(format!("HTTP Error: {}", status));
        }
        (res_meta, result.did_document, result.did_document_metadata)
    }
}

/// A verification method or service located inside a DID document.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DIDComponent {
    VerificationMethod(VerificationMethodMap),
    Service(Service),
}

impl DIDComponent {
    pub fn id(&self) -> &str {
        match self {
            Self::VerificationMethod(vm) => &vm.id,
            Self::Service(service) => &service.id,
        }
    }

    /// Type of the component. For services with several types the first is
    /// returned.
    pub fn type_(&self) -> Option<&str> {
        match self {
            Self::VerificationMethod(vm) => Some(&vm.type_),
            Self::Service(service) => service.type_.first().map(String::as_str),
        }
    }
}

/// DID resolution as consumed by the document loader: resolve a DID URL to its
/// document and locate fragments inside a document.
///
/// Implementations must be usable from concurrent verification calls.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Resolver: Send + Sync {
    async fn resolve_did(
        &self,
        did_url: &str,
        options: Option<ResolutionInputMetadata>,
    ) -> ResolutionResult;

    fn get_did_component_by_id(
        &self,
        document: &mut Document,
        did_url: &str,
        section: Option<DocumentSection>,
    ) -> Result<DIDComponent, Error> {
        get_did_component_by_id(document, did_url, section)
    }
}

/// [`Resolver`] over any [`DIDResolver`] backend.
pub struct DIDResolutionAdapter {
    resolver: Arc<dyn DIDResolver>,
}

impl DIDResolutionAdapter {
    pub fn new(resolver: Arc<dyn DIDResolver>) -> Self {
        Self { resolver }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Resolver for DIDResolutionAdapter {
    async fn resolve_did(
        &self,
        did_url: &str,
        options: Option<ResolutionInputMetadata>,
    ) -> ResolutionResult {
        log::debug!("Resolving {}", did_url);
        let mut input_metadata = options.unwrap_or_default();
        if input_metadata.accept.is_none() {
            input_metadata.accept = Some(TYPE_DID_LD_JSON.to_string());
        }
        let did = did_from_url(did_url).unwrap_or(did_url);
        let (res_meta, doc_opt, doc_meta_opt) = self.resolver.resolve(did, &input_metadata).await;
        // Backends may leave metadata out; callers always get both maps.
        ResolutionResult {
            did_document: doc_opt,
            did_resolution_metadata: Some(res_meta),
            did_document_metadata: Some(doc_meta_opt.unwrap_or_default()),
            ..Default::default()
        }
    }
}

const MAIN_SECTIONS: [DocumentSection; 3] = [
    DocumentSection::VerificationMethod,
    DocumentSection::PublicKey,
    DocumentSection::Service,
];

/// Position of a candidate inside a document: section and index.
type Slot = (DocumentSection, usize);

fn matches_id(id: &str, did: &str, did_url: &str) -> bool {
    id == did_url || format!("{}{}", did, id) == did_url
}

/// Find the first entry of `sections` matching `did_url`. String references
/// are only considered when `include_references` is set.
fn find_slot(
    document: &Document,
    sections: &[DocumentSection],
    did: &str,
    did_url: &str,
    include_references: bool,
) -> Option<(Slot, bool)> {
    for section in sections {
        if *section == DocumentSection::Service {
            let services = document.service.iter().flatten();
            for (i, service) in services.enumerate() {
                if matches_id(&service.id, did, did_url) {
                    return Some(((*section, i), false));
                }
            }
            continue;
        }
        for (i, method) in document.methods(*section).into_iter().flatten().enumerate() {
            let is_reference = matches!(method, VerificationMethod::DIDURL(_));
            if is_reference && !include_references {
                continue;
            }
            if matches_id(method.id(), did, did_url) {
                return Some(((*section, i), is_reference));
            }
        }
    }
    None
}

/// Locate a verification method or service in a DID document.
///
/// `did_url` matches an entry when it equals the entry's id or the DID
/// concatenated with the id, so documents using bare `#fragment` ids are found
/// by absolute DID URL. Without `section` the search covers
/// `verificationMethod`, `publicKey` and `service` in that order. A matching
/// reference is dereferenced against `verificationMethod` and `publicKey`.
///
/// The matched entry's id is rewritten in place to the absolute form when it
/// is a bare fragment. The first match wins when several entries collide.
pub fn get_did_component_by_id(
    document: &mut Document,
    did_url: &str,
    section: Option<DocumentSection>,
) -> Result<DIDComponent, Error> {
    log::debug!("Resolving {}", did_url);
    let did = did_from_url(did_url).unwrap_or(&document.id).to_string();
    let sections: &[DocumentSection] = match section {
        Some(ref section) => std::slice::from_ref(section),
        None => &MAIN_SECTIONS,
    };
    let not_found = || {
        let err = Error::ComponentNotFound(did_url.to_string());
        log::debug!("{}", err);
        err
    };
    let (mut slot, is_reference) =
        find_slot(document, sections, &did, did_url, true).ok_or_else(not_found)?;
    if is_reference {
        slot = find_slot(document, &MAIN_SECTIONS[..2], &did, did_url, false)
            .ok_or_else(not_found)?
            .0;
    }
    let (section, index) = slot;
    let component = if section == DocumentSection::Service {
        let service = document
            .service
            .as_mut()
            .and_then(|services| services.get_mut(index))
            .ok_or_else(not_found)?;
        if service.id.starts_with('#') {
            service.id = format!("{}{}", did, service.id);
        }
        DIDComponent::Service(service.clone())
    } else {
        let method = document
            .methods_mut(section)
            .and_then(|methods| methods.get_mut(index))
            .ok_or_else(not_found)?;
        match method {
            VerificationMethod::Map(vm) => {
                if vm.id.starts_with('#') {
                    vm.id = format!("{}{}", did, vm.id);
                }
                DIDComponent::VerificationMethod(vm.clone())
            }
            VerificationMethod::DIDURL(_) => return Err(not_found()),
        }
    };
    Ok(component)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const EXAMPLE_123_JSON: &str = r##"{
        "@context": "https://www.w3.org/ns/did/v1",
        "id": "did:example:123",
        "verificationMethod": [
            {
                "id": "#key-1",
                "type": "Ed25519VerificationKey2018",
                "controller": "did:example:123",
                "publicKeyBase58": "H3C2AVvLMv6gmMNam3uVAjZpfkcJCwDwnZn6z3wXmqPV"
            },
            {
                "id": "did:example:123#key-2",
                "type": "Bls12381G2Key2020",
                "controller": "did:example:123",
                "publicKeyBase58": "25EEkQtcLKsEzQ6JTo9cg4W7NHpaurn4Wg6LaNPFq6JQXnrP91SDviUz7KrJVMJd76CtAZFsRLYzvgX2JGxo2ccUHtuHk7ELCWwrkBDfrXCFVfqJKDootee9iVaF6NpdJtBE"
            }
        ],
        "authentication": ["#key-1"],
        "assertionMethod": ["#key-1", "did:example:123#key-2"],
        "service": [{
            "id": "#hub",
            "type": "LinkedDomains",
            "serviceEndpoint": "https://example.com/"
        }]
    }"##;

    pub struct ExampleResolver;

    #[async_trait]
    impl DIDResolver for ExampleResolver {
        async fn resolve(
            &self,
            did: &str,
            input_metadata: &ResolutionInputMetadata,
        ) -> (
            ResolutionMetadata,
            Option<Document>,
            Option<DocumentMetadata>,
        ) {
            assert_eq!(input_metadata.accept.as_deref(), Some(TYPE_DID_LD_JSON));
            if !did.starts_with("did:example:") {
                return (
                    ResolutionMetadata::from_error(ERROR_METHOD_NOT_SUPPORTED),
                    None,
                    None,
                );
            }
            if did != "did:example:123" {
                return (ResolutionMetadata::from_error(ERROR_NOT_FOUND), None, None);
            }
            let doc = Document::from_json(EXAMPLE_123_JSON).unwrap();
            (ResolutionMetadata::default(), Some(doc), None)
        }
    }

    #[test]
    fn component_with_bare_fragment_id_is_rewritten() {
        let mut doc = Document::from_json(EXAMPLE_123_JSON).unwrap();
        let component = get_did_component_by_id(&mut doc, "did:example:123#key-1", None).unwrap();
        assert_eq!(component.id(), "did:example:123#key-1");
        assert_eq!(component.type_(), Some("Ed25519VerificationKey2018"));
        // rewritten in the document too
        let methods = doc.verification_method.as_ref().unwrap();
        assert_eq!(methods[0].id(), "did:example:123#key-1");
    }

    #[test]
    fn component_with_absolute_id() {
        let mut doc = Document::from_json(EXAMPLE_123_JSON).unwrap();
        let component = get_did_component_by_id(&mut doc, "did:example:123#key-2", None).unwrap();
        assert_eq!(component.type_(), Some("Bls12381G2Key2020"));
    }

    #[test]
    fn service_component() {
        let mut doc = Document::from_json(EXAMPLE_123_JSON).unwrap();
        let component = get_did_component_by_id(&mut doc, "did:example:123#hub", None).unwrap();
        match component {
            DIDComponent::Service(service) => {
                assert_eq!(service.id, "did:example:123#hub");
                assert_eq!(
                    service.service_endpoint,
                    Some(Value::String("https://example.com/".to_string()))
                );
            }
            other => panic!("expected service, found {:?}", other),
        }
    }

    #[test]
    fn reference_in_section_is_dereferenced() {
        let mut doc = Document::from_json(EXAMPLE_123_JSON).unwrap();
        let component = get_did_component_by_id(
            &mut doc,
            "did:example:123#key-1",
            Some(DocumentSection::AssertionMethod),
        )
        .unwrap();
        match component {
            DIDComponent::VerificationMethod(vm) => {
                assert_eq!(vm.id, "did:example:123#key-1");
                assert_eq!(vm.controller, "did:example:123");
            }
            other => panic!("expected verification method, found {:?}", other),
        }
    }

    #[test]
    fn missing_fragment_is_not_found() {
        let mut doc = Document::from_json(EXAMPLE_123_JSON).unwrap();
        let err = get_did_component_by_id(&mut doc, "did:example:123#nope", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "not_found: DID document fragment (did:example:123#nope) could not be located."
        );
    }

    #[test]
    fn bare_fragment_url_uses_document_id() {
        let mut doc = Document::from_json(EXAMPLE_123_JSON).unwrap();
        let component = get_did_component_by_id(&mut doc, "#key-1", None).unwrap();
        assert_eq!(component.id(), "did:example:123#key-1");
    }

    #[tokio::test]
    async fn adapter_fills_canned_response() {
        let adapter = DIDResolutionAdapter::new(Arc::new(ExampleResolver));
        let result = adapter.resolve_did("did:example:123#key-1", None).await;
        assert_eq!(result.did_document.unwrap().id, "did:example:123");
        assert_eq!(result.did_resolution_metadata, Some(ResolutionMetadata::default()));
        assert_eq!(result.did_document_metadata, Some(DocumentMetadata::default()));

        let result = adapter.resolve_did("did:example:456", None).await;
        assert!(result.did_document.is_none());
        assert_eq!(
            result.did_resolution_metadata.unwrap().error.as_deref(),
            Some(ERROR_NOT_FOUND)
        );
    }

    #[tokio::test]
    async fn series_resolver_skips_unsupported_methods() {
        struct NoneResolver;
        #[async_trait]
        impl DIDResolver for NoneResolver {
            async fn resolve(
                &self,
                _did: &str,
                _input_metadata: &ResolutionInputMetadata,
            ) -> (
                ResolutionMetadata,
                Option<Document>,
                Option<DocumentMetadata>,
            ) {
                (
                    ResolutionMetadata::from_error(ERROR_METHOD_NOT_SUPPORTED),
                    None,
                    None,
                )
            }
        }
        let series = SeriesResolver {
            resolvers: vec![Arc::new(NoneResolver), Arc::new(ExampleResolver)],
        };
        let input = ResolutionInputMetadata {
            accept: Some(TYPE_DID_LD_JSON.to_string()),
            ..Default::default()
        };
        let (res_meta, doc, _) = series.resolve("did:example:123", &input).await;
        assert_eq!(res_meta.error, None);
        assert!(doc.is_some());
        let (res_meta, doc, _) = series.resolve("did:other:abc", &input).await;
        assert_eq!(res_meta.error.as_deref(), Some(ERROR_METHOD_NOT_SUPPORTED));
        assert!(doc.is_none());
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::Error;

pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const CREDENTIALS_EXAMPLES_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/examples/v1";
pub const ODRL_CONTEXT: &str = "https://www.w3.org/ns/odrl.jsonld";
pub const SECURITY_V1_CONTEXT: &str = "https://w3id.org/security/v1";
pub const SECURITY_V2_CONTEXT: &str = "https://w3id.org/security/v2";
pub const SCHEMA_ORG_CONTEXT: &str = "https://schema.org/";
pub const DID_V1_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
pub const W3ID_DID_V1_CONTEXT: &str = "https://w3id.org/did/v1";
pub const DID_RESOLUTION_V1_CONTEXT: &str = "https://w3id.org/did-resolution/v1";
pub const DIF_ESRS2020_CONTEXT: &str = "https://identity.foundation/EcdsaSecp256k1RecoverySignature2020/lds-ecdsa-secp256k1-recovery2020-0.0.jsonld";
pub const LDS_JWS2020_V1_CONTEXT: &str =
    "https://w3c-ccg.github.io/lds-jws2020/contexts/lds-jws2020-v1.json";
pub const W3ID_ED2018_V1_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2018/v1";
pub const W3ID_ED2020_V1_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";
pub const CITIZENSHIP_V1_CONTEXT: &str = "https://w3id.org/citizenship/v1";
pub const VACCINATION_V1_CONTEXT: &str = "https://w3id.org/vaccination/v1";
pub const TRACEABILITY_CONTEXT: &str = "https://w3id.org/traceability/v1";
pub const BBS_V1_CONTEXT: &str = "https://w3id.org/security/bbs/v1";

/// <https://w3id.org/security/suites/ed25519-2018/v1>
const W3ID_ED2018_V1: &str = include_str!("../contexts/w3id-ed25519-signature-2018-v1.jsonld");

// The recovery suite still signs with the DIF context URL.
#[allow(deprecated)]
const DIF_ESRS2020: &str = ssi_contexts::DIF_ESRS2020;

lazy_static::lazy_static! {
    static ref STATIC_CONTEXTS: HashMap<&'static str, Value> = {
        let documents = [
            (CREDENTIALS_V1_CONTEXT, ssi_contexts::CREDENTIALS_V1),
            (CREDENTIALS_EXAMPLES_V1_CONTEXT, ssi_contexts::CREDENTIALS_EXAMPLES_V1),
            (ODRL_CONTEXT, ssi_contexts::ODRL),
            (SECURITY_V1_CONTEXT, ssi_contexts::SECURITY_V1),
            (SECURITY_V2_CONTEXT, ssi_contexts::SECURITY_V2),
            (SCHEMA_ORG_CONTEXT, ssi_contexts::SCHEMA_ORG),
            (DID_V1_CONTEXT, ssi_contexts::DID_V1),
            (W3ID_DID_V1_CONTEXT, ssi_contexts::DID_V1),
            (DID_RESOLUTION_V1_CONTEXT, ssi_contexts::DID_RESOLUTION_V1),
            (DIF_ESRS2020_CONTEXT, DIF_ESRS2020),
            (LDS_JWS2020_V1_CONTEXT, ssi_contexts::LDS_JWS2020_V1),
            (W3ID_ED2018_V1_CONTEXT, W3ID_ED2018_V1),
            (W3ID_ED2020_V1_CONTEXT, ssi_contexts::W3ID_ED2020_V1),
            (CITIZENSHIP_V1_CONTEXT, ssi_contexts::CITIZENSHIP_V1),
            (VACCINATION_V1_CONTEXT, ssi_contexts::VACCINATION_V1),
            (TRACEABILITY_CONTEXT, ssi_contexts::TRACEABILITY_V1),
            (BBS_V1_CONTEXT, ssi_contexts::BBS_V1),
        ];
        documents
            .iter()
            .filter_map(|(url, jsonld)| match serde_json::from_str(jsonld) {
                Ok(doc) => Some((*url, doc)),
                Err(err) => {
                    log::warn!("Unable to parse bundled context {}: {}", url, err);
                    None
                }
            })
            .collect()
    };
}

/// Result of loading a URL: the document plus the URL it was loaded from.
///
/// `context_url` (the URL of a context linked through an HTTP `Link` header)
/// is never set by the loaders in this crate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub context_url: Option<String>,
    pub document_url: String,
    pub document: Value,
}

impl RemoteDocument {
    pub fn new(document_url: &str, document: Value) -> Self {
        Self {
            context_url: None,
            document_url: document_url.to_string(),
            document,
        }
    }
}

/// Dereferences the URLs met while processing a JSON-LD document: `@context`
/// entries and verification method ids.
///
/// The same loader may be called from concurrent verifications.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<RemoteDocument, Error>;
}

/// Cache of context documents, consulted before any network access.
pub trait ContextStore: Send + Sync {
    fn has(&self, url: &str) -> bool;
    fn get(&self, url: &str) -> Option<Value>;
}

/// Loader for the context documents bundled with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

impl StaticLoader {
    pub fn get(&self, url: &str) -> Option<&'static Value> {
        STATIC_CONTEXTS.get(url)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl DocumentLoader for StaticLoader {
    async fn load(&self, url: &str) -> Result<RemoteDocument, Error> {
        match self.get(url) {
            Some(doc) => Ok(RemoteDocument::new(url, doc.clone())),
            None => Err(Error::UnknownContext(url.to_string())),
        }
    }
}

/// Error that can be raised by the [`ContextLoader::with_context_map_from`]
/// constructor function.
#[derive(Debug, Error)]
pub enum FromContextMapError {
    #[error("Unable to parse context {0}: {1}")]
    Parse(String, serde_json::Error),
    #[error("Context {0} is not a JSON object")]
    NotAnObject(String),
}

/// [`ContextStore`] made of the bundled contexts and an optional map of
/// additional, application-specific contexts.
#[derive(Clone)]
pub struct ContextLoader {
    // Specifies if StaticLoader is meant to be checked first.
    static_loader: Option<StaticLoader>,
    context_map: Option<HashMap<String, Value>>,
}

impl std::fmt::Debug for ContextLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("ContextLoader")
            .field("static_loader", &self.static_loader.is_some())
            .field(
                "context_map",
                &self.context_map.as_ref().map(|map| map.keys().collect::<Vec<_>>()),
            )
            .finish()
    }
}

impl ContextLoader {
    /// Constructs an "empty" ContextLoader.
    pub fn empty() -> Self {
        Self {
            static_loader: None,
            context_map: None,
        }
    }

    /// Using the builder pattern, the StaticLoader can be enabled so that contexts are checked
    /// against it before being checked against context_map.
    pub fn with_static_loader(mut self) -> Self {
        self.static_loader = Some(StaticLoader);
        self
    }

    /// Using the builder pattern, the map of additional contexts can be set. `preparsed_context_map`
    /// maps context URLs to their JSON content.
    pub fn with_context_map_from(
        mut self,
        preparsed_context_map: HashMap<String, String>,
    ) -> Result<Self, FromContextMapError> {
        let context_map = self.context_map.get_or_insert_with(HashMap::new);
        for (url, jsonld) in preparsed_context_map {
            let doc: Value = match serde_json::from_str(&jsonld) {
                Ok(doc) => doc,
                Err(err) => return Err(FromContextMapError::Parse(url, err)),
            };
            if !doc.is_object() {
                return Err(FromContextMapError::NotAnObject(url));
            }
            context_map.insert(url, doc);
        }
        Ok(self)
    }
}

/// The default ContextLoader only uses StaticLoader.
impl Default for ContextLoader {
    fn default() -> Self {
        Self {
            static_loader: Some(StaticLoader),
            context_map: None,
        }
    }
}

impl ContextStore for ContextLoader {
    fn has(&self, url: &str) -> bool {
        self.get_ref(url).is_some()
    }

    fn get(&self, url: &str) -> Option<Value> {
        self.get_ref(url).cloned()
    }
}

impl ContextLoader {
    fn get_ref(&self, url: &str) -> Option<&Value> {
        if let Some(doc) = self.static_loader.as_ref().and_then(|loader| loader.get(url)) {
            return Some(doc);
        }
        self.context_map.as_ref().and_then(|map| map.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_contexts_are_bundled() {
        let loader = ContextLoader::default();
        assert!(loader.has(CREDENTIALS_V1_CONTEXT));
        assert!(loader.has(BBS_V1_CONTEXT));
        assert!(loader.has(W3ID_ED2018_V1_CONTEXT));
        assert!(loader.has(W3ID_ED2020_V1_CONTEXT));
        assert!(loader.has(DIF_ESRS2020_CONTEXT));
        assert!(!loader.has("https://example.org/unknown/v1"));
        let doc = loader.get(CREDENTIALS_V1_CONTEXT).unwrap();
        assert!(doc.get("@context").is_some());
    }

    #[test]
    fn context_map_from_strings() {
        let mut map = HashMap::new();
        map.insert(
            "https://example.org/custom/v1".to_string(),
            r#"{"@context": {"name": "https://schema.org/name"}}"#.to_string(),
        );
        let loader = ContextLoader::empty().with_context_map_from(map).unwrap();
        assert!(loader.has("https://example.org/custom/v1"));
        // static loader not enabled
        assert!(!loader.has(CREDENTIALS_V1_CONTEXT));
    }

    #[test]
    fn context_map_rejects_invalid_json() {
        let mut map = HashMap::new();
        map.insert("https://example.org/bad".to_string(), "{".to_string());
        let err = ContextLoader::default().with_context_map_from(map).unwrap_err();
        assert!(matches!(err, FromContextMapError::Parse(url, _) if url == "https://example.org/bad"));
    }

    #[tokio::test]
    async fn static_loader_unknown_context() {
        let doc = StaticLoader.load(SECURITY_V2_CONTEXT).await.unwrap();
        assert_eq!(doc.document_url, SECURITY_V2_CONTEXT);
        assert_eq!(doc.context_url, None);
        match StaticLoader.load("https://example.org/nope").await {
            Err(Error::UnknownContext(url)) => assert_eq!(url, "https://example.org/nope"),
            other => panic!("unexpected result {:?}", other),
        }
    }
}

//! JSON-LD document loader used during proof verification.
//!
//! DID URLs are resolved through a [`Resolver`], other URLs are looked up in a
//! [`ContextStore`], optionally fetched over HTTP, and finally handed to a
//! fallback loader.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::did_resolve::Resolver;
use crate::error::Error;
use crate::jsonld::{ContextStore, DocumentLoader, RemoteDocument, StaticLoader};
use crate::registry::SuiteRegistry;

/// The VC API serves status list credentials with a database `_id` member,
/// which is not valid JSON-LD.
#[cfg(feature = "http")]
const SPHEREON_CREDENTIALS_URL: &str = "https://vc-api.sphereon.io/services/credentials/";

pub struct LdDocumentLoader {
    context_store: Arc<dyn ContextStore>,
    registry: Arc<SuiteRegistry>,
    fallback: Arc<dyn DocumentLoader>,
}

impl LdDocumentLoader {
    pub fn new(context_store: Arc<dyn ContextStore>, registry: Arc<SuiteRegistry>) -> Self {
        Self {
            context_store,
            registry,
            fallback: Arc::new(StaticLoader),
        }
    }

    /// Loader used for URLs that are neither DIDs nor known contexts.
    pub fn with_fallback(mut self, fallback: Arc<dyn DocumentLoader>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn registry(&self) -> &Arc<SuiteRegistry> {
        &self.registry
    }

    /// Bind the loader to a DID resolver for one verification.
    pub fn loader<'a>(
        &'a self,
        resolver: &'a dyn Resolver,
        fetch_remote_contexts: bool,
    ) -> BoundLoader<'a> {
        BoundLoader {
            inner: self,
            resolver,
            fetch_remote_contexts,
        }
    }
}

/// [`LdDocumentLoader`] bound to a resolver and fetch policy.
pub struct BoundLoader<'a> {
    inner: &'a LdDocumentLoader,
    resolver: &'a dyn Resolver,
    fetch_remote_contexts: bool,
}

impl<'a> BoundLoader<'a> {
    async fn load_did(&self, url: &str) -> Result<Value, Error> {
        let result = self.resolver.resolve_did(url, None).await;
        let mut document = result
            .did_document
            .ok_or_else(|| Error::DIDDocumentNotFound(url.to_string()))?;
        if document.merge_public_keys() == Some(0) {
            return Err(Error::NoVerificationMethod(url.to_string()));
        }

        let has_fragment = matches!(url.find('#'), Some(i) if i > 0);
        if has_fragment && document.context.is_some() {
            let component = self
                .resolver
                .get_did_component_by_id(&mut document, url, None)?;
            if !component.id().is_empty() {
                let contexts = component
                    .type_()
                    .map(|type_| self.inner.registry.contexts_for_method_type(type_))
                    .unwrap_or_default();
                let mut fragment = match serde_json::to_value(&component)? {
                    Value::Object(map) => map,
                    _ => return Err(Error::ExpectedJsonObject),
                };
                fragment.insert("@context".to_string(), contexts.into());
                log::debug!("Resolved {} to a {:?} component", url, component.type_());
                return Ok(Value::Object(fragment));
            }
        }

        for suite in self.inner.registry.all() {
            suite.pre_did_resolution(url, &mut document);
        }
        Ok(serde_json::to_value(document)?)
    }

    #[cfg(feature = "http")]
    async fn fetch(&self, url: &str) -> Option<Value> {
        log::warn!("Attempting to fetch the document directly for {}", url);
        let resp = match reqwest::Client::new()
            .get(url)
            .header("Accept", "application/ld+json, application/json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                log::warn!("Unable to fetch {}: {}", url, err);
                return None;
            }
        };
        if resp.status() != reqwest::StatusCode::OK {
            log::warn!("Unable to fetch {}: HTTP {}", url, resp.status());
            return None;
        }
        let mut document: Value = match resp.json().await {
            Ok(document) => document,
            Err(err) => {
                log::warn!("Unable to interpret {} as JSON: {}", url, err);
                return None;
            }
        };
        if url.starts_with(SPHEREON_CREDENTIALS_URL) {
            if let Value::Object(ref mut map) = document {
                map.remove("_id");
            }
        }
        Some(document)
    }

    #[cfg(not(feature = "http"))]
    async fn fetch(&self, url: &str) -> Option<Value> {
        log::warn!("Remote fetch of {} requires the http feature", url);
        None
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<'a> DocumentLoader for BoundLoader<'a> {
    async fn load(&self, url: &str) -> Result<RemoteDocument, Error> {
        if url.to_lowercase().starts_with("did:") {
            let document = self.load_did(url).await?;
            return Ok(RemoteDocument::new(url, document));
        }

        let store = &self.inner.context_store;
        if store.has(url) {
            let document = store
                .get(url)
                .ok_or_else(|| Error::UnknownContext(url.to_string()))?;
            return Ok(RemoteDocument::new(url, document));
        }

        if self.fetch_remote_contexts {
            if let Some(document) = self.fetch(url).await {
                return Ok(RemoteDocument::new(url, document));
            }
        }

        log::warn!(
            "Possible unknown context/identifier for {}, falling back to the default document loader",
            url
        );
        let mut remote = self.inner.fallback.load(url).await?;
        remote.context_url = None;
        remote.document_url = url.to_string();
        Ok(remote)
    }
}

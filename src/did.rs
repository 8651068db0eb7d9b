use std::collections::HashMap as Map;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::one_or_many::OneOrMany;

// ***********************************************
// * Data Structures for Decentralized Identifiers
// * https://www.w3.org/TR/did-core/
// ***********************************************

pub const DEFAULT_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

// v0.11 context used by universal resolver
pub const V0_11_CONTEXT: &str = "https://w3id.org/did/v0.11";

pub type DID = String;
pub type DIDURL = String;

#[derive(Debug, Serialize, Deserialize, Builder, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[builder(
    setter(into, strip_option),
    default,
    build_fn(validate = "Self::validate")
)]
pub struct Document {
    #[serde(rename = "@context")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub id: DID,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub also_known_as: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<OneOrMany<DID>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<Vec<VerificationMethod>>,
    /// Legacy key listing from earlier DID Core drafts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Vec<VerificationMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Vec<VerificationMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_method: Option<Vec<VerificationMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_agreement: Option<Vec<VerificationMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_invocation: Option<Vec<VerificationMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_delegation: Option<Vec<VerificationMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<Service>>,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

/// Entry of a verification method list or verification relationship: either a
/// reference to a method defined elsewhere or the method itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum VerificationMethod {
    DIDURL(DIDURL),
    Map(VerificationMethodMap),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethodMap {
    #[serde(rename = "@context")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub controller: DID,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: OneOrMany<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_endpoint: Option<Value>,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

/// Named arrays of a DID document that may hold verification methods or services.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DocumentSection {
    VerificationMethod,
    PublicKey,
    Service,
    Authentication,
    AssertionMethod,
    KeyAgreement,
    CapabilityInvocation,
    CapabilityDelegation,
}

impl DocumentSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerificationMethod => "verificationMethod",
            Self::PublicKey => "publicKey",
            Self::Service => "service",
            Self::Authentication => "authentication",
            Self::AssertionMethod => "assertionMethod",
            Self::KeyAgreement => "keyAgreement",
            Self::CapabilityInvocation => "capabilityInvocation",
            Self::CapabilityDelegation => "capabilityDelegation",
        }
    }
}

impl VerificationMethod {
    /// Identifier of the method, whether embedded or referenced.
    pub fn id(&self) -> &str {
        match self {
            Self::DIDURL(id) => id,
            Self::Map(map) => &map.id,
        }
    }
}

impl VerificationMethodMap {
    pub fn get_property(&self, name: &str) -> Option<&Value> {
        self.property_set.as_ref().and_then(|props| props.get(name))
    }

    pub fn set_property(&mut self, name: &str, value: Value) {
        self.property_set
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value);
    }
}

impl DocumentBuilder {
    fn validate(&self) -> Result<(), String> {
        // validate is called before defaults are assigned.
        // None means default will be used.
        match self.id {
            None => return Err("Missing document ID".to_string()),
            Some(ref id) if id.is_empty() => return Err("Missing document ID".to_string()),
            _ => {}
        }
        Ok(())
    }
}

impl Document {
    pub fn new(id: &str) -> Document {
        Document {
            context: Some(Value::String(DEFAULT_CONTEXT.to_string())),
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Document, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_bytes(json: &[u8]) -> Result<Document, serde_json::Error> {
        serde_json::from_slice(json)
    }

    /// Move legacy `publicKey` entries to the end of `verificationMethod`.
    ///
    /// Returns the merged method count when a `publicKey` property was
    /// present, or `None` when there was nothing to merge.
    pub fn merge_public_keys(&mut self) -> Option<usize> {
        let public_keys = self.public_key.take()?;
        let methods = self.verification_method.get_or_insert_with(Vec::new);
        methods.extend(public_keys);
        Some(methods.len())
    }

    /// Verification method entries listed in a section. Services are not
    /// verification methods and yield `None`.
    pub fn methods(&self, section: DocumentSection) -> Option<&Vec<VerificationMethod>> {
        match section {
            DocumentSection::VerificationMethod => self.verification_method.as_ref(),
            DocumentSection::PublicKey => self.public_key.as_ref(),
            DocumentSection::Authentication => self.authentication.as_ref(),
            DocumentSection::AssertionMethod => self.assertion_method.as_ref(),
            DocumentSection::KeyAgreement => self.key_agreement.as_ref(),
            DocumentSection::CapabilityInvocation => self.capability_invocation.as_ref(),
            DocumentSection::CapabilityDelegation => self.capability_delegation.as_ref(),
            DocumentSection::Service => None,
        }
    }

    pub fn methods_mut(
        &mut self,
        section: DocumentSection,
    ) -> Option<&mut Vec<VerificationMethod>> {
        match section {
            DocumentSection::VerificationMethod => self.verification_method.as_mut(),
            DocumentSection::PublicKey => self.public_key.as_mut(),
            DocumentSection::Authentication => self.authentication.as_mut(),
            DocumentSection::AssertionMethod => self.assertion_method.as_mut(),
            DocumentSection::KeyAgreement => self.key_agreement.as_mut(),
            DocumentSection::CapabilityInvocation => self.capability_invocation.as_mut(),
            DocumentSection::CapabilityDelegation => self.capability_delegation.as_mut(),
            DocumentSection::Service => None,
        }
    }
}

/// Extract the `did:method:method-specific-id` part of a DID URL.
///
/// Returns `None` when the input is not a syntactically valid DID.
pub fn did_from_url(did_url: &str) -> Option<&str> {
    let end = did_url.find(|c| c == '#' || c == '?' || c == '/').unwrap_or(did_url.len());
    let did = &did_url[..end];
    let mut parts = did.splitn(3, ':');
    if parts.next()? != "did" {
        return None;
    }
    let method = parts.next()?;
    if method.is_empty()
        || !method
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return None;
    }
    let method_specific_id = parts.next()?;
    if method_specific_id.is_empty()
        || !method_specific_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ".-_:%".contains(c))
    {
        return None;
    }
    Some(did)
}

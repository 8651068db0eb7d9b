use std::collections::HashMap as Map;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::jsonld::{DocumentLoader, CREDENTIALS_V1_CONTEXT};
use crate::ldp::{Check, LinkedDataProofs, Proof, ProofPurpose, VerificationResult};
use crate::one_or_many::OneOrMany;
use crate::suites::VerificationSuite;

// ********************************************
// * Data Structures for Verifiable Credentials
// * https://www.w3.org/TR/vc-data-model/
// ********************************************

pub const DEFAULT_CONTEXT: &str = CREDENTIALS_V1_CONTEXT;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "@context")]
    pub context: Contexts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: OneOrMany<String>,
    pub credential_subject: OneOrMany<CredentialSubject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Issuer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<VCDateTime>,
    // This field is populated only when using
    // embedded proofs such as LD-PROOF
    //   https://w3c-ccg.github.io/ld-proofs/
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<OneOrMany<Proof>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<VCDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_use: Option<Vec<TermsOfUse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<OneOrMany<Evidence>>,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Contexts {
    One(Context),
    Many(Vec<Context>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Context {
    URI(String),
    Object(Map<String, Value>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
#[serde(try_from = "IssuerUnchecked")]
pub enum Issuer {
    URI(String),
    Object(ObjectWithId),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum IssuerUnchecked {
    URI(String),
    Object(ObjectWithId),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectWithId {
    pub id: String,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TermsOfUse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(rename = "@context")]
    pub context: Contexts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: OneOrMany<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifiable_credential: Option<OneOrMany<Credential>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<OneOrMany<Proof>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

/// RFC3339 date-time as used in VC Data Model
/// <https://www.w3.org/TR/vc-data-model/#issuance-date>
/// <https://www.w3.org/TR/vc-data-model/#expiration>
///
/// Serializes back to the exact lexical form it was parsed from, so signed
/// documents survive a round trip through the typed model.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct VCDateTime {
    date_time: DateTime<FixedOffset>,
    lexical: String,
}

impl VCDateTime {
    pub fn date_time(&self) -> DateTime<FixedOffset> {
        self.date_time
    }

    pub fn as_str(&self) -> &str {
        &self.lexical
    }
}

impl FromStr for VCDateTime {
    type Err = chrono::format::ParseError;
    fn from_str(date_time: &str) -> Result<Self, Self::Err> {
        Ok(VCDateTime {
            date_time: DateTime::parse_from_rfc3339(date_time)?,
            lexical: date_time.to_string(),
        })
    }
}

impl TryFrom<String> for VCDateTime {
    type Error = chrono::format::ParseError;
    fn try_from(date_time: String) -> Result<Self, Self::Error> {
        let parsed = DateTime::parse_from_rfc3339(&date_time)?;
        Ok(VCDateTime {
            date_time: parsed,
            lexical: date_time,
        })
    }
}

impl From<VCDateTime> for String {
    fn from(date_time: VCDateTime) -> String {
        date_time.lexical
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for VCDateTime
where
    DateTime<FixedOffset>: From<DateTime<Tz>>,
{
    fn from(date_time: DateTime<Tz>) -> Self {
        let date_time: DateTime<FixedOffset> = date_time.into();
        let use_z = date_time.offset().local_minus_utc() == 0;
        Self {
            lexical: date_time.to_rfc3339_opts(SecondsFormat::AutoSi, use_z),
            date_time,
        }
    }
}

impl fmt::Display for VCDateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.lexical)
    }
}

/// Checks the `credentialStatus` of a credential, e.g. against a revocation
/// list.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait CheckStatus: Send + Sync {
    async fn check_status(
        &self,
        credential: &Credential,
        document_loader: &dyn DocumentLoader,
    ) -> VerificationResult;
}

impl TryFrom<IssuerUnchecked> for Issuer {
    type Error = &'static str;
    fn try_from(issuer: IssuerUnchecked) -> Result<Self, Self::Error> {
        // must be either URI or object containing id property
        match issuer {
            IssuerUnchecked::URI(uri) => {
                if uri.contains(':') {
                    Ok(Issuer::URI(uri))
                } else {
                    Err("Issuer string is not a URI")
                }
            }
            IssuerUnchecked::Object(object) => Ok(Issuer::Object(object)),
        }
    }
}

impl Issuer {
    pub fn get_id(&self) -> &str {
        match self {
            Self::URI(uri) => uri,
            Self::Object(object) => &object.id,
        }
    }
}

impl Contexts {
    pub fn contains_uri(&self, uri: &str) -> bool {
        let matches = |context: &Context| matches!(context, Context::URI(u) if u == uri);
        match self {
            Self::One(context) => matches(context),
            Self::Many(contexts) => contexts.iter().any(matches),
        }
    }

    /// Append a context URI unless already present.
    pub fn add_uri(&mut self, uri: &str) {
        if self.contains_uri(uri) {
            return;
        }
        let context = Context::URI(uri.to_string());
        if let Self::Many(contexts) = self {
            contexts.push(context);
            return;
        }
        if let Self::One(first) = std::mem::replace(self, Self::Many(Vec::new())) {
            *self = Self::Many(vec![first, context]);
        }
    }

    /// The first context must be the credentials v1 context.
    fn validate(&self) -> Result<(), Error> {
        let first = match self {
            Self::One(context) => context,
            Self::Many(contexts) => contexts.first().ok_or(Error::MissingContext)?,
        };
        match first {
            Context::URI(uri) if uri == DEFAULT_CONTEXT => Ok(()),
            _ => Err(Error::InvalidContext),
        }
    }
}

impl Credential {
    pub fn from_json(s: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn add_context(&mut self, uri: &str) {
        self.context.add_uri(uri);
    }

    pub fn has_context(&self, uri: &str) -> bool {
        self.context.contains_uri(uri)
    }

    /// Check the credential structure: contexts, type and issuer.
    pub fn validate(&self) -> Result<(), Error> {
        self.context.validate()?;
        if !self.type_.contains(&"VerifiableCredential".to_string()) {
            return Err(Error::MissingTypeVerifiableCredential);
        }
        if self.issuer.is_none() {
            return Err(Error::MissingIssuer);
        }
        Ok(())
    }

    pub fn is_expired(&self) -> bool {
        self.expiration_date
            .as_ref()
            .map(|expiration| expiration.date_time().with_timezone(&Utc) < Utc::now())
            .unwrap_or(false)
    }

    /// Verify the credential: structure, expiration, proofs accepted by
    /// `suites` for `purpose`, then status when `credentialStatus` is set.
    pub async fn verify(
        &self,
        suites: &[VerificationSuite],
        purpose: &ProofPurpose,
        document_loader: &dyn DocumentLoader,
        compact_proof: bool,
        check_status: Option<&dyn CheckStatus>,
    ) -> VerificationResult {
        if let Err(err) = self.validate() {
            return VerificationResult::error(&err.to_string());
        }
        if self.is_expired() {
            return VerificationResult::error(&Error::ExpiredCredential.to_string());
        }
        if self.credential_status.is_some() && check_status.is_none() {
            return VerificationResult::error(&Error::MissingStatusChecker.to_string());
        }
        let document = match serde_json::to_value(self) {
            Ok(document) => document,
            Err(err) => return VerificationResult::error(&Error::Json(err).to_string()),
        };
        let mut result =
            LinkedDataProofs::verify(&document, suites, purpose, document_loader, compact_proof)
                .await;
        if !result.is_ok() {
            return result;
        }
        if let (Some(_), Some(checker)) = (&self.credential_status, check_status) {
            let mut status_result = checker.check_status(self, document_loader).await;
            let status_ok = status_result.is_ok();
            result.append(&mut status_result);
            if status_ok && !result.checks.contains(&Check::Status) {
                result.checks.push(Check::Status);
            }
        }
        result
    }
}

impl Presentation {
    pub fn from_json(s: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn add_context(&mut self, uri: &str) {
        self.context.add_uri(uri);
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.context.validate()?;
        if !self.type_.contains(&"VerifiablePresentation".to_string()) {
            return Err(Error::MissingTypeVerifiablePresentation);
        }
        Ok(())
    }

    /// Verify the presentation proof for `purpose`, then every embedded
    /// credential as issued by its issuer.
    pub async fn verify(
        &self,
        suites: &[VerificationSuite],
        purpose: &ProofPurpose,
        document_loader: &dyn DocumentLoader,
        compact_proof: bool,
        check_status: Option<&dyn CheckStatus>,
    ) -> VerificationResult {
        if let Err(err) = self.validate() {
            return VerificationResult::error(&err.to_string());
        }
        let document = match serde_json::to_value(self) {
            Ok(document) => document,
            Err(err) => return VerificationResult::error(&Error::Json(err).to_string()),
        };
        let mut result =
            LinkedDataProofs::verify(&document, suites, purpose, document_loader, compact_proof)
                .await;
        if !result.is_ok() {
            return result;
        }
        for credential in self.verifiable_credential.iter().flatten() {
            let mut credential_result = credential
                .verify(
                    suites,
                    &ProofPurpose::CredentialIssuance,
                    document_loader,
                    compact_proof,
                    check_status,
                )
                .await;
            result.append(&mut credential_result);
        }
        result.checks.dedup();
        result
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::jsonld::DocumentLoader;
use crate::one_or_many::OneOrMany;
use crate::suites::{VerificationSuite, VerifyOptions};
use crate::vc::VCDateTime;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "@context")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<VCDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

impl Proof {
    pub fn new(type_: &str) -> Self {
        Self {
            type_: type_.to_string(),
            ..Default::default()
        }
    }
}

/// The intent a proof is checked against.
///
/// <https://w3c-ccg.github.io/ld-proofs/#proof-purpose>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofPurpose {
    AssertionMethod,
    /// Assertion by the credential issuer: the verification method controller
    /// must be the `issuer` of the verified document.
    CredentialIssuance,
    Authentication {
        challenge: Option<String>,
        domain: Option<String>,
    },
}

impl Default for ProofPurpose {
    fn default() -> Self {
        Self::AssertionMethod
    }
}

impl ProofPurpose {
    /// Verification relationship term the proof's `proofPurpose` must equal.
    pub fn term(&self) -> &'static str {
        match self {
            Self::AssertionMethod | Self::CredentialIssuance => "assertionMethod",
            Self::Authentication { .. } => "authentication",
        }
    }

    /// Purpose used for presentations: assertion unless a challenge or domain
    /// is given.
    pub fn for_presentation(challenge: Option<&str>, domain: Option<&str>) -> Self {
        if challenge.is_none() && domain.is_none() {
            Self::AssertionMethod
        } else {
            Self::Authentication {
                challenge: challenge.map(String::from),
                domain: domain.map(String::from),
            }
        }
    }

    fn validate_proof(&self, proof: &Proof) -> Result<(), Error> {
        if let Self::Authentication { challenge, domain } = self {
            let challenge = challenge.as_ref().ok_or(Error::MissingChallenge)?;
            if proof.challenge.as_ref() != Some(challenge) {
                return Err(Error::InvalidProofChallenge);
            }
            if let Some(domain) = domain {
                match proof.domain {
                    Some(ref proof_domain) if proof_domain.contains(domain) => {}
                    _ => return Err(Error::InvalidProofDomain),
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.term())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Check {
    Proof,
    Status,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// The checks performed
    pub checks: Vec<Check>,
    /// Warnings
    pub warnings: Vec<String>,
    /// Errors
    pub errors: Vec<String>,
}

impl VerificationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a verification result with the given error.
    pub fn error(err: &str) -> Self {
        Self {
            errors: vec![err.to_string()],
            ..Default::default()
        }
    }

    /// Append the checks, warnings and errors of another result.
    pub fn append(&mut self, other: &mut Self) {
        self.checks.append(&mut other.checks);
        self.warnings.append(&mut other.warnings);
        self.errors.append(&mut other.errors);
    }

    /// Return this result with an error appended.
    pub fn with_error(mut self, error: String) -> Self {
        self.errors.push(error);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<Result<VerificationResult, Error>> for VerificationResult {
    fn from(res: Result<VerificationResult, Error>) -> Self {
        match res {
            Ok(result) => result,
            Err(error) => VerificationResult::error(&error.to_string()),
        }
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, Error> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::ExpectedJsonObject),
    }
}

/// Pick the verification method `id` from a loaded document: either the
/// document is the method itself, or a DID document listing it.
fn select_method(document: Value, id: &str) -> Result<Map<String, Value>, Error> {
    let mut map = match document {
        Value::Object(map) => map,
        _ => return Err(Error::ExpectedJsonObject),
    };
    if map.get("id").and_then(Value::as_str) == Some(id) && map.contains_key("type") {
        return Ok(map);
    }
    let did = map.get("id").and_then(Value::as_str).unwrap_or("").to_string();
    for section in &["verificationMethod", "publicKey"] {
        if let Some(Value::Array(methods)) = map.remove(*section) {
            for method in methods {
                if let Value::Object(method) = method {
                    let method_id = method.get("id").and_then(Value::as_str).unwrap_or("");
                    if method_id == id || format!("{}{}", did, method_id) == id {
                        return Ok(method);
                    }
                }
            }
        }
    }
    Err(Error::ComponentNotFound(id.to_string()))
}

/// Whether a verification relationship of a controller document lists the
/// method `vm_id`, by reference or embedded.
fn relationship_contains(controller_doc: &Map<String, Value>, term: &str, vm_id: &str) -> bool {
    let did = controller_doc.get("id").and_then(Value::as_str).unwrap_or("");
    let entries = match controller_doc.get(term) {
        Some(Value::Array(entries)) => entries.iter().collect::<Vec<_>>(),
        Some(entry) => vec![entry],
        None => return false,
    };
    entries.into_iter().any(|entry| {
        let id = match entry {
            Value::String(id) => id.as_str(),
            Value::Object(map) => map.get("id").and_then(Value::as_str).unwrap_or(""),
            _ => return false,
        };
        id == vm_id || format!("{}{}", did, id) == vm_id
    })
}

fn issuer_id(document: &Map<String, Value>) -> Option<&str> {
    match document.get("issuer")? {
        Value::String(id) => Some(id),
        Value::Object(issuer) => issuer.get("id").and_then(Value::as_str),
        _ => None,
    }
}

pub struct LinkedDataProofs;

impl LinkedDataProofs {
    // https://w3c-ccg.github.io/ld-proofs/#proof-verification-algorithm
    /// Verify the proofs of a signed JSON-LD document.
    ///
    /// Proofs are selected by purpose term and by the proof types of `suites`;
    /// every selected proof must verify and at least one must be selected.
    pub async fn verify(
        document: &Value,
        suites: &[VerificationSuite],
        purpose: &ProofPurpose,
        loader: &dyn DocumentLoader,
        compact_proof: bool,
    ) -> VerificationResult {
        let mut result = VerificationResult::new();
        let map = match as_object(document) {
            Ok(map) => map,
            Err(err) => return VerificationResult::error(&err.to_string()),
        };
        let proofs: OneOrMany<Proof> = match map.get("proof") {
            None => return VerificationResult::error(&Error::MissingProof.to_string()),
            Some(proofs) => match serde_json::from_value(proofs.clone()) {
                Ok(proofs) => proofs,
                Err(err) => return VerificationResult::error(&Error::Json(err).to_string()),
            },
        };
        let mut unsigned = map.clone();
        unsigned.remove("proof");
        let unsigned = Value::Object(unsigned);

        let mut matched = 0;
        for proof in proofs.iter() {
            if proof.proof_purpose.as_deref() != Some(purpose.term()) {
                continue;
            }
            let suite = match suites.iter().find(|suite| suite.proof_type == proof.type_) {
                Some(suite) => suite,
                None => continue,
            };
            matched += 1;
            if let Err(err) =
                Self::verify_proof(&unsigned, proof, suite, purpose, loader, compact_proof).await
            {
                log::debug!("{} proof verification failed: {}", proof.type_, err);
                result.errors.push(err.to_string());
            }
        }
        if matched == 0 {
            return result.with_error(
                "No proofs matched the required suite and purpose".to_string(),
            );
        }
        if result.is_ok() {
            result.checks.push(Check::Proof);
        }
        result
    }

    async fn verify_proof(
        document: &Value,
        proof: &Proof,
        suite: &VerificationSuite,
        purpose: &ProofPurpose,
        loader: &dyn DocumentLoader,
        compact_proof: bool,
    ) -> Result<(), Error> {
        purpose.validate_proof(proof)?;
        let vm_id = proof
            .verification_method
            .as_deref()
            .ok_or(Error::MissingVerificationMethod)?;
        let vm = select_method(loader.load(vm_id).await?.document, vm_id)?;
        let vm_type = vm.get("type").and_then(Value::as_str).ok_or(Error::MissingType)?;
        if !suite.verification_method_types.contains(&vm_type) {
            return Err(Error::VerificationMethodMismatch(
                vm_type.to_string(),
                proof.type_.clone(),
            ));
        }
        let controller = vm
            .get("controller")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnauthorizedVerificationMethod(vm_id.to_string(), purpose.to_string()))?;
        let controller_doc = loader.load(controller).await?.document;
        if !relationship_contains(as_object(&controller_doc)?, purpose.term(), vm_id) {
            return Err(Error::UnauthorizedVerificationMethod(
                vm_id.to_string(),
                purpose.to_string(),
            ));
        }
        if *purpose == ProofPurpose::CredentialIssuance {
            let issuer = issuer_id(as_object(document)?).ok_or(Error::MissingIssuer)?;
            if issuer != controller {
                return Err(Error::IssuerMismatch(issuer.to_string(), controller.to_string()));
            }
        }
        let outcome = suite
            .verifier
            .verify(
                document,
                VerifyOptions {
                    proof,
                    verification_method: &vm,
                    purpose,
                    document_loader: loader,
                    compact_proof,
                },
            )
            .await;
        if outcome.verified {
            Ok(())
        } else {
            Err(Error::InvalidSignature(
                outcome.error.unwrap_or_else(|| "signature mismatch".to_string()),
            ))
        }
    }
}

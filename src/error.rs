#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    NotImplemented(&'static str),
    #[error("Could not fetch DID document with url: {0}. Did you enable the the driver?")]
    DIDDocumentNotFound(String),
    #[error("No verification method available for {0}")]
    NoVerificationMethod(String),
    #[error("not_found: DID document fragment ({0}) could not be located.")]
    ComponentNotFound(String),
    #[error("Error verifying LD Verifiable Credential")]
    CredentialVerification,
    #[error("Error verifying LD Verifiable Presentation")]
    PresentationVerification,
    #[error("Unknown context: {0}")]
    UnknownContext(String),
    #[error("Missing proof")]
    MissingProof,
    #[error("Missing verification method")]
    MissingVerificationMethod,
    #[error("Missing issuer")]
    MissingIssuer,
    #[error("Missing type")]
    MissingType,
    #[error("Missing context")]
    MissingContext,
    #[error("Invalid context")]
    InvalidContext,
    #[error("Missing type VerifiableCredential")]
    MissingTypeVerifiableCredential,
    #[error("Missing type VerifiablePresentation")]
    MissingTypeVerifiablePresentation,
    #[error("Credential has expired")]
    ExpiredCredential,
    #[error("A status checker must be given to verify credentials with credentialStatus")]
    MissingStatusChecker,
    #[error("Private key must be defined")]
    MissingPrivateKey,
    #[error("Unsupported key type {0}")]
    UnsupportedKeyType(String),
    #[error("Linked Data Proof type not supported: {0}")]
    ProofTypeNotSupported(String),
    #[error("Verification method type {0} is not accepted by proof type {1}")]
    VerificationMethodMismatch(String, String),
    #[error("Verification method {0} not authorized by controller for proof purpose {1}")]
    UnauthorizedVerificationMethod(String, String),
    #[error("Credential issuer {0} does not match the verification method controller {1}")]
    IssuerMismatch(String, String),
    #[error("A challenge is required for the authentication proof purpose")]
    MissingChallenge,
    #[error("Invalid proof challenge")]
    InvalidProofChallenge,
    #[error("Invalid proof domain")]
    InvalidProofDomain,
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Expected a JSON object")]
    ExpectedJsonObject,
    #[error(transparent)]
    FromHex(#[from] hex::FromHexError),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

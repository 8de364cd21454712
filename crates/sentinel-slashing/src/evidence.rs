//! Double-sign evidence.
//!
//! Evidence arrives encoded inside a "report evidence" transaction and is
//! decoded through an [`EvidenceDecoder`] supplied at construction time. The
//! slashing logic only relies on the [`Evidence`] trait, so the wire format
//! can change without touching it.
//!
//! [`JsonEvidenceDecoder`] is the decoder used by the node today. Its input
//! groups evidences by kind:
//!
//! ```json
//! {
//!   "duplicate_prepare": [ { "a": { ... }, "b": { ... } } ],
//!   "duplicate_vote": [],
//!   "duplicate_view_change": []
//! }
//! ```
//!
//! Decoded order is all prepares, then votes, then view changes, each list
//! in document order.
//!
//! The decoder is built with a [`SignatureVerifier`] and hands it to every
//! evidence it produces. [`Evidence::validate`] only passes when both
//! messages verify against the claimed signer over
//! [`SignedMessage::signing_digest`].

use std::fmt;
use std::sync::Arc;

use sentinel_types::{keccak256, put_u64_be, Address, BlockHash};
use serde::{Deserialize, Serialize};

use crate::signer::SignatureVerifier;

/// Error type for evidence decoding and verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvidenceError {
    #[error("malformed evidence payload: {0}")]
    Malformed(String),
    #[error("conflicting messages are at different heights ({0} vs {1})")]
    HeightMismatch(u64, u64),
    #[error("conflicting messages are in different views")]
    ViewMismatch,
    #[error("conflicting messages were signed by different validators")]
    SignerMismatch,
    #[error("messages do not conflict: same block hash")]
    IdenticalMessages,
    #[error("message carries no signature")]
    EmptySignature,
    #[error("signature does not verify against signer {0}")]
    BadSignature(Address),
    #[error("evidence height cannot be 0")]
    ZeroHeight,
}

/// Kind of duplicate signing. The discriminant is persisted in record keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvidenceType {
    /// Two block proposals at the same height.
    DuplicatePrepare = 1,
    /// Two votes at the same height.
    DuplicateVote = 2,
    /// Two view changes for the same view.
    DuplicateViewChange = 3,
}

impl EvidenceType {
    pub fn code(&self) -> u64 {
        *self as u64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::DuplicatePrepare => "duplicate_prepare",
            EvidenceType::DuplicateVote => "duplicate_vote",
            EvidenceType::DuplicateViewChange => "duplicate_view_change",
        }
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.code())
    }
}

/// A self-verifying misbehavior report.
pub trait Evidence: fmt::Debug + Send + Sync {
    /// Staking address of the offending validator.
    fn address(&self) -> Address;

    /// Height at which the validator signed twice.
    fn block_number(&self) -> u64;

    fn evidence_type(&self) -> EvidenceType;

    /// Content hash, for logging and auditing.
    fn hash(&self) -> [u8; 32];

    /// Structural and signature checks specific to the evidence kind.
    fn validate(&self) -> Result<(), EvidenceError>;
}

/// Decodes a report-evidence payload into zero or more evidences.
pub trait EvidenceDecoder: Send + Sync {
    fn decode(&self, data: &str) -> Result<Vec<Box<dyn Evidence>>, EvidenceError>;
}

impl<F> EvidenceDecoder for F
where
    F: Fn(&str) -> Result<Vec<Box<dyn Evidence>>, EvidenceError> + Send + Sync,
{
    fn decode(&self, data: &str) -> Result<Vec<Box<dyn Evidence>>, EvidenceError> {
        self(data)
    }
}

// ============================================================================
// Duplicate-sign evidence
// ============================================================================

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        let trimmed = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(trimmed).map_err(de::Error::custom)
    }
}

/// One signed consensus message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub epoch: u64,
    pub view: u64,
    pub block_number: u64,
    pub block_hash: BlockHash,
    /// Staking address of the signer.
    pub signer: Address,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl SignedMessage {
    /// Digest the validator signs when it emits this message as `kind`.
    pub fn signing_digest(&self, kind: EvidenceType) -> [u8; 32] {
        let mut buf = Vec::with_capacity(64);
        put_u64_be(&mut buf, kind.code());
        put_u64_be(&mut buf, self.epoch);
        put_u64_be(&mut buf, self.view);
        put_u64_be(&mut buf, self.block_number);
        buf.extend_from_slice(self.block_hash.as_bytes());
        keccak256(&buf)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        put_u64_be(out, self.epoch);
        put_u64_be(out, self.view);
        put_u64_be(out, self.block_number);
        out.extend_from_slice(self.block_hash.as_bytes());
        out.extend_from_slice(self.signer.as_bytes());
        out.extend_from_slice(&self.signature);
    }
}

/// Two conflicting messages signed by the same validator.
#[derive(Clone)]
pub struct DuplicateSignEvidence {
    pub kind: EvidenceType,
    pub a: SignedMessage,
    pub b: SignedMessage,
    verifier: Arc<dyn SignatureVerifier>,
}

impl DuplicateSignEvidence {
    pub fn new(
        kind: EvidenceType,
        a: SignedMessage,
        b: SignedMessage,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            kind,
            a,
            b,
            verifier,
        }
    }

    fn verify_message(&self, message: &SignedMessage) -> Result<(), EvidenceError> {
        let digest = message.signing_digest(self.kind);
        if self
            .verifier
            .verify(&message.signer, &digest, &message.signature)
        {
            Ok(())
        } else {
            Err(EvidenceError::BadSignature(message.signer))
        }
    }
}

impl fmt::Debug for DuplicateSignEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplicateSignEvidence")
            .field("kind", &self.kind)
            .field("a", &self.a)
            .field("b", &self.b)
            .finish_non_exhaustive()
    }
}

impl Evidence for DuplicateSignEvidence {
    fn address(&self) -> Address {
        self.a.signer
    }

    fn block_number(&self) -> u64 {
        self.a.block_number
    }

    fn evidence_type(&self) -> EvidenceType {
        self.kind
    }

    fn hash(&self) -> [u8; 32] {
        let mut buf = Vec::new();
        put_u64_be(&mut buf, self.kind.code());
        self.a.encode(&mut buf);
        self.b.encode(&mut buf);
        keccak256(&buf)
    }

    fn validate(&self) -> Result<(), EvidenceError> {
        if self.a.block_number != self.b.block_number {
            return Err(EvidenceError::HeightMismatch(
                self.a.block_number,
                self.b.block_number,
            ));
        }
        if self.a.block_number == 0 {
            return Err(EvidenceError::ZeroHeight);
        }
        if self.a.epoch != self.b.epoch || self.a.view != self.b.view {
            return Err(EvidenceError::ViewMismatch);
        }
        if self.a.signer != self.b.signer {
            return Err(EvidenceError::SignerMismatch);
        }
        if self.a.block_hash == self.b.block_hash {
            return Err(EvidenceError::IdenticalMessages);
        }
        if self.a.signature.is_empty() || self.b.signature.is_empty() {
            return Err(EvidenceError::EmptySignature);
        }
        self.verify_message(&self.a)?;
        self.verify_message(&self.b)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct MessagePair {
    a: SignedMessage,
    b: SignedMessage,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
struct EvidenceDocument {
    duplicate_prepare: Vec<MessagePair>,
    duplicate_vote: Vec<MessagePair>,
    duplicate_view_change: Vec<MessagePair>,
}

/// JSON evidence decoder.
#[derive(Clone)]
pub struct JsonEvidenceDecoder {
    verifier: Arc<dyn SignatureVerifier>,
}

impl JsonEvidenceDecoder {
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { verifier }
    }

    /// Encode evidences into the payload format accepted by [`Self::decode`].
    pub fn encode(evidences: &[DuplicateSignEvidence]) -> Result<String, EvidenceError> {
        let mut doc = EvidenceDocument::default();
        for ev in evidences {
            let pair = MessagePair {
                a: ev.a.clone(),
                b: ev.b.clone(),
            };
            match ev.kind {
                EvidenceType::DuplicatePrepare => doc.duplicate_prepare.push(pair),
                EvidenceType::DuplicateVote => doc.duplicate_vote.push(pair),
                EvidenceType::DuplicateViewChange => doc.duplicate_view_change.push(pair),
            }
        }
        serde_json::to_string(&doc).map_err(|e| EvidenceError::Malformed(e.to_string()))
    }
}

impl fmt::Debug for JsonEvidenceDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonEvidenceDecoder").finish_non_exhaustive()
    }
}

impl EvidenceDecoder for JsonEvidenceDecoder {
    fn decode(&self, data: &str) -> Result<Vec<Box<dyn Evidence>>, EvidenceError> {
        let doc: EvidenceDocument =
            serde_json::from_str(data).map_err(|e| EvidenceError::Malformed(e.to_string()))?;

        let mut out: Vec<Box<dyn Evidence>> = Vec::new();
        for (kind, pairs) in [
            (EvidenceType::DuplicatePrepare, doc.duplicate_prepare),
            (EvidenceType::DuplicateVote, doc.duplicate_vote),
            (EvidenceType::DuplicateViewChange, doc.duplicate_view_change),
        ] {
            for pair in pairs {
                out.push(Box::new(DuplicateSignEvidence::new(
                    kind,
                    pair.a,
                    pair.b,
                    self.verifier.clone(),
                )));
            }
        }
        Ok(out)
    }
}

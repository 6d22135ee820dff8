//! Verification of the ed25519 signature Discord attaches to every interaction.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// Reasons an interaction request is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Configured public key is not 32 hex-encoded bytes.
    #[error("invalid application public key")]
    InvalidPublicKey,
    /// Signature header is not 64 hex-encoded bytes.
    #[error("malformed signature header")]
    MalformedSignature,
    /// Signature does not match `timestamp || body`.
    #[error("signature mismatch")]
    Mismatch,
}

/// Checks `X-Signature-Ed25519` against `X-Signature-Timestamp` and the raw body.
#[derive(Debug, Clone)]
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// Build a verifier from the hex-encoded application public key.
    pub fn from_hex(public_key: &str) -> Result<Self, SignatureError> {
        let bytes: [u8; 32] = hex::decode(public_key.trim())
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(SignatureError::InvalidPublicKey)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| SignatureError::InvalidPublicKey)?;
        Ok(Self { key })
    }

    /// Verify one request.
    pub fn verify(&self, signature: &str, timestamp: &str, body: &[u8]) -> Result<(), SignatureError> {
        let raw = hex::decode(signature.trim()).map_err(|_| SignatureError::MalformedSignature)?;
        let signature =
            Signature::from_slice(&raw).map_err(|_| SignatureError::MalformedSignature)?;

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    fn keypair() -> (SigningKey, InteractionVerifier) {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let verifier =
            InteractionVerifier::from_hex(&hex::encode(signing.verifying_key().to_bytes()))
                .unwrap();
        (signing, verifier)
    }

    #[test]
    fn accepts_signature_over_timestamp_and_body() {
        let (signing, verifier) = keypair();
        let body = br#"{"type":1}"#;
        let signature = signing.sign(&[b"1700000000".as_slice(), body].concat());

        assert_eq!(
            verifier.verify(&hex::encode(signature.to_bytes()), "1700000000", body),
            Ok(())
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let (signing, verifier) = keypair();
        let signature = signing.sign(b"1700000000{\"type\":1}");

        assert_eq!(
            verifier.verify(
                &hex::encode(signature.to_bytes()),
                "1700000000",
                br#"{"type":2}"#
            ),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_garbage_inputs() {
        let (_, verifier) = keypair();
        assert_eq!(
            verifier.verify("zz", "1", b"{}"),
            Err(SignatureError::MalformedSignature)
        );
        assert!(matches!(
            InteractionVerifier::from_hex("abcd"),
            Err(SignatureError::InvalidPublicKey)
        ));
    }
}

use std::fmt;

use thiserror::Error;

/// Result type for Agile encryption operations.
pub type Result<T> = std::result::Result<T, AgileCryptoError>;

/// Which descriptor field named an algorithm we do not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    Hash,
    Cipher,
    ChainingMode,
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlgorithmKind::Hash => "hash algorithm",
            AlgorithmKind::Cipher => "cipher algorithm",
            AlgorithmKind::ChainingMode => "cipher chaining mode",
        })
    }
}

/// Errors raised by the raw AES adapters in [`crate::aes_modes`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("unsupported AES key length: {0} bytes (expected 16, 24, or 32)")]
    InvalidKeyLength(usize),
    #[error("invalid AES IV length: {0} bytes (expected 16)")]
    InvalidIvLength(usize),
    #[error("ciphertext length is not a multiple of 16 bytes: {0}")]
    InvalidCiphertextLength(usize),
}

/// Why a decryption step could not produce output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptFailureReason {
    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("decrypted value is truncated: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("declared plaintext size {declared} exceeds the {available} ciphertext bytes")]
    ShorterThanDeclared { declared: u64, available: usize },

    #[error("stream is shorter than the 8-byte size prefix ({len} bytes)")]
    MissingSizePrefix { len: usize },

    #[error("stream size prefix {stream} does not match descriptor totalSize {descriptor}")]
    SizeMismatch { stream: u64, descriptor: u64 },

    #[error("segment index does not fit into 32 bits")]
    TooManySegments,

    #[error("required value is missing from the descriptor")]
    Missing,
}

/// Errors returned while deriving keys, verifying passwords or decrypting packages.
///
/// Variants keep "corrupt file" and "wrong password" apart so callers can react differently, and
/// never carry password bytes, derived keys or plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgileCryptoError {
    #[error("unsupported {kind} `{name}`")]
    UnsupportedAlgorithm { kind: AlgorithmKind, name: String },

    #[error("key derivation failed: {reason}")]
    KeyDerivationFailure { reason: &'static str },

    #[error("failed to decrypt {field}: {reason}")]
    DecryptionFailure {
        field: &'static str,
        #[source]
        reason: DecryptFailureReason,
    },

    #[error("wrong password (verifier mismatch)")]
    WrongPassword,

    #[error("integrity check failed (HMAC mismatch); the package may be corrupted")]
    IntegrityMismatch,

    #[error("{limit} {value} exceeds the configured maximum {max}")]
    ResourceLimit {
        limit: &'static str,
        value: u64,
        max: u64,
    },
}

impl AgileCryptoError {
    pub(crate) fn decryption(field: &'static str, reason: impl Into<DecryptFailureReason>) -> Self {
        Self::DecryptionFailure {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn truncated(field: &'static str, expected: usize, got: usize) -> Self {
        Self::decryption(field, DecryptFailureReason::Truncated { expected, got })
    }
}

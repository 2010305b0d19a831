//! Hash adapter for MS-OFFCRYPTO Agile encryption.
//!
//! The descriptor names its hash algorithm as a string (`SHA1`, `SHA512`, ...). Parsing that name
//! is the only place an unknown algorithm can surface, so every hashing routine below operates on
//! an already-validated [`HashAlgorithm`].

use std::fmt;
use std::str::FromStr;

use digest::Digest;

use crate::error::{AgileCryptoError, AlgorithmKind};

/// Largest digest produced by any supported algorithm (SHA-512).
pub const MAX_DIGEST_LEN: usize = 64;

/// Hash algorithm identifiers used by MS-OFFCRYPTO Agile encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Parse a hash algorithm name as used in the `EncryptionInfo` XML.
    ///
    /// Names are case-insensitive and tolerate the `SHA-256` / `sha_256` spellings seen in other
    /// tooling.
    pub fn from_name(name: &str) -> Result<Self, AgileCryptoError> {
        let normalized = name.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(AgileCryptoError::UnsupportedAlgorithm {
                kind: AlgorithmKind::Hash,
                name: name.trim().to_string(),
            }),
        }
    }

    /// Canonical MS-OFFCRYPTO spelling.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
        }
    }

    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Hash the concatenation of `parts` into `out[..digest_len]`.
    ///
    /// Writing into a caller buffer lets the spin loop reuse one fixed-size (zeroized) buffer
    /// instead of allocating a fresh digest per iteration.
    pub(crate) fn digest_parts_into(self, parts: &[&[u8]], out: &mut [u8]) {
        fn run<D: Digest>(parts: &[&[u8]], out: &mut [u8]) {
            let mut hasher = D::new();
            for part in parts {
                hasher.update(*part);
            }
            let digest = hasher.finalize();
            out[..digest.len()].copy_from_slice(&digest);
        }

        match self {
            HashAlgorithm::Sha1 => run::<sha1::Sha1>(parts, out),
            HashAlgorithm::Sha256 => run::<sha2::Sha256>(parts, out),
            HashAlgorithm::Sha384 => run::<sha2::Sha384>(parts, out),
            HashAlgorithm::Sha512 => run::<sha2::Sha512>(parts, out),
        }
    }

    /// Convenience wrapper returning an owned digest.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; self.digest_len()];
        self.digest_parts_into(&[data], &mut out);
        out
    }
}

impl FromStr for HashAlgorithm {
    type Err = AgileCryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

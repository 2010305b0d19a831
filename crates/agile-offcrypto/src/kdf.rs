//! Password-based key derivation for MS-OFFCRYPTO Agile encryption.
//!
//! Algorithm:
//! 1. `pw = UTF-16LE(password)` (no BOM, no terminator)
//! 2. `H = Hash(salt || pw)`
//! 3. For `i in 0..spinCount`: `H = Hash(LE32(i) || H)`
//! 4. `K = Hash(H || blockKey)`, truncated to `keyBits / 8`. When the digest is shorter than the
//!    key the missing tail stays `0x00`.
//!
//! The spin loop dominates the cost of opening a file (100k iterations by default), so
//! [`PasswordHash`] computes it once and hands out purpose keys derived from the cached value.

use std::fmt;

use subtle::ConstantTimeEq as _;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::aes_modes::AES_BLOCK_SIZE;
use crate::error::{AgileCryptoError, Result};
use crate::hash::{HashAlgorithm, MAX_DIGEST_LEN};

/// Block key for the key that decrypts `encryptedVerifierHashInput`.
pub const VERIFIER_HASH_INPUT_BLOCK: [u8; 8] = [0xFE, 0xA7, 0xD2, 0x76, 0x3B, 0x4B, 0x9E, 0x79];
/// Block key for the key that decrypts `encryptedVerifierHashValue`.
pub const VERIFIER_HASH_VALUE_BLOCK: [u8; 8] = [0xD7, 0xAA, 0x0F, 0x6D, 0x30, 0x61, 0x34, 0x4E];
/// Block key for the key that decrypts `encryptedKeyValue`.
pub const KEY_VALUE_BLOCK: [u8; 8] = [0x14, 0x6E, 0x0B, 0xE7, 0xAB, 0xAC, 0xD0, 0xD6];
/// Block key for the IV of `dataIntegrity/encryptedHmacKey`.
pub const HMAC_KEY_BLOCK: [u8; 8] = [0x5F, 0xB2, 0xAD, 0x01, 0x0C, 0xB9, 0xE1, 0xF6];
/// Block key for the IV of `dataIntegrity/encryptedHmacValue`.
pub const HMAC_VALUE_BLOCK: [u8; 8] = [0xA0, 0x67, 0x7F, 0x02, 0xB2, 0x2C, 0x84, 0x33];

/// Largest AES key (AES-256).
pub const MAX_KEY_LEN: usize = 32;

/// The password-key purposes defined by the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKeyPurpose {
    VerifierHashInput,
    VerifierHashValue,
    EncryptedKeyValue,
}

impl BlockKeyPurpose {
    pub const fn block_key(self) -> [u8; 8] {
        match self {
            BlockKeyPurpose::VerifierHashInput => VERIFIER_HASH_INPUT_BLOCK,
            BlockKeyPurpose::VerifierHashValue => VERIFIER_HASH_VALUE_BLOCK,
            BlockKeyPurpose::EncryptedKeyValue => KEY_VALUE_BLOCK,
        }
    }
}

/// Validate `keyBits` and convert it to a byte length.
pub fn key_len_from_bits(key_bits: usize) -> Result<usize> {
    match key_bits {
        128 | 192 | 256 => Ok(key_bits / 8),
        _ => Err(AgileCryptoError::KeyDerivationFailure {
            reason: "keyBits must be 128, 192, or 256",
        }),
    }
}

/// Secret AES key material. Wiped on drop; `Debug` never prints the bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; MAX_KEY_LEN],
    len: usize,
}

impl DerivedKey {
    /// Copy `bytes` into a fixed-size key buffer. Fails for anything but an AES key length.
    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self> {
        if !matches!(bytes.len(), 16 | 24 | 32) {
            return Err(AgileCryptoError::KeyDerivationFailure {
                reason: "key length must be 16, 24, or 32 bytes",
            });
        }
        let mut out = Self {
            bytes: [0u8; MAX_KEY_LEN],
            len: bytes.len(),
        };
        out.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for DerivedKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && bool::from(self.as_bytes().ct_eq(other.as_bytes()))
    }
}

impl Eq for DerivedKey {}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
thread_local! {
    // Per-thread so parallel tests do not observe each other's spin loops.
    pub(crate) static ITERATED_HASH_CALLS: std::cell::Cell<usize> =
        const { std::cell::Cell::new(0) };
}

/// The iterated password hash `H` (after the spin loop).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PasswordHash {
    #[zeroize(skip)]
    hash_algorithm: HashAlgorithm,
    bytes: [u8; MAX_DIGEST_LEN],
}

impl PasswordHash {
    /// Run the salted spin loop for `password`.
    pub fn compute(
        password: &str,
        salt: &[u8],
        spin_count: u32,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self> {
        if salt.len() != AES_BLOCK_SIZE {
            return Err(AgileCryptoError::KeyDerivationFailure {
                reason: "passwordSalt must be 16 bytes",
            });
        }

        #[cfg(test)]
        ITERATED_HASH_CALLS.with(|calls| calls.set(calls.get() + 1));

        let pw = password_utf16le_bytes(password);
        let digest_len = hash_algorithm.digest_len();

        let mut out = Self {
            hash_algorithm,
            bytes: [0u8; MAX_DIGEST_LEN],
        };
        hash_algorithm.digest_parts_into(&[salt, pw.as_slice()], &mut out.bytes);

        // Hashing from and into the same buffer needs a scratch copy of the previous round.
        let mut prev = Zeroizing::new([0u8; MAX_DIGEST_LEN]);
        for i in 0..spin_count {
            prev[..digest_len].copy_from_slice(&out.bytes[..digest_len]);
            hash_algorithm.digest_parts_into(
                &[&i.to_le_bytes()[..], &prev[..digest_len]],
                &mut out.bytes,
            );
        }

        Ok(out)
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.hash_algorithm.digest_len()]
    }

    /// Derive a `key_bits` key for `purpose`, or from `H` alone when `purpose` is `None`.
    pub fn derive(&self, key_bits: usize, purpose: Option<BlockKeyPurpose>) -> Result<DerivedKey> {
        let key_len = key_len_from_bits(key_bits)?;
        let digest_len = self.hash_algorithm.digest_len();

        // Without a block key the key is a prefix of `H` itself.
        let mut digest = Zeroizing::new([0u8; MAX_DIGEST_LEN]);
        match purpose {
            Some(purpose) => {
                let block_key = purpose.block_key();
                self.hash_algorithm
                    .digest_parts_into(&[self.as_bytes(), &block_key[..]], &mut digest[..]);
            }
            None => digest[..digest_len].copy_from_slice(self.as_bytes()),
        }

        if digest_len < key_len {
            log::warn!(
                "{} digest ({digest_len} bytes) is shorter than the {key_len}-byte key; \
                 padding with zeros",
                self.hash_algorithm
            );
        }

        let mut key = DerivedKey {
            bytes: [0u8; MAX_KEY_LEN],
            len: key_len,
        };
        let copy_len = key_len.min(digest_len);
        key.bytes[..copy_len].copy_from_slice(&digest[..copy_len]);
        Ok(key)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("hash_algorithm", &self.hash_algorithm)
            .finish_non_exhaustive()
    }
}

/// Derive a password key for one purpose.
///
/// Each call runs the full spin loop; use [`PasswordHash`] directly when several purpose keys are
/// needed for the same password.
pub fn derive_key(
    password: &str,
    salt: &[u8],
    spin_count: u32,
    hash_algorithm: HashAlgorithm,
    key_bits: usize,
    purpose: Option<BlockKeyPurpose>,
) -> Result<DerivedKey> {
    // Reject bad key sizes before paying for the spin loop.
    key_len_from_bits(key_bits)?;
    PasswordHash::compute(password, salt, spin_count, hash_algorithm)?.derive(key_bits, purpose)
}

/// Derive a 16-byte IV as `Hash(salt || suffix)[..16]`.
pub(crate) fn derive_iv(
    salt: &[u8],
    suffix: &[u8],
    hash_algorithm: HashAlgorithm,
) -> [u8; AES_BLOCK_SIZE] {
    let mut digest = [0u8; MAX_DIGEST_LEN];
    hash_algorithm.digest_parts_into(&[salt, suffix], &mut digest);
    let mut iv = [0u8; AES_BLOCK_SIZE];
    iv.copy_from_slice(&digest[..AES_BLOCK_SIZE]);
    iv
}

fn password_utf16le_bytes(password: &str) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(password.len().saturating_mul(2)));
    for unit in password.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

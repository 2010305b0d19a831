use crate::aes_modes::{ChainingMode, CipherAlgorithm};
use crate::hash::HashAlgorithm;

/// Protocol default for `spinCount`.
pub const DEFAULT_SPIN_COUNT: u32 = 100_000;

/// `<dataIntegrity>` blobs, both encrypted with the document key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIntegrity {
    pub encrypted_hmac_key: Vec<u8>,
    pub encrypted_hmac_value: Vec<u8>,
}

/// Parsed Agile `EncryptionInfo` parameters.
///
/// Locating and parsing the `EncryptionInfo` stream is left to the caller; this type holds the
/// already-decoded values (salts and encrypted blobs as raw bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionDescriptor {
    /// `<p:encryptedKey saltValue>`; also the IV for the three password-key blobs.
    pub password_salt: Vec<u8>,
    pub spin_count: u32,
    pub hash_algorithm: HashAlgorithm,
    pub key_bits: usize,
    pub encrypted_verifier_hash_input: Vec<u8>,
    pub encrypted_verifier_hash_value: Vec<u8>,
    pub encrypted_key_value: Vec<u8>,
    /// `<keyData saltValue>`; seeds the per-segment IVs.
    pub key_data_salt: Vec<u8>,
    pub cipher_algorithm: CipherAlgorithm,
    pub cipher_chaining: ChainingMode,
    /// Declared plaintext length of the package.
    pub total_size: u64,
    pub data_integrity: Option<DataIntegrity>,
}

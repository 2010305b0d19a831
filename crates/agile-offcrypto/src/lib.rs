//! MS-OFFCRYPTO "Agile Encryption" (ECMA-376) password verification and package decryption.
//!
//! This crate implements the cryptographic core used to open password-protected Office documents:
//! - password → key derivation (salted, iterated hash with per-purpose block keys)
//! - password verification against the encrypted verifier pair
//! - segmented `EncryptedPackage` decryption (AES-CBC or AES-CFB, 4096-byte segments)
//! - `dataIntegrity` HMAC verification
//!
//! Locating and parsing the `EncryptionInfo` stream is left to the caller, which builds an
//! [`EncryptionDescriptor`] from the decoded values.
//!
//! ```no_run
//! use agile_offcrypto::{decrypt_encrypted_package, DecryptOptions, EncryptionDescriptor};
//!
//! fn open(stream: &[u8], descriptor: &EncryptionDescriptor) -> agile_offcrypto::Result<Vec<u8>> {
//!     decrypt_encrypted_package(stream, "password", descriptor, &DecryptOptions::default())
//! }
//! ```

pub mod aes_modes;
pub mod descriptor;
pub mod error;
pub mod hash;
pub mod integrity;
pub mod kdf;
pub mod options;
pub mod package;
mod parallel;
pub mod verifier;

pub use crate::aes_modes::{ChainingMode, CipherAlgorithm, AES_BLOCK_SIZE};
pub use crate::descriptor::{DataIntegrity, EncryptionDescriptor, DEFAULT_SPIN_COUNT};
pub use crate::error::{
    AgileCryptoError, AlgorithmKind, CipherError, DecryptFailureReason, Result,
};
pub use crate::hash::HashAlgorithm;
pub use crate::integrity::{verify_data_integrity, IntegrityBlock};
pub use crate::kdf::{derive_key, BlockKeyPurpose, DerivedKey, PasswordHash};
pub use crate::options::{DecryptOptions, DEFAULT_MAX_SPIN_COUNT, DEFAULT_MAX_TOTAL_SIZE};
pub use crate::package::{
    decrypt_encrypted_package, decrypt_package, decrypt_package_with_options,
    parse_encrypted_package_stream, recover_document_key, segment_iv, EncryptedPackage,
    SEGMENT_SIZE,
};
pub use crate::verifier::{verify_and_recover_key, verify_password};

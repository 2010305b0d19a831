//! JSON form of an [`EncryptionDescriptor`].
//!
//! Field names follow the `EncryptionInfo` XML attributes; binary values are base64, exactly as
//! they appear in the XML.

use std::path::Path;

use agile_offcrypto::{
    ChainingMode, CipherAlgorithm, DataIntegrity, EncryptionDescriptor, HashAlgorithm,
};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorFile {
    pub password_salt: String,
    pub spin_count: u32,
    pub hash_algorithm: String,
    pub key_bits: usize,
    pub encrypted_verifier_hash_input: String,
    pub encrypted_verifier_hash_value: String,
    pub encrypted_key_value: String,
    pub key_data_salt: String,
    pub cipher_algorithm: String,
    pub cipher_chaining: String,
    /// Declared plaintext size. Taken from the stream's size prefix when absent.
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub data_integrity: Option<DataIntegrityFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIntegrityFile {
    pub encrypted_hmac_key: String,
    pub encrypted_hmac_value: String,
}

impl DescriptorFile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read descriptor {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse descriptor {}", path.display()))
    }

    /// Decode into an [`EncryptionDescriptor`]. `stream_total_size` fills in a missing
    /// `totalSize`.
    pub fn into_descriptor(self, stream_total_size: u64) -> Result<EncryptionDescriptor> {
        Ok(EncryptionDescriptor {
            password_salt: decode("passwordSalt", &self.password_salt)?,
            spin_count: self.spin_count,
            hash_algorithm: HashAlgorithm::from_name(&self.hash_algorithm)?,
            key_bits: self.key_bits,
            encrypted_verifier_hash_input: decode(
                "encryptedVerifierHashInput",
                &self.encrypted_verifier_hash_input,
            )?,
            encrypted_verifier_hash_value: decode(
                "encryptedVerifierHashValue",
                &self.encrypted_verifier_hash_value,
            )?,
            encrypted_key_value: decode("encryptedKeyValue", &self.encrypted_key_value)?,
            key_data_salt: decode("keyDataSalt", &self.key_data_salt)?,
            cipher_algorithm: CipherAlgorithm::from_name(&self.cipher_algorithm)?,
            cipher_chaining: ChainingMode::from_name(&self.cipher_chaining)?,
            total_size: self.total_size.unwrap_or(stream_total_size),
            data_integrity: self
                .data_integrity
                .map(|di| -> Result<DataIntegrity> {
                    Ok(DataIntegrity {
                        encrypted_hmac_key: decode(
                            "dataIntegrity.encryptedHmacKey",
                            &di.encrypted_hmac_key,
                        )?,
                        encrypted_hmac_value: decode(
                            "dataIntegrity.encryptedHmacValue",
                            &di.encrypted_hmac_value,
                        )?,
                    })
                })
                .transpose()?,
        })
    }
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>> {
    // Some producers wrap long base64 values across lines.
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .with_context(|| format!("invalid base64 in `{field}`"))
}

#![allow(dead_code)]

use std::path::PathBuf;

use agile_offcrypto::{
    ChainingMode, CipherAlgorithm, DataIntegrity, EncryptionDescriptor, HashAlgorithm,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

/// A fixture produced by an independent Python implementation of the format.
pub struct Fixture {
    pub password: String,
    pub descriptor: EncryptionDescriptor,
    /// Full `EncryptedPackage` stream (size prefix + ciphertext).
    pub stream: Vec<u8>,
}

impl Fixture {
    pub fn ciphertext(&self) -> &[u8] {
        &self.stream[8..]
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureFile {
    password: String,
    descriptor: DescriptorFile,
    encrypted_package: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorFile {
    password_salt: String,
    spin_count: u32,
    hash_algorithm: String,
    key_bits: usize,
    encrypted_verifier_hash_input: String,
    encrypted_verifier_hash_value: String,
    encrypted_key_value: String,
    key_data_salt: String,
    cipher_algorithm: String,
    cipher_chaining: String,
    total_size: u64,
    data_integrity: Option<DataIntegrityFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataIntegrityFile {
    encrypted_hmac_key: String,
    encrypted_hmac_value: String,
}

fn b64(value: &str) -> Vec<u8> {
    BASE64.decode(value).expect("valid base64 in fixture")
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{name}.json"))
}

pub fn load(name: &str) -> Fixture {
    let text = std::fs::read_to_string(fixture_path(name)).expect("read fixture");
    let file: FixtureFile = serde_json::from_str(&text).expect("parse fixture json");
    let d = file.descriptor;
    Fixture {
        password: file.password,
        descriptor: EncryptionDescriptor {
            password_salt: b64(&d.password_salt),
            spin_count: d.spin_count,
            hash_algorithm: HashAlgorithm::from_name(&d.hash_algorithm).expect("hash"),
            key_bits: d.key_bits,
            encrypted_verifier_hash_input: b64(&d.encrypted_verifier_hash_input),
            encrypted_verifier_hash_value: b64(&d.encrypted_verifier_hash_value),
            encrypted_key_value: b64(&d.encrypted_key_value),
            key_data_salt: b64(&d.key_data_salt),
            cipher_algorithm: CipherAlgorithm::from_name(&d.cipher_algorithm).expect("cipher"),
            cipher_chaining: ChainingMode::from_name(&d.cipher_chaining).expect("chaining"),
            total_size: d.total_size,
            data_integrity: d.data_integrity.map(|di| DataIntegrity {
                encrypted_hmac_key: b64(&di.encrypted_hmac_key),
                encrypted_hmac_value: b64(&di.encrypted_hmac_value),
            }),
        },
        stream: b64(&file.encrypted_package),
    }
}

/// Plaintext the fixtures were generated from.
pub fn expected_plaintext(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + 7) % 256) as u8).collect()
}

pub const FIXTURES: [&str; 2] = ["agile_sha512_cbc", "agile_sha1_cfb"];

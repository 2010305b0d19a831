//! `dataIntegrity` HMAC verification (MS-OFFCRYPTO 2.3.4.14).
//!
//! The HMAC covers the entire `EncryptedPackage` stream as stored: the 8-byte size prefix followed
//! by the ciphertext, including any block padding.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use zeroize::Zeroizing;

use crate::aes_modes::{self, ChainingMode};
use crate::descriptor::EncryptionDescriptor;
use crate::error::{AgileCryptoError, DecryptFailureReason, Result};
use crate::hash::HashAlgorithm;
use crate::kdf::{derive_iv, HMAC_KEY_BLOCK, HMAC_VALUE_BLOCK};
use crate::verifier::ct_eq;

/// The two `dataIntegrity` blobs, each with its own IV block key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrityBlock {
    HmacKey,
    HmacValue,
}

impl IntegrityBlock {
    pub const fn block_key(self) -> [u8; 8] {
        match self {
            IntegrityBlock::HmacKey => HMAC_KEY_BLOCK,
            IntegrityBlock::HmacValue => HMAC_VALUE_BLOCK,
        }
    }

    fn field(self) -> &'static str {
        match self {
            IntegrityBlock::HmacKey => "dataIntegrity.encryptedHmacKey",
            IntegrityBlock::HmacValue => "dataIntegrity.encryptedHmacValue",
        }
    }
}

/// Check the `dataIntegrity` HMAC of a full `EncryptedPackage` stream.
///
/// `document_key` is the key recovered from `encryptedKeyValue`. Returns
/// [`AgileCryptoError::IntegrityMismatch`] when the stream was modified.
pub fn verify_data_integrity(
    encrypted_package_stream: &[u8],
    document_key: &[u8],
    descriptor: &EncryptionDescriptor,
) -> Result<()> {
    let data_integrity = descriptor.data_integrity.as_ref().ok_or_else(|| {
        AgileCryptoError::decryption("dataIntegrity", DecryptFailureReason::Missing)
    })?;
    let hash_alg = descriptor.hash_algorithm;
    let digest_len = hash_alg.digest_len();

    let hmac_key = decrypt_integrity_blob(
        IntegrityBlock::HmacKey,
        &data_integrity.encrypted_hmac_key,
        document_key,
        descriptor,
    )?;
    let expected = decrypt_integrity_blob(
        IntegrityBlock::HmacValue,
        &data_integrity.encrypted_hmac_value,
        document_key,
        descriptor,
    )?;

    let actual = compute_hmac(hash_alg, &hmac_key[..digest_len], encrypted_package_stream)?;
    if ct_eq(&actual, &expected[..digest_len]) {
        Ok(())
    } else {
        Err(AgileCryptoError::IntegrityMismatch)
    }
}

/// Decrypt one blob and check it holds at least a digest's worth of bytes.
fn decrypt_integrity_blob(
    block: IntegrityBlock,
    ciphertext: &[u8],
    document_key: &[u8],
    descriptor: &EncryptionDescriptor,
) -> Result<Zeroizing<Vec<u8>>> {
    let digest_len = descriptor.hash_algorithm.digest_len();
    let iv = derive_iv(
        &descriptor.key_data_salt,
        &block.block_key()[..],
        descriptor.hash_algorithm,
    );
    let plaintext = aes_modes::decrypt_no_padding(ChainingMode::Cbc, document_key, &iv, ciphertext)
        .map_err(|err| AgileCryptoError::decryption(block.field(), err))?;
    if plaintext.len() < digest_len {
        return Err(AgileCryptoError::truncated(
            block.field(),
            digest_len,
            plaintext.len(),
        ));
    }
    Ok(plaintext)
}

fn compute_hmac(alg: HashAlgorithm, key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    fn run<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| {
            AgileCryptoError::KeyDerivationFailure {
                reason: "invalid HMAC key length",
            }
        })?;
        mac.update(data);
        Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
    }

    match alg {
        HashAlgorithm::Sha1 => run::<Hmac<sha1::Sha1>>(key, data),
        HashAlgorithm::Sha256 => run::<Hmac<sha2::Sha256>>(key, data),
        HashAlgorithm::Sha384 => run::<Hmac<sha2::Sha384>>(key, data),
        HashAlgorithm::Sha512 => run::<Hmac<sha2::Sha512>>(key, data),
    }
}

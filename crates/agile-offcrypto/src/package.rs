//! `EncryptedPackage` decryption.
//!
//! The stream is an 8-byte little-endian plaintext size followed by ciphertext split into
//! independent 4096-byte segments. Segment `i` uses the document key and the IV
//! `Hash(keyDataSalt || LE32(i))[..16]`; chaining never crosses a segment boundary, so segments
//! can be decrypted in any order.

use crate::aes_modes::{self, AES_BLOCK_SIZE};
use crate::descriptor::EncryptionDescriptor;
use crate::error::{AgileCryptoError, CipherError, DecryptFailureReason, Result};
use crate::hash::HashAlgorithm;
use crate::integrity::verify_data_integrity;
use crate::kdf::{derive_iv, DerivedKey};
use crate::options::DecryptOptions;
use crate::parallel::try_for_each_chunk;
use crate::verifier::{compute_password_hash, document_key, verify_and_recover_key};

/// Plaintext bytes per segment.
pub const SEGMENT_SIZE: usize = 4096;

/// Length of the `EncryptedPackage` size prefix.
pub const ENCRYPTED_PACKAGE_SIZE_PREFIX_LEN: usize = 8;

const PACKAGE_FIELD: &str = "EncryptedPackage";

/// An `EncryptedPackage` stream split into its size prefix and ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedPackage<'a> {
    pub total_size: u64,
    pub ciphertext: &'a [u8],
}

/// Split an `EncryptedPackage` stream into `(total_size, ciphertext)`.
pub fn parse_encrypted_package_stream(stream: &[u8]) -> Result<EncryptedPackage<'_>> {
    let prefix: [u8; ENCRYPTED_PACKAGE_SIZE_PREFIX_LEN] = stream
        .get(..ENCRYPTED_PACKAGE_SIZE_PREFIX_LEN)
        .and_then(|prefix| prefix.try_into().ok())
        .ok_or_else(|| {
            AgileCryptoError::decryption(
                PACKAGE_FIELD,
                DecryptFailureReason::MissingSizePrefix { len: stream.len() },
            )
        })?;
    Ok(EncryptedPackage {
        total_size: u64::from_le_bytes(prefix),
        ciphertext: &stream[ENCRYPTED_PACKAGE_SIZE_PREFIX_LEN..],
    })
}

/// IV for segment `segment_index`.
pub fn segment_iv(
    key_data_salt: &[u8],
    segment_index: u32,
    hash_algorithm: HashAlgorithm,
) -> [u8; AES_BLOCK_SIZE] {
    derive_iv(key_data_salt, &segment_index.to_le_bytes()[..], hash_algorithm)
}

/// Recover the document key for `password`.
///
/// Does not check the password verifier; a wrong password yields a wrong key.
pub fn recover_document_key(
    password: &str,
    descriptor: &EncryptionDescriptor,
) -> Result<DerivedKey> {
    let password_hash = compute_password_hash(password, descriptor)?;
    document_key(&password_hash, descriptor)
}

/// Decrypt the package ciphertext (without the size prefix) to exactly `descriptor.total_size`
/// bytes.
///
/// The password is not verified first; use [`decrypt_encrypted_package`] to get
/// [`AgileCryptoError::WrongPassword`] instead of garbage output.
pub fn decrypt_package(
    ciphertext: &[u8],
    password: &str,
    descriptor: &EncryptionDescriptor,
) -> Result<Vec<u8>> {
    let key = recover_document_key(password, descriptor)?;
    decrypt_segments(ciphertext, &key, descriptor, DecryptOptions::default().parallel)
}

/// [`decrypt_package`] with resource limits and an explicit parallelism choice.
pub fn decrypt_package_with_options(
    ciphertext: &[u8],
    password: &str,
    descriptor: &EncryptionDescriptor,
    options: &DecryptOptions,
) -> Result<Vec<u8>> {
    options.check_limits(descriptor)?;
    let key = recover_document_key(password, descriptor)?;
    decrypt_segments(ciphertext, &key, descriptor, options.parallel)
}

/// Verify the password, check integrity and decrypt a full `EncryptedPackage` stream.
///
/// The size prefix must match `descriptor.total_size`. The `dataIntegrity` HMAC (when present and
/// enabled) is checked before any plaintext is produced.
pub fn decrypt_encrypted_package(
    stream: &[u8],
    password: &str,
    descriptor: &EncryptionDescriptor,
    options: &DecryptOptions,
) -> Result<Vec<u8>> {
    options.check_limits(descriptor)?;

    let package = parse_encrypted_package_stream(stream)?;
    if package.total_size != descriptor.total_size {
        return Err(AgileCryptoError::decryption(
            PACKAGE_FIELD,
            DecryptFailureReason::SizeMismatch {
                stream: package.total_size,
                descriptor: descriptor.total_size,
            },
        ));
    }

    let key = verify_and_recover_key(password, descriptor)?;

    if options.verify_integrity {
        if descriptor.data_integrity.is_some() {
            verify_data_integrity(stream, key.as_bytes(), descriptor)?;
        } else {
            log::debug!("descriptor has no dataIntegrity; skipping HMAC check");
        }
    }

    decrypt_segments(package.ciphertext, &key, descriptor, options.parallel)
}

fn decrypt_segments(
    ciphertext: &[u8],
    key: &DerivedKey,
    descriptor: &EncryptionDescriptor,
    parallel: bool,
) -> Result<Vec<u8>> {
    if ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(AgileCryptoError::decryption(
            PACKAGE_FIELD,
            CipherError::InvalidCiphertextLength(ciphertext.len()),
        ));
    }
    if descriptor.key_data_salt.is_empty() {
        return Err(AgileCryptoError::KeyDerivationFailure {
            reason: "keyDataSalt must not be empty",
        });
    }

    let total_size = usize::try_from(descriptor.total_size)
        .ok()
        .filter(|&size| size <= ciphertext.len())
        .ok_or_else(|| {
            AgileCryptoError::decryption(
                PACKAGE_FIELD,
                DecryptFailureReason::ShorterThanDeclared {
                    declared: descriptor.total_size,
                    available: ciphertext.len(),
                },
            )
        })?;

    // Only segments that contribute plaintext are decrypted; trailing padding segments are not.
    let needed = total_size
        .div_ceil(SEGMENT_SIZE)
        .saturating_mul(SEGMENT_SIZE)
        .min(ciphertext.len());
    let segments = needed.div_ceil(SEGMENT_SIZE);
    if segments > (u32::MAX as usize).saturating_add(1) {
        return Err(AgileCryptoError::decryption(
            PACKAGE_FIELD,
            DecryptFailureReason::TooManySegments,
        ));
    }

    let mut out = ciphertext[..needed].to_vec();
    let mode = descriptor.cipher_chaining;
    try_for_each_chunk(&mut out, SEGMENT_SIZE, parallel, |index, segment| {
        let index = u32::try_from(index).map_err(|_| {
            AgileCryptoError::decryption(PACKAGE_FIELD, DecryptFailureReason::TooManySegments)
        })?;
        let iv = segment_iv(&descriptor.key_data_salt, index, descriptor.hash_algorithm);
        aes_modes::decrypt_no_padding_in_place(mode, key.as_bytes(), &iv, segment)
            .map_err(|err| AgileCryptoError::decryption(PACKAGE_FIELD, err))
    })?;

    out.truncate(total_size);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aes_modes::{ChainingMode, CipherAlgorithm};

    fn descriptor(total_size: u64) -> EncryptionDescriptor {
        EncryptionDescriptor {
            password_salt: vec![0x11; 16],
            spin_count: 0,
            hash_algorithm: HashAlgorithm::Sha256,
            key_bits: 128,
            encrypted_verifier_hash_input: vec![0; 16],
            encrypted_verifier_hash_value: vec![0; 32],
            encrypted_key_value: vec![0; 16],
            key_data_salt: vec![0x22; 16],
            cipher_algorithm: CipherAlgorithm::Aes,
            cipher_chaining: ChainingMode::Cbc,
            total_size,
            data_integrity: None,
        }
    }

    #[test]
    fn parse_stream_splits_prefix() {
        let mut stream = 5000u64.to_le_bytes().to_vec();
        stream.extend_from_slice(&[0xAA; 32]);
        let package = parse_encrypted_package_stream(&stream).unwrap();
        assert_eq!(package.total_size, 5000);
        assert_eq!(package.ciphertext, &[0xAA; 32][..]);
    }

    #[test]
    fn parse_stream_rejects_short_input() {
        let err = parse_encrypted_package_stream(&[1, 2, 3]).unwrap_err();
        assert!(
            matches!(
                err,
                AgileCryptoError::DecryptionFailure {
                    reason: DecryptFailureReason::MissingSizePrefix { len: 3 },
                    ..
                }
            ),
            "expected MissingSizePrefix, got {err:?}"
        );
    }

    #[test]
    fn segment_ivs_depend_only_on_salt_and_index() {
        let salt: Vec<u8> = (0u8..16).collect();
        let iv0 = segment_iv(&salt, 0, HashAlgorithm::Sha512);
        assert_eq!(iv0, segment_iv(&salt, 0, HashAlgorithm::Sha512));
        assert_ne!(iv0, segment_iv(&salt, 1, HashAlgorithm::Sha512));
        assert_eq!(
            hex::encode(segment_iv(&salt, 2, HashAlgorithm::Sha512)),
            "ccf04743299db0755e73ba7bf44d41e1"
        );
    }

    #[test]
    fn misaligned_ciphertext_is_rejected() {
        let key = DerivedKey::from_slice(&[0u8; 16]).unwrap();
        let err = decrypt_segments(&[0u8; 33], &key, &descriptor(10), false).unwrap_err();
        assert!(
            matches!(
                err,
                AgileCryptoError::DecryptionFailure {
                    field: "EncryptedPackage",
                    reason: DecryptFailureReason::Cipher(CipherError::InvalidCiphertextLength(33)),
                }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn declared_size_larger_than_ciphertext_is_rejected() {
        let key = DerivedKey::from_slice(&[0u8; 16]).unwrap();
        let err = decrypt_segments(&[0u8; 32], &key, &descriptor(33), false).unwrap_err();
        assert!(
            matches!(
                err,
                AgileCryptoError::DecryptionFailure {
                    reason: DecryptFailureReason::ShorterThanDeclared {
                        declared: 33,
                        available: 32
                    },
                    ..
                }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn zero_total_size_yields_empty_output() {
        let key = DerivedKey::from_slice(&[0u8; 16]).unwrap();
        let out = decrypt_segments(&[0u8; 4096], &key, &descriptor(0), false).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn trailing_padding_segments_are_ignored() {
        let key = DerivedKey::from_slice(&[7u8; 16]).unwrap();
        let ciphertext = vec![0x5Au8; SEGMENT_SIZE * 3];
        let short = decrypt_segments(&ciphertext, &key, &descriptor(100), false).unwrap();
        let long = decrypt_segments(&ciphertext, &key, &descriptor(3 * 4096), false).unwrap();
        assert_eq!(short.len(), 100);
        assert_eq!(short[..], long[..100]);
    }

    #[test]
    fn limits_are_enforced_before_key_derivation() {
        let mut desc = descriptor(1024);
        desc.spin_count = 50_000_000;
        let err =
            decrypt_package_with_options(&[0u8; 1024], "pw", &desc, &DecryptOptions::default())
                .unwrap_err();
        assert!(
            matches!(err, AgileCryptoError::ResourceLimit { limit: "spinCount", .. }),
            "got {err:?}"
        );

        let desc = descriptor(u64::MAX);
        let err = decrypt_package_with_options(&[], "pw", &desc, &DecryptOptions::default())
            .unwrap_err();
        assert!(
            matches!(err, AgileCryptoError::ResourceLimit { limit: "totalSize", .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn stream_prefix_must_match_descriptor() {
        let mut stream = 17u64.to_le_bytes().to_vec();
        stream.extend_from_slice(&[0u8; 32]);
        let err =
            decrypt_encrypted_package(&stream, "pw", &descriptor(16), &DecryptOptions::default())
                .unwrap_err();
        assert!(
            matches!(
                err,
                AgileCryptoError::DecryptionFailure {
                    reason: DecryptFailureReason::SizeMismatch { stream: 17, descriptor: 16 },
                    ..
                }
            ),
            "got {err:?}"
        );
    }
}

//! Password verification against the encrypted verifier pair.

use subtle::ConstantTimeEq as _;
use zeroize::Zeroizing;

use crate::aes_modes::{self, ChainingMode};
use crate::descriptor::EncryptionDescriptor;
use crate::error::{AgileCryptoError, Result};
use crate::hash::MAX_DIGEST_LEN;
use crate::kdf::{BlockKeyPurpose, DerivedKey, PasswordHash};

/// Check `password` against the descriptor's verifier.
///
/// Returns `Ok(false)` for a wrong password. Malformed verifier blobs are errors.
pub fn verify_password(password: &str, descriptor: &EncryptionDescriptor) -> Result<bool> {
    let password_hash = compute_password_hash(password, descriptor)?;
    verify_with_password_hash(&password_hash, descriptor)
}

/// Verify `password` and recover the document key from one spin loop.
///
/// A verifier mismatch is [`AgileCryptoError::WrongPassword`].
pub fn verify_and_recover_key(
    password: &str,
    descriptor: &EncryptionDescriptor,
) -> Result<DerivedKey> {
    let password_hash = compute_password_hash(password, descriptor)?;
    if !verify_with_password_hash(&password_hash, descriptor)? {
        return Err(AgileCryptoError::WrongPassword);
    }
    document_key(&password_hash, descriptor)
}

/// Run the spin loop for `password` with the descriptor's salt and hash.
pub(crate) fn compute_password_hash(
    password: &str,
    descriptor: &EncryptionDescriptor,
) -> Result<PasswordHash> {
    // Key size errors should not cost a full spin loop.
    crate::kdf::key_len_from_bits(descriptor.key_bits)?;
    PasswordHash::compute(
        password,
        &descriptor.password_salt,
        descriptor.spin_count,
        descriptor.hash_algorithm,
    )
}

pub(crate) fn verify_with_password_hash(
    password_hash: &PasswordHash,
    descriptor: &EncryptionDescriptor,
) -> Result<bool> {
    let hash_alg = descriptor.hash_algorithm;
    let digest_len = hash_alg.digest_len();

    let key_input =
        password_hash.derive(descriptor.key_bits, Some(BlockKeyPurpose::VerifierHashInput))?;
    let verifier_input = decrypt_password_blob(
        "encryptedVerifierHashInput",
        &descriptor.encrypted_verifier_hash_input,
        &key_input,
        descriptor,
    )?;
    // The verifier input is one salt-sized random value; anything past it is block padding.
    let salt_len = descriptor.password_salt.len();
    let verifier_input = verifier_input.get(..salt_len).ok_or_else(|| {
        AgileCryptoError::truncated("encryptedVerifierHashInput", salt_len, verifier_input.len())
    })?;

    let mut computed = Zeroizing::new([0u8; MAX_DIGEST_LEN]);
    hash_alg.digest_parts_into(&[verifier_input], &mut computed[..]);

    let key_value =
        password_hash.derive(descriptor.key_bits, Some(BlockKeyPurpose::VerifierHashValue))?;
    let verifier_hash = decrypt_password_blob(
        "encryptedVerifierHashValue",
        &descriptor.encrypted_verifier_hash_value,
        &key_value,
        descriptor,
    )?;
    let expected = verifier_hash.get(..digest_len).ok_or_else(|| {
        AgileCryptoError::truncated("encryptedVerifierHashValue", digest_len, verifier_hash.len())
    })?;

    Ok(ct_eq(&computed[..digest_len], expected))
}

/// Recover the document key from `encryptedKeyValue`.
pub(crate) fn document_key(
    password_hash: &PasswordHash,
    descriptor: &EncryptionDescriptor,
) -> Result<DerivedKey> {
    let key_len = crate::kdf::key_len_from_bits(descriptor.key_bits)?;
    let key_encryption_key =
        password_hash.derive(descriptor.key_bits, Some(BlockKeyPurpose::EncryptedKeyValue))?;
    let decrypted = decrypt_password_blob(
        "encryptedKeyValue",
        &descriptor.encrypted_key_value,
        &key_encryption_key,
        descriptor,
    )?;
    let key = decrypted
        .get(..key_len)
        .ok_or_else(|| AgileCryptoError::truncated("encryptedKeyValue", key_len, decrypted.len()))?;
    DerivedKey::from_slice(key)
}

/// Password-key blobs are always AES-CBC with the password salt as IV.
fn decrypt_password_blob(
    field: &'static str,
    ciphertext: &[u8],
    key: &DerivedKey,
    descriptor: &EncryptionDescriptor,
) -> Result<Zeroizing<Vec<u8>>> {
    aes_modes::decrypt_no_padding(
        ChainingMode::Cbc,
        key.as_bytes(),
        &descriptor.password_salt,
        ciphertext,
    )
    .map_err(|err| AgileCryptoError::decryption(field, err))
}

/// Constant-time equality that also treats a length mismatch as "not equal".
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

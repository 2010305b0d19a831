//! AES adapters with padding disabled.
//!
//! MS-OFFCRYPTO Agile encryption pre-pads every plaintext to a whole number of AES blocks, so the
//! ciphertext buffers handed to these helpers are always block-aligned and the caller truncates
//! the decrypted output to the semantic length stored elsewhere in the format.
//!
//! CFB is full-block (128-bit feedback) CFB, which is what Office produces for
//! `ChainingModeCFB`.

use std::fmt;
use std::str::FromStr;

use aes::{Aes128, Aes192, Aes256};
use cipher::block_padding::NoPadding;
use cipher::{AsyncStreamCipher, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use zeroize::Zeroizing;

use crate::error::{AgileCryptoError, AlgorithmKind, CipherError};

pub const AES_BLOCK_SIZE: usize = 16;

/// Block cipher named by the descriptor's `cipherAlgorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    Aes,
}

impl CipherAlgorithm {
    pub fn from_name(name: &str) -> Result<Self, AgileCryptoError> {
        if name.trim().eq_ignore_ascii_case("AES") {
            Ok(Self::Aes)
        } else {
            Err(AgileCryptoError::UnsupportedAlgorithm {
                kind: AlgorithmKind::Cipher,
                name: name.trim().to_string(),
            })
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CipherAlgorithm::Aes => "AES",
        }
    }

    pub fn block_size(self) -> usize {
        match self {
            CipherAlgorithm::Aes => AES_BLOCK_SIZE,
        }
    }
}

impl FromStr for CipherAlgorithm {
    type Err = AgileCryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Block chaining mode named by the descriptor's `cipherChaining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainingMode {
    Cbc,
    Cfb,
}

impl ChainingMode {
    /// Accepts the XML spellings (`ChainingModeCBC`) as well as the bare mode names.
    pub fn from_name(name: &str) -> Result<Self, AgileCryptoError> {
        let trimmed = name.trim();
        let mode = trimmed
            .get(..ChainingMode::XML_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(ChainingMode::XML_PREFIX))
            .map_or(trimmed, |_| &trimmed[ChainingMode::XML_PREFIX.len()..]);
        if mode.eq_ignore_ascii_case("CBC") {
            Ok(Self::Cbc)
        } else if mode.eq_ignore_ascii_case("CFB") {
            Ok(Self::Cfb)
        } else {
            Err(AgileCryptoError::UnsupportedAlgorithm {
                kind: AlgorithmKind::ChainingMode,
                name: trimmed.to_string(),
            })
        }
    }

    const XML_PREFIX: &'static str = "ChainingMode";

    pub fn name(self) -> &'static str {
        match self {
            ChainingMode::Cbc => "ChainingModeCBC",
            ChainingMode::Cfb => "ChainingModeCFB",
        }
    }
}

impl FromStr for ChainingMode {
    type Err = AgileCryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for ChainingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decrypt AES ciphertext without padding removal, returning a zeroize-on-drop buffer.
pub fn decrypt_no_padding(
    mode: ChainingMode,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let mut out = Zeroizing::new(ciphertext.to_vec());
    decrypt_no_padding_in_place(mode, key, iv, &mut out)?;
    Ok(out)
}

/// In-place AES decryption without padding removal.
pub fn decrypt_no_padding_in_place(
    mode: ChainingMode,
    key: &[u8],
    iv: &[u8],
    buf: &mut [u8],
) -> Result<(), CipherError> {
    if iv.len() != AES_BLOCK_SIZE {
        return Err(CipherError::InvalidIvLength(iv.len()));
    }
    if buf.len() % AES_BLOCK_SIZE != 0 {
        return Err(CipherError::InvalidCiphertextLength(buf.len()));
    }

    match (mode, key.len()) {
        (ChainingMode::Cbc, 16) => cbc_decrypt::<Aes128>(key, iv, buf),
        (ChainingMode::Cbc, 24) => cbc_decrypt::<Aes192>(key, iv, buf),
        (ChainingMode::Cbc, 32) => cbc_decrypt::<Aes256>(key, iv, buf),
        (ChainingMode::Cfb, 16) => cfb_decrypt::<Aes128>(key, iv, buf),
        (ChainingMode::Cfb, 24) => cfb_decrypt::<Aes192>(key, iv, buf),
        (ChainingMode::Cfb, 32) => cfb_decrypt::<Aes256>(key, iv, buf),
        (_, other) => Err(CipherError::InvalidKeyLength(other)),
    }
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), CipherError>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    if buf.is_empty() {
        return Ok(());
    }
    let len = buf.len();
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CipherError::InvalidKeyLength(key.len()))?
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| CipherError::InvalidCiphertextLength(len))?;
    Ok(())
}

fn cfb_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), CipherError>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    cfb_mode::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CipherError::InvalidKeyLength(key.len()))?
        .decrypt(buf);
    Ok(())
}

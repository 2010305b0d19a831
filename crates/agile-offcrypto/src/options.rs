use crate::descriptor::EncryptionDescriptor;
use crate::error::{AgileCryptoError, Result};

/// Default maximum declared plaintext size (512 MiB).
///
/// The declared size comes from the file itself; bounding it keeps a hostile header from
/// requesting huge allocations.
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 512 * 1024 * 1024;

/// Default maximum accepted `spinCount`.
///
/// Excel uses `spinCount=100000`. This default leaves plenty of headroom while preventing a
/// document from requesting billions of hash iterations.
pub const DEFAULT_MAX_SPIN_COUNT: u32 = 10_000_000;

/// Options controlling package decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptOptions {
    /// Maximum accepted `total_size`. `None` disables the check.
    pub max_total_size: Option<u64>,
    /// Maximum accepted `spinCount`. `None` disables the check.
    pub max_spin_count: Option<u32>,
    /// Check the `dataIntegrity` HMAC when the descriptor carries one.
    pub verify_integrity: bool,
    /// Decrypt segments on the worker pool (only with the `parallel` feature).
    pub parallel: bool,
}

impl Default for DecryptOptions {
    fn default() -> Self {
        Self {
            max_total_size: Some(DEFAULT_MAX_TOTAL_SIZE),
            max_spin_count: Some(DEFAULT_MAX_SPIN_COUNT),
            verify_integrity: true,
            parallel: true,
        }
    }
}

impl DecryptOptions {
    /// No resource limits; integrity checking and parallelism keep their defaults.
    pub fn unbounded() -> Self {
        Self {
            max_total_size: None,
            max_spin_count: None,
            ..Self::default()
        }
    }

    /// Reject descriptors whose `spinCount` or `totalSize` exceed the configured maximums.
    pub fn check_limits(&self, descriptor: &EncryptionDescriptor) -> Result<()> {
        if let Some(max) = self.max_spin_count {
            if descriptor.spin_count > max {
                return Err(AgileCryptoError::ResourceLimit {
                    limit: "spinCount",
                    value: u64::from(descriptor.spin_count),
                    max: u64::from(max),
                });
            }
        }
        if let Some(max) = self.max_total_size {
            if descriptor.total_size > max {
                return Err(AgileCryptoError::ResourceLimit {
                    limit: "totalSize",
                    value: descriptor.total_size,
                    max,
                });
            }
        }
        Ok(())
    }
}

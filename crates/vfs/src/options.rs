//! Mount configuration.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::VfsError;
use crate::sanitize::NormalizationForm;

/// Default block size for semi-random generation (128 KiB).
pub const DEFAULT_BLOCK_SIZE: u64 = 131_072;

/// Default number of pre-generated blocks.
pub const DEFAULT_BLOCK_COUNT: usize = 100;

/// Default block-pool seed.
pub const DEFAULT_SEED: u32 = 4;

/// Default uniform modification time: 2017-10-17 00:00:00 UTC.
pub const DEFAULT_MTIME_SECS: u64 = 1_508_198_400;

/// Content synthesis strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    /// Every byte of every file is the given fill byte.
    Fill(u8),
    /// Bytes come from the pre-generated pseudo-random block pool.
    SemiRandom,
}

/// Configuration for a mounted tree.
#[derive(Debug, Clone)]
pub struct VfsOptions {
    /// Content synthesis mode.
    pub content: ContentMode,
    /// Minimum seconds between admitted operations; 0 disables.
    pub rate_limit: f64,
    /// Maximum operations per second; 0 disables.
    pub iop_limit: u32,
    /// Block size (B) for the semi-random pool.
    pub block_size: u64,
    /// Number of pre-generated blocks (N).
    pub block_count: usize,
    /// Seed for the block pool.
    pub seed: u32,
    /// Uniform owner uid.
    pub uid: u32,
    /// Uniform owner gid.
    pub gid: u32,
    /// Uniform modification time.
    pub mtime: SystemTime,
    /// Unicode normalization form for path comparison.
    pub normalization: NormalizationForm,
    /// Add the macOS cache-suppression entries to the root.
    pub macos_cache_files: bool,
    /// Silence warnings about missing "._" companion lookups.
    pub ignore_appledouble: bool,
}

impl Default for VfsOptions {
    fn default() -> Self {
        Self {
            content: ContentMode::Fill(0),
            rate_limit: 0.0,
            iop_limit: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            block_count: DEFAULT_BLOCK_COUNT,
            seed: DEFAULT_SEED,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            mtime: UNIX_EPOCH + Duration::from_secs(DEFAULT_MTIME_SECS),
            normalization: NormalizationForm::Nfd,
            macos_cache_files: true,
            ignore_appledouble: false,
        }
    }
}

impl VfsOptions {
    /// Reject out-of-range values before any mount work happens.
    pub fn validate(&self) -> Result<(), VfsError> {
        if !self.rate_limit.is_finite() || self.rate_limit < 0.0 {
            return Err(VfsError::InvalidConfig(
                "rate limit must be a non-negative number".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(VfsError::InvalidConfig(
                "block size must be a positive integer".to_string(),
            ));
        }
        if self.block_count == 0 {
            return Err(VfsError::InvalidConfig(
                "pre-generated block count must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options: VfsOptions = VfsOptions::default();
        assert_eq!(options.content, ContentMode::Fill(0));
        assert_eq!(options.block_size, 131_072);
        assert_eq!(options.block_count, 100);
        assert_eq!(options.seed, 4);
        assert_eq!(options.normalization, NormalizationForm::Nfd);
        assert!(options.macos_cache_files);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_rate() {
        let options: VfsOptions = VfsOptions {
            rate_limit: -0.5,
            ..VfsOptions::default()
        };
        assert!(matches!(
            options.validate().unwrap_err(),
            VfsError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_validate_rejects_zero_block_size() {
        let options: VfsOptions = VfsOptions {
            block_size: 0,
            ..VfsOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_block_count() {
        let options: VfsOptions = VfsOptions {
            block_count: 0,
            ..VfsOptions::default()
        };
        assert!(options.validate().is_err());
    }
}

//! Arena configuration parameters.

use spool_core::ArenaError;

/// Configuration for the arena allocator.
///
/// Controls segment sizing, capacity limits, descriptor table limits and
/// the page size used for file-range alignment. Validated at construction;
/// all values are immutable after creation.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Size of each backing byte segment.
    ///
    /// Default: 1 MiB. Must be at least [`MIN_SEGMENT_SIZE`](Self::MIN_SEGMENT_SIZE).
    /// A single allocation (including a whole chain of buffers) must fit
    /// in one segment.
    pub segment_size: usize,

    /// Maximum number of segments.
    ///
    /// Default: 64, so 64 MiB of payload at the default segment size.
    pub max_segments: u16,

    /// Page size used to align coalesced file ranges.
    ///
    /// Default: 4096. Must be a power of two.
    pub page_size: u64,

    /// Maximum number of buffer descriptors.
    pub max_bufs: u32,

    /// Maximum number of chain links (pooled links included).
    pub max_links: u32,
}

impl ArenaConfig {
    /// Default segment size: 1 MiB.
    pub const DEFAULT_SEGMENT_SIZE: usize = 1 << 20;

    /// Smallest permitted segment size.
    pub const MIN_SEGMENT_SIZE: usize = 4096;

    /// Default maximum segment count.
    pub const DEFAULT_MAX_SEGMENTS: u16 = 64;

    /// Default page size.
    pub const DEFAULT_PAGE_SIZE: u64 = 4096;

    /// Default descriptor table limit, per table.
    pub const DEFAULT_MAX_DESCRIPTORS: u32 = 1 << 20;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            segment_size: Self::DEFAULT_SEGMENT_SIZE,
            max_segments: Self::DEFAULT_MAX_SEGMENTS,
            page_size: Self::DEFAULT_PAGE_SIZE,
            max_bufs: Self::DEFAULT_MAX_DESCRIPTORS,
            max_links: Self::DEFAULT_MAX_DESCRIPTORS,
        }
    }

    /// Check every field against its constraint.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.segment_size < Self::MIN_SEGMENT_SIZE {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "segment_size {} below minimum {}",
                    self.segment_size,
                    Self::MIN_SEGMENT_SIZE
                ),
            });
        }
        if self.max_segments == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "max_segments must be at least 1".into(),
            });
        }
        if !self.page_size.is_power_of_two() {
            return Err(ArenaError::InvalidConfig {
                reason: format!("page_size {} is not a power of two", self.page_size),
            });
        }
        if self.max_bufs == 0 || self.max_links == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "descriptor limits must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// Total payload capacity in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.segment_size * self.max_segments as usize
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

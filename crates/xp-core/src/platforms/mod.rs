//! Built-in platform descriptors.

pub mod facebook;
pub mod tiktok;

pub use facebook::FacebookPlatform;
pub use tiktok::TikTokPlatform;

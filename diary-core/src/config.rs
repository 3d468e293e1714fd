//! Application configuration constants
//!
//! Central location for resource limits, allow-lists and validation
//! boundaries used throughout the engine.

// ===== Attachment Limits =====

/// Maximum accepted attachment size in bytes (10 MB)
pub const MAX_ATTACHMENT_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted for attachment upload
pub const ALLOWED_ATTACHMENT_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/heic",
    "video/mp4",
    "video/quicktime",
    "video/webm",
];

/// Maximum stored filename length (characters)
pub const MAX_FILENAME_LENGTH: usize = 255;

// ===== Tag Limits =====

/// Maximum number of tags kept on an entry or draft
pub const MAX_TAGS: usize = 20;

/// Maximum length of a single tag in characters
pub const MAX_TAG_LENGTH: usize = 40;

/// Placeholder values that are never stored as tags (compared case-insensitively)
pub const TAG_SENTINELS: &[&str] = &["other", "none"];

// ===== Template Ratings =====

/// Lowest accepted rating on rating-style templates
pub const MIN_RATING: u8 = 1;

/// Highest accepted rating on rating-style templates
pub const MAX_RATING: u8 = 10;

/// Midpoint a fresh rating starts at. A rating still at this value is
/// treated as untouched.
pub const DEFAULT_RATING: u8 = 5;

// ===== Drafts =====

/// Title given to drafts saved with a blank title
pub const UNTITLED_DRAFT_TITLE: &str = "Untitled Entry";

// ===== Insights =====

/// A week spans its start day plus this many days
pub const WEEK_SPAN_DAYS: i64 = 6;

/// Number of tags reported in entry statistics
pub const TOP_TAG_COUNT: usize = 5;

// ===== Logging =====

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "diary_core=debug,info";

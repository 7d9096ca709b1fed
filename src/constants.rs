//! Application-wide constants
//!
//! Single source of truth for magic numbers and string literals used
//! throughout the tool.

/// Profile store layout
pub mod store {
    /// Application directory under the per-user local data directory
    pub const APP_DIR: &str = "monitor-profiles";

    /// Subdirectory holding the profile files
    pub const PROFILES_DIR: &str = "profiles";

    /// File extension for stored profiles
    pub const PROFILE_EXTENSION: &str = "json";
}

/// Display-configuration query behavior
pub mod query {
    /// Attempts before giving up on the buffer-size/query race
    pub const MAX_ATTEMPTS: u32 = 5;
}

/// Graphics adapter flag bits (DXGI adapter flags)
pub mod adapter {
    /// Adapter is a remote (terminal-services) adapter
    pub const FLAG_REMOTE: u32 = 0x1;

    /// Adapter is a software rasterizer
    pub const FLAG_SOFTWARE: u32 = 0x2;
}

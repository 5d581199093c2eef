//! Storage key constants.

/// Storage keys used for the persisted provider session.
pub struct StorageKeys;

impl StorageKeys {
    /// Supabase access token
    pub const SUPABASE_ACCESS_TOKEN: &'static str = "supabase_access_token";

    /// Supabase refresh token
    pub const SUPABASE_REFRESH_TOKEN: &'static str = "supabase_refresh_token";

    /// Supabase session metadata (JSON)
    pub const SUPABASE_SESSION_META: &'static str = "supabase_session_meta";

    /// Every key owned by the portal, for bulk clearing.
    pub const ALL: [&'static str; 3] = [
        Self::SUPABASE_ACCESS_TOKEN,
        Self::SUPABASE_REFRESH_TOKEN,
        Self::SUPABASE_SESSION_META,
    ];
}

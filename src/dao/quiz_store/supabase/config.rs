/// Runtime configuration describing how to reach the Supabase REST gateway.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Service or anon key sent as both `apikey` and bearer token.
    pub api_key: String,
}

impl SupabaseConfig {
    /// Point at `base_url`, authenticating with `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

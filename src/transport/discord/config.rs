/// Default REST endpoint of the Discord API.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Runtime configuration describing how to reach Discord.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// REST API root.
    pub api_base: String,
    /// Bot token.
    pub bot_token: String,
    /// Application (client) id.
    pub application_id: u64,
    /// Hex-encoded ed25519 key used to verify interaction signatures.
    pub public_key: String,
}

impl DiscordConfig {
    /// Construct a configuration against the public Discord API.
    pub fn new(
        bot_token: impl Into<String>,
        application_id: u64,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            bot_token: bot_token.into(),
            application_id,
            public_key: public_key.into(),
        }
    }

    /// Point the client at another API root (proxies, test doubles).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

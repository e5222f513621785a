use crate::game::constants::OFFICE_COLORS;

/// Session configuration for one peer
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Port the host endpoint listens on
    pub port: u16,
    /// Address advertised in the room code (hosts only)
    pub advertise_address: String,
    /// Room code of the host to join; present selects the guest role
    pub room_code: Option<String>,
    /// Display name for the local player
    pub player_name: String,
    /// Display color for the local player (hex)
    pub player_color: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: 4433,
            advertise_address: "127.0.0.1".to_string(),
            room_code: None,
            player_name: "Employee".to_string(),
            player_color: OFFICE_COLORS[0].to_string(),
        }
    }
}

impl SessionConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                if parsed > 0 {
                    config.port = parsed;
                } else {
                    tracing::warn!("PORT must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid PORT '{}', using default", port);
            }
        }

        if let Ok(addr) = std::env::var("ADVERTISE_ADDRESS") {
            if !addr.trim().is_empty() {
                config.advertise_address = addr.trim().to_string();
            }
        }

        if let Ok(code) = std::env::var("ROOM_CODE") {
            if !code.trim().is_empty() {
                config.room_code = Some(code.trim().to_string());
            }
        }

        if let Ok(name) = std::env::var("PLAYER_NAME") {
            if !name.trim().is_empty() {
                config.player_name = name.trim().to_string();
            } else {
                tracing::warn!("PLAYER_NAME is empty, using default");
            }
        }

        if let Ok(color) = std::env::var("PLAYER_COLOR") {
            if color.starts_with('#') {
                config.player_color = color;
            } else {
                tracing::warn!("Invalid PLAYER_COLOR '{}', using default", color);
            }
        }

        config
    }

    /// Whether this peer joins an existing room instead of hosting one
    pub fn is_guest(&self) -> bool {
        self.room_code.is_some()
    }

    /// Room code this peer will advertise when hosting
    pub fn host_room_code(&self) -> String {
        format!("https://{}:{}", self.advertise_address, self.port)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.player_name.is_empty() {
            return Err("player_name cannot be empty".to_string());
        }
        if !self.player_color.starts_with('#') {
            return Err("player_color must be a hex color".to_string());
        }
        Ok(())
    }
}

/// Boss commentary configuration
#[derive(Debug, Clone)]
pub struct CommentaryConfig {
    /// Anthropic API key; commentary is silently inactive without one
    pub api_key: Option<String>,
    /// Model used for commentary lines
    pub model: String,
}

impl Default for CommentaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-3-5-haiku-latest".to_string(),
        }
    }
}

impl CommentaryConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.trim().is_empty() {
                config.api_key = Some(key.trim().to_string());
            }
        }

        if let Ok(model) = std::env::var("COMMENTARY_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }

        config
    }

    /// Commentary only runs with a configured key; otherwise callers get
    /// the fallback line without any network traffic.
    pub fn is_active(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

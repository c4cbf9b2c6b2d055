//! Lobby configuration.

/// Settings for the lobby actor.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Maximum number of online clients. 0 means unlimited.
    pub max_clients: usize,

    /// Capacity of the actor's command channel. Senders wait when it is
    /// full.
    pub channel_size: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            max_clients: 0,
            channel_size: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_config_default_is_unlimited() {
        let config = LobbyConfig::default();
        assert_eq!(config.max_clients, 0);
        assert_eq!(config.channel_size, 256);
    }
}

//! Configuration for the voice-command pipeline

/// Configuration for one voice pipeline instance.
///
/// Timing defaults follow the behavior of the stock launcher integration:
/// a 5 s budget for the cloud resolver, 500 ms settling time between
/// compound-action steps, and feedback overlays that dismiss themselves
/// after 1.5 s (success) or 2 s (everything else).
#[derive(Clone, Debug)]
pub struct VoiceConfig {
    /// BCP-47 tag passed to the speech capture capability
    pub locale: String,

    /// Whether the cloud resolver is consulted before the offline one
    pub cloud_enabled: bool,

    /// Whether spoken confirmations are produced
    pub tts_enabled: bool,

    /// Whether haptic pulses are produced
    pub haptics_enabled: bool,

    /// Budget for one cloud resolution attempt, in milliseconds
    pub cloud_timeout_ms: u64,

    /// Connect/read timeout for the cloud HTTP client, in milliseconds
    pub http_timeout_ms: u64,

    /// Settling delay between compound-action steps, in milliseconds
    pub compound_delay_ms: u64,

    /// Overlay auto-dismiss delay after a successful action, in milliseconds
    pub success_dismiss_ms: u64,

    /// Overlay auto-dismiss delay after errors and confirmations, in milliseconds
    pub error_dismiss_ms: u64,

    /// Maximum installed apps embedded in the cloud prompt
    pub max_context_apps: usize,

    /// Maximum contacts embedded in the cloud prompt
    pub max_context_contacts: usize,

    /// Maximum recent apps embedded in the cloud prompt
    pub max_context_recents: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            cloud_enabled: false,
            tts_enabled: true,
            haptics_enabled: true,
            cloud_timeout_ms: 5000,
            http_timeout_ms: 5000,
            compound_delay_ms: 500,
            success_dismiss_ms: 1500,
            error_dismiss_ms: 2000,
            max_context_apps: 200,
            max_context_contacts: 100,
            max_context_recents: 10,
        }
    }
}

impl VoiceConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capture locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Enable or disable the cloud resolver
    pub fn with_cloud(mut self, enabled: bool) -> Self {
        self.cloud_enabled = enabled;
        self
    }

    /// Enable or disable spoken confirmations
    pub fn with_tts(mut self, enabled: bool) -> Self {
        self.tts_enabled = enabled;
        self
    }

    /// Enable or disable haptic feedback
    pub fn with_haptics(mut self, enabled: bool) -> Self {
        self.haptics_enabled = enabled;
        self
    }

    /// Set the cloud resolution budget
    pub fn with_cloud_timeout_ms(mut self, timeout: u64) -> Self {
        self.cloud_timeout_ms = timeout;
        self
    }

    /// Set the delay between compound-action steps
    pub fn with_compound_delay_ms(mut self, delay: u64) -> Self {
        self.compound_delay_ms = delay;
        self
    }

    /// Set the auto-dismiss delays
    pub fn with_dismiss_delays_ms(mut self, success: u64, error: u64) -> Self {
        self.success_dismiss_ms = success;
        self.error_dismiss_ms = error;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VoiceConfig::default();
        assert_eq!(config.locale, "en-US");
        assert!(!config.cloud_enabled);
        assert_eq!(config.cloud_timeout_ms, 5000);
        assert_eq!(config.compound_delay_ms, 500);
        assert_eq!(config.success_dismiss_ms, 1500);
        assert_eq!(config.error_dismiss_ms, 2000);
        assert_eq!(config.max_context_apps, 200);
        assert_eq!(config.max_context_contacts, 100);
        assert_eq!(config.max_context_recents, 10);
    }

    #[test]
    fn test_builder_pattern() {
        let config = VoiceConfig::new()
            .with_locale("de-DE")
            .with_cloud(true)
            .with_cloud_timeout_ms(2500)
            .with_dismiss_delays_ms(1000, 3000);

        assert_eq!(config.locale, "de-DE");
        assert!(config.cloud_enabled);
        assert_eq!(config.cloud_timeout_ms, 2500);
        assert_eq!(config.success_dismiss_ms, 1000);
        assert_eq!(config.error_dismiss_ms, 3000);
    }
}

//! Cloud intent resolution via a language-model completion endpoint
//!
//! One HTTP call per attempt: the transcript plus a bounded slice of the
//! context snapshot goes out, a single tagged JSON object comes back and is
//! parsed into a [`VoiceAction`]. Every failure mode (missing key, HTTP
//! error, malformed payload, unknown tag, missing field) collapses into
//! `Unsupported`, which is what lets the router fall back uniformly. The
//! API key is read from the secret store and never logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{IntentResolver, VoiceAction};
use crate::config::VoiceConfig;
use crate::context::{PhoneContext, SystemCommand};
use crate::secrets::SecretStore;
use crate::{MutterError, Result};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MODEL: &str = "claude-sonnet-4-5-20250929";
const MAX_TOKENS: u32 = 256;

/// Secret-store key holding the completion-endpoint API key
pub const API_KEY_SECRET: &str = "claude_api_key";

/// Remote resolution strategy
pub struct CloudResolver {
    client: Client,
    secrets: Arc<dyn SecretStore>,
    config: VoiceConfig,
    fence: Regex,
}

impl CloudResolver {
    pub fn new(config: VoiceConfig, secrets: Arc<dyn SecretStore>) -> Result<Self> {
        let timeout = Duration::from_millis(config.http_timeout_ms);
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| MutterError::ConfigError(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            secrets,
            config,
            fence: Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("static regex"),
        })
    }

    fn build_system_prompt(&self, context: &PhoneContext) -> String {
        let app_names = context
            .installed_apps
            .iter()
            .take(self.config.max_context_apps)
            .map(|a| a.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let recent_apps = context
            .recent_apps
            .iter()
            .take(self.config.max_context_recents)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let contacts = context
            .contacts
            .iter()
            .take(self.config.max_context_contacts)
            .map(|c| c.display_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let actions = context.available_actions.join(", ");

        format!(
            r#"You are a voice command classifier for a phone launcher.
Given a voice transcript, classify it into exactly one action.

Available apps: {app_names}
Recent apps: {recent_apps}
Contacts: {contacts}
System actions: {actions}
Current time: {current_time}

Respond with ONLY a JSON object matching one of these schemas:
{{"type":"launch_app","package_name":"<pkg>","profile_type":"SYSTEM"}}
{{"type":"call_contact","name":"<name>","number":"<number or null>"}}
{{"type":"send_message","recipient":"<name or number>","body":"<text>"}}
{{"type":"system_action","action":"<action_name>"}}
{{"type":"open_url","url":"<url>"}}
{{"type":"set_alarm","hour":<int>,"minute":<int>,"label":"<optional>"}}
{{"type":"device_setting","setting":"<name>","enable":<bool>}}
{{"type":"accessibility_action","description":"<what to do>"}}
{{"type":"compound_action","actions":[<array of above actions>]}}
{{"type":"clarification","message":"<ask user for clarification>"}}
{{"type":"unsupported","message":"<reason>"}}

Match app names fuzzily. Prefer recently used apps when ambiguous.
For compound requests (e.g. "open X and call Y"), use compound_action."#,
            current_time = context.current_time,
        )
    }

    /// Pull the action JSON out of the completion body
    fn parse_response(&self, body: &Value) -> VoiceAction {
        let Some(text) = body
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
        else {
            return unsupported("No content in response");
        };

        let payload = self.extract_json(text);
        match serde_json::from_str::<WireAction>(payload) {
            Ok(wire) => wire.into_action(),
            Err(e) => unsupported(format!("Invalid action JSON: {e}")),
        }
    }

    /// Strip an optional markdown fence; otherwise take the outermost braces
    fn extract_json<'a>(&self, text: &'a str) -> &'a str {
        if let Some(caps) = self.fence.captures(text) {
            return caps.get(1).map(|m| m.as_str()).unwrap_or(text);
        }
        match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if end > start => &text[start..=end],
            _ => text,
        }
    }
}

#[async_trait]
impl IntentResolver for CloudResolver {
    async fn resolve_intent(&self, transcript: &str, context: &PhoneContext) -> VoiceAction {
        let Some(api_key) = self.secrets.get_secret(API_KEY_SECRET) else {
            return unsupported("No API key configured");
        };

        let request = json!({
            "model": MODEL,
            "max_tokens": MAX_TOKENS,
            "system": self.build_system_prompt(context),
            "messages": [{"role": "user", "content": transcript}],
        });

        let response = match self
            .client
            .post(API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return unsupported(format!("Request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return unsupported(format!("API error: {}", status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return unsupported(format!("Invalid response body: {e}")),
        };

        let action = self.parse_response(&body);
        debug!(kind = action.kind(), "cloud resolver produced action");
        action
    }
}

fn unsupported(reason: impl Into<String>) -> VoiceAction {
    VoiceAction::Unsupported {
        reason: reason.into(),
    }
}

fn default_profile() -> String {
    "SYSTEM".to_string()
}

/// Tagged shapes of the private wire contract, one per action variant
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireAction {
    LaunchApp {
        package_name: String,
        #[serde(default = "default_profile")]
        profile_type: String,
    },
    CallContact {
        name: String,
        #[serde(default)]
        number: Option<String>,
    },
    SendMessage {
        recipient: String,
        body: String,
    },
    SystemAction {
        action: String,
    },
    OpenUrl {
        url: String,
    },
    SetAlarm {
        hour: i64,
        minute: i64,
        #[serde(default)]
        label: Option<String>,
    },
    DeviceSetting {
        setting: String,
        enable: bool,
    },
    AccessibilityAction {
        description: String,
    },
    CompoundAction {
        actions: Vec<WireAction>,
    },
    Clarification {
        message: String,
    },
    Unsupported {
        #[serde(default)]
        message: String,
    },
}

impl WireAction {
    fn into_action(self) -> VoiceAction {
        match self {
            WireAction::LaunchApp {
                package_name,
                profile_type,
            } => VoiceAction::LaunchApp {
                package: package_name,
                profile: profile_type,
            },
            WireAction::CallContact { name, number } => VoiceAction::CallContact {
                name,
                number: number.filter(|n| !n.is_empty()),
            },
            WireAction::SendMessage { recipient, body } => {
                VoiceAction::SendMessage { recipient, body }
            }
            WireAction::SystemAction { action } => match action.parse::<SystemCommand>() {
                Ok(command) => VoiceAction::SystemAction(command),
                Err(()) => unsupported(format!("Unknown system action: {action}")),
            },
            WireAction::OpenUrl { url } => VoiceAction::OpenUrl { url },
            WireAction::SetAlarm { hour, minute, label } => {
                if !(0..=23).contains(&hour) || !(0..=59).contains(&minute) {
                    return unsupported(format!("Invalid alarm time: {hour}:{minute:02}"));
                }
                VoiceAction::SetAlarm {
                    hour: hour as u8,
                    minute: minute as u8,
                    label: label.filter(|l| !l.is_empty()),
                }
            }
            WireAction::DeviceSetting { setting, enable } => {
                VoiceAction::DeviceSetting { setting, enable }
            }
            WireAction::AccessibilityAction { description } => {
                VoiceAction::AccessibilityAction { description }
            }
            WireAction::CompoundAction { actions } => VoiceAction::CompoundAction(
                actions.into_iter().map(WireAction::into_action).collect(),
            ),
            WireAction::Clarification { message } => VoiceAction::Clarification { message },
            WireAction::Unsupported { message } => {
                let reason = if message.is_empty() {
                    "Unknown action type".to_string()
                } else {
                    message
                };
                unsupported(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AppEntry, ContactEntry};
    use crate::secrets::MemorySecretStore;

    fn resolver() -> CloudResolver {
        CloudResolver::new(VoiceConfig::default(), Arc::new(MemorySecretStore::new())).unwrap()
    }

    fn completion_body(text: &str) -> Value {
        json!({"content": [{"type": "text", "text": text}]})
    }

    #[test]
    fn test_parse_launch_app() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"launch_app","package_name":"com.android.camera","profile_type":"SYSTEM"}"#,
        ));
        assert_eq!(
            action,
            VoiceAction::LaunchApp {
                package: "com.android.camera".to_string(),
                profile: "SYSTEM".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_defaults_profile_when_missing() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"launch_app","package_name":"com.android.camera"}"#,
        ));
        assert_eq!(
            action,
            VoiceAction::LaunchApp {
                package: "com.android.camera".to_string(),
                profile: "SYSTEM".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_fenced_payload() {
        let action = resolver().parse_response(&completion_body(
            "```json\n{\"type\":\"system_action\",\"action\":\"LockScreen\"}\n```",
        ));
        assert_eq!(action, VoiceAction::SystemAction(SystemCommand::LockScreen));
    }

    #[test]
    fn test_parse_payload_with_surrounding_prose() {
        let action = resolver().parse_response(&completion_body(
            "Here is the action: {\"type\":\"open_url\",\"url\":\"https://example.com\"}",
        ));
        assert_eq!(
            action,
            VoiceAction::OpenUrl {
                url: "https://example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_call_contact_with_null_number() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"call_contact","name":"Mom","number":null}"#,
        ));
        assert_eq!(
            action,
            VoiceAction::CallContact {
                name: "Mom".to_string(),
                number: None,
            }
        );
    }

    #[test]
    fn test_parse_empty_number_reads_as_absent() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"call_contact","name":"Mom","number":""}"#,
        ));
        assert_eq!(
            action,
            VoiceAction::CallContact {
                name: "Mom".to_string(),
                number: None,
            }
        );
    }

    #[test]
    fn test_parse_send_message() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"send_message","recipient":"Mom","body":"running late"}"#,
        ));
        assert_eq!(
            action,
            VoiceAction::SendMessage {
                recipient: "Mom".to_string(),
                body: "running late".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_device_setting() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"device_setting","setting":"wifi","enable":false}"#,
        ));
        assert_eq!(
            action,
            VoiceAction::DeviceSetting {
                setting: "wifi".to_string(),
                enable: false,
            }
        );
    }

    #[test]
    fn test_parse_accessibility_action() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"accessibility_action","description":"tap the submit button"}"#,
        ));
        assert_eq!(
            action,
            VoiceAction::AccessibilityAction {
                description: "tap the submit button".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_clarification() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"clarification","message":"Which Bob did you mean?"}"#,
        ));
        assert_eq!(
            action,
            VoiceAction::Clarification {
                message: "Which Bob did you mean?".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_unsupported_without_message_gets_default_reason() {
        let action = resolver().parse_response(&completion_body(r#"{"type":"unsupported"}"#));
        assert_eq!(
            action,
            VoiceAction::Unsupported {
                reason: "Unknown action type".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"reboot_device","target":"now"}"#,
        ));
        assert!(matches!(action, VoiceAction::Unsupported { .. }));
    }

    #[test]
    fn test_missing_field_is_unsupported() {
        let action =
            resolver().parse_response(&completion_body(r#"{"type":"send_message","body":"hi"}"#));
        assert!(matches!(action, VoiceAction::Unsupported { .. }));
    }

    #[test]
    fn test_unknown_system_action_is_unsupported() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"system_action","action":"SelfDestruct"}"#,
        ));
        assert!(matches!(action, VoiceAction::Unsupported { .. }));
    }

    #[test]
    fn test_out_of_range_alarm_is_unsupported() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"set_alarm","hour":25,"minute":30}"#,
        ));
        assert!(matches!(action, VoiceAction::Unsupported { .. }));
    }

    #[test]
    fn test_compound_children_convert_recursively() {
        let action = resolver().parse_response(&completion_body(
            r#"{"type":"compound_action","actions":[
                {"type":"launch_app","package_name":"com.android.camera"},
                {"type":"set_alarm","hour":7,"minute":30,"label":"gym"}
            ]}"#,
        ));
        let VoiceAction::CompoundAction(actions) = action else {
            panic!("expected compound action");
        };
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[1],
            VoiceAction::SetAlarm {
                hour: 7,
                minute: 30,
                label: Some("gym".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_content_is_unsupported() {
        let action = resolver().parse_response(&json!({"error": "overloaded"}));
        assert!(matches!(action, VoiceAction::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_missing_api_key_short_circuits() {
        let action = resolver()
            .resolve_intent("open camera", &PhoneContext::default())
            .await;
        assert_eq!(
            action,
            VoiceAction::Unsupported {
                reason: "No API key configured".to_string(),
            }
        );
    }

    #[test]
    fn test_prompt_bounds_context_slices() {
        let context = PhoneContext {
            installed_apps: (0..250)
                .map(|i| AppEntry::new(format!("App{i:03}"), format!("com.app{i:03}")))
                .collect(),
            contacts: (0..150)
                .map(|i| ContactEntry::new(format!("Contact{i:03}"), "+1555"))
                .collect(),
            recent_apps: (0..20).map(|i| format!("com.recent{i:02}")).collect(),
            available_actions: vec!["LockScreen".to_string()],
            current_time: "2026-08-04 12:00".to_string(),
        };

        let prompt = resolver().build_system_prompt(&context);
        assert!(prompt.contains("App199"));
        assert!(!prompt.contains("App200"));
        assert!(prompt.contains("Contact099"));
        assert!(!prompt.contains("Contact100"));
        assert!(prompt.contains("com.recent09"));
        assert!(!prompt.contains("com.recent10"));
        assert!(prompt.contains("Current time: 2026-08-04 12:00"));
    }
}

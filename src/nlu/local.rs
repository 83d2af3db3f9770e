//! Offline intent resolution via keyword, regex and fuzzy matching
//!
//! A fixed-priority cascade evaluated until the first stage matches:
//!
//!   1. Exact keyword phrases for system actions
//!   2. "open X" / "launch X" / "start X" → fuzzy app lookup
//!   3. "call X" / "dial X" / "phone X" → fuzzy contact lookup
//!   4. Message phrasing ("message X saying Y", bare "text X")
//!   5. Alarm phrasing ("set alarm for 7 30", "wake me at 7:30")
//!   6. Device-setting toggles against a fixed whitelist
//!   7. The whole transcript as a fuzzy app query
//!
//! First match wins; the order is part of the contract.

use async_trait::async_trait;
use regex::Regex;

use super::fuzzy::{self, DIRECTORY_THRESHOLD};
use super::{IntentResolver, VoiceAction};
use crate::context::{AppEntry, ContactEntry, PhoneContext, SystemCommand};

const SETTING_WHITELIST: [&str; 5] = ["wifi", "bluetooth", "airplane mode", "flashlight", "location"];

/// Offline resolver; synchronous under the hood, no network
pub struct LocalResolver {
    message_with_body: Regex,
    message_bare: Regex,
    alarm_set: Regex,
    alarm_wake: Regex,
    toggle_leading: Regex,
    toggle_enable: Regex,
    toggle_trailing: Regex,
}

impl Default for LocalResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalResolver {
    pub fn new() -> Self {
        // The patterns are fixed literals; compilation cannot fail.
        Self {
            message_with_body: Regex::new(
                r"^(?:message|text|send (?:a )?message to) (.+?) (?:saying|that|with message) (.+)$",
            )
            .expect("static regex"),
            message_bare: Regex::new(r"^(?:message|text) (.+)$").expect("static regex"),
            alarm_set: Regex::new(r"^set (?:an )?alarm (?:for )?(?:at )?(\d{1,2})[: ](\d{2})\s*(.*)$")
                .expect("static regex"),
            alarm_wake: Regex::new(r"^(?:wake me|alarm) (?:at|for) (\d{1,2})[: ](\d{2})\s*(.*)$")
                .expect("static regex"),
            toggle_leading: Regex::new(r"^(?:turn |switch |toggle )(on|off) (.+)$").expect("static regex"),
            toggle_enable: Regex::new(r"^(?:enable|disable) (.+)$").expect("static regex"),
            toggle_trailing: Regex::new(r"^(.+?) (on|off)$").expect("static regex"),
        }
    }

    fn resolve_system_action(&self, input: &str) -> Option<VoiceAction> {
        let command = match input {
            "lock" | "lock screen" | "lock phone" => SystemCommand::LockScreen,
            "screenshot" | "take screenshot" | "take a screenshot" => SystemCommand::TakeScreenshot,
            "recents" | "recent apps" | "show recents" => SystemCommand::ShowRecents,
            "notifications" | "show notifications" => SystemCommand::ShowNotifications,
            "quick settings" | "show quick settings" => SystemCommand::OpenQuickSettings,
            "power" | "power menu" | "power dialog" => SystemCommand::OpenPowerDialog,
            _ => return None,
        };
        Some(VoiceAction::SystemAction(command))
    }

    fn resolve_open_command(&self, input: &str, context: &PhoneContext) -> Option<VoiceAction> {
        let app_name = ["open ", "launch ", "start "]
            .iter()
            .find_map(|prefix| input.strip_prefix(prefix))
            .map(str::trim)?;

        if app_name.is_empty() {
            return None;
        }
        Some(self.fuzzy_match_app(app_name, context))
    }

    fn resolve_call_command(&self, input: &str, context: &PhoneContext) -> Option<VoiceAction> {
        let contact_name = ["call ", "dial ", "phone "]
            .iter()
            .find_map(|prefix| input.strip_prefix(prefix))
            .map(str::trim)?;

        if contact_name.is_empty() {
            return None;
        }

        Some(match find_best_contact(contact_name, context) {
            Some(contact) => VoiceAction::CallContact {
                name: contact.display_name.clone(),
                number: Some(contact.phone_number.clone()).filter(|n| !n.is_empty()),
            },
            None => VoiceAction::Clarification {
                message: format!("No contact found matching: {contact_name}"),
            },
        })
    }

    fn resolve_message_command(&self, input: &str, context: &PhoneContext) -> Option<VoiceAction> {
        let (recipient_name, body) = if let Some(caps) = self.message_with_body.captures(input) {
            (caps[1].trim().to_string(), caps[2].trim().to_string())
        } else if let Some(caps) = self.message_bare.captures(input) {
            (caps[1].trim().to_string(), String::new())
        } else {
            return None;
        };

        let recipient = match find_best_contact(&recipient_name, context) {
            Some(contact) if !contact.phone_number.is_empty() => contact.phone_number.clone(),
            Some(contact) => contact.display_name.clone(),
            None => recipient_name,
        };

        Some(VoiceAction::SendMessage { recipient, body })
    }

    fn resolve_alarm_command(&self, input: &str) -> Option<VoiceAction> {
        for pattern in [&self.alarm_set, &self.alarm_wake] {
            let Some(caps) = pattern.captures(input) else {
                continue;
            };
            let Ok(hour) = caps[1].parse::<u8>() else {
                continue;
            };
            let Ok(minute) = caps[2].parse::<u8>() else {
                continue;
            };
            if hour > 23 || minute > 59 {
                continue;
            }
            let label = Some(caps[3].trim().to_string()).filter(|l| !l.is_empty());
            return Some(VoiceAction::SetAlarm { hour, minute, label });
        }
        None
    }

    fn resolve_device_setting(&self, input: &str) -> Option<VoiceAction> {
        let (setting, enable) = if let Some(caps) = self.toggle_leading.captures(input) {
            (caps[2].to_string(), &caps[1] == "on")
        } else if let Some(caps) = self.toggle_enable.captures(input) {
            (caps[1].to_string(), input.starts_with("enable"))
        } else if let Some(caps) = self.toggle_trailing.captures(input) {
            (caps[1].to_string(), &caps[2] == "on")
        } else {
            return None;
        };

        let setting = setting.trim().to_lowercase();
        if !SETTING_WHITELIST.contains(&setting.as_str()) {
            return None;
        }
        Some(VoiceAction::DeviceSetting { setting, enable })
    }

    fn fuzzy_match_app(&self, query: &str, context: &PhoneContext) -> VoiceAction {
        match find_best_app(query, context) {
            Some(app) => VoiceAction::LaunchApp {
                package: app.package.clone(),
                profile: app.profile.clone(),
            },
            None => VoiceAction::Unsupported {
                reason: format!("No matching app found for: {query}"),
            },
        }
    }
}

/// Best-scoring app above the acceptance threshold; first wins on ties
fn find_best_app<'a>(query: &str, context: &'a PhoneContext) -> Option<&'a AppEntry> {
    let mut best: Option<&AppEntry> = None;
    let mut best_score = DIRECTORY_THRESHOLD;
    for app in &context.installed_apps {
        let score = fuzzy::score(&app.label, query);
        if score > best_score {
            best = Some(app);
            best_score = score;
        }
    }
    best
}

/// Best-scoring contact above the acceptance threshold; first wins on ties
fn find_best_contact<'a>(query: &str, context: &'a PhoneContext) -> Option<&'a ContactEntry> {
    let mut best: Option<&ContactEntry> = None;
    let mut best_score = DIRECTORY_THRESHOLD;
    for contact in &context.contacts {
        let score = fuzzy::score(&contact.display_name, query);
        if score > best_score {
            best = Some(contact);
            best_score = score;
        }
    }
    best
}

#[async_trait]
impl IntentResolver for LocalResolver {
    async fn resolve_intent(&self, transcript: &str, context: &PhoneContext) -> VoiceAction {
        let input = transcript.trim().to_lowercase();

        if let Some(action) = self.resolve_system_action(&input) {
            return action;
        }
        if let Some(action) = self.resolve_open_command(&input, context) {
            return action;
        }
        if let Some(action) = self.resolve_call_command(&input, context) {
            return action;
        }
        if let Some(action) = self.resolve_message_command(&input, context) {
            return action;
        }
        if let Some(action) = self.resolve_alarm_command(&input) {
            return action;
        }
        if let Some(action) = self.resolve_device_setting(&input) {
            return action;
        }

        self.fuzzy_match_app(&input, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> PhoneContext {
        PhoneContext {
            installed_apps: vec![
                AppEntry::new("Camera", "com.android.camera"),
                AppEntry::new("Google Chrome", "com.android.chrome"),
                AppEntry::new("Messages", "com.android.messaging"),
            ],
            contacts: vec![
                ContactEntry::new("Mom", "+15551234"),
                ContactEntry::new("Alice Johnson", "+15559876"),
                ContactEntry {
                    display_name: "Bob".to_string(),
                    phone_number: String::new(),
                    email: "bob@example.com".to_string(),
                },
            ],
            recent_apps: vec![],
            available_actions: SystemCommand::ALL.iter().map(|c| c.to_string()).collect(),
            current_time: "2026-08-04 12:00".to_string(),
        }
    }

    async fn resolve(transcript: &str) -> VoiceAction {
        LocalResolver::new().resolve_intent(transcript, &context()).await
    }

    #[tokio::test]
    async fn test_system_action_keywords() {
        assert_eq!(
            resolve("lock screen").await,
            VoiceAction::SystemAction(SystemCommand::LockScreen)
        );
        assert_eq!(
            resolve("take a screenshot").await,
            VoiceAction::SystemAction(SystemCommand::TakeScreenshot)
        );
        assert_eq!(
            resolve("Recent Apps").await,
            VoiceAction::SystemAction(SystemCommand::ShowRecents)
        );
        assert_eq!(
            resolve("show notifications").await,
            VoiceAction::SystemAction(SystemCommand::ShowNotifications)
        );
        assert_eq!(
            resolve("quick settings").await,
            VoiceAction::SystemAction(SystemCommand::OpenQuickSettings)
        );
        assert_eq!(
            resolve("power menu").await,
            VoiceAction::SystemAction(SystemCommand::OpenPowerDialog)
        );
    }

    #[tokio::test]
    async fn test_open_command_fuzzy_matches_app() {
        assert_eq!(
            resolve("open camera").await,
            VoiceAction::LaunchApp {
                package: "com.android.camera".to_string(),
                profile: "SYSTEM".to_string(),
            }
        );
        assert_eq!(
            resolve("launch chrome").await,
            VoiceAction::LaunchApp {
                package: "com.android.chrome".to_string(),
                profile: "SYSTEM".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_open_unknown_app_is_unsupported() {
        let action = resolve("open flight simulator").await;
        assert!(matches!(action, VoiceAction::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_call_known_contact() {
        assert_eq!(
            resolve("call mom").await,
            VoiceAction::CallContact {
                name: "Mom".to_string(),
                number: Some("+15551234".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_call_unknown_contact_asks_for_clarification() {
        let mut ctx = context();
        // "Bob" is a single edit-distance-2 token and would itself clear the
        // threshold against "mom", so keep only clearly dissimilar names.
        ctx.contacts.retain(|c| c.display_name == "Alice Johnson");
        let action = LocalResolver::new().resolve_intent("call mom", &ctx).await;
        assert!(
            matches!(action, VoiceAction::Clarification { .. }),
            "expected Clarification, got {action:?}"
        );
    }

    #[tokio::test]
    async fn test_message_with_body_resolves_recipient_number() {
        assert_eq!(
            resolve("message mom saying running late").await,
            VoiceAction::SendMessage {
                recipient: "+15551234".to_string(),
                body: "running late".to_string(),
            }
        );
        assert_eq!(
            resolve("send a message to mom that I'll call back").await,
            VoiceAction::SendMessage {
                recipient: "+15551234".to_string(),
                body: "i'll call back".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_message_contact_without_number_uses_name() {
        assert_eq!(
            resolve("text bob saying hello").await,
            VoiceAction::SendMessage {
                recipient: "Bob".to_string(),
                body: "hello".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_bare_message_has_empty_body() {
        assert_eq!(
            resolve("text mom").await,
            VoiceAction::SendMessage {
                recipient: "+15551234".to_string(),
                body: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_message_unknown_recipient_keeps_raw_name() {
        assert_eq!(
            resolve("message zigzag saying hi").await,
            VoiceAction::SendMessage {
                recipient: "zigzag".to_string(),
                body: "hi".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_alarm_space_separated() {
        assert_eq!(
            resolve("set alarm for 7 30").await,
            VoiceAction::SetAlarm {
                hour: 7,
                minute: 30,
                label: None,
            }
        );
    }

    #[tokio::test]
    async fn test_alarm_colon_with_label() {
        assert_eq!(
            resolve("set an alarm for 6:45 gym").await,
            VoiceAction::SetAlarm {
                hour: 6,
                minute: 45,
                label: Some("gym".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_wake_me_phrasing() {
        assert_eq!(
            resolve("wake me at 8:00").await,
            VoiceAction::SetAlarm {
                hour: 8,
                minute: 0,
                label: None,
            }
        );
    }

    #[tokio::test]
    async fn test_out_of_range_alarm_falls_through_to_app_search() {
        let action = resolve("set alarm for 25 30").await;
        assert!(
            matches!(action, VoiceAction::Unsupported { .. }),
            "expected fallthrough to app search, got {action:?}"
        );
    }

    #[tokio::test]
    async fn test_device_setting_orderings() {
        assert_eq!(
            resolve("turn on wifi").await,
            VoiceAction::DeviceSetting {
                setting: "wifi".to_string(),
                enable: true,
            }
        );
        assert_eq!(
            resolve("disable bluetooth").await,
            VoiceAction::DeviceSetting {
                setting: "bluetooth".to_string(),
                enable: false,
            }
        );
        assert_eq!(
            resolve("airplane mode off").await,
            VoiceAction::DeviceSetting {
                setting: "airplane mode".to_string(),
                enable: false,
            }
        );
    }

    #[tokio::test]
    async fn test_non_whitelisted_setting_falls_through() {
        let action = resolve("turn on the oven").await;
        assert!(
            !matches!(action, VoiceAction::DeviceSetting { .. }),
            "oven must not resolve as a device setting"
        );
    }

    #[tokio::test]
    async fn test_raw_transcript_falls_back_to_app_search() {
        assert_eq!(
            resolve("camera").await,
            VoiceAction::LaunchApp {
                package: "com.android.camera".to_string(),
                profile: "SYSTEM".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_nothing_matches_yields_unsupported() {
        let action = resolve("xylophone quartet").await;
        assert!(matches!(action, VoiceAction::Unsupported { .. }));
    }

    #[test]
    fn test_tie_keeps_first_app_in_input_order() {
        let ctx = PhoneContext {
            installed_apps: vec![
                AppEntry::new("Clock", "com.first.clock"),
                AppEntry::new("Clock", "com.second.clock"),
            ],
            ..PhoneContext::default()
        };
        let best = find_best_app("clock", &ctx).unwrap();
        assert_eq!(best.package, "com.first.clock");
    }
}

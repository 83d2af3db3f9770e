//! Intent resolution: transcript + context snapshot → structured action

pub mod cloud;
pub mod fuzzy;
pub mod local;
pub mod router;

pub use cloud::CloudResolver;
pub use local::LocalResolver;
pub use router::ResolverRouter;

use async_trait::async_trait;

use crate::context::{PhoneContext, SystemCommand};

/// A resolved voice command.
///
/// Closed sum type; the dispatcher handles every variant exhaustively.
#[derive(Clone, Debug, PartialEq)]
pub enum VoiceAction {
    /// Launch an installed app by package identifier
    LaunchApp { package: String, profile: String },
    /// Dial a contact, by number when known, otherwise by name lookup
    CallContact { name: String, number: Option<String> },
    /// Compose a message to a recipient (name or number)
    SendMessage { recipient: String, body: String },
    /// Trigger a platform-level action
    SystemAction(SystemCommand),
    /// Open a URL in the default browser
    OpenUrl { url: String },
    /// Set an alarm; hour in 0..=23, minute in 0..=59
    SetAlarm {
        hour: u8,
        minute: u8,
        label: Option<String>,
    },
    /// Open a device-setting panel ("wifi", "bluetooth", ...)
    DeviceSetting { setting: String, enable: bool },
    /// Locate and activate a UI element by free-text description
    AccessibilityAction { description: String },
    /// Ordered sequence executed as one logical unit
    CompoundAction(Vec<VoiceAction>),
    /// The user should be asked before anything happens
    Clarification { message: String },
    /// Nothing actionable could be resolved
    Unsupported { reason: String },
}

impl VoiceAction {
    /// Short tag for logging; never includes user data
    pub fn kind(&self) -> &'static str {
        match self {
            VoiceAction::LaunchApp { .. } => "launch_app",
            VoiceAction::CallContact { .. } => "call_contact",
            VoiceAction::SendMessage { .. } => "send_message",
            VoiceAction::SystemAction(_) => "system_action",
            VoiceAction::OpenUrl { .. } => "open_url",
            VoiceAction::SetAlarm { .. } => "set_alarm",
            VoiceAction::DeviceSetting { .. } => "device_setting",
            VoiceAction::AccessibilityAction { .. } => "accessibility_action",
            VoiceAction::CompoundAction(_) => "compound_action",
            VoiceAction::Clarification { .. } => "clarification",
            VoiceAction::Unsupported { .. } => "unsupported",
        }
    }
}

/// One resolution strategy.
///
/// Strategies absorb their own failures: every transcript resolves to some
/// `VoiceAction`, with `Unsupported` as the bottom value.
#[async_trait]
pub trait IntentResolver: Send + Sync {
    async fn resolve_intent(&self, transcript: &str, context: &PhoneContext) -> VoiceAction;
}

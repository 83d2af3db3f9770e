//! Exhaustive mapping from resolved actions to platform effects
//!
//! Every [`VoiceAction`] variant dispatches to exactly one [`ActionResult`];
//! the match is total, so adding a variant without a dispatch arm fails to
//! compile. Collaborator failures are caught once, centrally, and become
//! `Failed`; dispatch never returns an error across its boundary.

pub mod tree;

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error};

use crate::context::{AppEntry, DeviceDirectory, SystemCommand};
use crate::nlu::VoiceAction;
use crate::Result;

use self::tree::UiTree;

/// Nesting bound for compound actions; deeper input is rejected rather
/// than recursed into.
const MAX_COMPOUND_DEPTH: usize = 8;

/// Terminal outcome of dispatching one action
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    /// The user should confirm or disambiguate before anything happens
    NeedsConfirmation { message: String },
    /// A runtime permission is missing
    NeedsPermission { permission: String },
    Failed { reason: String },
}

/// Launch collaborator. Authentication and app-locking policy are the
/// launcher's concern, not the dispatcher's.
pub trait AppLauncher: Send + Sync {
    fn launch(&self, app: &AppEntry) -> Result<()>;
}

/// Boolean-returning system-action primitives backed by the platform's
/// accessibility service.
pub trait SystemActions: Send + Sync {
    /// Whether the backing service is currently connected
    fn is_available(&self) -> bool;

    fn lock_screen(&self) -> bool;
    fn show_recents(&self) -> bool;
    fn open_notifications(&self) -> bool;
    fn open_quick_settings(&self) -> bool;
    fn open_power_dialog(&self) -> bool;
    fn take_screenshot(&self) -> bool;
}

/// Intent-style device effects: dialing, messaging, URLs, alarms and
/// setting panels.
pub trait DeviceGateway: Send + Sync {
    fn dial(&self, number: &str) -> Result<()>;

    fn compose_message(&self, recipient: &str, body: &str) -> Result<()>;

    fn open_url(&self, url: &str) -> Result<()>;

    fn set_alarm(&self, hour: u8, minute: u8, label: Option<&str>) -> Result<()>;

    /// Open the panel for a named setting; `enable` is advisory
    fn open_setting(&self, setting: &str, enable: bool) -> Result<()>;
}

pub struct ActionDispatcher {
    directory: Arc<dyn DeviceDirectory>,
    launcher: Arc<dyn AppLauncher>,
    system: Arc<dyn SystemActions>,
    gateway: Arc<dyn DeviceGateway>,
    ui_tree: Arc<dyn UiTree>,
    compound_delay: Duration,
}

impl ActionDispatcher {
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        launcher: Arc<dyn AppLauncher>,
        system: Arc<dyn SystemActions>,
        gateway: Arc<dyn DeviceGateway>,
        ui_tree: Arc<dyn UiTree>,
        compound_delay: Duration,
    ) -> Self {
        Self {
            directory,
            launcher,
            system,
            gateway,
            ui_tree,
            compound_delay,
        }
    }

    /// Dispatch one action. Never fails; collaborator errors are converted
    /// into `Failed` here.
    pub async fn execute(&self, action: &VoiceAction) -> ActionResult {
        match self.try_execute(action, 0).await {
            Ok(result) => {
                debug!(kind = action.kind(), outcome = result_tag(&result), "action dispatched");
                result
            }
            Err(e) => {
                error!(kind = action.kind(), error = %e, "action dispatch failed");
                ActionResult::Failed {
                    reason: format!("Execution error: {e}"),
                }
            }
        }
    }

    fn try_execute<'a>(
        &'a self,
        action: &'a VoiceAction,
        depth: usize,
    ) -> BoxFuture<'a, Result<ActionResult>> {
        async move {
            match action {
                VoiceAction::LaunchApp { package, .. } => self.launch_app(package),
                VoiceAction::CallContact { name, number } => {
                    self.call_contact(name, number.as_deref())
                }
                VoiceAction::SendMessage { recipient, body } => {
                    self.gateway.compose_message(recipient, body)?;
                    Ok(ActionResult::Success)
                }
                VoiceAction::SystemAction(command) => Ok(self.system_action(*command)),
                VoiceAction::OpenUrl { url } => {
                    self.gateway.open_url(&normalize_url(url))?;
                    Ok(ActionResult::Success)
                }
                VoiceAction::SetAlarm { hour, minute, label } => {
                    self.gateway.set_alarm(*hour, *minute, label.as_deref())?;
                    Ok(ActionResult::Success)
                }
                VoiceAction::DeviceSetting { setting, enable } => {
                    self.gateway.open_setting(setting, *enable)?;
                    Ok(ActionResult::Success)
                }
                VoiceAction::AccessibilityAction { description } => {
                    Ok(tree::find_and_activate(self.ui_tree.as_ref(), description))
                }
                VoiceAction::CompoundAction(actions) => self.execute_compound(actions, depth).await,
                VoiceAction::Clarification { message } => Ok(ActionResult::NeedsConfirmation {
                    message: message.clone(),
                }),
                VoiceAction::Unsupported { reason } => Ok(ActionResult::Failed {
                    reason: reason.clone(),
                }),
            }
        }
        .boxed()
    }

    fn launch_app(&self, package: &str) -> Result<ActionResult> {
        let apps = self.directory.installed_apps()?;
        let Some(app) = apps.iter().find(|a| a.package == package) else {
            return Ok(ActionResult::Failed {
                reason: format!("App not found: {package}"),
            });
        };
        self.launcher.launch(app)?;
        Ok(ActionResult::Success)
    }

    fn call_contact(&self, name: &str, number: Option<&str>) -> Result<ActionResult> {
        if let Some(number) = number.filter(|n| !n.trim().is_empty()) {
            self.gateway.dial(number)?;
            return Ok(ActionResult::Success);
        }

        let contacts = self.directory.contacts()?;
        let matched = contacts
            .iter()
            .find(|c| c.display_name.eq_ignore_ascii_case(name));

        match matched {
            Some(contact) if !contact.phone_number.is_empty() => {
                self.gateway.dial(&contact.phone_number)?;
                Ok(ActionResult::Success)
            }
            _ => Ok(ActionResult::NeedsConfirmation {
                message: format!("No number found for {name}"),
            }),
        }
    }

    fn system_action(&self, command: SystemCommand) -> ActionResult {
        if !self.system.is_available() {
            return ActionResult::Failed {
                reason: "Accessibility service not available".to_string(),
            };
        }

        let success = match command {
            SystemCommand::LockScreen => self.system.lock_screen(),
            SystemCommand::ShowRecents => self.system.show_recents(),
            SystemCommand::ShowNotifications => self.system.open_notifications(),
            SystemCommand::OpenQuickSettings => self.system.open_quick_settings(),
            SystemCommand::OpenPowerDialog => self.system.open_power_dialog(),
            SystemCommand::TakeScreenshot => self.system.take_screenshot(),
        };

        if success {
            ActionResult::Success
        } else {
            ActionResult::Failed {
                reason: "System action failed".to_string(),
            }
        }
    }

    /// Sub-actions run strictly in order with a settling delay between
    /// them; the first `Failed` short-circuits the rest.
    async fn execute_compound(
        &self,
        actions: &[VoiceAction],
        depth: usize,
    ) -> Result<ActionResult> {
        if depth >= MAX_COMPOUND_DEPTH {
            return Ok(ActionResult::Failed {
                reason: "Compound action nested too deeply".to_string(),
            });
        }

        for (i, sub_action) in actions.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.compound_delay).await;
            }
            let result = match self.try_execute(sub_action, depth + 1).await {
                Ok(result) => result,
                Err(e) => ActionResult::Failed {
                    reason: format!("Execution error: {e}"),
                },
            };
            if let ActionResult::Failed { reason } = result {
                return Ok(ActionResult::Failed {
                    reason: format!("Compound action failed at: {reason}"),
                });
            }
        }
        Ok(ActionResult::Success)
    }
}

fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn result_tag(result: &ActionResult) -> &'static str {
    match result {
        ActionResult::Success => "success",
        ActionResult::NeedsConfirmation { .. } => "needs_confirmation",
        ActionResult::NeedsPermission { .. } => "needs_permission",
        ActionResult::Failed { .. } => "failed",
    }
}

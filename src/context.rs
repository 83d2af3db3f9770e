//! Device context snapshot consumed by intent resolution
//!
//! A [`PhoneContext`] is built once per resolution attempt from the
//! read-only directory collaborator and never mutated afterwards.

use chrono::Local;

use crate::Result;

/// Descriptor of one installed application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppEntry {
    /// Human-visible label ("Camera")
    pub label: String,
    /// Stable package identifier ("com.android.camera")
    pub package: String,
    /// Opaque profile tag ("SYSTEM", "WORK", ...)
    pub profile: String,
}

impl AppEntry {
    pub fn new(label: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            package: package.into(),
            profile: "SYSTEM".to_string(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }
}

/// Descriptor of one contact. Empty strings mean the field is absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactEntry {
    pub display_name: String,
    pub phone_number: String,
    pub email: String,
}

impl ContactEntry {
    pub fn new(display_name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            phone_number: phone_number.into(),
            email: String::new(),
        }
    }
}

/// System-level actions the platform executor can perform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemCommand {
    LockScreen,
    ShowRecents,
    ShowNotifications,
    OpenQuickSettings,
    OpenPowerDialog,
    TakeScreenshot,
}

impl SystemCommand {
    pub const ALL: [SystemCommand; 6] = [
        SystemCommand::LockScreen,
        SystemCommand::ShowRecents,
        SystemCommand::ShowNotifications,
        SystemCommand::OpenQuickSettings,
        SystemCommand::OpenPowerDialog,
        SystemCommand::TakeScreenshot,
    ];
}

impl std::fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SystemCommand::LockScreen => "LockScreen",
            SystemCommand::ShowRecents => "ShowRecents",
            SystemCommand::ShowNotifications => "ShowNotifications",
            SystemCommand::OpenQuickSettings => "OpenQuickSettings",
            SystemCommand::OpenPowerDialog => "OpenPowerDialog",
            SystemCommand::TakeScreenshot => "TakeScreenshot",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for SystemCommand {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "LockScreen" => Ok(SystemCommand::LockScreen),
            "ShowRecents" => Ok(SystemCommand::ShowRecents),
            "ShowNotifications" => Ok(SystemCommand::ShowNotifications),
            "OpenQuickSettings" => Ok(SystemCommand::OpenQuickSettings),
            "OpenPowerDialog" => Ok(SystemCommand::OpenPowerDialog),
            "TakeScreenshot" => Ok(SystemCommand::TakeScreenshot),
            _ => Err(()),
        }
    }
}

/// Immutable context snapshot for one resolution attempt
#[derive(Clone, Debug, Default)]
pub struct PhoneContext {
    pub installed_apps: Vec<AppEntry>,
    pub recent_apps: Vec<String>,
    pub contacts: Vec<ContactEntry>,
    pub available_actions: Vec<String>,
    pub current_time: String,
}

impl PhoneContext {
    /// Build a snapshot from the directory collaborator.
    ///
    /// The recents list is best-effort: a failure there degrades to an
    /// empty list instead of failing the snapshot.
    pub fn snapshot(directory: &dyn DeviceDirectory) -> Result<Self> {
        let installed_apps = directory.installed_apps()?;
        let contacts = directory.contacts()?;
        let recent_apps = directory.recent_apps().unwrap_or_default();

        Ok(Self {
            installed_apps,
            recent_apps,
            contacts,
            available_actions: SystemCommand::ALL.iter().map(|c| c.to_string()).collect(),
            current_time: Local::now().format("%Y-%m-%d %H:%M").to_string(),
        })
    }
}

/// Read-only directory of installed apps and contacts.
///
/// App enumeration, caching and contact querying live outside the
/// pipeline; this trait only hands over already-resolved lists.
pub trait DeviceDirectory: Send + Sync {
    fn installed_apps(&self) -> Result<Vec<AppEntry>>;

    fn contacts(&self) -> Result<Vec<ContactEntry>>;

    /// Identifiers of recently used apps, most recent first
    fn recent_apps(&self) -> Result<Vec<String>>;
}

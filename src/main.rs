//! Demo driver: runs scripted voice interactions against in-memory
//! collaborators and logs every state the pipeline moves through.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mutter::capture::{CaptureEvent, SpeechCapture, Transcript};
use mutter::config::VoiceConfig;
use mutter::context::{AppEntry, ContactEntry, DeviceDirectory};
use mutter::dispatch::tree::{UiNode, UiTree};
use mutter::dispatch::{AppLauncher, DeviceGateway, SystemActions};
use mutter::pipeline::VoicePipeline;

/// Capture stand-in that "hears" a fixed utterance shortly after starting
struct ScriptedCapture {
    utterance: parking_lot::Mutex<String>,
}

impl ScriptedCapture {
    fn new() -> Self {
        Self {
            utterance: parking_lot::Mutex::new(String::new()),
        }
    }

    fn script(&self, utterance: &str) {
        *self.utterance.lock() = utterance.to_string();
    }
}

impl SpeechCapture for ScriptedCapture {
    fn start_listening(&self, _locale: &str, events: UnboundedSender<CaptureEvent>) {
        let utterance = self.utterance.lock().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let words: Vec<&str> = utterance.split_whitespace().collect();
            if let Some(first) = words.first() {
                let _ = events.send(CaptureEvent::Partial(first.to_string()));
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
            let _ = events.send(CaptureEvent::Final(Transcript::new(utterance, 0.9)));
        });
    }

    fn stop_listening(&self) {}

    fn is_available(&self) -> bool {
        true
    }

    fn shutdown(&self) {}
}

struct DemoDirectory;

impl DeviceDirectory for DemoDirectory {
    fn installed_apps(&self) -> mutter::Result<Vec<AppEntry>> {
        Ok(vec![
            AppEntry::new("Camera", "com.android.camera"),
            AppEntry::new("Google Chrome", "com.android.chrome"),
            AppEntry::new("Messages", "com.android.messaging"),
        ])
    }

    fn contacts(&self) -> mutter::Result<Vec<ContactEntry>> {
        Ok(vec![ContactEntry::new("Mom", "+1 555 0123")])
    }

    fn recent_apps(&self) -> mutter::Result<Vec<String>> {
        Ok(vec!["com.android.chrome".to_string()])
    }
}

/// Platform effects that only log what they would do
struct LoggingPlatform;

impl AppLauncher for LoggingPlatform {
    fn launch(&self, app: &AppEntry) -> mutter::Result<()> {
        info!(package = %app.package, "would launch app");
        Ok(())
    }
}

impl SystemActions for LoggingPlatform {
    fn is_available(&self) -> bool {
        true
    }

    fn lock_screen(&self) -> bool {
        info!("would lock screen");
        true
    }

    fn show_recents(&self) -> bool {
        true
    }

    fn open_notifications(&self) -> bool {
        true
    }

    fn open_quick_settings(&self) -> bool {
        true
    }

    fn open_power_dialog(&self) -> bool {
        true
    }

    fn take_screenshot(&self) -> bool {
        info!("would take screenshot");
        true
    }
}

impl DeviceGateway for LoggingPlatform {
    fn dial(&self, number: &str) -> mutter::Result<()> {
        info!(number, "would dial");
        Ok(())
    }

    fn compose_message(&self, recipient: &str, body: &str) -> mutter::Result<()> {
        info!(recipient, body, "would compose message");
        Ok(())
    }

    fn open_url(&self, url: &str) -> mutter::Result<()> {
        info!(url, "would open url");
        Ok(())
    }

    fn set_alarm(&self, hour: u8, minute: u8, label: Option<&str>) -> mutter::Result<()> {
        info!(hour, minute, label, "would set alarm");
        Ok(())
    }

    fn open_setting(&self, setting: &str, enable: bool) -> mutter::Result<()> {
        info!(setting, enable, "would open setting panel");
        Ok(())
    }
}

struct NoWindow;

impl UiTree for NoWindow {
    fn active_root(&self) -> Option<Box<dyn UiNode>> {
        None
    }

    fn focused_input(&self) -> Option<Box<dyn UiNode>> {
        None
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mutter=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mutter demo");

    let capture = Arc::new(ScriptedCapture::new());
    let platform = Arc::new(LoggingPlatform);

    let pipeline = VoicePipeline::builder()
        .with_config(VoiceConfig::default())
        .with_capture(capture.clone())
        .with_directory(Arc::new(DemoDirectory))
        .with_launcher(platform.clone())
        .with_system_actions(platform.clone())
        .with_gateway(platform)
        .with_ui_tree(Arc::new(NoWindow))
        .build()?;

    let mut session_rx = pipeline.session().subscribe();
    let mut overlay_rx = pipeline.overlay().subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    info!(state = %*session_rx.borrow(), "session");
                }
                changed = overlay_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    info!(overlay = ?*overlay_rx.borrow(), "overlay");
                }
            }
        }
    });

    for utterance in ["open camera", "call mom", "set alarm for 7 30"] {
        info!(utterance, "simulating voice command");
        capture.script(utterance);
        pipeline.start_voice_command();
        // Capture delay + pipeline + auto-dismiss.
        tokio::time::sleep(Duration::from_millis(2600)).await;
    }

    pipeline.destroy();
    info!("Demo finished");
    Ok(())
}

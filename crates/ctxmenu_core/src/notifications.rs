//! Desktop notifications for finished torrents.
//!
//! The platform notification API is an external collaborator reached through
//! [`NotificationBackend`]. [`Notifications`] owns the enabled/requested
//! state, the relabelled menu title, and the auto-cancel timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

/// How long a shown notification stays up before it is cancelled.
pub const AUTO_CANCEL_DELAY: Duration = Duration::from_secs(5);

/// Icon shown with every notification.
pub const NOTIFICATION_ICON: &str = "style/transmission/images/logo.png";

/// Permission state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user allowed notifications.
    Granted,
    /// The user refused notifications.
    Denied,
    /// The user has not been asked yet.
    Unknown,
}

/// A notification created by the backend.
pub trait NotificationHandle: Send + Sync {
    /// Display the notification.
    fn show(&self);
    /// Remove the notification.
    fn cancel(&self);
}

/// Callback invoked once the permission prompt is answered.
pub type PermissionCallback = Box<dyn FnOnce(Permission) + Send + 'static>;

/// Platform notification capability.
pub trait NotificationBackend: Send + Sync {
    /// Current permission state.
    fn check_permission(&self) -> Permission;
    /// Ask the user for permission; `on_result` runs with the answer.
    fn request_permission(&self, on_result: PermissionCallback);
    /// Create a notification without showing it.
    fn create_notification(
        &self,
        icon: &str,
        title: &str,
        body: &str,
    ) -> Arc<dyn NotificationHandle>;
}

/// Torrent lifecycle signals that produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentEvent {
    /// All wanted data was downloaded.
    DownloadComplete,
    /// The torrent reached its seeding goal.
    SeedingComplete,
}

impl TorrentEvent {
    /// Notification title for this event.
    pub fn title(&self) -> &'static str {
        match self {
            Self::DownloadComplete => "Download complete",
            Self::SeedingComplete => "Seeding complete",
        }
    }
}

#[derive(Debug)]
struct NotificationState {
    enabled: bool,
}

/// Notification toggle and dispatcher.
pub struct Notifications {
    backend: Arc<dyn NotificationBackend>,
    state: Arc<Mutex<NotificationState>>,
    auto_cancel: Duration,
}

impl Notifications {
    /// Create the service; notifications start enabled only when permission
    /// was already granted.
    pub fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        let enabled = backend.check_permission() == Permission::Granted;
        tracing::debug!(enabled, "Notifications initialized");
        Self {
            backend,
            state: Arc::new(Mutex::new(NotificationState { enabled })),
            auto_cancel: AUTO_CANCEL_DELAY,
        }
    }

    /// Override the auto-cancel delay.
    pub fn with_auto_cancel(mut self, delay: Duration) -> Self {
        self.auto_cancel = delay;
        self
    }

    /// Whether notifications are currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Title of the menu entry that toggles notifications.
    pub fn menu_title(&self) -> &'static str {
        menu_title_for(self.is_enabled())
    }

    /// Flip the enabled state.
    ///
    /// Without permission this asks for it instead; the answer decides the
    /// new state and `on_change` runs with the new menu title either way.
    pub fn toggle(&self, on_change: impl FnOnce(&'static str) + Send + 'static) {
        if self.backend.check_permission() != Permission::Granted {
            let state = Arc::clone(&self.state);
            self.backend.request_permission(Box::new(move |permission| {
                let enabled = permission == Permission::Granted;
                state.lock().enabled = enabled;
                tracing::info!(?permission, enabled, "Notification permission answered");
                on_change(menu_title_for(enabled));
            }));
            return;
        }

        let enabled = {
            let mut state = self.state.lock();
            state.enabled = !state.enabled;
            state.enabled
        };
        tracing::debug!(enabled, "Notifications toggled");
        on_change(menu_title_for(enabled));
    }

    /// Show a notification for a torrent event and schedule its cancellation.
    ///
    /// Returns the id of the shown notification, or `None` while disabled.
    /// Must be called inside a tokio runtime.
    pub fn torrent_event(&self, event: TorrentEvent, torrent_name: &str) -> Option<Uuid> {
        if !self.is_enabled() {
            return None;
        }

        let id = Uuid::new_v4();
        let handle =
            self.backend.create_notification(NOTIFICATION_ICON, event.title(), torrent_name);
        handle.show();
        tracing::debug!(notification_id = %id, title = event.title(), "Notification shown");

        let delay = self.auto_cancel;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.cancel();
            tracing::trace!(notification_id = %id, "Notification auto-cancelled");
        });

        Some(id)
    }
}

fn menu_title_for(enabled: bool) -> &'static str {
    if enabled {
        "Disable Notifications"
    } else {
        "Enable Notifications"
    }
}

//! Torrent list model and the context menu host bound to it.

use std::sync::Arc;

use ctxmenu_core::notifications::{
    NotificationBackend, NotificationHandle, Permission, PermissionCallback,
};
use ctxmenu_core::{Notifications, Translator};
use ctxmenu_ui::{
    AfterSelect, BeforeOpen, Document, ElementId, Gesture, MenuHandle, MenuHost, OpenUi, SelectUi,
};

use crate::app_menus::notifications_label;

/// Run state of a torrent as shown in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentStatus {
    Stopped,
    Queued,
    Downloading,
    Seeding,
    Verifying,
}

impl TorrentStatus {
    fn is_stopped(self) -> bool {
        self == Self::Stopped
    }
}

/// One row of the torrent list.
#[derive(Debug, Clone)]
pub struct Torrent {
    pub name: String,
    pub status: TorrentStatus,
    pub selected: bool,
    /// Row element in the document.
    pub element: ElementId,
}

impl Torrent {
    pub fn new(name: impl Into<String>, status: TorrentStatus, element: ElementId) -> Self {
        Self { name: name.into(), status, selected: false, element }
    }
}

/// Counts that decide which actions apply to the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionSummary {
    pub selected: usize,
    pub active: usize,
    pub paused: usize,
    pub queued: usize,
}

/// Torrents in queue order.
#[derive(Debug, Default)]
pub struct TorrentList {
    torrents: Vec<Torrent>,
}

impl TorrentList {
    pub fn new(torrents: Vec<Torrent>) -> Self {
        Self { torrents }
    }

    pub fn torrents(&self) -> &[Torrent] {
        &self.torrents
    }

    pub fn names(&self) -> Vec<&str> {
        self.torrents.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn by_element(&self, element: ElementId) -> Option<&Torrent> {
        self.torrents.iter().find(|t| t.element == element)
    }

    pub fn summary(&self) -> SelectionSummary {
        self.selected().fold(SelectionSummary::default(), |mut s, t| {
            s.selected += 1;
            if t.status.is_stopped() {
                s.paused += 1;
            } else {
                s.active += 1;
            }
            if t.status == TorrentStatus::Queued {
                s.queued += 1;
            }
            s
        })
    }

    fn selected(&self) -> impl Iterator<Item = &Torrent> {
        self.torrents.iter().filter(|t| t.selected)
    }

    fn selected_names(&self) -> Vec<&str> {
        self.selected().map(|t| t.name.as_str()).collect()
    }

    /// Make `element` the only selected row unless it is already selected.
    pub fn ensure_selected(&mut self, element: ElementId) {
        if self.by_element(element).is_some_and(|t| t.selected) {
            return;
        }
        for torrent in &mut self.torrents {
            torrent.selected = torrent.element == element;
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        for torrent in &mut self.torrents {
            torrent.selected = selected;
        }
    }

    fn set_selected_status(&mut self, status: TorrentStatus) {
        for torrent in self.torrents.iter_mut().filter(|t| t.selected) {
            torrent.status = status;
        }
    }

    fn remove_selected(&mut self) -> Vec<Torrent> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.torrents).into_iter().partition(|t| t.selected);
        self.torrents = kept;
        removed
    }

    /// Selected torrents to the front or back, keeping their relative order.
    fn move_to_end(&mut self, front: bool) {
        let (mut selected, mut rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.torrents).into_iter().partition(|t| t.selected);
        self.torrents = if front {
            selected.append(&mut rest);
            selected
        } else {
            rest.append(&mut selected);
            rest
        };
    }

    /// Selected torrents one step up or down; a blocked torrent stays put.
    fn move_by_one(&mut self, up: bool) {
        let len = self.torrents.len();
        let order: Vec<usize> = if up { (1..len).collect() } else { (0..len.saturating_sub(1)).rev().collect() };
        for i in order {
            let j = if up { i - 1 } else { i + 1 };
            if self.torrents[i].selected && !self.torrents[j].selected {
                self.torrents.swap(i, j);
            }
        }
    }
}

/// Context menu host for the torrent list.
pub struct TorrentListHost {
    document: Document,
    list: TorrentList,
    notifications: Arc<Notifications>,
    translator: Translator,
}

impl TorrentListHost {
    pub fn new(
        document: Document,
        list: TorrentList,
        notifications: Arc<Notifications>,
        translator: Translator,
    ) -> Self {
        Self { document, list, notifications, translator }
    }

    pub fn list(&self) -> &TorrentList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut TorrentList {
        &mut self.list
    }

    fn notifications_title(&self) -> String {
        notifications_label(&self.translator, self.notifications.menu_title())
    }

    /// Drop the selected torrents and their rows from the page.
    fn remove_selected(&mut self) -> usize {
        let removed = self.list.remove_selected();
        for torrent in &removed {
            self.document.detach(torrent.element);
        }
        removed.len()
    }

    fn sync_entries(&self, menu: &MenuHandle) {
        let s = self.list.summary();
        menu.enable_entry("pause-selected", s.active > 0);
        menu.enable_entry("resume-selected", s.paused > 0);
        menu.enable_entry("resume-now-selected", s.paused > 0 || s.queued > 0);
        menu.enable_entry("rename", s.selected == 1);
        menu.set_entry("toggle-notifications", self.notifications_title());
    }
}

impl MenuHost for TorrentListHost {
    fn before_open(&mut self, _gesture: &Gesture, ui: &OpenUi) -> BeforeOpen {
        self.list.ensure_selected(ui.target);
        self.sync_entries(&ui.menu);
        tracing::debug!(summary = ?self.list.summary(), "Torrent menu prepared");
        BeforeOpen::Proceed
    }

    fn select(&mut self, ui: &SelectUi) -> AfterSelect {
        match ui.command.as_str() {
            "pause-selected" => self.list.set_selected_status(TorrentStatus::Stopped),
            "resume-selected" => self.list.set_selected_status(TorrentStatus::Queued),
            "resume-now-selected" => self.list.set_selected_status(TorrentStatus::Downloading),
            "move-top" => self.list.move_to_end(true),
            "move-bottom" => self.list.move_to_end(false),
            "move-up" => self.list.move_by_one(true),
            "move-down" => self.list.move_by_one(false),
            "remove" => {
                let count = self.remove_selected();
                tracing::info!(count, "Removed torrents from list");
            }
            "remove-data" => {
                let count = self.remove_selected();
                tracing::info!(count, "Removed torrents and trashed local data");
            }
            "verify" => self.list.set_selected_status(TorrentStatus::Verifying),
            "reannounce" => tracing::info!(torrents = ?self.list.selected_names(), "Asked trackers for more peers"),
            "rename" => tracing::info!(torrents = ?self.list.selected_names(), "Rename requested"),
            "move" => tracing::info!(torrents = ?self.list.selected_names(), "Set location requested"),
            "select-all" => self.list.select_all(true),
            "deselect-all" => self.list.select_all(false),
            "toggle-notifications" => {
                self.notifications.toggle(|title| {
                    tracing::info!(title, "Notification toggle relabelled");
                });
                ui.menu.set_entry("toggle-notifications", self.notifications_title());
            }
            other => tracing::warn!(command = other, "Unhandled menu command"),
        }
        AfterSelect::Close
    }

    fn close(&mut self) {
        tracing::trace!("Torrent menu closed");
    }
}

// ============================================================================
// Notification backend
// ============================================================================

/// Notification shown by writing to the log.
struct LoggedNotification {
    title: String,
    body: String,
}

impl NotificationHandle for LoggedNotification {
    fn show(&self) {
        tracing::info!(title = %self.title, body = %self.body, "Notification");
    }

    fn cancel(&self) {
        tracing::debug!(title = %self.title, "Notification dismissed");
    }
}

/// Backend for terminals: every permission request is granted.
pub struct LogNotificationBackend {
    granted: parking_lot::Mutex<bool>,
}

impl LogNotificationBackend {
    pub fn new(granted: bool) -> Self {
        Self { granted: parking_lot::Mutex::new(granted) }
    }
}

impl NotificationBackend for LogNotificationBackend {
    fn check_permission(&self) -> Permission {
        if *self.granted.lock() {
            Permission::Granted
        } else {
            Permission::Unknown
        }
    }

    fn request_permission(&self, on_result: PermissionCallback) {
        *self.granted.lock() = true;
        on_result(Permission::Granted);
    }

    fn create_notification(&self, _icon: &str, title: &str, body: &str) -> Arc<dyn NotificationHandle> {
        Arc::new(LoggedNotification { title: title.to_string(), body: body.to_string() })
    }
}

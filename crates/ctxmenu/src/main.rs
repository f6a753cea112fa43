//! ctxmenu - the torrent list context menu driven headlessly.

mod app;
mod app_menus;

use std::sync::Arc;
use std::time::Duration;

use app::{LogNotificationBackend, Torrent, TorrentList, TorrentListHost, TorrentStatus};
use ctxmenu_core::logging::{init_logging, log_dir, LogConfig};
use ctxmenu_core::{AppConfig, CtxMenuError, Notifications, PluralRules, TorrentEvent, Translator};
use ctxmenu_ui::{
    ContextMenuController, ContextMenuOptions, Document, ElementId, Gesture, Key, Point, Rect, Size,
};

const ROW_HEIGHT: f32 = 32.0;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config_path = AppConfig::default_path();
    let config = AppConfig::load_or_default(&config_path);

    let log_config = match &config {
        Ok(config) => LogConfig::from_app_config(config),
        Err(_) => LogConfig::new(log_dir()),
    };
    let _logging_guard = init_logging(log_config);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting ctxmenu");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, hint = e.hint(), "Failed to load config, using defaults");
            AppConfig::default()
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!(category = e.category(), error = %e, "Session failed");
        std::process::exit(1);
    }
}

fn load_translator(config: &AppConfig) -> Translator {
    let rules = PluralRules::builtin();
    let Some(dir) = config.catalog_dir.as_deref() else {
        return Translator::passthrough(&config.locale);
    };
    match Translator::load_dir(dir, &config.locale, &rules) {
        Ok(translator) => translator,
        Err(e) => {
            tracing::warn!(error = %e, locale = %config.locale, "Catalog unusable, showing source strings");
            Translator::passthrough(&config.locale)
        }
    }
}

/// Lay out the torrent list and return its root and rows.
fn build_page(document: &Document) -> (ElementId, TorrentList) {
    let list = document.create_element(document.body(), "ul");
    document.set_id(list, "torrent-list");

    let specs = [
        ("ubuntu-24.04-desktop-amd64.iso", TorrentStatus::Downloading),
        ("debian-12.5.0-amd64-netinst.iso", TorrentStatus::Stopped),
        ("Fedora-Workstation-Live-x86_64-40.iso", TorrentStatus::Queued),
        ("archlinux-2024.05.01-x86_64.iso", TorrentStatus::Seeding),
    ];
    let torrents = specs
        .into_iter()
        .enumerate()
        .map(|(i, (name, status))| {
            let row = document.create_element(list, "li");
            document.add_class(row, "torrent");
            document.set_rect(row, Rect::new(0.0, i as f32 * ROW_HEIGHT, 800.0, ROW_HEIGHT));
            Torrent::new(name, status, row)
        })
        .collect();
    (list, TorrentList::new(torrents))
}

async fn run(config: AppConfig) -> Result<(), CtxMenuError> {
    let translator = load_translator(&config);
    let backend = Arc::new(LogNotificationBackend::new(config.notifications_enabled));
    let notifications =
        Arc::new(Notifications::new(backend).with_auto_cancel(Duration::from_millis(50)));

    let document = Document::new(Size::new(1280.0, 800.0));
    let (list, torrents) = build_page(&document);
    let rows: Vec<ElementId> = torrents.torrents().iter().map(|t| t.element).collect();

    let menu = app_menus::torrent_context_menu(&translator, notifications.menu_title());
    let options = ContextMenuOptions {
        prevent_select: true,
        taphold: true,
        ..ContextMenuOptions::default().without_animations()
    };
    let host = TorrentListHost::new(document.clone(), torrents, Arc::clone(&notifications), translator);
    let mut controller =
        ContextMenuController::new(document.clone(), list, ".torrent", menu, options, host)?;

    let find = |controller: &ContextMenuController<TorrentListHost>, command: &str| {
        controller.menu().and_then(|menu| menu.borrow().find(command)).ok_or_else(|| {
            CtxMenuError::internal(format!("menu has no '{command}' entry"))
        })
    };

    // right-click a paused torrent and resume it
    let outcome = controller.handle_gesture(Gesture::context_menu(rows[1], Point::new(240.0, 48.0)));
    tracing::info!(?outcome, position = ?controller.position(), "Right-clicked paused torrent");
    let resume = find(&controller, "resume-selected")?;
    let activation = controller.activate(&resume);
    tracing::info!(?activation, summary = ?controller.host().list().summary(), "Resumed");

    // keyboard: first row is Pause, which now applies
    controller.handle_gesture(Gesture::taphold(rows[1], Point::new(240.0, 48.0)));
    controller.key_down(Key::ArrowDown);
    tracing::info!(highlighted = ?controller.highlighted().map(ToString::to_string), "Highlight moved");
    controller.key_down(Key::Enter);

    // move the seeding torrent to the top of the queue through the submenu
    controller.open(rows[3], serde_json::json!({ "source": "scripted" }));
    let queue = find(&controller, "queue")?;
    controller.activate(&queue);
    let move_top = find(&controller, "move-top")?;
    controller.activate(&move_top);
    tracing::info!(order = ?controller.host().list().names(), "Queue reordered");

    // turn notifications on and fire one
    controller.open(rows[0], serde_json::Value::Null);
    let toggle = find(&controller, "toggle-notifications")?;
    controller.activate(&toggle);
    if let Some(id) = notifications.torrent_event(TorrentEvent::DownloadComplete, "ubuntu-24.04-desktop-amd64.iso") {
        tracing::info!(notification_id = %id, "Completion notification shown");
    }

    // escape closes without selecting
    controller.open(rows[2], serde_json::Value::Null);
    controller.key_down(Key::Escape);
    tracing::info!(state = ?controller.state(), "Dismissed with Escape");

    tokio::time::sleep(Duration::from_millis(100)).await;

    controller.destroy();
    tracing::info!(
        listeners = document.listener_count(controller.namespace()),
        styles = document.styles().len(),
        "Context menu destroyed"
    );
    Ok(())
}

//! Torrent list context menu definition.
//!
//! Titles go through the active locale; command ids are fixed and are what
//! the host dispatches on.

use ctxmenu_core::Translator;
use ctxmenu_ui::{MenuDefinition, MenuEntry};

/// Catalog context holding the torrent action strings.
const CONTEXT: &str = "MainWindow";

/// Build the right-click menu of the torrent list.
///
/// `notifications_title` is the current label of the notification toggle,
/// which flips between enable and disable.
pub fn torrent_context_menu(tr: &Translator, notifications_title: &str) -> MenuDefinition {
    let t = |source: &str| tr.tr(CONTEXT, source).into_owned();

    MenuDefinition::new(vec![
        MenuEntry::command("pause-selected", t("Pause")).icon("ui-icon-pause"),
        MenuEntry::command("resume-selected", t("Resume")).icon("ui-icon-play"),
        MenuEntry::command("resume-now-selected", t("Resume Now")),
        MenuEntry::separator(),
        MenuEntry::submenu("queue", t("Queue"), vec![
            MenuEntry::command("move-top", t("Move to Top")),
            MenuEntry::command("move-up", t("Move Up")),
            MenuEntry::command("move-down", t("Move Down")),
            MenuEntry::command("move-bottom", t("Move to Bottom")),
        ]),
        MenuEntry::separator(),
        MenuEntry::command("remove", t("Remove From List...")),
        MenuEntry::command("remove-data", t("Trash Data and Remove From List...")),
        MenuEntry::separator(),
        MenuEntry::command("verify", t("Verify Local Data")),
        MenuEntry::command("reannounce", t("Ask tracker for more peers")),
        MenuEntry::separator(),
        MenuEntry::command("rename", t("Rename...")),
        MenuEntry::command("move", t("Set Location...")),
        MenuEntry::separator(),
        MenuEntry::command("select-all", t("Select All")),
        MenuEntry::command("deselect-all", t("Deselect All")),
        MenuEntry::separator(),
        MenuEntry::command("toggle-notifications", notifications_label(tr, notifications_title)),
    ])
}

/// Translated label of the notification toggle.
pub fn notifications_label(tr: &Translator, title: &str) -> String {
    tr.tr(CONTEXT, title).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmenu_core::{LocaleCatalog, PluralRules};
    use ctxmenu_ui::create_menu_markup;

    #[test]
    fn test_every_command_is_addressable() {
        let menu = torrent_context_menu(&Translator::passthrough("en"), "Enable Notifications");
        assert!(menu.duplicate_commands().is_empty());

        let markup = create_menu_markup(&menu);
        for command in [
            "pause-selected", "resume-selected", "resume-now-selected", "move-top", "move-up",
            "move-down", "move-bottom", "remove", "remove-data", "verify", "reannounce",
            "rename", "move", "select-all", "deselect-all", "toggle-notifications",
        ] {
            assert!(markup.find(command).is_some(), "missing {command}");
        }
    }

    #[test]
    fn test_titles_use_catalog_with_source_fallback() {
        let catalog = LocaleCatalog::parse(
            r#"<TS language="fr"><context><name>MainWindow</name>
                <message><source>Pause</source><translation>Suspendre</translation></message>
            </context></TS>"#,
        )
        .unwrap();
        let tr = Translator::new("fr", catalog, &PluralRules::builtin());
        let markup = create_menu_markup(&torrent_context_menu(&tr, "Enable Notifications"));

        let pause = markup.find("pause-selected").unwrap();
        assert_eq!(markup.row(&pause).unwrap().title(), Some("Suspendre"));
        let verify = markup.find("verify").unwrap();
        assert_eq!(markup.row(&verify).unwrap().title(), Some("Verify Local Data"));
    }
}

//! Controller options.
//!
//! Keys mirror the widget's option names so existing JSON configurations
//! deserialize unchanged.

use serde::de::{Deserializer, Error as _};
use serde::Deserialize;

use crate::animation::Animation;
use crate::definition::MenuDefinition;
use crate::markup::MenuHandle;
use crate::position::PositionOption;

/// Class added to every popup.
pub const DEFAULT_CLASS: &str = "ui-contextmenu";

/// Where a menu comes from.
#[derive(Debug, Clone, Default)]
pub enum MenuSource {
    /// Compile a definition; the controller owns the result.
    Definition(MenuDefinition),
    /// Existing markup; the host keeps ownership.
    Markup(MenuHandle),
    /// Existing markup registered in the document under `#id`.
    Selector(String),
    /// No menu.
    #[default]
    None,
}

impl From<MenuDefinition> for MenuSource {
    fn from(definition: MenuDefinition) -> Self {
        Self::Definition(definition)
    }
}

impl From<MenuHandle> for MenuSource {
    fn from(handle: MenuHandle) -> Self {
        Self::Markup(handle)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MenuSourceRepr {
    Empty,
    Selector(String),
    Definition(MenuDefinition),
}

impl<'de> Deserialize<'de> for MenuSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match MenuSourceRepr::deserialize(deserializer)? {
            MenuSourceRepr::Empty => Self::None,
            MenuSourceRepr::Selector(selector) if selector.trim().is_empty() => {
                return Err(D::Error::custom("empty menu selector"));
            }
            MenuSourceRepr::Selector(selector) => Self::Selector(selector),
            MenuSourceRepr::Definition(definition) => Self::Definition(definition),
        })
    }
}

/// Options accepted by [`ContextMenuController`](crate::ContextMenuController).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextMenuOptions {
    /// Class added to the popup.
    pub add_class: String,
    /// Focus the popup and highlight the first row once open.
    pub auto_focus: bool,
    /// Open on native gestures; when off only programmatic opens work.
    pub auto_trigger: bool,
    /// Trigger selector; the constructor argument takes precedence.
    pub delegate: Option<String>,
    pub hide: Animation,
    /// Selecting a submenu parent does nothing.
    pub ignore_parent_select: bool,
    /// Replacement menu applied by `set_options`.
    pub menu: Option<MenuSource>,
    pub position: PositionOption,
    /// Suppress the native context menu on the popup.
    pub prevent_context_menu_for_popup: bool,
    /// Disable text selection on trigger elements.
    pub prevent_select: bool,
    pub show: Animation,
    /// Also open on press-and-hold.
    pub taphold: bool,
}

impl Default for ContextMenuOptions {
    fn default() -> Self {
        Self {
            add_class: DEFAULT_CLASS.to_string(),
            auto_focus: false,
            auto_trigger: true,
            delegate: None,
            hide: Animation::default_hide(),
            ignore_parent_select: true,
            menu: None,
            position: PositionOption::Default,
            prevent_context_menu_for_popup: false,
            prevent_select: false,
            show: Animation::default_show(),
            taphold: false,
        }
    }
}

impl ContextMenuOptions {
    pub fn from_json(json: &str) -> Result<Self, ctxmenu_core::CtxMenuError> {
        serde_json::from_str(json).map_err(|e| {
            ctxmenu_core::CtxMenuError::config_with_hint(
                format!("Invalid options: {e}"),
                "Option keys use the widget's camelCase names",
            )
        })
    }

    /// Options with both animations turned off.
    pub fn without_animations(mut self) -> Self {
        self.show = Animation::none();
        self.hide = Animation::none();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Effect, FAST};

    #[test]
    fn test_defaults() {
        let options = ContextMenuOptions::default();
        assert_eq!(options.add_class, "ui-contextmenu");
        assert!(options.auto_trigger);
        assert!(options.ignore_parent_select);
        assert!(!options.auto_focus && !options.taphold && !options.prevent_select);
        assert_eq!(options.show.effect, Effect::SlideDown);
        assert_eq!(options.hide.effect, Effect::FadeOut);
        assert_eq!(options.hide.duration, FAST);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = ContextMenuOptions::from_json(
            r##"{"preventSelect": true, "taphold": true, "show": false, "hide": false,
                "delegate": ".torrent", "menu": "#torrent_context_menu"}"##,
        )
        .unwrap();
        assert!(options.prevent_select && options.taphold);
        assert!(options.show.is_immediate() && options.hide.is_immediate());
        assert_eq!(options.delegate.as_deref(), Some(".torrent"));
        assert!(matches!(options.menu, Some(MenuSource::Selector(ref s)) if s == "#torrent_context_menu"));
        assert_eq!(options.add_class, "ui-contextmenu");
    }

    #[test]
    fn test_menu_option_accepts_definition() {
        let options =
            ContextMenuOptions::from_json(r#"{"menu": [{"cmd": "verify", "title": "Verify"}]}"#).unwrap();
        let Some(MenuSource::Definition(definition)) = options.menu else {
            panic!("expected a definition");
        };
        assert_eq!(definition.len(), 1);
    }

    #[test]
    fn test_bad_options_are_config_errors() {
        let err = ContextMenuOptions::from_json(r#"{"autoFocus": "yes"}"#).unwrap_err();
        assert_eq!(err.category(), "Config");
        assert!(err.hint().is_some());
    }
}

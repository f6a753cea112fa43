//! Menu definitions: the declarative description a menu is compiled from.
//!
//! A definition is an ordered list of entries. Each entry is a separator, a
//! command row, or a command row with a nested definition (a submenu).
//! Definitions deserialize from the JSON shape the widget has always
//! accepted:
//!
//! ```json
//! [
//!   {"cmd": "pause-selected", "title": "Pause", "uiIcon": "ui-icon-pause"},
//!   {"title": "----"},
//!   {"cmd": "queue", "title": "Queue", "children": [
//!     {"cmd": "move-top", "title": "Move to Top"}
//!   ]}
//! ]
//! ```

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use ctxmenu_core::CtxMenuError;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::host::{AfterSelect, SelectUi};

/// Callback bound to a single entry, run after the `select` hook.
pub type ActionHandler = Rc<dyn Fn(&SelectUi) -> AfterSelect>;

/// Whether a title denotes a separator: only `-`, `—`, `–` and whitespace.
pub fn is_separator_title(title: &str) -> bool {
    title.chars().all(|c| matches!(c, '-' | '\u{2014}' | '\u{2013}') || c.is_whitespace())
}

/// Fields shared by command rows and submenu parents.
#[derive(Clone, Default)]
pub struct CommandEntry {
    /// Opaque command identifier.
    pub command: String,
    /// Display text.
    pub title: String,
    /// Icon class name.
    pub icon: Option<String>,
    /// Initially disabled.
    pub disabled: bool,
    /// Extra class name for the row.
    pub extra_class: Option<String>,
    /// Arbitrary attributes attached to the row.
    pub data: Option<Map<String, Value>>,
    /// Entry-bound callback.
    pub action: Option<ActionHandler>,
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("command", &self.command)
            .field("title", &self.title)
            .field("icon", &self.icon)
            .field("disabled", &self.disabled)
            .field("extra_class", &self.extra_class)
            .field("data", &self.data)
            .field("action", &self.action.as_ref().map(|_| "Fn"))
            .finish()
    }
}

/// One entry of a [`MenuDefinition`].
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawEntry")]
pub enum MenuEntry {
    /// A non-interactive divider.
    Separator,
    /// A selectable row.
    Command(CommandEntry),
    /// A row that opens a nested menu.
    Submenu(CommandEntry, MenuDefinition),
}

impl MenuEntry {
    /// A separator row.
    pub fn separator() -> Self {
        Self::Separator
    }

    /// A command row; a dash-only title yields a separator instead.
    pub fn command(command: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        if is_separator_title(&title) {
            return Self::Separator;
        }
        Self::Command(CommandEntry { command: command.into(), title, ..Default::default() })
    }

    /// A submenu parent with nested entries; a dash-only title yields a
    /// separator and the children are dropped.
    pub fn submenu(
        command: impl Into<String>,
        title: impl Into<String>,
        children: impl Into<MenuDefinition>,
    ) -> Self {
        let title = title.into();
        if is_separator_title(&title) {
            return Self::Separator;
        }
        Self::Submenu(
            CommandEntry { command: command.into(), title, ..Default::default() },
            children.into(),
        )
    }

    /// Set the icon class.
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        if let Some(entry) = self.entry_mut() {
            entry.icon = Some(icon.into());
        }
        self
    }

    /// Set the initial disabled state.
    pub fn disabled(mut self, disabled: bool) -> Self {
        if let Some(entry) = self.entry_mut() {
            entry.disabled = disabled;
        }
        self
    }

    /// Add an extra class to the row.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        if let Some(entry) = self.entry_mut() {
            entry.extra_class = Some(class.into());
        }
        self
    }

    /// Attach arbitrary attributes.
    pub fn data(mut self, data: Map<String, Value>) -> Self {
        if let Some(entry) = self.entry_mut() {
            entry.data = Some(data);
        }
        self
    }

    /// Bind a callback run when this entry is selected.
    pub fn action(mut self, action: impl Fn(&SelectUi) -> AfterSelect + 'static) -> Self {
        if let Some(entry) = self.entry_mut() {
            entry.action = Some(Rc::new(action));
        }
        self
    }

    /// Command fields, `None` for separators.
    pub fn entry(&self) -> Option<&CommandEntry> {
        match self {
            Self::Separator => None,
            Self::Command(entry) | Self::Submenu(entry, _) => Some(entry),
        }
    }

    pub fn entry_mut(&mut self) -> Option<&mut CommandEntry> {
        match self {
            Self::Separator => None,
            Self::Command(entry) | Self::Submenu(entry, _) => Some(entry),
        }
    }

    /// Command id, `None` for separators and anonymous submenu parents.
    pub fn command_id(&self) -> Option<&str> {
        self.entry().map(|e| e.command.as_str()).filter(|c| !c.is_empty())
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Separator)
    }
}

/// An ordered list of menu entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MenuDefinition {
    entries: Vec<MenuEntry>,
}

impl MenuDefinition {
    pub fn new(entries: Vec<MenuEntry>) -> Self {
        Self { entries }
    }

    /// Parse the JSON form.
    pub fn from_json(json: &str) -> Result<Self, CtxMenuError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: MenuEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MenuEntry> {
        self.entries.iter()
    }

    /// Command ids that occur more than once anywhere in the tree, in
    /// document order of their second occurrence.
    pub fn duplicate_commands(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        collect_duplicates(&self.entries, &mut seen, &mut duplicates);
        duplicates
    }
}

fn collect_duplicates<'a>(
    entries: &'a [MenuEntry],
    seen: &mut HashSet<&'a str>,
    duplicates: &mut Vec<String>,
) {
    for entry in entries {
        if let Some(command) = entry.command_id() {
            if !seen.insert(command) && !duplicates.iter().any(|d| d == command) {
                duplicates.push(command.to_string());
            }
        }
        if let MenuEntry::Submenu(_, children) = entry {
            collect_duplicates(&children.entries, seen, duplicates);
        }
    }
}

impl From<Vec<MenuEntry>> for MenuDefinition {
    fn from(entries: Vec<MenuEntry>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<MenuEntry> for MenuDefinition {
    fn from_iter<I: IntoIterator<Item = MenuEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MenuDefinition {
    type Item = &'a MenuEntry;
    type IntoIter = std::slice::Iter<'a, MenuEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Wire shape of one entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    cmd: Option<String>,
    title: String,
    ui_icon: Option<String>,
    #[serde(default)]
    disabled: bool,
    add_class: Option<String>,
    data: Option<Value>,
    children: Option<Vec<MenuEntry>>,
}

impl TryFrom<RawEntry> for MenuEntry {
    type Error = CtxMenuError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        if is_separator_title(&raw.title) {
            return Ok(Self::Separator);
        }

        let data = match raw.data {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(CtxMenuError::definition(format!(
                    "entry '{}': data must be an object",
                    raw.title
                )));
            }
        };

        let has_children = raw.children.is_some();
        let command = match raw.cmd {
            Some(cmd) => cmd,
            // submenu parents may be anonymous
            None if has_children => String::new(),
            None => {
                return Err(CtxMenuError::definition(format!(
                    "entry '{}' has no cmd",
                    raw.title
                )));
            }
        };

        let entry = CommandEntry {
            command,
            title: raw.title,
            icon: raw.ui_icon,
            disabled: raw.disabled,
            extra_class: raw.add_class,
            data,
            action: None,
        };

        Ok(match raw.children {
            Some(children) => Self::Submenu(entry, MenuDefinition::new(children)),
            None => Self::Command(entry),
        })
    }
}

//! Menu markup: the compiled, mutable row tree behind a popup.
//!
//! [`create_menu_markup`] turns a [`MenuDefinition`] into a [`MenuMarkup`].
//! The markup keeps an index from command id to row so the mutation API
//! (`enable_entry`, `show_entry`, `set_entry`) can find rows without a walk.
//! Markup is shared through [`MenuHandle`] because the host may own it
//! (borrowed markup) and hooks may mutate it while the controller holds it.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::definition::{ActionHandler, CommandEntry, MenuDefinition, MenuEntry};
use crate::document::Size;

/// Menu width used for layout estimates.
pub const MENU_WIDTH: f32 = 200.0;
/// Height of a command row.
pub const ROW_HEIGHT: f32 = 28.0;
/// Height of a separator row.
pub const SEPARATOR_HEIGHT: f32 = 9.0;
/// Vertical padding around the row list.
pub const MENU_PADDING: f32 = 8.0;

/// Address of a row: one index per nesting level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RowPath(SmallVec<[usize; 4]>);

impl RowPath {
    /// A top-level row.
    pub fn root(index: usize) -> Self {
        let mut path = SmallVec::new();
        path.push(index);
        Self(path)
    }

    /// Build from explicit indices.
    pub fn from_indices(indices: &[usize]) -> Self {
        Self(SmallVec::from_slice(indices))
    }

    /// The `index`-th child of this row.
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// The parent row, `None` for top-level rows.
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        let mut path = self.0.clone();
        path.pop();
        Some(Self(path))
    }

    /// Same level, different index.
    pub fn sibling(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        if let Some(last) = path.last_mut() {
            *last = index;
        }
        Self(path)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Index within the parent level.
    pub fn last(&self) -> usize {
        self.0.last().copied().unwrap_or(0)
    }

    /// Nesting depth, 1 for top-level rows.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &RowPath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for RowPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for index in &self.0 {
            if !first {
                f.write_str("/")?;
            }
            write!(f, "{index}")?;
            first = false;
        }
        Ok(())
    }
}

/// A selectable row's content.
#[derive(Clone)]
pub struct ItemRow {
    pub command: String,
    pub title: String,
    pub icon: Option<String>,
    pub extra_class: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub action: Option<ActionHandler>,
}

impl fmt::Debug for ItemRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemRow")
            .field("command", &self.command)
            .field("title", &self.title)
            .field("icon", &self.icon)
            .field("extra_class", &self.extra_class)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

impl ItemRow {
    fn from_entry(entry: &CommandEntry) -> Self {
        Self {
            command: entry.command.clone(),
            title: entry.title.clone(),
            icon: entry.icon.clone(),
            extra_class: entry.extra_class.clone(),
            data: entry.data.clone(),
            action: entry.action.clone(),
        }
    }
}

/// One row of compiled markup.
#[derive(Debug, Clone)]
pub struct Row {
    item: Option<ItemRow>,
    disabled: bool,
    hidden: bool,
    submenu: Option<Vec<Row>>,
}

impl Row {
    pub fn separator() -> Self {
        Self { item: None, disabled: false, hidden: false, submenu: None }
    }

    pub fn is_separator(&self) -> bool {
        self.item.is_none()
    }

    pub fn item(&self) -> Option<&ItemRow> {
        self.item.as_ref()
    }

    /// Command id, `None` for separators and anonymous parents.
    pub fn command(&self) -> Option<&str> {
        self.item.as_ref().map(|i| i.command.as_str()).filter(|c| !c.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.item.as_ref().map(|i| i.title.as_str())
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether this row opens a nested menu.
    pub fn has_popup(&self) -> bool {
        self.submenu.is_some()
    }

    pub fn children(&self) -> &[Row] {
        self.submenu.as_deref().unwrap_or(&[])
    }

    /// Can be highlighted and activated.
    pub fn is_interactive(&self) -> bool {
        self.item.is_some() && !self.disabled && !self.hidden
    }

    fn height(&self) -> f32 {
        match (self.hidden, self.is_separator()) {
            (true, _) => 0.0,
            (false, true) => SEPARATOR_HEIGHT,
            (false, false) => ROW_HEIGHT,
        }
    }
}

/// Build one row (and its nested rows) from an entry.
pub fn create_entry_markup(entry: &MenuEntry) -> Row {
    match entry {
        MenuEntry::Separator => Row::separator(),
        MenuEntry::Command(fields) => Row {
            item: Some(ItemRow::from_entry(fields)),
            disabled: fields.disabled,
            hidden: false,
            submenu: None,
        },
        MenuEntry::Submenu(fields, children) => Row {
            item: Some(ItemRow::from_entry(fields)),
            disabled: fields.disabled,
            hidden: false,
            submenu: Some(children.iter().map(create_entry_markup).collect()),
        },
    }
}

/// Compile a definition into fresh markup.
pub fn create_menu_markup(definition: &MenuDefinition) -> MenuMarkup {
    let rows = definition.iter().map(create_entry_markup).collect();
    MenuMarkup::from_rows(rows)
}

/// Replacement content for [`MenuMarkup::set_entry`].
#[derive(Debug, Clone)]
pub enum EntryUpdate {
    /// Change only the title.
    Title(String),
    /// Rebuild the row from a full entry; a missing command keeps the old one.
    Entry(MenuEntry),
}

impl From<&str> for EntryUpdate {
    fn from(title: &str) -> Self {
        Self::Title(title.to_string())
    }
}

impl From<String> for EntryUpdate {
    fn from(title: String) -> Self {
        Self::Title(title)
    }
}

impl From<MenuEntry> for EntryUpdate {
    fn from(entry: MenuEntry) -> Self {
        Self::Entry(entry)
    }
}

/// Compiled menu rows plus widget state.
#[derive(Debug, Default)]
pub struct MenuMarkup {
    rows: Vec<Row>,
    index: HashMap<String, RowPath>,
    classes: Vec<String>,
    attached: bool,
    visible: bool,
}

impl MenuMarkup {
    /// Wrap rows and build the command index.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut markup = Self { rows, ..Default::default() };
        markup.refresh();
        markup
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row at `path`.
    pub fn row(&self, path: &RowPath) -> Option<&Row> {
        let (first, rest) = path.indices().split_first()?;
        let mut row = self.rows.get(*first)?;
        for index in rest {
            row = row.submenu.as_ref()?.get(*index)?;
        }
        Some(row)
    }

    fn row_mut(&mut self, path: &RowPath) -> Option<&mut Row> {
        let (first, rest) = path.indices().split_first()?;
        let mut row = self.rows.get_mut(*first)?;
        for index in rest {
            row = row.submenu.as_mut()?.get_mut(*index)?;
        }
        Some(row)
    }

    /// Rows at the level `parent` opens, or the top level for `None`.
    pub fn level(&self, parent: Option<&RowPath>) -> &[Row] {
        match parent {
            None => &self.rows,
            Some(path) => self.row(path).map(Row::children).unwrap_or(&[]),
        }
    }

    /// Path of the row bound to `command`.
    pub fn find(&self, command: &str) -> Option<RowPath> {
        self.index.get(command).cloned()
    }

    /// Whether the row or any ancestor is disabled or hidden.
    pub fn is_inert(&self, path: &RowPath) -> bool {
        let mut current = Some(path.clone());
        while let Some(p) = current {
            match self.row(&p) {
                Some(row) if row.is_separator() && p == *path => return true,
                Some(row) if row.disabled || row.hidden => return true,
                Some(_) => {}
                None => return true,
            }
            current = p.parent();
        }
        false
    }

    /// First interactive row at the level `parent` opens.
    pub fn first_interactive(&self, parent: Option<&RowPath>) -> Option<RowPath> {
        let index = self.level(parent).iter().position(Row::is_interactive)?;
        Some(match parent {
            Some(p) => p.child(index),
            None => RowPath::root(index),
        })
    }

    /// Rebuild the command index after structural changes.
    ///
    /// Rows are indexed in document order; when a command repeats, the
    /// first row keeps the slot and the collision is logged.
    pub fn refresh(&mut self) {
        let mut index = HashMap::new();
        let mut stack: Vec<(RowPath, &Row)> =
            self.rows.iter().enumerate().rev().map(|(i, r)| (RowPath::root(i), r)).collect();
        while let Some((path, row)) = stack.pop() {
            if let Some(command) = row.command() {
                if index.contains_key(command) {
                    tracing::warn!(command, row = %path, "Duplicate menu command, keeping first row");
                } else {
                    index.insert(command.to_string(), path.clone());
                }
            }
            for (i, child) in row.children().iter().enumerate().rev() {
                stack.push((path.child(i), child));
            }
        }
        self.index = index;
    }

    /// Set the disabled flag of the row bound to `command`.
    pub fn enable_entry(&mut self, command: &str, enabled: bool) -> bool {
        let Some(path) = self.find(command) else {
            return false;
        };
        match self.row_mut(&path) {
            Some(row) => {
                row.disabled = !enabled;
                true
            }
            None => false,
        }
    }

    /// Show or hide the row bound to `command`.
    pub fn show_entry(&mut self, command: &str, visible: bool) -> bool {
        let Some(path) = self.find(command) else {
            return false;
        };
        match self.row_mut(&path) {
            Some(row) => {
                row.hidden = !visible;
                true
            }
            None => false,
        }
    }

    /// Replace the title or the whole row bound to `command`.
    pub fn set_entry(&mut self, command: &str, update: EntryUpdate) -> bool {
        let Some(path) = self.find(command) else {
            return false;
        };
        let Some(row) = self.row_mut(&path) else {
            return false;
        };
        match update {
            EntryUpdate::Title(title) => {
                if let Some(item) = row.item.as_mut() {
                    item.title = title;
                }
            }
            EntryUpdate::Entry(mut entry) => {
                if let Some(fields) = entry.entry_mut() {
                    if fields.command.is_empty() {
                        fields.command = command.to_string();
                    }
                }
                let hidden = row.hidden;
                *row = create_entry_markup(&entry);
                row.hidden = hidden;
                self.refresh();
            }
        }
        true
    }

    /// Estimated popup size for the top level.
    pub fn layout_size(&self) -> Size {
        let rows: f32 = self.rows.iter().map(Row::height).sum();
        Size::new(MENU_WIDTH, rows + MENU_PADDING)
    }

    // ========== Widget state ==========

    /// Turn the markup into a live popup: hidden, tagged with `class`.
    pub fn attach(&mut self, class: &str) {
        if !class.is_empty() && !self.classes.iter().any(|c| c == class) {
            self.classes.push(class.to_string());
        }
        self.attached = true;
        self.visible = false;
    }

    /// Release the popup: drop `class` and hide, keeping the rows.
    pub fn detach(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
        self.attached = false;
        self.visible = false;
    }

    /// Swap the widget class without touching visibility.
    pub fn replace_class(&mut self, old: &str, new: &str) {
        self.classes.retain(|c| c != old);
        if !new.is_empty() && !self.classes.iter().any(|c| c == new) {
            self.classes.push(new.to_string());
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Shared handle to menu markup.
#[derive(Clone, Default)]
pub struct MenuHandle(Rc<RefCell<MenuMarkup>>);

impl fmt::Debug for MenuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(markup) => f
                .debug_struct("MenuHandle")
                .field("rows", &markup.rows.len())
                .field("attached", &markup.attached)
                .field("visible", &markup.visible)
                .finish(),
            Err(_) => f.write_str("MenuHandle(<borrowed>)"),
        }
    }
}

impl MenuHandle {
    pub fn new(markup: MenuMarkup) -> Self {
        Self(Rc::new(RefCell::new(markup)))
    }

    /// Compile a definition straight into a handle.
    pub fn from_definition(definition: &MenuDefinition) -> Self {
        Self::new(create_menu_markup(definition))
    }

    pub fn borrow(&self) -> Ref<'_, MenuMarkup> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, MenuMarkup> {
        self.0.borrow_mut()
    }

    /// Whether both handles point at the same markup.
    pub fn ptr_eq(&self, other: &MenuHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Enable or disable the row bound to `command`.
    pub fn enable_entry(&self, command: &str, enabled: bool) -> bool {
        let found = self.0.borrow_mut().enable_entry(command, enabled);
        if !found {
            tracing::warn!(command, "enable_entry: unknown command");
        }
        found
    }

    /// Show or hide the row bound to `command`.
    pub fn show_entry(&self, command: &str, visible: bool) -> bool {
        let found = self.0.borrow_mut().show_entry(command, visible);
        if !found {
            tracing::warn!(command, "show_entry: unknown command");
        }
        found
    }

    /// Retitle or rebuild the row bound to `command`.
    pub fn set_entry(&self, command: &str, update: impl Into<EntryUpdate>) -> bool {
        let found = self.0.borrow_mut().set_entry(command, update.into());
        if !found {
            tracing::warn!(command, "set_entry: unknown command");
        }
        found
    }

    /// Title of the row bound to `command`.
    pub fn title_of(&self, command: &str) -> Option<String> {
        let markup = self.0.borrow();
        let path = markup.find(command)?;
        markup.row(&path).and_then(Row::title).map(String::from)
    }

    /// Whether the row bound to `command` is disabled.
    pub fn is_disabled(&self, command: &str) -> Option<bool> {
        let markup = self.0.borrow();
        let path = markup.find(command)?;
        markup.row(&path).map(Row::is_disabled)
    }

    /// Whether the row bound to `command` is hidden.
    pub fn is_hidden(&self, command: &str) -> Option<bool> {
        let markup = self.0.borrow();
        let path = markup.find(command)?;
        markup.row(&path).map(Row::is_hidden)
    }
}

//! Headless context menu controller.
//!
//! - **context_menu**: the controller and its popup state machine
//! - **definition**: menu definitions and their JSON form
//! - **markup**: the compiled row tree and the command index
//! - **document**: the document model the controller binds to
//! - **selector**, **position**, **animation**, **options**: supporting types
//! - **host**: hooks the embedding application implements

pub mod animation;
pub mod context_menu;
pub mod definition;
pub mod document;
pub mod host;
pub mod key_bindings;
pub mod markup;
pub mod options;
pub mod position;
pub mod selector;

#[cfg(test)]
mod scenario_tests;

pub use animation::{Animation, Effect};
pub use context_menu::{
    Activation, ContextMenuController, GestureOutcome, NativeMenu, NativeSelect, PopupPhase,
};
pub use definition::{CommandEntry, MenuDefinition, MenuEntry};
pub use document::{Document, ElementId, FocusTarget, Point, Rect, Size};
pub use host::{
    AfterSelect, BeforeOpen, DeferredOpen, Gesture, GestureKind, HitTarget, ItemUi, MenuHost,
    OpenResolver, OpenUi, SelectUi,
};
pub use key_bindings::Key;
pub use markup::{create_entry_markup, create_menu_markup, EntryUpdate, MenuHandle, MenuMarkup, RowPath};
pub use options::{ContextMenuOptions, MenuSource};
pub use position::{PositionOption, PositionOverrides};
pub use selector::Selector;

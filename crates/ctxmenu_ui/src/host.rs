//! The host side of the controller: gestures in, notifications out.

use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::document::{ElementId, Point};
use crate::markup::{MenuHandle, RowPath};
use crate::options::MenuSource;

/// How an open was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    /// Native "open context menu" (right click, menu key).
    ContextMenu,
    /// Press-and-hold on touch devices.
    TapHold,
    /// Programmatic `open()`.
    Manual,
}

/// A gesture aimed at an element.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub kind: GestureKind,
    pub target: ElementId,
    /// Page coordinates, absent for programmatic opens.
    pub page: Option<Point>,
    /// Caller data passed through to hooks.
    pub extra_data: Value,
}

impl Gesture {
    pub fn context_menu(target: ElementId, page: Point) -> Self {
        Self { kind: GestureKind::ContextMenu, target, page: Some(page), extra_data: Value::Null }
    }

    pub fn taphold(target: ElementId, page: Point) -> Self {
        Self { kind: GestureKind::TapHold, target, page: Some(page), extra_data: Value::Null }
    }

    pub fn manual(target: ElementId) -> Self {
        Self { kind: GestureKind::Manual, target, page: None, extra_data: Value::Null }
    }

    pub fn with_extra_data(mut self, extra_data: Value) -> Self {
        self.extra_data = extra_data;
        self
    }

    pub fn is_native(&self) -> bool {
        self.kind != GestureKind::Manual
    }
}

/// What a pointer press landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    /// A row of the open popup.
    MenuRow(RowPath),
    /// Popup chrome outside any row.
    Popup,
    /// Some document element.
    Element(ElementId),
    /// Nothing in particular.
    Outside,
}

/// Context handed to `before_open` and `open`.
#[derive(Debug, Clone)]
pub struct OpenUi {
    pub menu: MenuHandle,
    pub target: ElementId,
    pub extra_data: Value,
}

/// Context handed to `select` and entry actions.
#[derive(Debug, Clone)]
pub struct SelectUi {
    pub menu: MenuHandle,
    pub target: ElementId,
    pub command: String,
    pub row: RowPath,
    pub title: String,
    pub data: Option<Map<String, Value>>,
    pub extra_data: Value,
}

/// Context handed to `focus` and `blur`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUi {
    pub row: RowPath,
    pub command: Option<String>,
}

/// Decision returned from `before_open`.
#[derive(Debug)]
pub enum BeforeOpen {
    Proceed,
    /// Cancel the open. No `open` or `close` notification follows.
    Veto,
    /// Swap the menu, then open it.
    Replace(MenuSource),
    /// Open once the resolver fires; a dropped resolver cancels.
    Defer(DeferredOpen),
}

/// Decision returned from `select` and entry actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterSelect {
    #[default]
    Close,
    KeepOpen,
}

/// A pending open decision.
#[derive(Debug)]
pub struct DeferredOpen {
    receiver: oneshot::Receiver<()>,
}

/// Resolves a [`DeferredOpen`]. Dropping it without resolving rejects.
#[derive(Debug)]
pub struct OpenResolver {
    sender: oneshot::Sender<()>,
}

/// Result of polling a deferral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Pending,
    Resolved,
    Rejected,
}

impl DeferredOpen {
    pub fn channel() -> (OpenResolver, DeferredOpen) {
        let (sender, receiver) = oneshot::channel();
        (OpenResolver { sender }, DeferredOpen { receiver })
    }

    pub fn try_settle(&mut self) -> Settled {
        match self.receiver.try_recv() {
            Ok(()) => Settled::Resolved,
            Err(oneshot::error::TryRecvError::Empty) => Settled::Pending,
            Err(oneshot::error::TryRecvError::Closed) => Settled::Rejected,
        }
    }

    /// Wait for the decision; `true` means proceed.
    pub async fn settle(self) -> bool {
        self.receiver.await.is_ok()
    }
}

impl OpenResolver {
    pub fn resolve(self) {
        // the controller may already have dropped a superseded deferral
        let _ = self.sender.send(());
    }

    pub fn reject(self) {
        drop(self);
    }
}

/// Notifications raised by the controller.
///
/// All hooks have no-op defaults, so hosts implement only what they need.
/// Hooks may mutate the menu through the handle in their UI context.
pub trait MenuHost {
    /// The controller was created.
    fn create(&mut self, _menu: Option<&MenuHandle>) {}

    /// An open was requested for a matching trigger element.
    fn before_open(&mut self, _gesture: &Gesture, _ui: &OpenUi) -> BeforeOpen {
        BeforeOpen::Proceed
    }

    /// The popup finished opening.
    fn open(&mut self, _gesture: &Gesture, _ui: &OpenUi) {}

    /// A row was activated.
    fn select(&mut self, _ui: &SelectUi) -> AfterSelect {
        AfterSelect::Close
    }

    /// The popup finished closing.
    fn close(&mut self) {}

    fn focus(&mut self, _ui: &ItemUi) {}

    fn blur(&mut self, _ui: &ItemUi) {}
}

impl MenuHost for () {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_resolve_and_reject() {
        let (resolver, mut deferred) = DeferredOpen::channel();
        assert_eq!(deferred.try_settle(), Settled::Pending);
        resolver.resolve();
        assert_eq!(deferred.try_settle(), Settled::Resolved);

        let (resolver, mut deferred) = DeferredOpen::channel();
        resolver.reject();
        assert_eq!(deferred.try_settle(), Settled::Rejected);
    }

    #[tokio::test]
    async fn test_deferred_settle_async() {
        let (resolver, deferred) = DeferredOpen::channel();
        tokio::spawn(async move { resolver.resolve() });
        assert!(deferred.settle().await);

        let (resolver, deferred) = DeferredOpen::channel();
        drop(resolver);
        assert!(!deferred.settle().await);
    }

    #[test]
    fn test_gesture_builders() {
        let target = crate::document::Document::new(Default::default()).body();
        let gesture = Gesture::taphold(target, Point::new(1.0, 2.0));
        assert!(gesture.is_native());
        let manual = Gesture::manual(target).with_extra_data(serde_json::json!({"row": 3}));
        assert!(!manual.is_native());
        assert!(manual.page.is_none());
        assert_eq!(manual.extra_data["row"], 3);
    }
}

//! Context menu controller.
//!
//! This module provides:
//! - ContextMenuController bound to a root scope and a delegate selector
//! - The Closed/Opening/Open/Closing popup state machine
//! - Deferred opens driven by a host decision
//! - Keyboard and pointer navigation with submenus
//! - Entry mutation by command id

use std::time::Instant;

use ctxmenu_core::CtxMenuError;
use serde_json::Value;

use crate::animation::{AnimationKind, PendingAnimation, Ticket, TicketCounter};
use crate::document::{
    Document, ElementId, FocusTarget, ListenerGuard, ListenerKind, ListenerScope, Point, StyleGuard,
};
use crate::host::{
    AfterSelect, BeforeOpen, DeferredOpen, Gesture, GestureKind, HitTarget, ItemUi, MenuHost,
    OpenUi, SelectUi, Settled,
};
use crate::key_bindings::Key;
use crate::markup::{EntryUpdate, MenuHandle, MenuMarkup, RowPath};
use crate::options::{ContextMenuOptions, MenuSource};
use crate::selector::Selector;

// ============================================================================
// Outcomes
// ============================================================================

/// Observable phase of the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupPhase {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Result of a gesture or programmatic open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// No listener, no matching trigger, or no menu.
    Ignored,
    /// `before_open` vetoed, or a deferral was rejected.
    Vetoed,
    /// Waiting on a deferred `before_open` decision.
    Deferred,
    /// Show animation running.
    Opening,
    /// Fully open.
    Opened,
}

impl GestureOutcome {
    /// Whether the native browser menu must be suppressed.
    pub fn suppresses_native(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Result of activating a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The popup is not open.
    Ignored,
    /// Separator, disabled, hidden or missing row.
    Inert,
    /// A submenu parent was expanded instead of selected.
    Expanded,
    /// `select` or the entry action asked to keep the popup open.
    KeptOpen,
    /// The selection closed the popup.
    Closed,
}

/// Whether the native context menu may show on the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeMenu {
    Allowed,
    Suppressed,
}

/// Whether a native text selection may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeSelect {
    Allowed,
    Suppressed,
}

// ============================================================================
// Internal state
// ============================================================================

/// One show/hide cycle. Dropping it releases the dismissal listeners.
struct Session {
    target: ElementId,
    gesture: Gesture,
    position: Point,
    previous_focus: Option<FocusTarget>,
    _dismissal: Vec<ListenerGuard>,
    popup_guard: Option<ListenerGuard>,
}

enum PopupState {
    Closed,
    Opening { session: Session, ticket: Ticket },
    Open(Session),
    Closing { previous_focus: Option<FocusTarget>, ticket: Ticket },
}

impl PopupState {
    fn phase(&self) -> PopupPhase {
        match self {
            Self::Closed => PopupPhase::Closed,
            Self::Opening { .. } => PopupPhase::Opening,
            Self::Open(_) => PopupPhase::Open,
            Self::Closing { .. } => PopupPhase::Closing,
        }
    }

    fn session(&self) -> Option<&Session> {
        match self {
            Self::Opening { session, .. } | Self::Open(session) => Some(session),
            _ => None,
        }
    }
}

struct BackingMenu {
    handle: MenuHandle,
    owned: bool,
}

struct PendingOpen {
    deferred: DeferredOpen,
    gesture: Gesture,
}

// ============================================================================
// ContextMenuController
// ============================================================================

/// Binds a menu to trigger elements and drives the popup.
pub struct ContextMenuController<H: MenuHost> {
    document: Document,
    root: ElementId,
    delegate: Selector,
    options: ContextMenuOptions,
    host: H,
    namespace: String,
    menu: Option<BackingMenu>,
    state: PopupState,
    pending: Option<PendingOpen>,
    animation: Option<PendingAnimation>,
    tickets: TicketCounter,
    highlighted: Option<RowPath>,
    expanded: Vec<RowPath>,
    trigger_guards: Vec<ListenerGuard>,
    style_guard: Option<StyleGuard>,
    destroyed: bool,
}

impl<H: MenuHost> ContextMenuController<H> {
    /// Bind a controller to `root`, opening on descendants matching `delegate`.
    ///
    /// An empty `delegate` falls back to `options.delegate`. A bad selector,
    /// a missing root or an unresolvable menu source fails here.
    pub fn new(
        document: Document,
        root: ElementId,
        delegate: &str,
        menu: impl Into<MenuSource>,
        mut options: ContextMenuOptions,
        host: H,
    ) -> Result<Self, CtxMenuError> {
        if !document.contains_element(root) {
            return Err(CtxMenuError::config_with_hint(
                "Root scope element not found",
                "Create the root element in the document before binding",
            ));
        }

        let delegate_text = match delegate.trim() {
            "" => options.delegate.clone().unwrap_or_default(),
            text => text.to_string(),
        };
        let delegate = Selector::parse(&delegate_text)?;
        options.delegate = Some(delegate.as_str().to_string());

        let menu = match (menu.into(), options.menu.take()) {
            (MenuSource::None, Some(from_options)) => from_options,
            (menu, _) => menu,
        };

        let namespace = document.next_namespace();
        let mut controller = Self {
            document,
            root,
            delegate,
            options,
            host,
            namespace,
            menu: None,
            state: PopupState::Closed,
            pending: None,
            animation: None,
            tickets: TicketCounter::default(),
            highlighted: None,
            expanded: Vec::new(),
            trigger_guards: Vec::new(),
            style_guard: None,
            destroyed: false,
        };

        controller.install_triggers();
        controller.create_ui_menu(menu)?;

        tracing::debug!(
            namespace = %controller.namespace,
            delegate = %controller.delegate,
            has_menu = controller.menu.is_some(),
            "Context menu bound"
        );

        let handle = controller.menu();
        controller.host.create(handle.as_ref());
        Ok(controller)
    }

    // ========== Queries ==========

    pub fn state(&self) -> PopupPhase {
        self.state.phase()
    }

    /// Whether a popup is showing for a target (including while animating in).
    pub fn is_open(&self) -> bool {
        self.menu.is_some() && self.current_target().is_some()
    }

    /// Trigger element of the current open; cleared as soon as closing begins.
    pub fn current_target(&self) -> Option<ElementId> {
        self.state.session().map(|s| s.target)
    }

    /// Top-left corner of the current popup.
    pub fn position(&self) -> Option<Point> {
        self.state.session().map(|s| s.position)
    }

    /// The live menu.
    pub fn menu(&self) -> Option<MenuHandle> {
        self.menu.as_ref().map(|m| m.handle.clone())
    }

    /// Whether the live menu was compiled by this controller.
    pub fn owns_menu(&self) -> bool {
        self.menu.as_ref().is_some_and(|m| m.owned)
    }

    pub fn highlighted(&self) -> Option<&RowPath> {
        self.highlighted.as_ref()
    }

    /// Submenu parents currently expanded, outermost first.
    pub fn expanded(&self) -> &[RowPath] {
        &self.expanded
    }

    pub fn has_pending_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_animation(&self) -> Option<&PendingAnimation> {
        self.animation.as_ref()
    }

    /// Event namespace owning every listener this controller installs.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn options(&self) -> &ContextMenuOptions {
        &self.options
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ========== Host -> controller ==========

    /// Entry point for native gestures and programmatic opens.
    pub fn handle_gesture(&mut self, gesture: Gesture) -> GestureOutcome {
        if self.destroyed {
            return GestureOutcome::Ignored;
        }
        let listening = match gesture.kind {
            GestureKind::ContextMenu => {
                self.document.has_listener(ListenerKind::ContextMenu, &self.namespace)
            }
            GestureKind::TapHold => self.document.has_listener(ListenerKind::TapHold, &self.namespace),
            GestureKind::Manual => true,
        };
        if !listening {
            return GestureOutcome::Ignored;
        }
        self.open_menu(gesture, false)
    }

    /// Open the menu for `target` as if it had been right-clicked.
    pub fn open(&mut self, target: ElementId, extra_data: Value) -> GestureOutcome {
        self.handle_gesture(Gesture::manual(target).with_extra_data(extra_data))
    }

    /// Close the popup with the hide animation.
    pub fn close(&mut self) {
        if self.is_open() {
            self.close_menu(false);
        }
    }

    /// Swap the menu, closing an open popup immediately first.
    pub fn replace_menu(&mut self, source: impl Into<MenuSource>) -> Result<(), CtxMenuError> {
        self.create_ui_menu(source.into())
    }

    pub fn enable_entry(&mut self, command: &str, enabled: bool) -> bool {
        match self.menu() {
            Some(menu) => menu.enable_entry(command, enabled),
            None => {
                tracing::warn!(command, "enable_entry without a menu");
                false
            }
        }
    }

    pub fn show_entry(&mut self, command: &str, visible: bool) -> bool {
        match self.menu() {
            Some(menu) => menu.show_entry(command, visible),
            None => {
                tracing::warn!(command, "show_entry without a menu");
                false
            }
        }
    }

    pub fn set_entry(&mut self, command: &str, update: impl Into<EntryUpdate>) -> bool {
        match self.menu() {
            Some(menu) => menu.set_entry(command, update),
            None => {
                tracing::warn!(command, "set_entry without a menu");
                false
            }
        }
    }

    /// Re-apply options. A `menu` value replaces the current menu.
    pub fn set_options(&mut self, mut options: ContextMenuOptions) -> Result<(), CtxMenuError> {
        if let Some(delegate) = options.delegate.as_deref() {
            if delegate.trim() != self.delegate.as_str() {
                self.delegate = Selector::parse(delegate)?;
            }
        }
        options.delegate = Some(self.delegate.as_str().to_string());
        let menu = options.menu.take();

        if options.add_class != self.options.add_class {
            if let Some(handle) = self.menu() {
                handle.borrow_mut().replace_class(&self.options.add_class, &options.add_class);
            }
        }
        self.options = options;
        if !self.destroyed {
            self.install_triggers();
        }
        if let Some(source) = menu {
            self.create_ui_menu(source)?;
        }
        Ok(())
    }

    /// Close without animation and release every listener, style and menu.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.pending = None;
        if !matches!(self.state, PopupState::Closed) {
            self.close_menu(true);
        }
        self.release_menu();
        self.trigger_guards.clear();
        self.style_guard = None;
        self.destroyed = true;
        tracing::debug!(namespace = %self.namespace, "Context menu destroyed");
    }

    // ========== Document events ==========

    /// A mouse or touch press anywhere in the document.
    ///
    /// Returns whether the press dismissed the popup.
    pub fn pointer_down(&mut self, hit: HitTarget) -> bool {
        if self.state.session().is_none() {
            return false;
        }
        let on_row = match &hit {
            HitTarget::MenuRow(path) => self
                .with_markup(|markup| markup.row(path).is_some_and(|row| !row.is_separator()))
                .unwrap_or(false),
            _ => false,
        };
        if on_row {
            return false;
        }
        tracing::debug!(?hit, "Pointer down outside menu rows");
        self.close_menu(false);
        true
    }

    /// A key press while the dismissal listeners are installed.
    ///
    /// Returns whether the key was consumed.
    pub fn key_down(&mut self, key: Key) -> bool {
        if self.state.session().is_none() {
            return false;
        }
        match key {
            Key::Escape => {
                self.close_menu(false);
                true
            }
            Key::ArrowDown => self.move_highlight(true),
            Key::ArrowUp => self.move_highlight(false),
            Key::ArrowRight => {
                let Some(row) = self.highlighted.clone() else {
                    return false;
                };
                if !self.is_expandable(&row) {
                    return false;
                }
                self.expand_and_enter(&row);
                true
            }
            Key::ArrowLeft => {
                let Some(parent) = self.highlighted.as_ref().and_then(RowPath::parent) else {
                    return false;
                };
                self.set_highlight(Some(parent));
                true
            }
            Key::Enter | Key::Space => {
                let Some(row) = self.highlighted.clone() else {
                    return false;
                };
                self.activate(&row);
                true
            }
            Key::Other => false,
        }
    }

    /// Pointer moved onto a row.
    pub fn pointer_enter(&mut self, row: &RowPath) {
        if self.state.session().is_none() {
            return;
        }
        let Some((interactive, has_popup)) = self.with_markup(|markup| {
            (!markup.is_inert(row), markup.row(row).is_some_and(|r| r.has_popup()))
        }) else {
            return;
        };
        if !interactive {
            return;
        }
        self.set_highlight(Some(row.clone()));
        if has_popup {
            self.open_submenu(row);
        }
    }

    /// Pointer or keyboard activation of a row.
    pub fn activate(&mut self, row: &RowPath) -> Activation {
        let Some(session) = self.state.session() else {
            return Activation::Ignored;
        };
        let target = session.target;
        let extra_data = session.gesture.extra_data.clone();
        let Some(menu) = self.menu() else {
            return Activation::Ignored;
        };

        let (item, has_popup) = {
            let markup = menu.borrow();
            if markup.is_inert(row) {
                tracing::debug!(row = %row, "Activation on inert row ignored");
                return Activation::Inert;
            }
            let Some(found) = markup.row(row) else {
                return Activation::Inert;
            };
            let Some(item) = found.item().cloned() else {
                return Activation::Inert;
            };
            (item, found.has_popup())
        };

        // parents only expand, even when they carry an action
        if has_popup && self.options.ignore_parent_select {
            self.expand_and_enter(row);
            return Activation::Expanded;
        }

        let ui = SelectUi {
            menu,
            target,
            command: item.command.clone(),
            row: row.clone(),
            title: item.title.clone(),
            data: item.data.clone(),
            extra_data,
        };

        let mut keep_open = self.host.select(&ui) == AfterSelect::KeepOpen;
        if let Some(action) = &item.action {
            keep_open |= action(&ui) == AfterSelect::KeepOpen;
        }

        tracing::debug!(command = %item.command, keep_open, "Menu entry selected");
        if keep_open {
            Activation::KeptOpen
        } else {
            self.close_menu(false);
            Activation::Closed
        }
    }

    /// A native context menu request on the popup itself.
    pub fn popup_context_menu(&self) -> NativeMenu {
        match self.state.session() {
            Some(session) if session.popup_guard.is_some() => NativeMenu::Suppressed,
            _ => NativeMenu::Allowed,
        }
    }

    /// A native text selection starting at `target`.
    pub fn select_start(&self, target: ElementId) -> NativeSelect {
        if self.style_guard.is_none() {
            return NativeSelect::Allowed;
        }
        match self.document.closest_within(target, self.root, &self.delegate) {
            Some(_) => NativeSelect::Suppressed,
            None => NativeSelect::Allowed,
        }
    }

    // ========== Animations and deferrals ==========

    /// Complete the pending animation if its deadline has passed.
    pub fn advance(&mut self, now: Instant) {
        let Some(animation) = self.animation.as_ref() else {
            return;
        };
        if animation.is_due(now) {
            let (ticket, kind) = (animation.ticket, animation.kind);
            self.animation = None;
            self.complete_animation(ticket, kind);
        }
    }

    /// Complete the pending animation now.
    pub fn finish_animations(&mut self) {
        if let Some(animation) = self.animation.take() {
            self.complete_animation(animation.ticket, animation.kind);
        }
    }

    /// Check a deferred `before_open` decision without blocking.
    ///
    /// Returns `None` while nothing is pending or the decision is outstanding.
    pub fn poll_deferred(&mut self) -> Option<GestureOutcome> {
        let pending = self.pending.as_mut()?;
        match pending.deferred.try_settle() {
            Settled::Pending => None,
            Settled::Resolved => {
                let pending = self.pending.take()?;
                tracing::debug!("Deferred open resolved");
                Some(self.open_menu(pending.gesture, true))
            }
            Settled::Rejected => {
                self.pending = None;
                tracing::debug!("Deferred open rejected");
                Some(GestureOutcome::Vetoed)
            }
        }
    }

    /// Wait for a deferred `before_open` decision and resume the open.
    pub async fn settle_deferred(&mut self) -> Option<GestureOutcome> {
        let pending = self.pending.take()?;
        if pending.deferred.settle().await {
            tracing::debug!("Deferred open resolved");
            Some(self.open_menu(pending.gesture, true))
        } else {
            tracing::debug!("Deferred open rejected");
            Some(GestureOutcome::Vetoed)
        }
    }

    // ========== Menu construction ==========

    fn install_triggers(&mut self) {
        self.trigger_guards.clear();
        self.style_guard = None;

        let scope = ListenerScope::Element(self.root);
        if self.options.auto_trigger {
            self.trigger_guards.push(self.document.listen(
                scope,
                ListenerKind::ContextMenu,
                &self.namespace,
            ));
            if self.options.taphold {
                self.trigger_guards.push(self.document.listen(
                    scope,
                    ListenerKind::TapHold,
                    &self.namespace,
                ));
            }
        }

        if self.options.prevent_select {
            let scope_element =
                if self.document.is_document(self.root) { self.document.body() } else { self.root };
            let id = self.document.unique_id(scope_element);
            let selectors = self
                .delegate
                .as_str()
                .split(',')
                .map(|part| format!("#{id} {}", part.trim()))
                .collect::<Vec<_>>()
                .join(", ");
            let css = format!(
                "{selectors} {{ -webkit-user-select: none; -khtml-user-select: none; \
                 -moz-user-select: none; -ms-user-select: none; user-select: none; }}"
            );
            self.style_guard = Some(self.document.inject_style(css));
            self.trigger_guards.push(self.document.listen(
                scope,
                ListenerKind::SelectStart,
                &self.namespace,
            ));
        }
    }

    fn resolve_source(&self, source: MenuSource) -> Result<Option<BackingMenu>, CtxMenuError> {
        Ok(match source {
            MenuSource::None => None,
            MenuSource::Definition(definition) => {
                Some(BackingMenu { handle: MenuHandle::from_definition(&definition), owned: true })
            }
            MenuSource::Markup(handle) => Some(BackingMenu { handle, owned: false }),
            MenuSource::Selector(selector) => {
                let handle = self.document.markup_by_selector(&selector).ok_or_else(|| {
                    CtxMenuError::config_with_hint(
                        format!("No menu markup matches '{selector}'"),
                        "Register the markup with Document::insert_markup",
                    )
                })?;
                Some(BackingMenu { handle, owned: false })
            }
        })
    }

    fn create_ui_menu(&mut self, source: MenuSource) -> Result<(), CtxMenuError> {
        let backing = self.resolve_source(source)?;
        if self.is_open() {
            self.close_menu(true);
        }
        self.release_menu();
        if let Some(backing) = &backing {
            backing.handle.borrow_mut().attach(&self.options.add_class);
        }
        self.menu = backing;
        tracing::debug!(owned = self.owns_menu(), has_menu = self.menu.is_some(), "Menu created");
        Ok(())
    }

    fn release_menu(&mut self) {
        self.highlighted = None;
        self.expanded.clear();
        if let Some(backing) = self.menu.take() {
            backing.handle.borrow_mut().detach(&self.options.add_class);
            if backing.owned {
                tracing::trace!("Owned menu discarded");
            }
        }
    }

    fn open_ui(&self, target: ElementId, extra_data: &Value) -> Option<OpenUi> {
        self.menu().map(|menu| OpenUi { menu, target, extra_data: extra_data.clone() })
    }

    // ========== Transitions ==========

    fn open_menu(&mut self, mut gesture: Gesture, resumed: bool) -> GestureOutcome {
        if self.destroyed {
            return GestureOutcome::Ignored;
        }
        let target = if gesture.is_native() {
            match self.document.closest_within(gesture.target, self.root, &self.delegate) {
                Some(trigger) => trigger,
                None => return GestureOutcome::Ignored,
            }
        } else if self.document.contains_element(gesture.target) {
            gesture.target
        } else {
            tracing::warn!(element = gesture.target.index(), "open() on unknown element");
            return GestureOutcome::Ignored;
        };
        gesture.target = target;

        if self.menu.is_none() {
            tracing::warn!("Context menu gesture without a menu");
            return GestureOutcome::Ignored;
        }

        // a hide still animating completes before the next open starts
        if let PopupState::Closing { ticket, .. } = self.state {
            self.animation = None;
            self.complete_hide(ticket);
        }
        if self.pending.take().is_some() {
            tracing::debug!("Pending deferred open superseded");
        }

        if !resumed {
            let Some(ui) = self.open_ui(target, &gesture.extra_data) else {
                return GestureOutcome::Ignored;
            };
            match self.host.before_open(&gesture, &ui) {
                BeforeOpen::Proceed => {}
                BeforeOpen::Veto => {
                    tracing::debug!(element = target.index(), "Open vetoed");
                    return GestureOutcome::Vetoed;
                }
                BeforeOpen::Defer(deferred) => {
                    tracing::debug!(element = target.index(), "Open deferred");
                    self.pending = Some(PendingOpen { deferred, gesture });
                    return GestureOutcome::Deferred;
                }
                BeforeOpen::Replace(source) => {
                    self.abandon_session();
                    if let Err(error) = self.create_ui_menu(source) {
                        tracing::warn!(%error, "Replacement menu rejected, keeping current menu");
                    }
                    if self.menu.is_none() {
                        return GestureOutcome::Ignored;
                    }
                }
            }
        }

        self.abandon_session();
        self.show(gesture)
    }

    /// Drop an in-flight open without a close notification.
    fn abandon_session(&mut self) {
        if self.state.session().is_some() {
            tracing::debug!("Previous open abandoned");
            self.state = PopupState::Closed;
            self.animation = None;
            self.highlighted = None;
            self.expanded.clear();
        }
    }

    fn show(&mut self, gesture: Gesture) -> GestureOutcome {
        let Some(ui) = self.open_ui(gesture.target, &gesture.extra_data) else {
            return GestureOutcome::Ignored;
        };

        let dismissal = [ListenerKind::KeyDown, ListenerKind::PointerDown, ListenerKind::TouchStart]
            .into_iter()
            .map(|kind| self.document.listen(ListenerScope::Document, kind, &self.namespace))
            .collect();
        let popup_guard = self.options.prevent_context_menu_for_popup.then(|| {
            self.document.listen(ListenerScope::Popup, ListenerKind::PopupContextMenu, &self.namespace)
        });

        let size = ui.menu.borrow().layout_size();
        let position = self.options.position.resolve(&gesture, &ui).compute(&self.document, size);
        ui.menu.borrow_mut().set_visible(true);

        let target = gesture.target;
        let session = Session {
            target,
            gesture,
            position,
            previous_focus: None,
            _dismissal: dismissal,
            popup_guard,
        };
        let ticket = self.tickets.next();
        self.state = PopupState::Opening { session, ticket };
        tracing::debug!(
            element = target.index(),
            x = position.x,
            y = position.y,
            "Context menu opening"
        );

        if self.options.show.is_immediate() {
            self.complete_show(ticket);
            GestureOutcome::Opened
        } else {
            self.animation =
                Some(PendingAnimation::start(ticket, AnimationKind::Show, &self.options.show, Instant::now()));
            GestureOutcome::Opening
        }
    }

    fn complete_animation(&mut self, ticket: Ticket, kind: AnimationKind) {
        match kind {
            AnimationKind::Show => self.complete_show(ticket),
            AnimationKind::Hide => self.complete_hide(ticket),
        }
    }

    fn complete_show(&mut self, ticket: Ticket) {
        let mut session = match std::mem::replace(&mut self.state, PopupState::Closed) {
            PopupState::Opening { session, ticket: current } if current == ticket => session,
            other => {
                self.state = other;
                tracing::trace!("Stale show completion ignored");
                return;
            }
        };

        if self.options.auto_focus {
            session.previous_focus = self.document.focused();
            self.document.focus(FocusTarget::Popup);
        }
        let gesture = session.gesture.clone();
        self.state = PopupState::Open(session);
        tracing::debug!(element = gesture.target.index(), "Context menu open");

        if self.options.auto_focus {
            let first = self.with_markup(|markup| markup.first_interactive(None)).flatten();
            if first.is_some() {
                self.set_highlight(first);
            }
        }
        if let Some(ui) = self.open_ui(gesture.target, &gesture.extra_data) {
            self.host.open(&gesture, &ui);
        }
    }

    fn close_menu(&mut self, immediately: bool) {
        let previous_focus = match std::mem::replace(&mut self.state, PopupState::Closed) {
            PopupState::Opening { session, .. } | PopupState::Open(session) => {
                let previous_focus = session.previous_focus;
                // releases the dismissal listeners before any hide work starts
                drop(session);
                previous_focus
            }
            PopupState::Closing { previous_focus, ticket } => {
                self.state = PopupState::Closing { previous_focus, ticket };
                if immediately {
                    self.animation = None;
                    self.complete_hide(ticket);
                }
                return;
            }
            PopupState::Closed => return,
        };

        self.animation = None;
        self.highlighted = None;
        self.expanded.clear();

        let ticket = self.tickets.next();
        self.state = PopupState::Closing { previous_focus, ticket };
        tracing::debug!(immediately, "Context menu closing");

        if immediately || self.options.hide.is_immediate() || self.menu.is_none() {
            self.complete_hide(ticket);
        } else {
            self.animation =
                Some(PendingAnimation::start(ticket, AnimationKind::Hide, &self.options.hide, Instant::now()));
        }
    }

    fn complete_hide(&mut self, ticket: Ticket) {
        let previous_focus = match std::mem::replace(&mut self.state, PopupState::Closed) {
            PopupState::Closing { previous_focus, ticket: current } if current == ticket => {
                previous_focus
            }
            other => {
                self.state = other;
                tracing::trace!("Stale hide completion ignored");
                return;
            }
        };

        if let Some(menu) = self.menu() {
            menu.borrow_mut().set_visible(false);
        }
        if let Some(focus) = previous_focus {
            self.document.focus(focus);
        }
        tracing::debug!("Context menu closed");
        self.host.close();
    }

    // ========== Highlight and submenus ==========

    fn with_markup<R>(&self, f: impl FnOnce(&MenuMarkup) -> R) -> Option<R> {
        self.menu.as_ref().map(|backing| f(&backing.handle.borrow()))
    }

    fn item_ui(&self, row: &RowPath) -> ItemUi {
        let command = self
            .with_markup(|markup| markup.row(row).and_then(|r| r.command()).map(String::from))
            .flatten();
        ItemUi { row: row.clone(), command }
    }

    fn set_highlight(&mut self, row: Option<RowPath>) {
        if self.highlighted == row {
            return;
        }
        if let Some(old) = self.highlighted.take() {
            let ui = self.item_ui(&old);
            self.host.blur(&ui);
        }
        // submenus off the new row's ancestor chain collapse
        match &row {
            Some(new) => self.expanded.retain(|p| p != new && p.is_prefix_of(new)),
            None => self.expanded.clear(),
        }
        self.highlighted = row.clone();
        if let Some(new) = row {
            let ui = self.item_ui(&new);
            self.host.focus(&ui);
        }
    }

    fn is_expandable(&self, row: &RowPath) -> bool {
        self.with_markup(|markup| {
            !markup.is_inert(row) && markup.row(row).is_some_and(|r| r.has_popup())
        })
        .unwrap_or(false)
    }

    fn open_submenu(&mut self, parent: &RowPath) {
        self.expanded.retain(|p| p.is_prefix_of(parent) && p != parent);
        self.expanded.push(parent.clone());
    }

    fn expand_and_enter(&mut self, parent: &RowPath) {
        self.set_highlight(Some(parent.clone()));
        self.open_submenu(parent);
        let first = self.with_markup(|markup| markup.first_interactive(Some(parent))).flatten();
        if first.is_some() {
            self.set_highlight(first);
        }
    }

    fn move_highlight(&mut self, forward: bool) -> bool {
        let Some(menu) = self.menu() else {
            return false;
        };
        let level = self.highlighted.as_ref().and_then(RowPath::parent);
        let next = {
            let markup = menu.borrow();
            let rows = markup.level(level.as_ref());
            let len = rows.len();
            if len == 0 {
                return false;
            }
            let current = self.highlighted.as_ref().map(RowPath::last);
            let start = match (current, forward) {
                (Some(i), true) => i + 1,
                (None, true) => 0,
                (Some(i), false) => i + len - 1,
                (None, false) => len - 1,
            };
            (0..len)
                .map(|offset| if forward { (start + offset) % len } else { (start + len - offset) % len })
                .find(|&idx| rows[idx].is_interactive())
        };
        let Some(index) = next else {
            return false;
        };
        let path = match level {
            Some(parent) => parent.child(index),
            None => RowPath::root(index),
        };
        self.set_highlight(Some(path));
        true
    }
}

impl<H: MenuHost> Drop for ContextMenuController<H> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{MenuDefinition, MenuEntry};
    use crate::document::Size;

    #[derive(Default)]
    struct FocusLog {
        events: Vec<String>,
    }

    impl MenuHost for FocusLog {
        fn focus(&mut self, ui: &ItemUi) {
            self.events.push(format!("focus {}", ui.command.as_deref().unwrap_or("-")));
        }
        fn blur(&mut self, ui: &ItemUi) {
            self.events.push(format!("blur {}", ui.command.as_deref().unwrap_or("-")));
        }
    }

    fn fixture(options: ContextMenuOptions) -> (ContextMenuController<FocusLog>, ElementId) {
        let doc = Document::new(Size::new(800.0, 600.0));
        let row = doc.create_element(doc.body(), "li");
        doc.add_class(row, "torrent");
        let def = MenuDefinition::new(vec![
            MenuEntry::command("pause", "Pause"),
            MenuEntry::separator(),
            MenuEntry::command("resume", "Resume").disabled(true),
            MenuEntry::submenu("queue", "Queue", vec![
                MenuEntry::command("move-top", "Move to Top"),
                MenuEntry::command("move-bottom", "Move to Bottom"),
            ]),
            MenuEntry::command("verify", "Verify"),
        ]);
        let controller = ContextMenuController::new(
            doc.clone(),
            doc.body(),
            ".torrent",
            def,
            options.without_animations(),
            FocusLog::default(),
        )
        .unwrap();
        (controller, row)
    }

    #[test]
    fn test_arrow_keys_wrap_and_skip_inert_rows() {
        let (mut controller, row) = fixture(ContextMenuOptions::default());
        controller.open(row, Value::Null);

        assert!(controller.key_down(Key::ArrowDown));
        assert_eq!(controller.highlighted(), Some(&RowPath::root(0)));
        controller.key_down(Key::ArrowDown);
        assert_eq!(controller.highlighted(), Some(&RowPath::root(3)));
        controller.key_down(Key::ArrowDown);
        controller.key_down(Key::ArrowDown);
        assert_eq!(controller.highlighted(), Some(&RowPath::root(0)));
        controller.key_down(Key::ArrowUp);
        assert_eq!(controller.highlighted(), Some(&RowPath::root(4)));

        assert_eq!(
            controller.host().events,
            vec!["focus pause", "blur pause", "focus queue", "blur queue", "focus verify",
                 "blur verify", "focus pause", "blur pause", "focus verify"]
        );
    }

    #[test]
    fn test_submenu_expand_and_collapse() {
        let (mut controller, row) = fixture(ContextMenuOptions::default());
        controller.open(row, Value::Null);
        controller.pointer_enter(&RowPath::root(3));
        assert_eq!(controller.expanded(), &[RowPath::root(3)]);

        controller.key_down(Key::ArrowRight);
        assert_eq!(controller.highlighted(), Some(&RowPath::from_indices(&[3, 0])));
        controller.key_down(Key::ArrowUp);
        assert_eq!(controller.highlighted(), Some(&RowPath::from_indices(&[3, 1])));

        controller.key_down(Key::ArrowLeft);
        assert_eq!(controller.highlighted(), Some(&RowPath::root(3)));
        assert!(controller.expanded().is_empty());

        // moving to a sibling collapses an expanded submenu
        controller.pointer_enter(&RowPath::root(3));
        controller.key_down(Key::ArrowDown);
        assert!(controller.expanded().is_empty());
    }

    #[test]
    fn test_enter_activates_highlighted_row() {
        let (mut controller, row) = fixture(ContextMenuOptions::default());
        controller.open(row, Value::Null);
        controller.key_down(Key::ArrowUp);
        assert!(controller.key_down(Key::Enter));
        assert_eq!(controller.state(), PopupPhase::Closed);
        assert!(!controller.key_down(Key::Escape));
    }

    #[test]
    fn test_parent_click_expands_instead_of_selecting() {
        let (mut controller, row) = fixture(ContextMenuOptions::default());
        controller.open(row, Value::Null);
        assert_eq!(controller.activate(&RowPath::root(3)), Activation::Expanded);
        assert_eq!(controller.highlighted(), Some(&RowPath::from_indices(&[3, 0])));
        assert!(controller.is_open());
    }

    #[test]
    fn test_auto_focus_highlights_first_row_and_restores_focus() {
        let options = ContextMenuOptions { auto_focus: true, ..Default::default() };
        let (mut controller, row) = fixture(options);
        let doc = controller.document().clone();
        doc.focus(FocusTarget::Element(row));

        controller.open(row, Value::Null);
        assert_eq!(doc.focused(), Some(FocusTarget::Popup));
        assert_eq!(controller.highlighted(), Some(&RowPath::root(0)));

        controller.close();
        assert_eq!(doc.focused(), Some(FocusTarget::Element(row)));
    }

    #[test]
    fn test_popup_context_menu_suppression() {
        let options = ContextMenuOptions { prevent_context_menu_for_popup: true, ..Default::default() };
        let (mut controller, row) = fixture(options);
        assert_eq!(controller.popup_context_menu(), NativeMenu::Allowed);
        controller.open(row, Value::Null);
        assert_eq!(controller.popup_context_menu(), NativeMenu::Suppressed);
        controller.close();
        assert_eq!(controller.popup_context_menu(), NativeMenu::Allowed);
    }

    #[test]
    fn test_set_options_toggles_taphold_listener() {
        let (mut controller, _row) = fixture(ContextMenuOptions::default());
        let ns = controller.namespace().to_string();
        assert!(!controller.document().has_listener(ListenerKind::TapHold, &ns));

        let options = ContextMenuOptions { taphold: true, ..controller.options().clone() };
        controller.set_options(options).unwrap();
        assert!(controller.document().has_listener(ListenerKind::TapHold, &ns));
    }
}

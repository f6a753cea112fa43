//! Headless document model.
//!
//! The controller never touches a real DOM. It talks to this small model of
//! one: an element tree with layout boxes, a focus owner, and registries for
//! listeners, injected styles and pre-existing menu markup. Registrations
//! return guards that unregister on drop.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::markup::MenuHandle;
use crate::selector::Selector;

/// Identifier of an element in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A point in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { origin: Point::new(x, y), size: Size::new(width, height) }
    }

    /// A zero-sized box at a point (used for pointer anchors).
    pub fn at(point: Point) -> Self {
        Self { origin: point, size: Size::default() }
    }

    pub fn left(&self) -> f32 {
        self.origin.x
    }

    pub fn top(&self) -> f32 {
        self.origin.y
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }
}

/// Who owns keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// A document element.
    Element(ElementId),
    /// The popup menu itself.
    Popup,
}

/// Kinds of listeners the controller installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Native "open context menu" gesture, delegated from the root scope.
    ContextMenu,
    /// Press-and-hold gesture, delegated from the root scope.
    TapHold,
    /// Text selection start on trigger elements.
    SelectStart,
    /// Document-wide key presses.
    KeyDown,
    /// Document-wide mouse presses.
    PointerDown,
    /// Document-wide touch starts.
    TouchStart,
    /// Native context menu requests on the popup itself.
    PopupContextMenu,
}

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScope {
    /// The whole document.
    Document,
    /// A single element subtree.
    Element(ElementId),
    /// The popup menu structure.
    Popup,
}

#[derive(Debug)]
struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<ElementId>,
    rect: Rect,
}

#[derive(Debug)]
struct ListenerRecord {
    key: u64,
    scope: ListenerScope,
    kind: ListenerKind,
    namespace: String,
}

struct DocumentInner {
    elements: Vec<Element>,
    focused: Option<FocusTarget>,
    viewport: Size,
    listeners: Vec<ListenerRecord>,
    styles: Vec<(u64, String)>,
    markups: HashMap<String, MenuHandle>,
    next_key: u64,
    next_uid: u64,
    next_namespace: u64,
}

impl DocumentInner {
    fn next_key(&mut self) -> u64 {
        self.next_key += 1;
        self.next_key
    }
}

/// Handle to a headless document. Clones share the same tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("elements", &inner.elements.len())
            .field("listeners", &inner.listeners.len())
            .field("styles", &inner.styles.len())
            .field("focused", &inner.focused)
            .finish()
    }
}

impl Document {
    /// Create a document with the given viewport size.
    ///
    /// The tree starts with the document node and a `<body>` child.
    pub fn new(viewport: Size) -> Self {
        let document = Element {
            tag: "#document".to_string(),
            id: None,
            classes: Vec::new(),
            parent: None,
            rect: Rect { origin: Point::default(), size: viewport },
        };
        let body = Element {
            tag: "body".to_string(),
            id: None,
            classes: Vec::new(),
            parent: Some(ElementId(0)),
            rect: Rect { origin: Point::default(), size: viewport },
        };
        Self {
            inner: Rc::new(RefCell::new(DocumentInner {
                elements: vec![document, body],
                focused: None,
                viewport,
                listeners: Vec::new(),
                styles: Vec::new(),
                markups: HashMap::new(),
                next_key: 0,
                next_uid: 0,
                next_namespace: 0,
            })),
        }
    }

    // ========== Tree ==========

    /// The document node itself.
    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    /// The `<body>` element.
    pub fn body(&self) -> ElementId {
        ElementId(1)
    }

    /// Whether `id` refers to the document node.
    pub fn is_document(&self, id: ElementId) -> bool {
        id == self.root()
    }

    /// Whether `id` exists in this document.
    pub fn contains_element(&self, id: ElementId) -> bool {
        id.0 < self.inner.borrow().elements.len()
    }

    /// Append a new element under `parent`.
    pub fn create_element(&self, parent: ElementId, tag: &str) -> ElementId {
        let mut inner = self.inner.borrow_mut();
        let id = ElementId(inner.elements.len());
        inner.elements.push(Element {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            parent: Some(parent),
            rect: Rect::default(),
        });
        id
    }

    /// Take `element` and its subtree out of the tree.
    ///
    /// The id stays valid but no longer lies under the document, so
    /// delegation and `contains` stop seeing it.
    pub fn detach(&self, element: ElementId) {
        if element.0 <= self.body().0 {
            return;
        }
        if let Some(el) = self.inner.borrow_mut().elements.get_mut(element.0) {
            el.parent = None;
        }
    }

    /// Set the `id` attribute.
    pub fn set_id(&self, element: ElementId, id: &str) {
        if let Some(el) = self.inner.borrow_mut().elements.get_mut(element.0) {
            el.id = Some(id.to_string());
        }
    }

    /// The `id` attribute, if any.
    pub fn id_attr(&self, element: ElementId) -> Option<String> {
        self.inner.borrow().elements.get(element.0).and_then(|el| el.id.clone())
    }

    /// Return the element's id, assigning a generated `ui-id-N` when missing.
    pub fn unique_id(&self, element: ElementId) -> String {
        let mut inner = self.inner.borrow_mut();
        if let Some(id) = inner.elements.get(element.0).and_then(|el| el.id.clone()) {
            return id;
        }
        inner.next_uid += 1;
        let generated = format!("ui-id-{}", inner.next_uid);
        if let Some(el) = inner.elements.get_mut(element.0) {
            el.id = Some(generated.clone());
        }
        generated
    }

    /// Find an element by its `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.inner
            .borrow()
            .elements
            .iter()
            .position(|el| el.id.as_deref() == Some(id))
            .map(ElementId)
    }

    /// Lowercase tag name.
    pub fn tag(&self, element: ElementId) -> Option<String> {
        self.inner.borrow().elements.get(element.0).map(|el| el.tag.clone())
    }

    pub fn add_class(&self, element: ElementId, class: &str) {
        if let Some(el) = self.inner.borrow_mut().elements.get_mut(element.0) {
            if !el.classes.iter().any(|c| c == class) {
                el.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&self, element: ElementId, class: &str) {
        if let Some(el) = self.inner.borrow_mut().elements.get_mut(element.0) {
            el.classes.retain(|c| c != class);
        }
    }

    pub fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.inner
            .borrow()
            .elements
            .get(element.0)
            .is_some_and(|el| el.classes.iter().any(|c| c == class))
    }

    /// Parent element, `None` for the document node.
    pub fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.inner.borrow().elements.get(element.0).and_then(|el| el.parent)
    }

    /// Whether `element` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: ElementId, element: ElementId) -> bool {
        let mut current = Some(element);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest ancestor-or-self of `target` matching `selector` that lies
    /// strictly inside `root` (event delegation).
    pub fn closest_within(
        &self,
        target: ElementId,
        root: ElementId,
        selector: &Selector,
    ) -> Option<ElementId> {
        if !self.contains_element(target) || !self.contains(root, target) {
            return None;
        }
        let mut current = Some(target);
        while let Some(id) = current {
            if id == root {
                return None;
            }
            if selector.matches(self, id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    // ========== Layout ==========

    pub fn set_rect(&self, element: ElementId, rect: Rect) {
        if let Some(el) = self.inner.borrow_mut().elements.get_mut(element.0) {
            el.rect = rect;
        }
    }

    pub fn rect(&self, element: ElementId) -> Rect {
        self.inner.borrow().elements.get(element.0).map(|el| el.rect).unwrap_or_default()
    }

    pub fn viewport(&self) -> Size {
        self.inner.borrow().viewport
    }

    pub fn set_viewport(&self, viewport: Size) {
        self.inner.borrow_mut().viewport = viewport;
    }

    // ========== Focus ==========

    pub fn focused(&self) -> Option<FocusTarget> {
        self.inner.borrow().focused
    }

    pub fn focus(&self, target: FocusTarget) {
        self.inner.borrow_mut().focused = Some(target);
    }

    pub fn blur(&self) {
        self.inner.borrow_mut().focused = None;
    }

    // ========== Listeners ==========

    /// A fresh event namespace such as `.contextmenu3`.
    pub fn next_namespace(&self) -> String {
        let mut inner = self.inner.borrow_mut();
        inner.next_namespace += 1;
        format!(".contextmenu{}", inner.next_namespace)
    }

    /// Register a listener; it stays installed until the guard is dropped.
    pub fn listen(&self, scope: ListenerScope, kind: ListenerKind, namespace: &str) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        let key = inner.next_key();
        inner.listeners.push(ListenerRecord { key, scope, kind, namespace: namespace.to_string() });
        tracing::trace!(?kind, ?scope, namespace, "Listener installed");
        ListenerGuard { document: Rc::downgrade(&self.inner), key }
    }

    /// Number of listeners registered under `namespace`.
    pub fn listener_count(&self, namespace: &str) -> usize {
        self.inner.borrow().listeners.iter().filter(|l| l.namespace == namespace).count()
    }

    /// Whether a listener of `kind` is registered under `namespace`.
    pub fn has_listener(&self, kind: ListenerKind, namespace: &str) -> bool {
        self.inner
            .borrow()
            .listeners
            .iter()
            .any(|l| l.kind == kind && l.namespace == namespace)
    }

    /// Scope of the first listener of `kind` under `namespace`.
    pub fn listener_scope(&self, kind: ListenerKind, namespace: &str) -> Option<ListenerScope> {
        self.inner
            .borrow()
            .listeners
            .iter()
            .find(|l| l.kind == kind && l.namespace == namespace)
            .map(|l| l.scope)
    }

    // ========== Styles ==========

    /// Inject a global style sheet; it is removed when the guard is dropped.
    pub fn inject_style(&self, css: impl Into<String>) -> StyleGuard {
        let mut inner = self.inner.borrow_mut();
        let key = inner.next_key();
        inner.styles.push((key, css.into()));
        StyleGuard { document: Rc::downgrade(&self.inner), key }
    }

    /// All injected style sheets in insertion order.
    pub fn styles(&self) -> Vec<String> {
        self.inner.borrow().styles.iter().map(|(_, css)| css.clone()).collect()
    }

    // ========== Pre-existing markup ==========

    /// Register host-owned menu markup under an element id.
    pub fn insert_markup(&self, id: &str, markup: MenuHandle) {
        self.inner.borrow_mut().markups.insert(id.to_string(), markup);
    }

    /// Look up registered markup by an `#id` selector.
    pub fn markup_by_selector(&self, selector: &str) -> Option<MenuHandle> {
        let id = selector.trim().strip_prefix('#')?;
        self.inner.borrow().markups.get(id).cloned()
    }
}

/// Keeps a listener installed; dropping it unregisters the listener.
#[derive(Debug)]
#[must_use = "dropping the guard removes the listener immediately"]
pub struct ListenerGuard {
    document: Weak<RefCell<DocumentInner>>,
    key: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.document.upgrade() {
            inner.borrow_mut().listeners.retain(|l| l.key != self.key);
        }
    }
}

/// Keeps an injected style sheet alive; dropping it removes the sheet.
#[derive(Debug)]
#[must_use = "dropping the guard removes the style immediately"]
pub struct StyleGuard {
    document: Weak<RefCell<DocumentInner>>,
    key: u64,
}

impl Drop for StyleGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.document.upgrade() {
            inner.borrow_mut().styles.retain(|(key, _)| *key != self.key);
        }
    }
}

//! End-to-end behaviour of the controller against a recording host.
//!
//! Covers:
//! - Row order and separator classification of compiled menus
//! - Entry mutation addressing exactly one row
//! - Vetoed, replaced and deferred opens
//! - Listener release ordering on close and destroy
//! - Selection vetoes and inert rows
//! - Menu replacement while open
//! - Locale fallback for untranslated strings

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use ctxmenu_core::locale::{LocaleCatalog, PluralRules, Translator};
    use serde_json::{json, Value};

    use crate::animation::Animation;
    use crate::context_menu::{Activation, ContextMenuController, GestureOutcome, PopupPhase};
    use crate::definition::{MenuDefinition, MenuEntry};
    use crate::document::{Document, ElementId, ListenerKind, Point, Size};
    use crate::host::{
        AfterSelect, BeforeOpen, DeferredOpen, Gesture, HitTarget, MenuHost, OpenUi, SelectUi,
    };
    use crate::key_bindings::Key;
    use crate::markup::{create_menu_markup, MenuHandle, RowPath};
    use crate::options::{ContextMenuOptions, MenuSource};

    // =========================================================================
    // Fixtures
    // =========================================================================

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Create,
        BeforeOpen(ElementId),
        Open(ElementId),
        Select(String, ElementId),
        Close,
    }

    type Decide = Box<dyn FnMut(&Gesture, &OpenUi) -> BeforeOpen>;

    #[derive(Default)]
    struct RecordingHost {
        events: Vec<Event>,
        decide: Option<Decide>,
        select_result: AfterSelect,
        last_extra: Value,
    }

    impl RecordingHost {
        fn deciding(decide: impl FnMut(&Gesture, &OpenUi) -> BeforeOpen + 'static) -> Self {
            Self { decide: Some(Box::new(decide)), ..Default::default() }
        }

        fn count(&self, event: &Event) -> usize {
            self.events.iter().filter(|e| *e == event).count()
        }

        fn selections(&self) -> usize {
            self.events.iter().filter(|e| matches!(e, Event::Select(..))).count()
        }
    }

    impl MenuHost for RecordingHost {
        fn create(&mut self, _menu: Option<&MenuHandle>) {
            self.events.push(Event::Create);
        }

        fn before_open(&mut self, gesture: &Gesture, ui: &OpenUi) -> BeforeOpen {
            self.events.push(Event::BeforeOpen(ui.target));
            match self.decide.as_mut() {
                Some(decide) => decide(gesture, ui),
                None => BeforeOpen::Proceed,
            }
        }

        fn open(&mut self, _gesture: &Gesture, ui: &OpenUi) {
            self.last_extra = ui.extra_data.clone();
            self.events.push(Event::Open(ui.target));
        }

        fn select(&mut self, ui: &SelectUi) -> AfterSelect {
            self.events.push(Event::Select(ui.command.clone(), ui.target));
            self.select_result
        }

        fn close(&mut self) {
            self.events.push(Event::Close);
        }
    }

    struct Page {
        doc: Document,
        list: ElementId,
        rows: Vec<ElementId>,
        outside: ElementId,
    }

    fn page() -> Page {
        let doc = Document::new(Size::new(1024.0, 768.0));
        let list = doc.create_element(doc.body(), "ul");
        doc.set_id(list, "torrent_list");
        let rows = (0..3)
            .map(|i| {
                let row = doc.create_element(list, "li");
                doc.add_class(row, "torrent");
                doc.set_rect(row, crate::document::Rect::new(0.0, i as f32 * 40.0, 600.0, 40.0));
                row
            })
            .collect();
        let outside = doc.create_element(doc.body(), "div");
        Page { doc, list, rows, outside }
    }

    fn scenario_a() -> MenuDefinition {
        MenuDefinition::from_json(
            r#"[
                {"cmd": "open", "title": "Open"},
                {"cmd": "sep", "title": "-"},
                {"cmd": "del", "title": "Delete", "disabled": true}
            ]"#,
        )
        .unwrap()
    }

    fn torrent_menu() -> MenuDefinition {
        MenuDefinition::new(vec![
            MenuEntry::command("pause-selected", "Pause"),
            MenuEntry::command("resume-selected", "Resume"),
            MenuEntry::separator(),
            MenuEntry::submenu("queue", "Queue", vec![
                MenuEntry::command("move-top", "Move to Top"),
                MenuEntry::command("move-up", "Move Up"),
            ]),
            MenuEntry::command("remove", "Remove From List..."),
        ])
    }

    fn instant() -> ContextMenuOptions {
        ContextMenuOptions::default().without_animations()
    }

    fn bind(
        page: &Page,
        menu: impl Into<MenuSource>,
        options: ContextMenuOptions,
        host: RecordingHost,
    ) -> ContextMenuController<RecordingHost> {
        ContextMenuController::new(page.doc.clone(), page.doc.body(), ".torrent", menu, options, host)
            .unwrap()
    }

    fn right_click(target: ElementId) -> Gesture {
        Gesture::context_menu(target, Point::new(120.0, 80.0))
    }

    fn dismissal_installed(controller: &ContextMenuController<RecordingHost>) -> bool {
        let ns = controller.namespace();
        let doc = controller.document();
        doc.has_listener(ListenerKind::KeyDown, ns)
            || doc.has_listener(ListenerKind::PointerDown, ns)
            || doc.has_listener(ListenerKind::TouchStart, ns)
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    #[test]
    fn test_row_order_is_preserved_recursively() {
        let def = torrent_menu();
        let markup = create_menu_markup(&def);

        let titles: Vec<_> = markup.rows().iter().map(|r| r.title().unwrap_or("-")).collect();
        assert_eq!(titles, vec!["Pause", "Resume", "-", "Queue", "Remove From List..."]);
        let nested: Vec<_> = markup.rows()[3].children().iter().filter_map(|r| r.command()).collect();
        assert_eq!(nested, vec!["move-top", "move-up"]);

        // compiling twice yields the same structure
        let again = create_menu_markup(&def);
        assert_eq!(format!("{:?}", markup.rows()), format!("{:?}", again.rows()));
    }

    #[test]
    fn test_dash_titles_compile_to_inert_separators() {
        let def = MenuDefinition::from_json(
            r#"[
                {"cmd": "x", "title": " —–- ", "uiIcon": "ui-icon-x", "disabled": false,
                 "children": [{"cmd": "y", "title": "Y"}]},
                {"cmd": "z", "title": "Z"}
            ]"#,
        )
        .unwrap();
        let markup = create_menu_markup(&def);
        assert!(markup.rows()[0].is_separator());
        assert!(!markup.rows()[0].has_popup());
        assert_eq!(markup.find("x"), None);
        assert_eq!(markup.find("y"), None);

        let page = page();
        let mut controller = bind(&page, def, instant(), RecordingHost::default());
        controller.open(page.rows[0], Value::Null);
        assert_eq!(controller.activate(&RowPath::root(0)), Activation::Inert);
        assert_eq!(controller.host().selections(), 0);
        assert!(controller.is_open());
    }

    #[test]
    fn test_built_submenu_with_dash_title_is_separator() {
        let def = MenuDefinition::new(vec![
            MenuEntry::command("open", "Open"),
            MenuEntry::submenu("queue", "---", vec![MenuEntry::command("move-top", "Move to Top")]),
        ]);
        let markup = create_menu_markup(&def);
        assert!(markup.rows()[1].is_separator());
        assert!(!markup.rows()[1].has_popup());
        assert!(markup.rows()[1].children().is_empty());
        assert_eq!(markup.find("queue"), None);
        assert_eq!(markup.find("move-top"), None);

        let page = page();
        let mut controller = bind(&page, def, instant(), RecordingHost::default());
        controller.open(page.rows[0], Value::Null);
        assert_eq!(controller.activate(&RowPath::root(1)), Activation::Inert);
        assert_eq!(controller.host().selections(), 0);
        assert!(controller.is_open());
    }

    #[test]
    fn test_mutations_touch_exactly_one_row() {
        let page = page();
        let mut controller = bind(&page, torrent_menu(), instant(), RecordingHost::default());
        let menu = controller.menu().unwrap();
        let snapshot = |menu: &MenuHandle| format!("{:?}", menu.borrow().rows());
        let before = snapshot(&menu);

        assert!(controller.enable_entry("move-up", false));
        assert!(controller.show_entry("remove", false));
        assert!(controller.set_entry("pause-selected", "Pause All"));

        let markup = menu.borrow();
        assert!(markup.row(&RowPath::from_indices(&[3, 1])).unwrap().is_disabled());
        assert!(!markup.row(&RowPath::from_indices(&[3, 0])).unwrap().is_disabled());
        assert!(markup.rows()[4].is_hidden());
        assert_eq!(markup.rows()[0].title(), Some("Pause All"));
        assert_eq!(markup.rows()[1].title(), Some("Resume"));
        assert!(!markup.rows()[1].is_hidden() && !markup.rows()[1].is_disabled());
        drop(markup);

        // restoring the three rows gives back the original structure
        controller.enable_entry("move-up", true);
        controller.show_entry("remove", true);
        controller.set_entry("pause-selected", "Pause");
        assert_eq!(snapshot(&menu), before);

        assert!(!controller.enable_entry("no-such-command", true));
    }

    #[test]
    fn test_set_entry_with_children_rebuilds_submenu() {
        let page = page();
        let mut controller = bind(&page, torrent_menu(), instant(), RecordingHost::default());
        let entry = MenuEntry::submenu("remove", "Remove", vec![
            MenuEntry::command("remove-list", "From List"),
            MenuEntry::command("remove-data", "And Delete Data"),
        ]);
        assert!(controller.set_entry("remove", entry));

        let menu = controller.menu().unwrap();
        assert_eq!(menu.borrow().find("remove-data"), Some(RowPath::from_indices(&[4, 1])));
        assert!(menu.borrow().rows()[4].has_popup());
    }

    // =========================================================================
    // Opening
    // =========================================================================

    #[test]
    fn test_native_gesture_opens_on_matching_descendant_only() {
        let page = page();
        let mut controller = bind(&page, torrent_menu(), instant(), RecordingHost::default());

        let outcome = controller.handle_gesture(right_click(page.outside));
        assert_eq!(outcome, GestureOutcome::Ignored);
        assert!(!outcome.suppresses_native());
        assert!(controller.host().events.iter().all(|e| !matches!(e, Event::BeforeOpen(_))));

        let span = page.doc.create_element(page.rows[1], "span");
        let outcome = controller.handle_gesture(right_click(span));
        assert_eq!(outcome, GestureOutcome::Opened);
        assert!(outcome.suppresses_native());
        // the delegate element, not the raw target, is the current target
        assert_eq!(controller.current_target(), Some(page.rows[1]));
        assert_eq!(controller.position(), Some(Point::new(120.0, 80.0)));
        assert!(controller.menu().unwrap().borrow().is_visible());
        assert_eq!(
            controller.host().events,
            vec![Event::Create, Event::BeforeOpen(page.rows[1]), Event::Open(page.rows[1])]
        );
    }

    #[test]
    fn test_programmatic_open_carries_extra_data() {
        let page = page();
        let mut controller = bind(&page, torrent_menu(), instant(), RecordingHost::default());
        let outcome = controller.open(page.rows[2], json!({"source": "toolbar"}));
        assert_eq!(outcome, GestureOutcome::Opened);
        assert_eq!(controller.host().last_extra, json!({"source": "toolbar"}));
        // without page coordinates the popup sits below the target
        assert_eq!(controller.position(), Some(Point::new(0.0, 120.0)));
    }

    #[test]
    fn test_auto_trigger_off_requires_manual_open() {
        let page = page();
        let options = ContextMenuOptions { auto_trigger: false, ..instant() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());
        assert_eq!(controller.handle_gesture(right_click(page.rows[0])), GestureOutcome::Ignored);
        assert_eq!(controller.open(page.rows[0], Value::Null), GestureOutcome::Opened);
    }

    #[test]
    fn test_taphold_is_a_trigger_only_when_enabled() {
        let page = page();
        let mut plain = bind(&page, torrent_menu(), instant(), RecordingHost::default());
        let hold = Gesture::taphold(page.rows[0], Point::new(10.0, 10.0));
        assert_eq!(plain.handle_gesture(hold.clone()), GestureOutcome::Ignored);

        let options = ContextMenuOptions { taphold: true, ..instant() };
        let mut touch = bind(&page, torrent_menu(), options, RecordingHost::default());
        assert_eq!(touch.handle_gesture(hold), GestureOutcome::Opened);
    }

    #[test]
    fn test_veto_leaves_controller_closed() {
        let page = page();
        let host = RecordingHost::deciding(|_, _| BeforeOpen::Veto);
        let mut controller = bind(&page, torrent_menu(), instant(), host);

        let outcome = controller.handle_gesture(right_click(page.rows[0]));
        assert_eq!(outcome, GestureOutcome::Vetoed);
        assert!(outcome.suppresses_native());
        assert_eq!(controller.state(), PopupPhase::Closed);
        assert!(!controller.is_open());
        assert!(!dismissal_installed(&controller));
        assert_eq!(controller.host().count(&Event::Open(page.rows[0])), 0);
        assert_eq!(controller.host().count(&Event::Close), 0);
        assert!(!controller.menu().unwrap().borrow().is_visible());
    }

    #[test]
    fn test_before_open_can_replace_menu_for_this_open() {
        let page = page();
        let host = RecordingHost::deciding(|_, _| {
            BeforeOpen::Replace(MenuSource::Definition(MenuDefinition::new(vec![
                MenuEntry::command("verify", "Verify Local Data"),
            ])))
        });
        let mut controller = bind(&page, torrent_menu(), instant(), host);
        controller.handle_gesture(right_click(page.rows[0]));

        assert!(controller.is_open());
        let menu = controller.menu().unwrap();
        assert_eq!(menu.borrow().rows().len(), 1);
        assert_eq!(controller.activate(&RowPath::root(0)), Activation::Closed);
        assert_eq!(
            controller.host().events.last(),
            Some(&Event::Close)
        );
        assert!(controller
            .host()
            .events
            .contains(&Event::Select("verify".to_string(), page.rows[0])));
    }

    #[test]
    fn test_deferred_open_waits_for_resolution() {
        let page = page();
        let resolvers = Rc::new(RefCell::new(Vec::new()));
        let sink = resolvers.clone();
        let host = RecordingHost::deciding(move |_, _| {
            let (resolver, deferred) = DeferredOpen::channel();
            sink.borrow_mut().push(resolver);
            BeforeOpen::Defer(deferred)
        });
        let mut controller = bind(&page, torrent_menu(), instant(), host);

        assert_eq!(controller.handle_gesture(right_click(page.rows[0])), GestureOutcome::Deferred);
        assert_eq!(controller.state(), PopupPhase::Closed);
        assert!(!controller.menu().unwrap().borrow().is_visible());
        assert!(!dismissal_installed(&controller));
        assert_eq!(controller.poll_deferred(), None);

        let resolver = resolvers.borrow_mut().remove(0);
        resolver.resolve();
        assert_eq!(controller.poll_deferred(), Some(GestureOutcome::Opened));
        assert!(controller.menu().unwrap().borrow().is_visible());
        assert!(dismissal_installed(&controller));
        // the resumed open does not ask again
        assert_eq!(controller.host().count(&Event::BeforeOpen(page.rows[0])), 1);
        assert_eq!(controller.host().count(&Event::Open(page.rows[0])), 1);
    }

    #[test]
    fn test_unresolved_deferral_never_opens_or_leaks() {
        let page = page();
        let resolvers = Rc::new(RefCell::new(Vec::new()));
        let sink = resolvers.clone();
        let host = RecordingHost::deciding(move |_, _| {
            let (resolver, deferred) = DeferredOpen::channel();
            sink.borrow_mut().push(resolver);
            BeforeOpen::Defer(deferred)
        });
        let mut controller = bind(&page, torrent_menu(), instant(), host);
        let ns = controller.namespace().to_string();
        let baseline = page.doc.listener_count(&ns);

        controller.handle_gesture(right_click(page.rows[0]));
        for _ in 0..3 {
            assert_eq!(controller.poll_deferred(), None);
        }
        assert_eq!(page.doc.listener_count(&ns), baseline);
        assert_eq!(controller.state(), PopupPhase::Closed);

        // a rejected deferral is a veto
        resolvers.borrow_mut().clear();
        assert_eq!(controller.poll_deferred(), Some(GestureOutcome::Vetoed));
        assert!(!controller.has_pending_open());

        drop(controller);
        assert_eq!(page.doc.listener_count(&ns), 0);
    }

    #[test]
    fn test_newer_gesture_supersedes_pending_deferral() {
        let page = page();
        let resolvers = Rc::new(RefCell::new(Vec::new()));
        let sink = resolvers.clone();
        let mut calls = 0;
        let host = RecordingHost::deciding(move |_, _| {
            calls += 1;
            if calls == 1 {
                let (resolver, deferred) = DeferredOpen::channel();
                sink.borrow_mut().push(resolver);
                BeforeOpen::Defer(deferred)
            } else {
                BeforeOpen::Proceed
            }
        });
        let mut controller = bind(&page, torrent_menu(), instant(), host);

        controller.handle_gesture(right_click(page.rows[0]));
        assert_eq!(controller.handle_gesture(right_click(page.rows[1])), GestureOutcome::Opened);
        assert!(!controller.has_pending_open());

        resolvers.borrow_mut().remove(0).resolve();
        assert_eq!(controller.poll_deferred(), None);
        assert_eq!(controller.current_target(), Some(page.rows[1]));
    }

    #[tokio::test]
    async fn test_settle_deferred_resumes_open() {
        let page = page();
        let resolvers = Rc::new(RefCell::new(Vec::new()));
        let sink = resolvers.clone();
        let host = RecordingHost::deciding(move |_, _| {
            let (resolver, deferred) = DeferredOpen::channel();
            sink.borrow_mut().push(resolver);
            BeforeOpen::Defer(deferred)
        });
        let mut controller = bind(&page, torrent_menu(), instant(), host);
        controller.handle_gesture(right_click(page.rows[2]));

        let resolver = resolvers.borrow_mut().remove(0);
        tokio::spawn(async move { resolver.resolve() });
        assert_eq!(controller.settle_deferred().await, Some(GestureOutcome::Opened));
        assert_eq!(controller.current_target(), Some(page.rows[2]));
        assert_eq!(controller.settle_deferred().await, None);
    }

    #[test]
    fn test_opening_while_open_abandons_prior_open() {
        let page = page();
        let mut controller = bind(&page, torrent_menu(), instant(), RecordingHost::default());
        let ns = controller.namespace().to_string();

        controller.handle_gesture(right_click(page.rows[0]));
        let with_popup = page.doc.listener_count(&ns);
        controller.handle_gesture(right_click(page.rows[1]));

        assert_eq!(controller.current_target(), Some(page.rows[1]));
        assert_eq!(controller.host().count(&Event::Close), 0);
        assert_eq!(page.doc.listener_count(&ns), with_popup);
    }

    #[test]
    fn test_show_animation_completes_on_advance() {
        let page = page();
        let options = ContextMenuOptions { hide: Animation::none(), ..Default::default() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());

        let started = Instant::now();
        assert_eq!(controller.handle_gesture(right_click(page.rows[0])), GestureOutcome::Opening);
        assert_eq!(controller.state(), PopupPhase::Opening);
        assert!(controller.is_open());
        assert!(dismissal_installed(&controller));
        assert_eq!(controller.host().count(&Event::Open(page.rows[0])), 0);

        controller.advance(started);
        assert_eq!(controller.state(), PopupPhase::Opening);
        controller.advance(started + Duration::from_secs(1));
        assert_eq!(controller.state(), PopupPhase::Open);
        assert_eq!(controller.host().count(&Event::Open(page.rows[0])), 1);
    }

    #[test]
    fn test_escape_during_show_animation_never_reports_open() {
        let page = page();
        let options = ContextMenuOptions { hide: Animation::none(), ..Default::default() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());

        controller.handle_gesture(right_click(page.rows[0]));
        assert!(controller.key_down(Key::Escape));
        assert_eq!(controller.state(), PopupPhase::Closed);

        controller.finish_animations();
        assert_eq!(controller.host().count(&Event::Open(page.rows[0])), 0);
        assert_eq!(controller.host().count(&Event::Close), 1);
    }

    // =========================================================================
    // Closing
    // =========================================================================

    #[test]
    fn test_listeners_release_before_hide_animation_completes() {
        let page = page();
        let options = ContextMenuOptions { show: Animation::none(), ..Default::default() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());
        controller.handle_gesture(right_click(page.rows[0]));
        assert_eq!(controller.state(), PopupPhase::Open);

        controller.close();
        assert_eq!(controller.state(), PopupPhase::Closing);
        assert_eq!(controller.current_target(), None);
        assert!(!controller.is_open());
        assert!(!dismissal_installed(&controller));

        // dismissal gestures during the hide animation have no effect
        assert!(!controller.key_down(Key::Escape));
        assert!(!controller.pointer_down(HitTarget::Outside));
        controller.close();
        assert_eq!(controller.host().count(&Event::Close), 0);

        controller.finish_animations();
        assert_eq!(controller.state(), PopupPhase::Closed);
        assert_eq!(controller.host().count(&Event::Close), 1);
        assert!(!controller.menu().unwrap().borrow().is_visible());
    }

    #[test]
    fn test_opening_during_hide_finishes_close_first() {
        let page = page();
        let options = ContextMenuOptions { show: Animation::none(), ..Default::default() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());
        controller.handle_gesture(right_click(page.rows[0]));
        controller.close();

        controller.handle_gesture(right_click(page.rows[1]));
        let events = &controller.host().events;
        let close = events.iter().position(|e| *e == Event::Close).unwrap();
        let reopen = events.iter().position(|e| *e == Event::BeforeOpen(page.rows[1])).unwrap();
        assert!(close < reopen);
        assert_eq!(controller.state(), PopupPhase::Open);

        // the stale hide deadline does nothing to the new popup
        controller.advance(Instant::now() + Duration::from_secs(5));
        assert_eq!(controller.state(), PopupPhase::Open);
    }

    #[test]
    fn test_pointer_down_closes_only_outside_rows() {
        let page = page();
        let mut controller = bind(&page, torrent_menu(), instant(), RecordingHost::default());
        controller.handle_gesture(right_click(page.rows[0]));

        assert!(!controller.pointer_down(HitTarget::MenuRow(RowPath::root(0))));
        assert!(!controller.pointer_down(HitTarget::MenuRow(RowPath::from_indices(&[3, 1]))));
        assert!(controller.is_open());

        // separators are not menu items
        assert!(controller.pointer_down(HitTarget::MenuRow(RowPath::root(2))));
        assert_eq!(controller.state(), PopupPhase::Closed);

        controller.handle_gesture(right_click(page.rows[0]));
        assert!(controller.pointer_down(HitTarget::Element(page.outside)));
        assert_eq!(controller.host().count(&Event::Close), 2);
    }

    // =========================================================================
    // Selection
    // =========================================================================

    #[test]
    fn test_select_veto_keeps_popup_open() {
        let page = page();
        let host = RecordingHost { select_result: AfterSelect::KeepOpen, ..Default::default() };
        let mut controller = bind(&page, torrent_menu(), instant(), host);
        controller.handle_gesture(right_click(page.rows[0]));

        assert_eq!(controller.activate(&RowPath::root(0)), Activation::KeptOpen);
        assert!(controller.is_open());

        controller.host_mut().select_result = AfterSelect::Close;
        assert_eq!(controller.activate(&RowPath::root(1)), Activation::Closed);
        assert_eq!(controller.state(), PopupPhase::Closed);
    }

    #[test]
    fn test_entry_action_runs_after_select_and_can_veto() {
        let page = page();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let def = MenuDefinition::new(vec![
            MenuEntry::command("rename", "Rename...").action(move |ui| {
                sink.borrow_mut().push(ui.command.clone());
                AfterSelect::KeepOpen
            }),
            MenuEntry::command("verify", "Verify"),
        ]);
        let mut controller = bind(&page, def, instant(), RecordingHost::default());
        controller.handle_gesture(right_click(page.rows[1]));

        assert_eq!(controller.activate(&RowPath::root(0)), Activation::KeptOpen);
        assert_eq!(*calls.borrow(), vec!["rename".to_string()]);
        // select notification came first, with the trigger target
        assert!(controller
            .host()
            .events
            .contains(&Event::Select("rename".to_string(), page.rows[1])));

        assert_eq!(controller.activate(&RowPath::root(1)), Activation::Closed);
    }

    #[test]
    fn test_parent_select_fires_when_not_ignored() {
        let page = page();
        let options = ContextMenuOptions { ignore_parent_select: false, ..instant() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());
        controller.handle_gesture(right_click(page.rows[0]));

        assert_eq!(controller.activate(&RowPath::root(3)), Activation::Closed);
        assert!(controller.host().events.contains(&Event::Select("queue".to_string(), page.rows[0])));
    }

    #[test]
    fn test_disabled_and_hidden_rows_are_inert() {
        let page = page();
        let mut controller = bind(&page, torrent_menu(), instant(), RecordingHost::default());
        controller.enable_entry("resume-selected", false);
        controller.show_entry("remove", false);
        controller.enable_entry("queue", false);
        controller.handle_gesture(right_click(page.rows[0]));

        for row in [RowPath::root(1), RowPath::root(4), RowPath::from_indices(&[3, 0]), RowPath::root(9)] {
            assert_eq!(controller.activate(&row), Activation::Inert);
        }
        assert_eq!(controller.host().selections(), 0);
        assert_eq!(controller.state(), PopupPhase::Open);
    }

    #[test]
    fn test_activation_while_closed_is_ignored() {
        let page = page();
        let mut controller = bind(&page, torrent_menu(), instant(), RecordingHost::default());
        assert_eq!(controller.activate(&RowPath::root(0)), Activation::Ignored);
        assert_eq!(controller.host().selections(), 0);
    }

    // =========================================================================
    // End-to-end
    // =========================================================================

    #[test]
    fn test_scenario_open_select_close() {
        let page = page();
        let mut controller = bind(&page, scenario_a(), instant(), RecordingHost::default());
        controller.open(page.rows[0], Value::Null);

        let menu = controller.menu().unwrap();
        {
            let markup = menu.borrow();
            assert_eq!(markup.rows().len(), 3);
            assert_eq!(markup.rows().iter().filter(|r| r.is_interactive()).count(), 1);
            assert_eq!(markup.rows().iter().filter(|r| r.is_separator()).count(), 1);
            assert!(markup.rows()[2].is_disabled());
        }

        assert_eq!(controller.activate(&RowPath::root(2)), Activation::Inert);
        assert!(controller.is_open());

        assert_eq!(controller.activate(&RowPath::root(0)), Activation::Closed);
        assert_eq!(controller.state(), PopupPhase::Closed);
        let tail = &controller.host().events[controller.host().events.len() - 2..];
        assert_eq!(tail, &[Event::Select("open".to_string(), page.rows[0]), Event::Close]);
    }

    #[test]
    fn test_scenario_replace_menu_while_open() {
        let page = page();
        // the hide animation would take 200ms if it were played
        let options = ContextMenuOptions { show: Animation::none(), ..Default::default() };
        let mut controller = bind(&page, scenario_a(), options, RecordingHost::default());
        controller.open(page.rows[0], Value::Null);
        assert_eq!(controller.state(), PopupPhase::Open);

        let replacement = MenuDefinition::new(vec![
            MenuEntry::command("start", "Start"),
            MenuEntry::command("stop", "Stop"),
        ]);
        controller.replace_menu(replacement).unwrap();

        assert_eq!(controller.state(), PopupPhase::Closed);
        assert!(controller.pending_animation().is_none());
        assert_eq!(controller.host().count(&Event::Close), 1);
        assert!(!dismissal_installed(&controller));

        controller.open(page.rows[0], Value::Null);
        let menu = controller.menu().unwrap();
        let commands: Vec<_> =
            menu.borrow().rows().iter().filter_map(|r| r.command().map(String::from)).collect();
        assert_eq!(commands, vec!["start", "stop"]);
    }

    #[test]
    fn test_scenario_untranslated_lookup_returns_source() {
        let catalog = LocaleCatalog::parse(
            r#"<TS language="de"><context><name>MainWindow</name>
                <message><source>Pause</source><translation>Anhalten</translation></message>
                <message><source>Verify Local Data</source><translation type="unfinished"></translation></message>
            </context></TS>"#,
        )
        .unwrap();
        let translator = Translator::new("de", catalog, &PluralRules::builtin());

        assert_eq!(translator.tr("MainWindow", "Pause"), "Anhalten");
        assert_eq!(translator.tr("MainWindow", "Verify Local Data"), "Verify Local Data");
        assert_eq!(translator.tr("MainWindow", "Ask Tracker for More Peers"), "Ask Tracker for More Peers");

        // translated titles flow into a compiled menu unchanged
        let def = MenuDefinition::new(vec![
            MenuEntry::command("pause-selected", translator.tr("MainWindow", "Pause")),
            MenuEntry::command("verify", translator.tr("MainWindow", "Verify Local Data")),
        ]);
        let markup = create_menu_markup(&def);
        assert_eq!(markup.rows()[1].title(), Some("Verify Local Data"));
    }

    // =========================================================================
    // Ownership and teardown
    // =========================================================================

    #[test]
    fn test_borrowed_markup_survives_replacement() {
        let page = page();
        let shared = MenuHandle::from_definition(&torrent_menu());
        page.doc.insert_markup("torrent_context_menu", shared.clone());

        let mut controller = bind(
            &page,
            MenuSource::Selector("#torrent_context_menu".to_string()),
            instant(),
            RecordingHost::default(),
        );
        assert!(!controller.owns_menu());
        assert!(shared.borrow().has_class("ui-contextmenu"));

        controller.replace_menu(scenario_a()).unwrap();
        assert!(controller.owns_menu());
        assert!(!shared.borrow().is_attached());
        assert!(!shared.borrow().has_class("ui-contextmenu"));
        assert_eq!(shared.borrow().rows().len(), 5);
    }

    #[test]
    fn test_unknown_markup_selector_is_config_error() {
        let page = page();
        let result = ContextMenuController::new(
            page.doc.clone(),
            page.doc.body(),
            ".torrent",
            MenuSource::Selector("#missing".to_string()),
            instant(),
            RecordingHost::default(),
        );
        let err = result.err().unwrap();
        assert_eq!(err.category(), "Config");
        assert_eq!(page.doc.listener_count(".contextmenu1"), 0);
    }

    #[test]
    fn test_bad_construction_inputs_fail_fast() {
        let page = page();
        let bad_selector = ContextMenuController::new(
            page.doc.clone(),
            page.doc.body(),
            "ul > li",
            torrent_menu(),
            instant(),
            RecordingHost::default(),
        );
        assert_eq!(bad_selector.err().unwrap().category(), "Selector");

        let other = Document::new(Size::new(10.0, 10.0));
        let missing_root = ContextMenuController::new(
            other,
            page.list,
            ".torrent",
            torrent_menu(),
            instant(),
            RecordingHost::default(),
        );
        assert_eq!(missing_root.err().unwrap().category(), "Config");
    }

    #[test]
    fn test_prevent_select_injects_scoped_style() {
        let page = page();
        let options = ContextMenuOptions { prevent_select: true, ..instant() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());

        let styles = page.doc.styles();
        assert_eq!(styles.len(), 1);
        assert!(styles[0].starts_with("#ui-id-1 .torrent"));
        assert!(styles[0].contains("user-select: none"));
        assert_eq!(controller.select_start(page.rows[0]), crate::NativeSelect::Suppressed);
        assert_eq!(controller.select_start(page.outside), crate::NativeSelect::Allowed);

        controller.destroy();
        assert!(page.doc.styles().is_empty());
    }

    #[test]
    fn test_destroy_while_open_releases_everything() {
        let page = page();
        let options = ContextMenuOptions { prevent_select: true, taphold: true, ..Default::default() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());
        let ns = controller.namespace().to_string();
        controller.handle_gesture(right_click(page.rows[0]));
        controller.finish_animations();
        assert_eq!(controller.state(), PopupPhase::Open);

        controller.destroy();
        assert_eq!(controller.state(), PopupPhase::Closed);
        assert_eq!(controller.host().count(&Event::Close), 1);
        assert_eq!(page.doc.listener_count(&ns), 0);
        assert!(page.doc.styles().is_empty());
        assert!(controller.menu().is_none());

        // a destroyed controller ignores everything
        assert_eq!(controller.handle_gesture(right_click(page.rows[0])), GestureOutcome::Ignored);
        assert_eq!(controller.open(page.rows[0], Value::Null), GestureOutcome::Ignored);
        controller.destroy();
        assert_eq!(controller.host().count(&Event::Close), 1);
    }

    #[test]
    fn test_drop_releases_listeners() {
        let page = page();
        let options = ContextMenuOptions { prevent_select: true, ..instant() };
        let mut controller = bind(&page, torrent_menu(), options, RecordingHost::default());
        let ns = controller.namespace().to_string();
        controller.handle_gesture(right_click(page.rows[0]));
        assert!(page.doc.listener_count(&ns) > 0);

        drop(controller);
        assert_eq!(page.doc.listener_count(&ns), 0);
        assert!(page.doc.styles().is_empty());
    }

    #[test]
    fn test_hooks_can_mutate_menu_through_handle() {
        let page = page();
        let host = RecordingHost::deciding(|_, ui| {
            ui.menu.enable_entry("resume-selected", false);
            ui.menu.set_entry("pause-selected", "Pause (3)");
            BeforeOpen::Proceed
        });
        let mut controller = bind(&page, torrent_menu(), instant(), host);
        controller.handle_gesture(right_click(page.rows[0]));

        let menu = controller.menu().unwrap();
        assert_eq!(menu.title_of("pause-selected").as_deref(), Some("Pause (3)"));
        assert_eq!(menu.is_disabled("resume-selected"), Some(true));
        assert_eq!(controller.activate(&RowPath::root(1)), Activation::Inert);
    }
}

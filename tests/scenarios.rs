//! End-to-end scenarios on headless services.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use glam::Vec2;
use spark_uikit::config::RootConfig;
use spark_uikit::input::VirtualTextInputPlatform;
use spark_uikit::lifecycle::{initialize, initializer, unsubscribe_subscriptions};
use spark_uikit::order::{GroupDependencies, GroupKey};
use spark_uikit::render::{HeadlessGpu, INSTANCE_SIZE, InstanceManager, SlotOrder};
use spark_uikit::text::uv_to_char_index;
use spark_uikit::{
    Color, Container, ElementType, Input, Inset, Listeners, ParentHandle, Properties, Root, RootServices,
    SelectionDirection, SignalExt, Subscription, Text,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (Root, VirtualTextInputPlatform) {
    init_tracing();
    let platform = VirtualTextInputPlatform::new();
    let services = RootServices::headless().with_input_platform(Rc::new(platform.clone()));
    let root = Root::with_services(RootConfig::default().with_size(400.0, 300.0), services).unwrap();
    (root, platform)
}

#[test]
fn container_padding_gives_text_its_content_box() {
    let (root, _) = setup();
    let container =
        Container::with_style(Properties::new().with("width", 100).with("height", 50).with("padding", 10));
    container.set_parent(Some(root.as_parent()));
    let text = Text::new("Hi");
    text.set_parent(Some(container.as_parent()));

    root.frame().unwrap();

    let parent = container.internals().unwrap();
    let state = parent.node.state();
    assert_eq!(state.size.peek(), Vec2::new(100.0, 50.0));
    assert_eq!(state.padding_inset.peek(), Inset::uniform(10.0));
    let padding = state.padding_inset.peek();
    let content = state.size.peek() - Vec2::new(padding.horizontal(), padding.vertical());
    assert_eq!(content, Vec2::new(80.0, 30.0));

    let child = text.internals().unwrap();
    let size = child.node.state().size.peek();
    assert!((size.x - 80.0).abs() < 1e-3, "stretched to the content width, got {size}");
    assert!(size.y <= 30.0 + 1e-3);

    let glyphs = child.text.unwrap().order_info.peek();
    let background = parent.order_info.peek();
    assert_eq!(glyphs.element_type, ElementType::Text);
    assert_eq!(glyphs.cmp_draw_order(&background), Ordering::Greater);
}

#[test]
fn typing_into_uncontrolled_input_updates_value_once() {
    let (root, platform) = setup();
    let input = Input::new();
    input.set_properties(Properties::new().with("defaultValue", "abc"));
    let changes: Rc<RefCell<Vec<String>>> = Rc::default();
    {
        let changes = changes.clone();
        input.set_listeners(Listeners {
            on_value_change: Some(Rc::new(move |value: &str| changes.borrow_mut().push(value.to_string()))),
            ..Listeners::default()
        });
    }
    input.set_parent(Some(root.as_parent()));
    root.frame().unwrap();
    assert_eq!(input.value(), "abc");

    input.focus(3, 3, SelectionDirection::None);
    assert!(input.has_focus());
    assert!(platform.type_text("d"));

    assert_eq!(input.value(), "abcd");
    assert_eq!(*changes.borrow(), vec!["abcd".to_string()]);
    assert_eq!(input.surface().unwrap().value(), "abcd");
}

#[test]
fn bound_input_value_wins_over_edits() {
    let (root, platform) = setup();
    let input = Input::new();
    input.set_properties(Properties::new().with("value", "fixed"));
    input.set_parent(Some(root.as_parent()));
    root.frame().unwrap();

    input.focus(5, 5, SelectionDirection::None);
    platform.type_text("!");
    assert_eq!(input.value(), "fixed");
    assert_eq!(input.surface().unwrap().value(), "fixed");
}

#[test]
fn pointer_down_outside_blurs_focused_input() {
    let (root, platform) = setup();
    let input = Input::new();
    input.set_style(Properties::new().with("width", 100).with("height", 20), true);
    input.set_parent(Some(root.as_parent()));
    root.frame().unwrap();

    input.focus(0, 0, SelectionDirection::None);
    assert!(platform.focused().is_some());

    // root is 400x300 centered on the origin and the input sits in its top-left corner
    root.dispatch_pointer(spark_uikit::PointerInput::down(1, Vec2::new(150.0, -140.0)));
    assert!(!input.has_focus());
}

#[test]
fn midpoint_uv_maps_to_midpoint_char() {
    let (root, _) = setup();
    let text = Text::new("0123456789");
    text.set_style(Properties::new().with("width", 100).with("fontSize", 10), true);
    text.set_parent(Some(root.as_parent()));
    root.frame().unwrap();

    let internals = text.internals().unwrap().text.unwrap();
    let (layout, text_box) = (internals.layout.peek(), internals.text_box.peek());
    assert_eq!(text_box.size.x, 100.0);

    let index = uv_to_char_index(&text_box, Vec2::new(0.5, 0.5), &layout);
    let (x, _) = layout.char_position(index);
    let advance = 10.0 * spark_uikit::text::MONOSPACE_ADVANCE;
    assert!((x - 50.0).abs() <= advance, "boundary {index} at {x}");
}

#[test]
fn equal_dependencies_share_a_group_key() {
    let (root, _) = setup();
    let style = || Properties::new().with("width", 20).with("height", 20).with("backgroundColor", "red");
    let a = Container::with_style(style());
    let b = Container::with_style(style());
    a.set_parent(Some(root.as_parent()));
    b.set_parent(Some(root.as_parent()));
    root.frame().unwrap();

    let key_a = a.internals().unwrap().order_info.peek().group_key;
    let key_b = b.internals().unwrap().order_info.peek().group_key;
    assert_eq!(key_a, key_b);

    b.set_style(Properties::new().with("materialClass", "phong"), false);
    let key_b = b.internals().unwrap().order_info.peek().group_key;
    assert_ne!(key_a, key_b);
}

#[test]
fn siblings_in_one_group_draw_in_element_order_after_visibility_toggles() {
    let (root, _) = setup();
    let style = |color: &str| {
        Properties::new()
            .with("positionType", "absolute")
            .with("width", 20)
            .with("height", 20)
            .with("backgroundColor", color)
            .with("visibility", "hidden")
    };
    let a = Container::with_style(style("red"));
    let b = Container::with_style(style("blue"));
    a.set_parent(Some(root.as_parent()));
    b.set_parent(Some(root.as_parent()));
    root.frame().unwrap();

    let order_a = a.internals().unwrap().order_info.peek();
    let order_b = b.internals().unwrap().order_info.peek();
    assert_eq!(order_a.group_key, order_b.group_key);
    assert!(order_a.sequence < order_b.sequence);

    // B takes the lower slot because it becomes visible first.
    b.set_style(Properties::new().with("visibility", "visible"), false);
    root.frame().unwrap();
    a.set_style(Properties::new().with("visibility", "visible"), false);
    root.frame().unwrap();

    let colors: Vec<[f32; 4]> =
        root.instances().drawn_instances(&order_a.group_key).iter().map(|instance| instance.color).collect();
    assert_eq!(colors, vec![Color::RED.to_array(), Color::BLUE.to_array()]);
}

#[test]
fn released_slots_are_reused_before_growing() {
    init_tracing();
    let config = RootConfig::default().with_initial_group_capacity(4);
    let manager = InstanceManager::new(Rc::new(HeadlessGpu::new(INSTANCE_SIZE)), &config);
    let key = GroupKey { z_index_class: 0, element_type: ElementType::Panel, deps: GroupDependencies::default() };

    let mut handles: Vec<_> = (0..4).map(|i| manager.acquire_slot(&key, SlotOrder::new(i, 0)).unwrap()).collect();
    let mut released: Vec<u32> = Vec::new();
    for handle in handles.drain(1..3) {
        released.push(handle.slot());
        manager.release_slot(handle);
    }

    let mut reused: Vec<u32> = (0..2).map(|_| manager.acquire_slot(&key, SlotOrder::default()).unwrap().slot()).collect();
    reused.sort_unstable();
    assert_eq!(reused, released);
    assert_eq!(manager.group_capacity(&key), Some(4));

    let grown = manager.acquire_slot(&key, SlotOrder::default()).unwrap();
    assert_eq!(grown.slot(), 4);
    assert_eq!(manager.group_capacity(&key), Some(8));
}

#[test]
fn subscriptions_tear_down_in_reverse() {
    init_tracing();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let push = |name: &'static str| {
        let log = log.clone();
        Subscription::new(move || log.borrow_mut().push(name))
    };
    let (ta, tb, tc) = (push("ta"), push("tb"), push("tc"));
    let (tb1, tb2) = (push("tb1"), push("tb2"));

    let mut subscriptions = Vec::new();
    initialize(
        vec![
            initializer(move |_| Some(ta)),
            initializer(move |subs| {
                subs.push(tb1);
                subs.push(tb2);
                Some(tb)
            }),
            initializer(move |_| Some(tc)),
        ],
        &mut subscriptions,
    );
    assert_eq!(unsubscribe_subscriptions(&mut subscriptions), 0);
    assert_eq!(*log.borrow(), vec!["tc", "tb", "tb2", "tb1", "ta"]);
}

use futures::executor::block_on;
use futures::future::{self, FutureExt};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use sylva_core::{
    LoadError, LoadFailurePolicy, LoadFuture, LoadOutcome, LoaderState, NodeKey, NodeView,
    TreeConfig, TreeEvent, TreeOptions, TreeStore,
};

fn key(value: &str) -> NodeKey {
    NodeKey::from(value)
}

fn keys(values: &[&str]) -> Vec<NodeKey> {
    values.iter().map(|value| key(value)).collect()
}

fn fixed_loader(node: &NodeView<'_>) -> LoadFuture {
    let result = match node.key.as_str() {
        "lazy" => Ok(vec![json!({"value": "lazy-1"}), json!({"value": "lazy-2"})]),
        "broken" => Err(LoadError::Fetch("connection reset".to_string())),
        "garbage" => Ok(vec![json!("not a node")]),
        _ => Ok(Vec::new()),
    };
    future::ready(result).boxed_local()
}

fn lazy_options() -> TreeOptions {
    TreeOptions {
        lazy: true,
        ..TreeOptions::default()
    }
}

fn setup_with(config: TreeConfig) -> TreeStore {
    TreeStore::with_data(
        config,
        vec![
            json!({"value": "lazy", "label": "Lazy", "children": true}),
            json!({"value": "empty", "children": true}),
            json!({"value": "broken", "children": true}),
            json!({"value": "garbage", "children": true}),
        ],
    )
    .unwrap()
}

fn setup(options: TreeOptions) -> TreeStore {
    setup_with(TreeConfig::new(options).with_loader(fixed_loader))
}

/// Resolves every parked fetch once, returning the outcomes in order.
fn drive(store: &mut TreeStore) -> Vec<Option<LoadOutcome>> {
    store
        .take_pending_loads()
        .into_iter()
        .map(|pending| {
            let completion = block_on(pending.resolve());
            store.complete_load(completion)
        })
        .collect()
}

#[test]
fn lazy_node_waits_for_expansion() {
    let store = setup(lazy_options());

    assert!(!store.has_pending_loads());
    assert!(!store.is_loading(&key("lazy")));
    assert!(!store.is_leaf(&key("lazy")));
    assert_eq!(store.loader_state(&key("lazy")), Some(LoaderState::Unloaded));
}

#[test]
fn expanding_starts_one_fetch_and_appends_children() {
    let mut store = setup(lazy_options());

    store.set_expanded(&key("lazy"), true);

    assert!(store.is_loading(&key("lazy")));
    assert_eq!(store.loader_state(&key("lazy")), Some(LoaderState::Loading));
    assert!(!store.load_children(&key("lazy")));
    let pending = store.take_pending_loads();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].key(), &key("lazy"));

    let completion = block_on(pending.into_iter().next().unwrap().resolve());
    assert_eq!(store.complete_load(completion), Some(LoadOutcome::Loaded));

    assert!(!store.is_loading(&key("lazy")));
    assert_eq!(store.loader_state(&key("lazy")), Some(LoaderState::Loaded));
    assert_eq!(store.children(&key("lazy")), keys(&["lazy-1", "lazy-2"]).as_slice());
    assert!(store.is_visible(&key("lazy-1")));
    assert!(store.is_last(&key("lazy-2")));

    // Loaded nodes do not fetch again.
    store.set_expanded(&key("lazy"), false);
    store.set_expanded(&key("lazy"), true);
    assert!(!store.has_pending_loads());
}

#[test]
fn empty_result_settles_on_no_children() {
    let mut store = setup(lazy_options());
    store.set_expanded(&key("empty"), true);

    assert_eq!(drive(&mut store), vec![Some(LoadOutcome::NoChildren)]);

    assert_eq!(store.loader_state(&key("empty")), Some(LoaderState::NoChildren));
    assert!(store.is_leaf(&key("empty")));
    assert!(!store.is_loading(&key("empty")));
}

#[test]
fn failed_fetch_is_retried_by_default() {
    let mut store = setup(lazy_options());
    store.set_expanded(&key("broken"), true);

    assert_eq!(drive(&mut store), vec![Some(LoadOutcome::Failed)]);

    assert!(!store.is_loading(&key("broken")));
    assert_eq!(store.loader_state(&key("broken")), Some(LoaderState::Unloaded));
    assert!(!store.is_leaf(&key("broken")));
    assert!(store.is_expanded(&key("broken")));

    // Expanding again, while still expanded, fetches again.
    store.set_expanded(&key("broken"), true);
    assert!(store.has_pending_loads());
    assert!(store.is_loading(&key("broken")));
    assert_eq!(drive(&mut store), vec![Some(LoadOutcome::Failed)]);
}

#[test]
fn repeated_expand_of_a_loaded_node_does_not_fetch() {
    let mut store = setup(lazy_options());
    store.set_expanded(&key("lazy"), true);
    drive(&mut store);

    store.set_expanded(&key("lazy"), true);

    assert!(!store.has_pending_loads());
    assert_eq!(store.children(&key("lazy")).len(), 2);
}

#[test]
fn failed_fetch_can_settle_on_no_children() {
    let mut store = setup(TreeOptions {
        load_failure: LoadFailurePolicy::NoChildren,
        ..lazy_options()
    });
    store.set_expanded(&key("broken"), true);
    store.set_expanded(&key("garbage"), true);

    assert_eq!(
        drive(&mut store),
        vec![Some(LoadOutcome::Failed), Some(LoadOutcome::Failed)]
    );

    for settled in ["broken", "garbage"] {
        assert_eq!(store.loader_state(&key(settled)), Some(LoaderState::NoChildren));
        assert!(store.is_leaf(&key(settled)));
    }
    assert_eq!(store.len(), 4);
}

#[test]
fn every_completed_attempt_emits_a_load_event() {
    let events: Rc<RefCell<Vec<TreeEvent>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let mut store = setup_with(
        TreeConfig::new(lazy_options())
            .with_loader(fixed_loader)
            .with_observer(move |event: &TreeEvent| sink.borrow_mut().push(event.clone())),
    );
    store.set_expanded(&key("lazy"), true);
    store.set_expanded(&key("broken"), true);
    drive(&mut store);

    let loads: Vec<(NodeKey, usize, LoadOutcome)> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            TreeEvent::Load { key, data, outcome } => Some((key.clone(), data.len(), *outcome)),
            TreeEvent::Updated => None,
        })
        .collect();
    assert_eq!(
        loads,
        vec![
            (key("lazy"), 2, LoadOutcome::Loaded),
            (key("broken"), 0, LoadOutcome::Failed),
        ]
    );
}

#[test]
fn eager_mode_loads_during_construction() {
    let mut store = setup(TreeOptions::default());

    assert!(store.has_pending_loads());
    assert!(store.is_loading(&key("lazy")));

    let completed = block_on(store.run_pending_loads());

    assert_eq!(completed, 4);
    assert!(!store.has_pending_loads());
    assert_eq!(store.children(&key("lazy")), keys(&["lazy-1", "lazy-2"]).as_slice());
    assert!(!store.is_visible(&key("lazy-1")));
}

#[test]
fn seeded_expansion_loads_even_in_lazy_mode() {
    let store = TreeStore::with_data(
        TreeConfig::new(lazy_options()).with_loader(fixed_loader),
        vec![json!({"value": "lazy", "expanded": true, "children": true})],
    )
    .unwrap();

    assert!(store.has_pending_loads());
    assert!(store.is_loading(&key("lazy")));
}

#[test]
fn missing_loader_leaves_node_unloaded() {
    let mut store = setup_with(TreeConfig::new(lazy_options()));

    store.set_expanded(&key("lazy"), true);

    assert!(!store.has_pending_loads());
    assert!(!store.is_loading(&key("lazy")));
    assert_eq!(store.loader_state(&key("lazy")), Some(LoaderState::Unloaded));
    assert!(store.is_expanded(&key("lazy")));
}

#[test]
fn completion_for_removed_node_is_dropped() {
    let mut store = setup(lazy_options());
    store.set_expanded(&key("lazy"), true);
    let pending = store.take_pending_loads();

    store.remove(&key("lazy")).unwrap();

    let completion = block_on(pending.into_iter().next().unwrap().resolve());
    assert_eq!(store.complete_load(completion), None);
    assert!(!store.contains(&key("lazy-1")));
}

#[test]
fn removing_a_loading_node_discards_its_fetch() {
    let mut store = setup(lazy_options());
    store.set_expanded(&key("lazy"), true);
    assert!(store.has_pending_loads());

    store.remove(&key("lazy")).unwrap();

    assert!(!store.has_pending_loads());
}

#[test]
fn children_of_a_checked_node_arrive_checked() {
    let mut store = setup(TreeOptions {
        checkable: true,
        ..lazy_options()
    });
    store.set_checked(&key("lazy"), true);
    assert!(store.is_checked(&key("lazy")));

    store.set_expanded(&key("lazy"), true);
    drive(&mut store);

    assert!(store.is_checked(&key("lazy-1")));
    assert!(store.is_checked(&key("lazy-2")));
    assert!(store.is_checked(&key("lazy")));
}

use flowtrace::bridge::{Explorer, GraphUpdate, ports};
use flowtrace::render::{LayoutPoint, RenderOptions};
use flowtrace::{Action, Definition, Error, ExplorerConfig, State, StateType, Workflow};
use futures::StreamExt as _;
use futures::executor::block_on;
use serde_json::json;

fn definition() -> Definition {
    Definition::new(
        vec![
            State::new("A", StateType::Start).with_transitions(["B"]),
            State::new("B", StateType::Normal).with_transitions(["C"]),
            State::new("C", StateType::End),
        ],
        Some("A".to_string()),
    )
}

fn update() -> GraphUpdate {
    GraphUpdate::new(
        definition(),
        Some(Workflow::new(
            "B",
            vec![Action::new("A"), Action::new("B"), Action::retry("B", 1)],
        )),
    )
}

#[test]
fn run_renders_updates_in_order_until_the_port_closes() {
    let (explorer_ports, runtime) = ports();
    let mut explorer = Explorer::init(
        ExplorerConfig::empty_object(),
        Some(explorer_ports),
        RenderOptions::default(),
    );
    assert!(explorer.has_ports());

    runtime.updates.unbounded_send(update()).unwrap();
    let single = GraphUpdate::new(
        Definition::new(vec![State::new("solo", StateType::Start)], None),
        None,
    );
    runtime.updates.unbounded_send(single).unwrap();
    drop(runtime.updates);

    block_on(explorer.run());

    let graph = explorer.graph().expect("rendered");
    assert_eq!(graph.node_count(), 1);
    assert!(explorer.canvas().scene().unwrap().node("node_solo").is_some());
}

#[test]
fn clicks_are_published_and_highlighted() {
    let (explorer_ports, runtime) = ports();
    let mut explorer = Explorer::init(
        ExplorerConfig::empty_object(),
        Some(explorer_ports),
        RenderOptions::default(),
    );
    explorer.handle_update(update()).unwrap();

    assert_eq!(explorer.click_state("B").as_deref(), Some("B"));
    {
        let scene = explorer.canvas().scene().unwrap();
        assert!(scene.has_class("node_B", "selected"));
        assert!(scene.has_class("edge-A-B", "selected"));
        assert!(scene.has_class("node_B", "current-state"));
    }

    assert_eq!(explorer.click(LayoutPoint::new(1.0, 1.0)), None);
    assert!(!explorer.canvas().scene().unwrap().has_class("node_B", "selected"));

    drop(explorer);
    let published: Vec<Option<String>> = block_on(runtime.selections.collect());
    assert_eq!(published, vec![Some("B".to_string()), None]);
}

#[test]
fn missing_ports_degrade_to_a_passive_explorer() {
    let mut explorer = Explorer::init(
        ExplorerConfig::empty_object(),
        None,
        RenderOptions::default(),
    );
    assert!(!explorer.has_ports());
    block_on(explorer.run());
    assert!(explorer.graph().is_none());

    explorer.handle_update(update()).unwrap();
    assert_eq!(explorer.click_state("A").as_deref(), Some("A"));
}

#[test]
fn runtime_json_updates_apply_selection_and_current_state() {
    let raw = json!({
        "definition": {
            "name": "credit",
            "onError": "error",
            "states": [
                { "id": "begin", "type": "start", "transitions": ["check"] },
                { "id": "check", "type": "normal", "description": "Check limits",
                  "transitions": ["done"], "onFailure": "manual" },
                { "id": "manual", "type": "manual", "transitions": ["done"] },
                { "id": "done", "type": "end" },
                { "id": "error", "type": "error" }
            ]
        },
        "workflow": {
            "state": "check",
            "actions": [
                { "state": "check", "retryNo": 2 },
                { "state": "check", "retryNo": 1 },
                { "state": "begin", "retryNo": 0 }
            ]
        },
        "selected": "manual"
    });
    let update = GraphUpdate::from_json_str(&raw.to_string()).unwrap();
    let mut explorer = Explorer::init(
        ExplorerConfig::empty_object(),
        None,
        RenderOptions::default(),
    );
    explorer.handle_update(update).unwrap();

    let graph = explorer.graph().unwrap();
    assert_eq!(graph.node("check").unwrap().retries, 2);
    assert!(graph.node("manual").unwrap().class.passive);

    let scene = explorer.canvas().scene().unwrap();
    assert!(scene.has_class("node_check", "current-state"));
    assert!(scene.has_class("node_manual", "selected"));
    assert!(scene.has_class("edge-check-manual", "selected"));
    assert!(!scene.has_class("node_check", "selected"));
}

#[test]
fn config_is_forwarded_unchanged_as_runtime_flags() {
    let config = ExplorerConfig::from_value(json!({
        "nflowApiUrl": "/nflow/api",
        "customKey": [1, 2, 3]
    }))
    .unwrap();
    let explorer = Explorer::init(config, None, RenderOptions::default());
    assert_eq!(
        explorer.runtime_flags(),
        json!({ "config": { "nflowApiUrl": "/nflow/api", "customKey": [1, 2, 3] } })
    );
}

#[test]
fn load_reads_render_options_and_aborts_on_bad_config() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = Explorer::load(tmp.path().join("nflow-explorer-config.json"), None);
    assert!(matches!(missing, Err(Error::ConfigLoad { .. })));

    let path = tmp.path().join("nflow-explorer-config.json");
    std::fs::write(&path, r#"{"graph": {"width": 720, "maxZoom": 2}}"#).unwrap();
    let explorer = Explorer::load(&path, None).unwrap();
    assert_eq!(explorer.canvas().options().available_width, 720.0);
    assert_eq!(explorer.canvas().options().max_zoom, 2.0);
    assert_eq!(explorer.config().get_f64("graph.width"), Some(720.0));
}

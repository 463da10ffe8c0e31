//! Bridge between a reactive UI runtime and the renderer.
//!
//! The runtime talks to the explorer through two one-directional ports: graph updates come in,
//! selected state ids go out. Updates are rendered strictly one after another.

use crate::render::{Canvas, LayoutPoint, RenderOptions, mark_current_state, mark_state_selected};
use crate::{Definition, ExplorerConfig, Graph, Workflow, build_graph};
use futures::StreamExt as _;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One `(definition, workflow)` message from the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUpdate {
    pub definition: Definition,
    #[serde(default)]
    pub workflow: Option<Workflow>,
    /// State to show as selected after rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
}

impl GraphUpdate {
    pub fn new(definition: Definition, workflow: Option<Workflow>) -> Self {
        Self {
            definition,
            workflow,
            selected: None,
        }
    }

    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Explorer-side ends of the two ports.
#[derive(Debug)]
pub struct Ports {
    pub updates: UnboundedReceiver<GraphUpdate>,
    pub selections: UnboundedSender<Option<String>>,
}

/// Runtime-side ends of the two ports.
#[derive(Debug)]
pub struct RuntimePorts {
    pub updates: UnboundedSender<GraphUpdate>,
    pub selections: UnboundedReceiver<Option<String>>,
}

pub fn ports() -> (Ports, RuntimePorts) {
    let (update_tx, update_rx) = unbounded();
    let (selection_tx, selection_rx) = unbounded();
    (
        Ports {
            updates: update_rx,
            selections: selection_tx,
        },
        RuntimePorts {
            updates: update_tx,
            selections: selection_rx,
        },
    )
}

#[derive(Debug)]
pub struct Explorer {
    config: ExplorerConfig,
    canvas: Canvas,
    graph: Option<Graph>,
    updates: Option<UnboundedReceiver<GraphUpdate>>,
    selections: Option<UnboundedSender<Option<String>>>,
}

impl Explorer {
    /// Starts an explorer around an already loaded config.
    ///
    /// Without ports the explorer still renders on direct calls, but [`Explorer::run`] has
    /// nothing to consume and selections go nowhere.
    pub fn init(config: ExplorerConfig, ports: Option<Ports>, options: RenderOptions) -> Self {
        let (updates, selections) = match ports {
            Some(p) => {
                tracing::info!("Subscribing to runtime ports");
                (Some(p.updates), Some(p.selections))
            }
            None => {
                tracing::warn!(
                    "No ports defined. Ports exist only if the runtime side uses them"
                );
                (None, None)
            }
        };
        Self {
            config,
            canvas: Canvas::new(options),
            graph: None,
            updates,
            selections,
        }
    }

    /// Loads the config file and starts an explorer with render options taken from it.
    ///
    /// A config that cannot be read or parsed aborts startup.
    pub fn load(path: impl AsRef<Path>, ports: Option<Ports>) -> crate::Result<Self> {
        let config = ExplorerConfig::load(path.as_ref()).inspect_err(|err| {
            tracing::error!(path = %path.as_ref().display(), error = %err, "Can't load explorer config");
        })?;
        let options = RenderOptions::from_config(&config);
        Ok(Self::init(config, ports, options))
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Startup flags handed to the runtime: `{"config": <config>}`.
    pub fn runtime_flags(&self) -> serde_json::Value {
        self.config.runtime_flags()
    }

    pub fn has_ports(&self) -> bool {
        self.updates.is_some() || self.selections.is_some()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Graph of the most recent successful update.
    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    /// Rebuilds the graph, repaints the canvas and reapplies current-state and selection marks.
    pub fn handle_update(&mut self, update: GraphUpdate) -> crate::render::Result<()> {
        let graph = build_graph(&update.definition, update.workflow.as_ref());
        let selections = self.selections.clone();
        self.canvas.render(&graph, move |state_id| {
            let Some(tx) = selections.as_ref() else {
                return;
            };
            if tx.unbounded_send(state_id.map(str::to_string)).is_err() {
                tracing::debug!("selection port closed; dropping selection");
            }
        })?;

        if let Some(scene) = self.canvas.scene_mut() {
            if let Some(wf) = update.workflow.as_ref() {
                mark_current_state(scene, wf);
            }
            if update.selected.is_some() {
                mark_state_selected(&graph, scene, update.selected.as_deref());
            }
        }
        self.graph = Some(graph);
        Ok(())
    }

    /// Delivers a click in container coordinates. The hit (or `None` for the background) is
    /// published on the selection port and marked in the scene.
    pub fn click(&mut self, point: LayoutPoint) -> Option<String> {
        let hit = self.canvas.click(point);
        if let (Some(graph), Some(scene)) = (self.graph.as_ref(), self.canvas.scene_mut()) {
            mark_state_selected(graph, scene, hit.as_deref());
        }
        hit
    }

    /// Clicks the node of `state_id` as if the user had clicked its center.
    pub fn click_state(&mut self, state_id: &str) -> Option<String> {
        let scene = self.canvas.scene()?;
        let node = scene.node(&crate::graph::node_dom_id(state_id))?;
        let point = scene.transform.apply(LayoutPoint::new(node.x, node.y));
        self.click(point)
    }

    /// Renders inbound updates one at a time until the runtime closes the update port.
    ///
    /// A failed render is logged and the next update is processed.
    pub async fn run(&mut self) {
        let Some(mut updates) = self.updates.take() else {
            return;
        };
        while let Some(update) = updates.next().await {
            if let Err(err) = self.handle_update(update) {
                tracing::error!(error = %err, "failed to render workflow graph");
            }
        }
        tracing::debug!("update port closed");
    }
}

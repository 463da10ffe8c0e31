#![forbid(unsafe_code)]

//! Workflow definition + execution trace model and the state graph builder (headless).
//!
//! Design goals:
//! - pure, deterministic graph construction (no layout, no I/O)
//! - plain-data graph storage so any layout/paint capability can consume it

pub mod build;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;

pub use build::build_graph;
pub use config::ExplorerConfig;
pub use error::{Error, Result};
pub use graph::{Edge, EdgeClass, EdgeStyle, Graph, Node, NodeClass, NodeStyle};
pub use model::{Action, Definition, State, StateType, Workflow};

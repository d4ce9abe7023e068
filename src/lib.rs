//! Graph engine for the ship outfit editor.
//!
//! Widgets expose typed ports; connecting a source port to a sink port
//! creates an edge, and edges derive a parent/child hierarchy that drives
//! auto-arrangement and validation. [`Workspace`] owns one editing session,
//! [`ConnectionGesture`] turns pointer input into graph operations and
//! [`wasm::Editor`] exposes both to JavaScript.

pub mod config;
pub mod error;
pub mod factory;
pub mod geometry;
pub mod graph;
pub mod hierarchy;
pub mod ids;
pub mod interaction;
pub mod model;
pub mod output;
pub mod persist;
pub mod registry;
pub mod schema;
pub mod tech;
pub mod validation;
pub mod wasm;
pub mod workspace;

pub use config::EditorConfig;
pub use error::{ConnectError, HierarchyError, PersistError};
pub use graph::{ConnectionGraph, Edge, GraphChange};
pub use ids::{EdgeId, PortId, WidgetId};
pub use interaction::{ConnectionGesture, GestureOutcome, SpawnMenu};
pub use model::{Direction, Port, Widget, WidgetData, WidgetKind};
pub use persist::{ConnectionRecord, WorkspaceSnapshot};
pub use registry::Registry;
pub use tech::{Empire, TechGate, TechTree};
pub use validation::{Issue, PreflightReport, Severity};
pub use workspace::{Hit, Workspace, WorkspaceEvent};

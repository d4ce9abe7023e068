//! Error taxonomy for the graph core.
//!
//! None of these cross the public workspace operations as failures: a
//! rejected connection or hierarchy link is a normal UI edge case and turns
//! into a no-op there. They exist so the internal checks can say *why*.

use thiserror::Error;

use crate::ids::{PortId, WidgetId};

/// Why two ports cannot be connected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("port {0} does not exist")]
    UnknownPort(PortId),
    #[error("ports belong to the same widget {0}")]
    SameWidget(WidgetId),
    #[error("both ports are {0}s")]
    SameDirection(&'static str),
    #[error("ports {0} and {1} are already connected")]
    AlreadyConnected(PortId, PortId),
    #[error("type {0} is not compatible with {1}")]
    IncompatibleTypes(String, String),
}

/// Why a parent/child link was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("widget {0} does not exist")]
    UnknownWidget(WidgetId),
    #[error("widget {0} cannot be its own child")]
    SelfLink(WidgetId),
    #[error("linking {parent} -> {child} would create a cycle")]
    WouldCycle { parent: WidgetId, child: WidgetId },
}

/// Snapshot decoding failures.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}

//! Identity newtypes for widgets, ports and edges.
//!
//! Every cross-reference in the editor (a port's owner, an edge's endpoints,
//! a widget's parents) is stored as one of these ids and resolved through the
//! registry at use time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Direction;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(WidgetId);
string_id!(PortId);
string_id!(EdgeId);

impl WidgetId {
    /// Sequential widget id, `widget-{n}`.
    pub fn numbered(n: u64) -> Self {
        Self(format!("widget-{}", n))
    }
}

impl PortId {
    /// Deterministic port id: `{widget}-{input|output}:{tag}-{index}`.
    pub fn for_widget(widget: &WidgetId, direction: Direction, type_tag: &str, index: u32) -> Self {
        Self(format!("{}-{}:{}-{}", widget, direction.as_str(), type_tag, index))
    }
}

/// Prefix shared by every edge id. Issue sources starting with it are
/// connection-sourced rather than widget-sourced.
pub const EDGE_ID_PREFIX: &str = "connection-";

impl EdgeId {
    /// Canonical id for the unordered pair `{a, b}`.
    ///
    /// The two port ids are sorted before joining, so the same physical link
    /// maps to the same id whichever endpoint started the drag.
    pub fn between(a: &PortId, b: &PortId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}{}-{}", EDGE_ID_PREFIX, lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_id_is_order_independent() {
        let a = PortId::from("widget-1-output:Class-1");
        let b = PortId::from("widget-2-input:Class-1");
        assert_eq!(EdgeId::between(&a, &b), EdgeId::between(&b, &a));
        assert!(EdgeId::between(&a, &b).as_str().starts_with(EDGE_ID_PREFIX));
    }

    #[test]
    fn test_edge_id_distinguishes_pairs() {
        let a = PortId::from("a");
        let b = PortId::from("b");
        let c = PortId::from("c");
        assert_ne!(EdgeId::between(&a, &b), EdgeId::between(&a, &c));
    }

    #[test]
    fn test_port_id_format() {
        let w = WidgetId::numbered(3);
        let p = PortId::for_widget(&w, Direction::Sink, "Core", 2);
        assert_eq!(p.as_str(), "widget-3-input:Core-2");
    }
}

// Widget, port and payload data model.
//
// Widgets and ports reference each other by id only; the registry resolves
// ids at use time.

pub mod data;
pub mod port;
pub mod widget;

pub use data::{Component, WidgetData};
pub use port::{Direction, Port, PortAnchor, PortSpec};
pub use widget::{ExpandableGroup, GroupChange, Widget, WidgetKind};

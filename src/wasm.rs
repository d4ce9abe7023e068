//! WASM bindings for the shipwright-core library.
//!
//! Everything exposed to JavaScript lives here. Arguments are plain strings
//! and numbers; structured results are returned as JSON strings. Pointer
//! coordinates arrive in screen space and are mapped through the current
//! view transform.

use log::{error, warn};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::EditorConfig;
use crate::geometry::{Point, ViewTransform};
use crate::ids::{EdgeId, PortId, WidgetId};
use crate::interaction::{ConnectionGesture, DragKind, GestureOutcome, SpawnMenu};
use crate::model::WidgetKind;
use crate::output::{preview_output, scene, ErrorInfo};
use crate::tech::TechTree;
use crate::workspace::Workspace;

/// Route `log` output to the browser console and panics to `console.error`.
#[wasm_bindgen]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Debug).is_err() {
        warn!("logger already initialised");
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        error!("Error serializing output: {e}");
        error_json(e)
    })
}

fn error_json(err: impl std::fmt::Display) -> String {
    let info = ErrorInfo { error: err.to_string() };
    serde_json::to_string(&info).unwrap_or_else(|_| "{\"error\": \"Serialization error\"}".to_string())
}

#[wasm_bindgen]
pub struct Editor {
    workspace: Workspace,
    gesture: ConnectionGesture,
    transform: ViewTransform,
    spawn_menu: Option<SpawnMenu>,
}

#[wasm_bindgen]
impl Editor {
    /// Create an editor from a JSON config. Empty or invalid config falls
    /// back to the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: &str) -> Editor {
        let config = if config.trim().is_empty() {
            EditorConfig::default()
        } else {
            EditorConfig::from_json(config).unwrap_or_else(|e| {
                error!("Error parsing config: {e}");
                EditorConfig::default()
            })
        };
        Editor {
            workspace: Workspace::new(config),
            gesture: ConnectionGesture::new(),
            transform: ViewTransform::default(),
            spawn_menu: None,
        }
    }

    pub fn set_transform(&mut self, scale: f64, translate_x: f64, translate_y: f64) {
        self.transform = ViewTransform { scale, translate_x, translate_y };
    }

    /// Returns the new widget id, or an empty string for an unknown kind.
    pub fn add_widget(&mut self, kind: &str, x: Option<f64>, y: Option<f64>) -> String {
        let Some(kind) = WidgetKind::parse(kind) else {
            error!("Unknown widget kind '{kind}'");
            return String::new();
        };
        let position = x.zip(y).map(|(x, y)| Point::new(x, y));
        self.workspace.add_widget(kind, position).to_string()
    }

    pub fn close_widget(&mut self, id: &str) -> bool {
        self.workspace.close_widget(&WidgetId::from(id))
    }

    /// Drag a widget; returns its final corner as JSON, or `null`.
    pub fn move_widget(&mut self, id: &str, x: f64, y: f64) -> String {
        to_json(&self.workspace.move_widget(&WidgetId::from(id), x, y))
    }

    pub fn resize_widget(&mut self, id: &str, width: f64, height: f64) -> bool {
        self.workspace.resize_widget(&WidgetId::from(id), width, height)
    }

    pub fn set_pinned(&mut self, id: &str, pinned: bool) -> bool {
        self.workspace.set_pinned(&WidgetId::from(id), pinned)
    }

    pub fn set_minimized(&mut self, id: &str, minimized: bool) -> bool {
        self.workspace.set_minimized(&WidgetId::from(id), minimized)
    }

    pub fn set_title(&mut self, id: &str, title: &str) -> bool {
        self.workspace.set_title(&WidgetId::from(id), title)
    }

    pub fn set_anchor(&mut self, id: &str, anchor: &str, y: f64) -> bool {
        self.workspace.set_anchor(&WidgetId::from(id), anchor, y)
    }

    pub fn update_widget_data(&mut self, id: &str, data: &str) -> bool {
        let value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                error!("Error parsing widget data: {e}");
                return false;
            }
        };
        self.workspace
            .update_widget_data(&WidgetId::from(id), value)
            .unwrap_or_else(|e| {
                error!("Invalid data for {id}: {e}");
                false
            })
    }

    pub fn arrange(&mut self, root: &str) -> usize {
        self.workspace.arrange(&WidgetId::from(root)).len()
    }

    /// Returns the edge id, or an empty string when the pair is refused.
    pub fn connect(&mut self, a: &str, b: &str) -> String {
        self.workspace
            .connect(&PortId::from(a), &PortId::from(b))
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    pub fn can_connect(&self, a: &str, b: &str) -> bool {
        self.workspace.can_connect(&PortId::from(a), &PortId::from(b))
    }

    pub fn disconnect(&mut self, edge: &str) -> bool {
        self.workspace.disconnect(&EdgeId::from(edge))
    }

    pub fn select_connection(&mut self, edge: &str) -> bool {
        self.workspace.select_connection(&EdgeId::from(edge))
    }

    pub fn deselect_all(&mut self) {
        self.workspace.deselect_all();
    }

    pub fn pointer_down(&mut self, port: &str, screen_x: f64, screen_y: f64) -> bool {
        let pointer = self.world(screen_x, screen_y);
        self.spawn_menu = None;
        self.gesture.pointer_down(&mut self.workspace, &PortId::from(port), pointer)
    }

    /// Returns the preview path as JSON, or `null` when not dragging.
    pub fn pointer_move(&mut self, screen_x: f64, screen_y: f64) -> String {
        let pointer = self.world(screen_x, screen_y);
        let hits = self.workspace.hit_test(pointer);
        if self.gesture.pointer_move(&self.workspace, pointer, &hits).is_none() {
            return "null".to_string();
        }
        to_json(&self.preview())
    }

    /// Finish a drag. A spawn-menu outcome is remembered for `choose_spawn`.
    pub fn pointer_up(&mut self, screen_x: f64, screen_y: f64) -> String {
        let pointer = self.world(screen_x, screen_y);
        let hits = self.workspace.hit_test(pointer);
        let outcome = self.gesture.pointer_up(&mut self.workspace, pointer, &hits);
        if let GestureOutcome::SpawnMenu(menu) = &outcome {
            self.spawn_menu = Some(menu.clone());
        }
        to_json(&outcome)
    }

    pub fn cancel_drag(&mut self) {
        self.spawn_menu = None;
        self.gesture.cancel(&mut self.workspace);
    }

    /// Pick a kind from the open spawn menu. The click position is where
    /// the new widget's port ends up. Returns the edge id or an empty string.
    pub fn choose_spawn(&mut self, kind: &str, screen_x: f64, screen_y: f64) -> String {
        let Some(menu) = self.spawn_menu.take() else {
            warn!("No spawn menu is open");
            return String::new();
        };
        let Some(kind) = WidgetKind::parse(kind) else {
            error!("Unknown widget kind '{kind}'");
            return String::new();
        };
        let click = self.world(screen_x, screen_y);
        ConnectionGesture::complete_spawn(&mut self.workspace, &menu, kind, click)
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    /// Everything the renderer needs, plus the events since the last call.
    pub fn scene(&mut self) -> String {
        let events = self.workspace.drain_events();
        to_json(&scene(&self.workspace, self.preview(), events))
    }

    pub fn validate(&mut self) -> String {
        to_json(self.workspace.run_validation())
    }

    /// Drive debounced validation. Returns true when a pass ran.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.workspace.poll(now_ms)
    }

    pub fn save(&self) -> String {
        self.workspace.save_json().unwrap_or_else(|e| {
            error!("Error saving workspace: {e}");
            error_json(e)
        })
    }

    /// Returns a restore summary, or `{"error": ...}` for unreadable input.
    pub fn load(&mut self, json: &str) -> String {
        self.gesture = ConnectionGesture::new();
        self.spawn_menu = None;
        match self.workspace.load_json(json) {
            Ok(summary) => to_json(&summary),
            Err(e) => {
                error!("Error loading workspace: {e}");
                error_json(e)
            }
        }
    }

    pub fn load_tech_tree(&mut self, json: &str) -> bool {
        match TechTree::from_json(json) {
            Ok(tree) => self.workspace.load_tech_tree(tree),
            Err(e) => {
                error!("Error parsing tech tree: {e}");
                false
            }
        }
    }

    pub fn research(&mut self, tech: &str) -> bool {
        self.workspace.research_tech(tech)
    }
}

impl Editor {
    fn world(&self, screen_x: f64, screen_y: f64) -> Point {
        self.transform.screen_to_world(Point::new(screen_x, screen_y))
    }

    fn preview(&self) -> Option<crate::output::PreviewOutput> {
        let session = self.gesture.session()?;
        let reconnecting = match &session.kind {
            DragKind::Reconnect { edge, .. } => Some(edge.clone()),
            DragKind::New => None,
        };
        Some(preview_output(&session.preview, session.snap_target.clone(), reconnecting))
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    fn port(editor: &Editor, widget: &str, tag: &str, direction: Direction) -> String {
        let ws = editor.workspace();
        ws.widget(&WidgetId::from(widget)).unwrap().find_port(tag, direction).unwrap().id.to_string()
    }

    #[test]
    fn test_gesture_through_screen_coordinates() {
        let mut editor = Editor::new("");
        editor.set_transform(2.0, 100.0, 50.0);
        let ship = editor.add_widget("ship", Some(0.0), Some(0.0));
        let outfit = editor.add_widget("outfit", Some(800.0), Some(0.0));
        let from = port(&editor, &ship, "Class", Direction::Source);
        let to = port(&editor, &outfit, "Class", Direction::Sink);

        let target = editor.workspace().port_position(&PortId::from(to.as_str())).unwrap();
        let screen = ViewTransform { scale: 2.0, translate_x: 100.0, translate_y: 50.0 }.world_to_screen(target);
        assert!(editor.pointer_down(&from, 0.0, 0.0));
        assert_ne!(editor.pointer_move(screen.x, screen.y), "null");
        let outcome: serde_json::Value = serde_json::from_str(&editor.pointer_up(screen.x, screen.y)).unwrap();
        assert_eq!(outcome["outcome"], "connected");
        assert_eq!(editor.workspace().graph().len(), 1);
    }

    #[test]
    fn test_spawn_menu_round_trip() {
        let mut editor = Editor::new("{}");
        let ship = editor.add_widget("ship", Some(0.0), Some(0.0));
        let from = port(&editor, &ship, "Loadout", Direction::Source);
        editor.pointer_down(&from, 0.0, 0.0);
        let outcome: serde_json::Value = serde_json::from_str(&editor.pointer_up(3000.0, 3000.0)).unwrap();
        assert_eq!(outcome["outcome"], "spawnMenu");
        assert_ne!(editor.choose_spawn("loadouts", 3000.0, 3000.0), "");
        assert_eq!(editor.choose_spawn("loadouts", 3000.0, 3000.0), "");
    }

    #[test]
    fn test_bad_input_is_reported_not_panicked() {
        let mut editor = Editor::new("{broken");
        assert_eq!(editor.add_widget("spaceStation", None, None), "");
        assert!(!editor.update_widget_data("widget-1", "{"));
        let reply: serde_json::Value = serde_json::from_str(&editor.load("nope")).unwrap();
        assert!(reply.get("error").is_some());
        assert_eq!(editor.connect("a", "b"), "");
    }

    #[test]
    fn test_save_then_load() {
        let mut editor = Editor::new("");
        editor.add_widget("shipCore", None, None);
        let saved = editor.save();
        let mut other = Editor::new("");
        let summary: serde_json::Value = serde_json::from_str(&other.load(&saved)).unwrap();
        assert_eq!(summary["widgets"], 1);
        let scene: serde_json::Value = serde_json::from_str(&other.scene()).unwrap();
        assert_eq!(scene["widgets"].as_array().unwrap().len(), 1);
    }
}

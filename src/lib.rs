pub mod graph;
pub mod ir;
pub mod layout;
pub mod render;
pub mod transform;

use wasm_bindgen::prelude::*;

use graph::Graph;
use ir::Ir;
use layout::{JsSolver, LayoutEngine, LayoutOptions};
use transform::SequentialIds;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Editor graph JSON to validated IR JSON
#[wasm_bindgen(js_name = "graphToIr")]
pub fn graph_to_ir_json(graph: &str) -> Result<String, String> {
    let graph = Graph::from_json(graph).map_err(|e| e.to_string())?;
    let ir = transform::graph_to_ir(&graph).map_err(|e| e.to_string())?;
    ir.to_json().map_err(|e| e.to_string())
}

/// IR JSON to editor graph JSON. Missing ids are minted under `id_prefix`,
/// which defaults to one derived from the current time.
#[wasm_bindgen(js_name = "irToGraph")]
pub fn ir_to_graph_json(ir: &str, id_prefix: Option<String>) -> Result<String, String> {
    let ir = Ir::from_json(ir).map_err(|e| e.to_string())?;
    let prefix = id_prefix.unwrap_or_else(default_id_prefix);
    let graph = transform::ir_to_graph(&ir, &mut SequentialIds::new(prefix));
    graph.to_json().map_err(|e| e.to_string())
}

/// `n<millis>-`, so ids minted in separate calls do not collide.
fn default_id_prefix() -> String {
    #[cfg(target_arch = "wasm32")]
    let millis = js_sys::Date::now() as u128;
    #[cfg(not(target_arch = "wasm32"))]
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!("n{millis}-")
}

/// IR JSON to render tree JSON (placeholders and row spans)
#[wasm_bindgen(js_name = "renderTree")]
pub fn render_tree_json(ir: &str) -> Result<String, String> {
    let ir = Ir::from_json(ir).map_err(|e| e.to_string())?;
    let tree = render::derive_render_tree(&ir);
    serde_json::to_string(&tree).map_err(|e| e.to_string())
}

/// Lay out editor graph JSON with a JS solver.
///
/// `solver` is either an object with a `layout` method (an elkjs instance,
/// called with itself as `this`) or a plain function. A method passed as a
/// function must be bound, e.g. `elk.layout.bind(elk)`.
#[wasm_bindgen(js_name = "layoutGraph")]
pub async fn layout_graph(graph: String, options: String, solver: JsValue) -> Result<String, JsValue> {
    let graph = Graph::from_json(&graph).map_err(to_js_error)?;
    let options = LayoutOptions::from_json(&options).map_err(to_js_error)?;
    let solver = JsSolver::from_js(solver).map_err(to_js_error)?;
    let engine = LayoutEngine::new(solver, options);
    let laid_out = engine.layout(&graph).await.map_err(to_js_error)?;
    laid_out.to_json().map_err(to_js_error)
}

fn to_js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDITOR_GRAPH: &str = r#"{
        "nodes": [
            {"id": "t", "type": "task", "data": {"content": "Fill tank"}, "position": {"x": 0, "y": 0}},
            {"id": "f", "type": "function", "data": {"content": "Pump water"}, "position": {"x": 0, "y": 0}}
        ],
        "edges": [{"id": "e-t-f", "source": "t", "target": "f"}]
    }"#;

    #[test]
    fn test_graph_to_ir_export() {
        let json = graph_to_ir_json(EDITOR_GRAPH).unwrap();
        let ir = Ir::from_json(&json).unwrap();
        assert_eq!(ir.tasks[0].task_name, "Fill tank");
        assert_eq!(ir.tasks[0].functions[0].function_name, "Pump water");
    }

    #[test]
    fn test_ir_to_graph_export_with_prefix() {
        let json = ir_to_graph_json(r#"{"tasks": [{"taskName": "Fill"}]}"#, Some("p-".to_string())).unwrap();
        let graph = Graph::from_json(&json).unwrap();
        assert_eq!(graph.nodes[0].id, "p-task-1");
    }

    #[test]
    fn test_ir_to_graph_export_default_prefix() {
        let json = ir_to_graph_json(r#"{"tasks": [{"taskName": "Fill"}]}"#, None).unwrap();
        let graph = Graph::from_json(&json).unwrap();
        let id = &graph.nodes[0].id;
        assert!(id.starts_with('n'));
        assert!(id.ends_with("-task-1"));
    }

    #[test]
    fn test_render_tree_export() {
        let json = render_tree_json(r#"{"tasks": [{"id": "t", "taskName": "Fill"}]}"#).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tasks"][0]["rowSpan"], 1);
        assert_eq!(value["tasks"][0]["functions"][0]["placeholder"], true);
    }

    #[test]
    fn test_export_errors_are_strings() {
        assert!(graph_to_ir_json("{").unwrap_err().contains("JSON"));
        assert!(render_tree_json("[]").is_err());
    }
}

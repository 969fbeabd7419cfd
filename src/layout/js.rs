//! Solver backed by JavaScript, e.g. an elkjs instance.

use async_trait::async_trait;
use js_sys::{Function, JSON, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use super::solver::{LayeredSolver, SolverError, SolverGraph};

/// Calls `receiver.callback(graph)` and awaits the returned value or Promise.
pub struct JsSolver {
    receiver: JsValue,
    callback: Function,
}

impl JsSolver {
    /// Free-standing callback, invoked with `this` undefined. Methods such as
    /// `elk.layout` must be bound first (`elk.layout.bind(elk)`) or passed
    /// through [`JsSolver::from_js`] as the owning object.
    pub fn new(callback: Function) -> Self {
        Self::with_receiver(JsValue::UNDEFINED, callback)
    }

    /// Callback invoked with `receiver` as `this`.
    pub fn with_receiver(receiver: JsValue, callback: Function) -> Self {
        Self { receiver, callback }
    }

    /// A function is called as is; any other object must expose a `layout`
    /// method, which is called on that object.
    pub fn from_js(value: JsValue) -> Result<Self, SolverError> {
        if let Some(callback) = value.dyn_ref::<Function>() {
            return Ok(Self::new(callback.clone()));
        }
        let method = Reflect::get(&value, &JsValue::from_str("layout")).map_err(rejected)?;
        let callback = method
            .dyn_into::<Function>()
            .map_err(|_| SolverError::Rejected("solver has no layout method".to_string()))?;
        Ok(Self::with_receiver(value, callback))
    }
}

fn rejected(value: JsValue) -> SolverError {
    SolverError::Rejected(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

#[async_trait(?Send)]
impl LayeredSolver for JsSolver {
    async fn solve(&self, graph: SolverGraph) -> Result<SolverGraph, SolverError> {
        let input = JSON::parse(&serde_json::to_string(&graph)?).map_err(rejected)?;
        let returned = self.callback.call1(&self.receiver, &input).map_err(rejected)?;
        let output = JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(rejected)?;
        let text: String = JSON::stringify(&output).map_err(rejected)?.into();
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wasm_bindgen_test::wasm_bindgen_test;

    fn graph() -> SolverGraph {
        SolverGraph {
            id: "root".to_string(),
            layout_options: BTreeMap::new(),
            children: vec![],
            edges: vec![],
        }
    }

    /// `{ marker, layout(g) }` whose `layout` fails unless `this` is the object.
    fn engine_object() -> JsValue {
        Function::new_no_args(
            "return { marker: 7, layout(g) {
                if (!this || this.marker !== 7) throw new Error('unbound');
                return Promise.resolve(g);
            } };",
        )
        .call0(&JsValue::NULL)
        .unwrap()
    }

    #[wasm_bindgen_test]
    async fn test_object_layout_method_keeps_receiver() {
        let solver = JsSolver::from_js(engine_object()).unwrap();
        assert_eq!(solver.solve(graph()).await.unwrap(), graph());
    }

    #[wasm_bindgen_test]
    async fn test_unbound_method_is_rejected() {
        let method = Reflect::get(&engine_object(), &JsValue::from_str("layout"))
            .unwrap()
            .dyn_into::<Function>()
            .unwrap();
        let result = JsSolver::new(method).solve(graph()).await;
        assert!(matches!(result, Err(SolverError::Rejected(_))));
    }

    #[wasm_bindgen_test]
    async fn test_plain_function() {
        let identity = Function::new_with_args("g", "return g;");
        let solver = JsSolver::from_js(identity.into()).unwrap();
        assert_eq!(solver.solve(graph()).await.unwrap(), graph());
    }

    #[wasm_bindgen_test]
    fn test_object_without_layout() {
        let empty = Function::new_no_args("return {};").call0(&JsValue::NULL).unwrap();
        assert!(JsSolver::from_js(empty).is_err());
    }
}

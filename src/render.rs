//! Nested-table render structure: merged-cell row spans and placeholder rows.
//!
//! A row span is the number of table rows an element's subtree occupies. It is
//! never below 1, so an incomplete branch still produces a row.

use crate::ir::{Func, Interpretation, Ir, Property, Realization, Task};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderInterpretation {
    #[serde(flatten)]
    pub interpretation: Interpretation,
    pub row_span: usize,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderProperty {
    pub id: Option<String>,
    pub properties: Vec<String>,
    pub interpretations: Vec<RenderInterpretation>,
    pub row_span: usize,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRealization {
    pub id: Option<String>,
    pub realization_name: String,
    pub properties: Vec<RenderProperty>,
    pub row_span: usize,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFunc {
    pub id: Option<String>,
    pub function_name: String,
    pub realizations: Vec<RenderRealization>,
    pub row_span: usize,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTask {
    pub id: Option<String>,
    pub task_name: String,
    pub functions: Vec<RenderFunc>,
    pub row_span: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderTree {
    pub tasks: Vec<RenderTask>,
}

impl RenderTree {
    /// Total table rows.
    pub fn row_count(&self) -> usize {
        self.tasks.iter().map(|t| t.row_span).sum()
    }
}

fn blank_property() -> Property {
    Property {
        id: None,
        properties: vec![String::new()],
        interpretations: vec![Interpretation::default()],
    }
}

fn blank_realization() -> Realization {
    Realization {
        id: None,
        realization_name: String::new(),
        properties: vec![blank_property()],
    }
}

fn blank_func() -> Func {
    Func {
        id: None,
        function_name: String::new(),
        realizations: vec![blank_realization()],
    }
}

fn filled<T: Clone>(items: &[T], blank: fn() -> T, normalize: fn(&T) -> T) -> Vec<T> {
    if items.is_empty() {
        vec![blank()]
    } else {
        items.iter().map(normalize).collect()
    }
}

fn normalize_property(property: &Property) -> Property {
    Property {
        interpretations: filled(&property.interpretations, Interpretation::default, Clone::clone),
        ..property.clone()
    }
}

fn normalize_realization(realization: &Realization) -> Realization {
    Realization {
        properties: filled(&realization.properties, blank_property, normalize_property),
        ..realization.clone()
    }
}

fn normalize_func(func: &Func) -> Func {
    Func {
        realizations: filled(&func.realizations, blank_realization, normalize_realization),
        ..func.clone()
    }
}

fn normalize_task(task: &Task) -> Task {
    Task {
        functions: filled(&task.functions, blank_func, normalize_func),
        ..task.clone()
    }
}

/// Replace every empty function/realization/property/interpretation list with
/// a single blank element. Idempotent.
pub fn ensure_renderable_structure(ir: &Ir) -> Ir {
    Ir {
        tasks: ir.tasks.iter().map(normalize_task).collect(),
    }
}

fn span(spans: impl Iterator<Item = usize>) -> usize {
    spans.sum::<usize>().max(1)
}

fn render_interpretation(interp: &Interpretation) -> RenderInterpretation {
    RenderInterpretation {
        placeholder: *interp == Interpretation::default(),
        interpretation: interp.clone(),
        row_span: 1,
    }
}

fn render_property(property: &Property) -> RenderProperty {
    let interpretations: Vec<_> = property.interpretations.iter().map(render_interpretation).collect();
    RenderProperty {
        id: property.id.clone(),
        properties: property.properties.clone(),
        row_span: span(interpretations.iter().map(|i| i.row_span)),
        interpretations,
        placeholder: *property == blank_property(),
    }
}

fn render_realization(realization: &Realization) -> RenderRealization {
    let properties: Vec<_> = realization.properties.iter().map(render_property).collect();
    RenderRealization {
        id: realization.id.clone(),
        realization_name: realization.realization_name.clone(),
        row_span: span(properties.iter().map(|p| p.row_span)),
        properties,
        placeholder: *realization == blank_realization(),
    }
}

fn render_func(func: &Func) -> RenderFunc {
    let realizations: Vec<_> = func.realizations.iter().map(render_realization).collect();
    RenderFunc {
        id: func.id.clone(),
        function_name: func.function_name.clone(),
        row_span: span(realizations.iter().map(|r| r.row_span)),
        realizations,
        placeholder: *func == blank_func(),
    }
}

fn render_task(task: &Task) -> RenderTask {
    let functions: Vec<_> = task.functions.iter().map(render_func).collect();
    RenderTask {
        id: task.id.clone(),
        task_name: task.task_name.clone(),
        row_span: span(functions.iter().map(|f| f.row_span)),
        functions,
    }
}

/// Bottom-up row spans. Empty lists stay empty and count as one row;
/// elements identical to a synthesized blank are flagged as placeholders.
pub fn compute_row_spans(ir: &Ir) -> RenderTree {
    RenderTree {
        tasks: ir.tasks.iter().map(render_task).collect(),
    }
}

/// Normalize, then compute spans.
pub fn derive_render_tree(ir: &Ir) -> RenderTree {
    let tree = compute_row_spans(&ensure_renderable_structure(ir));
    tracing::debug!(tasks = tree.tasks.len(), rows = tree.row_count(), "render tree derived");
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{GuideWord, TextItem};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn interp(n: usize) -> Interpretation {
        Interpretation {
            guide_word_id: Some(format!("g{n}")),
            guide_word: GuideWord::PartOf,
            deviations: vec![TextItem::new(format!("d{n}"), "dev")],
            ..Default::default()
        }
    }

    fn property(interpretations: Vec<Interpretation>) -> Property {
        Property {
            id: Some("p".into()),
            properties: vec!["Flow".into()],
            interpretations,
        }
    }

    fn realization(properties: Vec<Property>) -> Realization {
        Realization {
            id: Some("r".into()),
            realization_name: "Pump".into(),
            properties,
        }
    }

    fn ir_with(functions: Vec<Func>) -> Ir {
        Ir {
            tasks: vec![Task {
                id: Some("t".into()),
                task_name: "Fill".into(),
                functions,
            }],
        }
    }

    #[test]
    fn test_function_without_realizations() {
        let ir = ir_with(vec![Func {
            id: Some("f".into()),
            function_name: "Transfer".into(),
            realizations: vec![],
        }]);
        let tree = derive_render_tree(&ir);

        let task = &tree.tasks[0];
        assert_eq!(task.row_span, 1);
        let func = &task.functions[0];
        assert_eq!(func.row_span, 1);
        assert!(!func.placeholder);
        assert_eq!(func.realizations.len(), 1);

        let realization = &func.realizations[0];
        assert!(realization.placeholder);
        assert_eq!(realization.row_span, 1);
        assert_eq!(realization.properties.len(), 1);

        let property = &realization.properties[0];
        assert!(property.placeholder);
        assert_eq!(property.row_span, 1);
        assert_eq!(property.properties, vec![String::new()]);
        assert_eq!(property.interpretations.len(), 1);

        let interpretation = &property.interpretations[0];
        assert!(interpretation.placeholder);
        assert_eq!(interpretation.row_span, 1);
        assert_eq!(interpretation.interpretation.guide_word, GuideWord::No);
        assert!(interpretation.interpretation.deviations.is_empty());
        assert!(interpretation.interpretation.causes.is_empty());
        assert!(interpretation.interpretation.consequences.is_empty());
        assert!(interpretation.interpretation.requirements.is_empty());
    }

    #[test]
    fn test_spans_sum_up_the_tree() {
        let ir = ir_with(vec![
            Func {
                id: Some("f1".into()),
                function_name: "A".into(),
                realizations: vec![
                    realization(vec![property(vec![interp(1), interp(2), interp(3)]), property(vec![])]),
                    realization(vec![property(vec![interp(4)])]),
                ],
            },
            Func {
                id: Some("f2".into()),
                function_name: "B".into(),
                realizations: vec![],
            },
        ]);

        let spans = compute_row_spans(&ir);
        let f1 = &spans.tasks[0].functions[0];
        assert_eq!(f1.realizations[0].properties[0].row_span, 3);
        assert_eq!(f1.realizations[0].properties[1].row_span, 1);
        assert_eq!(f1.realizations[0].row_span, 4);
        assert_eq!(f1.realizations[1].row_span, 1);
        assert_eq!(f1.row_span, 5);
        assert_eq!(spans.tasks[0].functions[1].row_span, 1);
        assert!(spans.tasks[0].functions[1].realizations.is_empty());
        assert_eq!(spans.tasks[0].row_span, 6);

        let tree = derive_render_tree(&ir);
        assert_eq!(tree.row_count(), 6);
        assert!(tree.tasks[0].functions[0].realizations[0].properties[1].interpretations[0].placeholder);
    }

    #[test]
    fn test_task_without_functions() {
        let tree = derive_render_tree(&ir_with(vec![]));
        let func = &tree.tasks[0].functions[0];
        assert!(func.placeholder);
        assert!(func.realizations[0].properties[0].interpretations[0].placeholder);
        assert_eq!(tree.tasks[0].row_span, 1);
    }

    #[test]
    fn test_normalization_keeps_real_content() {
        let ir = ir_with(vec![Func {
            id: Some("f".into()),
            function_name: "Transfer".into(),
            realizations: vec![realization(vec![property(vec![interp(1)])])],
        }]);
        assert_eq!(ensure_renderable_structure(&ir), ir);
    }

    #[test]
    fn test_render_tree_json_shape() {
        let tree = derive_render_tree(&ir_with(vec![]));
        let json = serde_json::to_value(&tree).unwrap();
        let interp = &json["tasks"][0]["functions"][0]["realizations"][0]["properties"][0]["interpretations"][0];
        assert_eq!(interp["guideWord"], "No");
        assert_eq!(interp["rowSpan"], 1);
        assert_eq!(json["tasks"][0]["rowSpan"], 1);
    }

    fn arb_ir() -> impl Strategy<Value = Ir> {
        let interp = (0..3usize).prop_map(|n| Interpretation {
            causes: (0..n).map(|i| TextItem::new(format!("c{i}"), "cause")).collect(),
            ..Default::default()
        });
        let property = prop::collection::vec(interp, 0..4).prop_map(|interpretations| Property {
            id: None,
            properties: vec!["p".into()],
            interpretations,
        });
        let realization = prop::collection::vec(property, 0..3).prop_map(|properties| Realization {
            properties,
            ..Default::default()
        });
        let func = prop::collection::vec(realization, 0..3).prop_map(|realizations| Func {
            realizations,
            ..Default::default()
        });
        let task = prop::collection::vec(func, 0..3).prop_map(|functions| Task {
            functions,
            ..Default::default()
        });
        prop::collection::vec(task, 0..3).prop_map(|tasks| Ir { tasks })
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(ir in arb_ir()) {
            let once = ensure_renderable_structure(&ir);
            let twice = ensure_renderable_structure(&once);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(derive_render_tree(&once), derive_render_tree(&ir));
        }

        #[test]
        fn prop_spans_match_children(ir in arb_ir()) {
            let tree = compute_row_spans(&ir);
            for task in &tree.tasks {
                let sum: usize = task.functions.iter().map(|f| f.row_span).sum();
                prop_assert_eq!(task.row_span, sum.max(1));
                for func in &task.functions {
                    let sum: usize = func.realizations.iter().map(|r| r.row_span).sum();
                    prop_assert_eq!(func.row_span, sum.max(1));
                    for realization in &func.realizations {
                        let sum: usize = realization.properties.iter().map(|p| p.row_span).sum();
                        prop_assert_eq!(realization.row_span, sum.max(1));
                        for property in &realization.properties {
                            prop_assert_eq!(property.row_span, property.interpretations.len().max(1));
                        }
                    }
                }
            }
        }

        #[test]
        fn prop_render_tree_has_no_empty_levels(ir in arb_ir()) {
            let tree = derive_render_tree(&ir);
            for task in &tree.tasks {
                prop_assert!(!task.functions.is_empty());
                for func in &task.functions {
                    prop_assert!(!func.realizations.is_empty());
                    for realization in &func.realizations {
                        prop_assert!(!realization.properties.is_empty());
                        for property in &realization.properties {
                            prop_assert!(!property.interpretations.is_empty());
                        }
                    }
                }
            }
        }
    }
}

//! Strict hierarchical view of a hazard analysis.
//!
//! Every list defaults to empty and the guide word defaults to `No`, both when
//! parsing JSON and when the tree is assembled from a graph.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum IrError {
    #[error("Invalid IR JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid IR at {path}: {message}")]
    Validation { path: String, message: &'static str },
}

/// Closed set of guide words an interpretation may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuideWord {
    #[serde(rename = "Part of")]
    PartOf,
    #[serde(rename = "Other than")]
    OtherThan,
    #[default]
    No,
}

impl GuideWord {
    /// Case-insensitive match of free text; anything unrecognized is `No`.
    pub fn normalize(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("part of") {
            Self::PartOf
        } else if text.eq_ignore_ascii_case("other than") {
            Self::OtherThan
        } else {
            Self::No
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PartOf => "Part of",
            Self::OtherThan => "Other than",
            Self::No => "No",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl TextItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_word_id: Option<String>,
    #[serde(default)]
    pub guide_word: GuideWord,
    #[serde(default)]
    pub deviations: Vec<TextItem>,
    #[serde(default)]
    pub causes: Vec<TextItem>,
    #[serde(default)]
    pub consequences: Vec<TextItem>,
    #[serde(default)]
    pub requirements: Vec<TextItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// At least one entry after validation.
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub interpretations: Vec<Interpretation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Realization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub realization_name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Func {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub realizations: Vec<Realization>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub functions: Vec<Func>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ir {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Ir {
    /// Parse and validate IR JSON.
    pub fn from_json(source: &str) -> Result<Self, IrError> {
        let ir: Ir = serde_json::from_str(source)?;
        ir.validate()?;
        Ok(ir)
    }

    pub fn to_json(&self) -> Result<String, IrError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), IrError> {
        for (ti, task) in self.tasks.iter().enumerate() {
            for (fi, func) in task.functions.iter().enumerate() {
                for (ri, realization) in func.realizations.iter().enumerate() {
                    for (pi, property) in realization.properties.iter().enumerate() {
                        if property.properties.is_empty() {
                            return Err(IrError::Validation {
                                path: format!(
                                    "tasks[{ti}].functions[{fi}].realizations[{ri}].properties[{pi}]"
                                ),
                                message: "property must list at least one entry",
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

//! Chain node definitions.
//!
//! A node's kind is fixed by its payload variant at creation time; the
//! payload is the only mutable part. Every update operation is total for
//! its variant and rejects a kind mismatch instead of merging fields.

use serde::{Deserialize, Serialize};

use crate::{AnimflowError, Result, generate::GenerationOutcome, model::NodeModel, utils};

/// node id
pub type NodeId = String;

/// Kind of a chain node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    SourceAsset,
    Instruction,
    GenerationOutput,
}

/// State of a generation output node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationState {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Payload of a generation output node.
///
/// `output_content` survives a failed re-run: a transition to `Failed`
/// leaves the last good output in place.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct OutputPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_content: Option<String>,
    #[serde(default)]
    pub state: GenerationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_model: Option<String>,
}

/// Kind-tagged node payload, one variant per [`NodeKind`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum NodePayload {
    /// Raw markup text of the source asset.
    SourceAsset {
        markup: String,
    },
    /// Free-text generation instruction.
    Instruction {
        prompt: String,
    },
    /// Generation result and its lifecycle state.
    GenerationOutput(OutputPayload),
}

impl NodePayload {
    /// Creates a payload of the given kind from raw params.
    ///
    /// Params are validated against the kind's schema first, so a payload
    /// carrying fields of another kind is rejected instead of merged.
    pub fn create(
        kind: NodeKind,
        params: serde_json::Value,
    ) -> Result<Self> {
        let params = if params.is_null() {
            serde_json::json!({})
        } else {
            params
        };
        jsonschema::validate(&Self::schema(kind), &params).map_err(|e| AnimflowError::Node(format!("invalid {} payload: {}", kind.as_ref(), e)))?;

        match kind {
            NodeKind::SourceAsset => {
                #[derive(Deserialize)]
                struct Params {
                    #[serde(default)]
                    markup: String,
                }
                let p: Params = serde_json::from_value(params)?;
                Ok(NodePayload::SourceAsset {
                    markup: p.markup,
                })
            }
            NodeKind::Instruction => {
                #[derive(Deserialize)]
                struct Params {
                    #[serde(default)]
                    prompt: String,
                }
                let p: Params = serde_json::from_value(params)?;
                Ok(NodePayload::Instruction {
                    prompt: p.prompt,
                })
            }
            NodeKind::GenerationOutput => {
                let p: OutputPayload = serde_json::from_value(params)?;
                Ok(NodePayload::GenerationOutput(p))
            }
        }
    }

    /// Returns the payload schema of the given kind.
    pub fn schema(kind: NodeKind) -> serde_json::Value {
        match kind {
            NodeKind::SourceAsset => serde_json::json!({
                "type": "object",
                "properties": {
                    "markup": {
                        "type": "string",
                        "description": "Raw markup text of the source asset"
                    }
                },
                "additionalProperties": false
            }),
            NodeKind::Instruction => serde_json::json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Free-text generation instruction"
                    }
                },
                "additionalProperties": false
            }),
            NodeKind::GenerationOutput => serde_json::json!({
                "type": "object",
                "properties": {
                    "output_content": { "type": ["string", "null"] },
                    "state": {
                        "type": "string",
                        "enum": ["idle", "loading", "succeeded", "failed"]
                    },
                    "chosen_model": { "type": ["string", "null"] }
                },
                "additionalProperties": false
            }),
        }
    }

    /// The kind this payload belongs to.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::SourceAsset {
                ..
            } => NodeKind::SourceAsset,
            NodePayload::Instruction {
                ..
            } => NodeKind::Instruction,
            NodePayload::GenerationOutput(_) => NodeKind::GenerationOutput,
        }
    }
}

/// A node of the chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    /// node id
    pub id: NodeId,
    payload: NodePayload,
}

impl Node {
    /// Creates a runtime node from its serialized model.
    pub fn new(model: &NodeModel) -> Result<Self> {
        if model.id.is_empty() {
            return Err(AnimflowError::Node("node id must not be empty".to_string()));
        }
        let payload = NodePayload::create(model.kind, model.payload.clone())?;

        Ok(Self {
            id: model.id.clone(),
            payload,
        })
    }

    /// Creates a fresh node of the given kind with an empty payload and a
    /// generated id.
    pub fn with_kind(kind: NodeKind) -> Self {
        let payload = match kind {
            NodeKind::SourceAsset => NodePayload::SourceAsset {
                markup: String::new(),
            },
            NodeKind::Instruction => NodePayload::Instruction {
                prompt: String::new(),
            },
            NodeKind::GenerationOutput => NodePayload::GenerationOutput(OutputPayload::default()),
        };

        Self {
            id: utils::longid(),
            payload,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    /// Markup of a source asset node.
    pub fn markup(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::SourceAsset {
                markup,
            } => Some(markup.as_str()),
            _ => None,
        }
    }

    /// Prompt of an instruction node.
    pub fn prompt(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::Instruction {
                prompt,
            } => Some(prompt.as_str()),
            _ => None,
        }
    }

    /// Output payload of a generation output node.
    pub fn output(&self) -> Option<&OutputPayload> {
        match &self.payload {
            NodePayload::GenerationOutput(output) => Some(output),
            _ => None,
        }
    }

    /// Replace the markup of a source asset node.
    pub fn set_markup(
        &mut self,
        markup: impl Into<String>,
    ) -> Result<()> {
        match &mut self.payload {
            NodePayload::SourceAsset {
                markup: current,
            } => {
                *current = markup.into();
                Ok(())
            }
            _ => Err(self.kind_mismatch(NodeKind::SourceAsset)),
        }
    }

    /// Replace the prompt of an instruction node.
    pub fn set_prompt(
        &mut self,
        prompt: impl Into<String>,
    ) -> Result<()> {
        match &mut self.payload {
            NodePayload::Instruction {
                prompt: current,
            } => {
                *current = prompt.into();
                Ok(())
            }
            _ => Err(self.kind_mismatch(NodeKind::Instruction)),
        }
    }

    /// Move a generation output node into `Loading`.
    pub(crate) fn begin_generation(&mut self) -> Result<()> {
        let output = self.output_mut()?;
        output.state = GenerationState::Loading;
        Ok(())
    }

    /// Record a successful generation on an output node.
    pub(crate) fn complete_generation(
        &mut self,
        outcome: &GenerationOutcome,
    ) -> Result<()> {
        let output = self.output_mut()?;
        output.state = GenerationState::Succeeded;
        output.output_content = Some(outcome.output_content.clone());
        output.chosen_model = Some(outcome.model_used.clone());
        Ok(())
    }

    /// Record a failed generation on an output node, preserving the last
    /// good output content.
    pub(crate) fn fail_generation(&mut self) -> Result<()> {
        let output = self.output_mut()?;
        output.state = GenerationState::Failed;
        Ok(())
    }

    fn output_mut(&mut self) -> Result<&mut OutputPayload> {
        if !matches!(self.payload, NodePayload::GenerationOutput(_)) {
            return Err(self.kind_mismatch(NodeKind::GenerationOutput));
        }
        match &mut self.payload {
            NodePayload::GenerationOutput(output) => Ok(output),
            _ => unreachable!(),
        }
    }

    fn kind_mismatch(
        &self,
        expected: NodeKind,
    ) -> AnimflowError {
        AnimflowError::Node(format!("node {} is a {}, not a {}", self.id, self.kind().as_ref(), expected.as_ref()))
    }
}

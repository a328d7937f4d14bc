//! Shader graph model handed over by the node editor, plus the JSON compile request
//! that wraps it for the CLI and the golden tests.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::generator::GeneratorOptions;
use crate::generator::error::GeneratorError;
use crate::generator::table::{Struct, StructField};
use crate::generator::types::TypeRegistry;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ShaderGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Node {
    pub id: String,
    /// Display name; local variables are named after it.
    #[serde(default)]
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub pins: Vec<Pin>,
}

/// The closed set of node kinds. Type fields hold type keywords (`float3`, `float4x4`, ...).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// Samples a 2D texture at the uv given on its first input pin.
    Texture,
    /// Binary operator over the first two input pins.
    Operator {
        op: String,
        #[serde(rename = "valueType")]
        ty: String,
    },
    FuncCall {
        func: String,
        #[serde(rename = "valueType")]
        ty: String,
    },
    FuncCallVoid {
        func: String,
    },
    /// Call to a function whose body ships with the node. `ty: None` makes it a void call.
    FuncCallDeclaration {
        method: String,
        #[serde(default, rename = "valueType")]
        ty: Option<String>,
        source: String,
    },
    Convert {
        value: f32,
    },
    ComponentMask {
        mask: String,
        #[serde(rename = "valueType")]
        ty: String,
    },
    Pack {
        #[serde(rename = "valueType")]
        ty: String,
    },
    Split {
        #[serde(rename = "valueType")]
        ty: String,
    },
    Constant {
        #[serde(rename = "valueType")]
        ty: String,
    },
    Input,
    Output,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Texture => "Texture",
            NodeKind::Operator { .. } => "Operator",
            NodeKind::FuncCall { .. } => "FuncCall",
            NodeKind::FuncCallVoid { .. } => "FuncCallVoid",
            NodeKind::FuncCallDeclaration { .. } => "FuncCallDeclaration",
            NodeKind::Convert { .. } => "Convert",
            NodeKind::ComponentMask { .. } => "ComponentMask",
            NodeKind::Pack { .. } => "Pack",
            NodeKind::Split { .. } => "Split",
            NodeKind::Constant { .. } => "Constant",
            NodeKind::Input => "Input",
            NodeKind::Output => "Output",
        }
    }

    /// Declared value type, if the kind carries one.
    pub fn value_type(&self) -> Option<&str> {
        match self {
            NodeKind::Operator { ty, .. }
            | NodeKind::FuncCall { ty, .. }
            | NodeKind::ComponentMask { ty, .. }
            | NodeKind::Pack { ty }
            | NodeKind::Split { ty }
            | NodeKind::Constant { ty } => Some(ty.as_str()),
            NodeKind::FuncCallDeclaration { ty, .. } => ty.as_deref(),
            NodeKind::Convert { .. } => Some("float4"),
            NodeKind::Texture | NodeKind::FuncCallVoid { .. } | NodeKind::Input | NodeKind::Output => {
                None
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    In,
    Out,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Pin {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: PinKind,
    #[serde(default, rename = "valueType")]
    pub ty: Option<String>,
    /// Literal used when the pin is left unconnected.
    #[serde(default, rename = "defaultValue")]
    pub default_value: Option<String>,
}

impl Pin {
    pub fn input(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: PinKind::In,
            ty: None,
            default_value: None,
        }
    }

    pub fn output(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: PinKind::Out,
            ..Self::input(id, name)
        }
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Name used for member access; falls back to the id when the pin is unnamed.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            pins: Vec::new(),
        }
    }

    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pins.push(pin);
        self
    }

    pub fn pin(&self, pin_id: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == pin_id)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.kind == PinKind::In)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.kind == PinKind::Out)
    }

    /// The `index`-th input pin, in authored order.
    pub fn input(&self, index: usize) -> Option<&Pin> {
        self.inputs().nth(index)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Link {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Endpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "pinId")]
    pub pin_id: String,
}

impl Link {
    pub fn new(from_node: &str, from_pin: &str, to_node: &str, to_pin: &str) -> Self {
        Self {
            id: format!("{from_node}_{from_pin}_{to_node}_{to_pin}"),
            from: Endpoint {
                node_id: from_node.to_string(),
                pin_id: from_pin.to_string(),
            },
            to: Endpoint {
                node_id: to_node.to_string(),
                pin_id: to_pin.to_string(),
            },
        }
    }
}

impl ShaderGraph {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    pub fn find_node(&self, node_id: &str) -> Result<&Node> {
        match self.nodes.iter().find(|n| n.id == node_id) {
            Some(node) => Ok(node),
            None => bail!(GeneratorError::MissingNode {
                node: node_id.to_string()
            }),
        }
    }

    /// First link feeding `pin_id` on `node_id`.
    pub fn incoming_link(&self, node_id: &str, pin_id: &str) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.to.node_id == node_id && l.to.pin_id == pin_id)
    }

    /// The link from `producer_id` into `consumer_id.pin_id`, if any.
    pub fn find_source_link(
        &self,
        producer_id: &str,
        consumer_id: &str,
        pin_id: &str,
    ) -> Option<&Link> {
        self.links.iter().find(|l| {
            l.from.node_id == producer_id && l.to.node_id == consumer_id && l.to.pin_id == pin_id
        })
    }

    pub fn has_links(&self, node_id: &str) -> bool {
        self.links
            .iter()
            .any(|l| l.from.node_id == node_id || l.to.node_id == node_id)
    }
}

/// Stage I/O signature: a struct name and its ordered fields.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SignatureDesc {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDesc>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDesc {
    pub name: String,
    #[serde(rename = "valueType")]
    pub ty: String,
    #[serde(default)]
    pub semantic: Option<String>,
}

impl SignatureDesc {
    pub fn to_struct(&self, registry: &TypeRegistry) -> Struct {
        Struct {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(|f| {
                    let ty = registry.parse(&f.ty);
                    let ty = match &f.semantic {
                        Some(semantic) => ty.with_semantic(semantic),
                        None => ty,
                    };
                    StructField::new(f.name.clone(), ty)
                })
                .collect(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Everything one compilation needs: the graph, the root, the entry point and its I/O.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    #[serde(default = "default_version")]
    pub version: String,
    pub entry_name: String,
    pub root: String,
    pub input_signature: SignatureDesc,
    pub output_signature: SignatureDesc,
    #[serde(default)]
    pub define_input_struct: bool,
    #[serde(default)]
    pub define_output_struct: bool,
    #[serde(default)]
    pub options: GeneratorOptions,
    pub graph: ShaderGraph,
}

pub fn parse_request(text: &str) -> Result<CompileRequest> {
    serde_json::from_str(text).context("failed to parse compile request json")
}

pub fn load_request_from_path(path: impl AsRef<std::path::Path>) -> Result<CompileRequest> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read compile request at {}", path.display()))?;
    parse_request(&text).with_context(|| format!("in {}", path.display()))
}

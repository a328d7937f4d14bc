//! Per-compilation state: the variable table, node→operation mapping, slot dictionaries
//! and the link resolution every node compiler goes through.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, bail};
use log::{trace, warn};

use super::error::GeneratorError;
use super::table::{Operation, SamplerState, ShaderResourceView, Struct, VariableTable};
use super::types::{SType, SamplerType, TextureType, TypeRegistry};
use super::utils::{parenthesize, sanitize_ident, variable_base};
use crate::dsl::{Link, Node, NodeKind, Pin, ShaderGraph};

/// A resolved operand: the text to splice into an expression and its type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub ty: SType,
    /// Operation whose value this reads, for reference counting.
    pub source: Option<String>,
}

impl Definition {
    pub fn literal(text: impl Into<String>, ty: SType) -> Self {
        Self {
            name: text.into(),
            ty,
            source: None,
        }
    }
}

#[derive(Debug)]
pub struct GenerationContext {
    pub table: VariableTable,
    pub registry: TypeRegistry,
    mapping: HashMap<String, usize>,
    /// Texture node id → SRV slot.
    pub texture_slots: BTreeMap<String, u32>,
    /// Texture node id → sampler slot.
    pub sampler_slots: BTreeMap<String, u32>,
    pub input: Struct,
    pub output: Struct,
    /// Operation index of the stage input variable.
    pub input_var: Option<usize>,
    pub output_type: SType,
    pub inline: bool,
    input_node: Option<String>,
}

impl GenerationContext {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            table: VariableTable::new(),
            registry,
            mapping: HashMap::new(),
            texture_slots: BTreeMap::new(),
            sampler_slots: BTreeMap::new(),
            input: Struct::default(),
            output: Struct::default(),
            input_var: None,
            output_type: SType::unknown(),
            inline: false,
            input_node: None,
        }
    }

    pub fn reset(&mut self) {
        self.table.clear();
        self.mapping.clear();
        self.texture_slots.clear();
        self.sampler_slots.clear();
        self.input = Struct::default();
        self.output = Struct::default();
        self.input_var = None;
        self.output_type = SType::unknown();
        self.input_node = None;
    }

    /// Operation emitted for `node`.
    pub fn find(&self, node_id: &str) -> Option<&Operation> {
        self.mapping
            .get(node_id)
            .and_then(|&idx| self.table.operation(idx))
    }

    pub fn is_mapped(&self, node_id: &str) -> bool {
        self.mapping.contains_key(node_id)
    }

    pub fn input_var_name(&self) -> &str {
        self.input_var
            .and_then(|idx| self.table.operation(idx))
            .map(|op| op.name.as_str())
            .unwrap_or("input")
    }

    /// Struct declaration named `name`: the stage structs first, then the table.
    pub fn find_struct(&self, name: &str) -> Option<&Struct> {
        if self.input.name == name {
            return Some(&self.input);
        }
        if self.output.name == name {
            return Some(&self.output);
        }
        self.table.get_struct(name)
    }

    fn parse_type(&self, ty: Option<&str>) -> Option<SType> {
        ty.map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| self.registry.parse(t))
    }

    /// Value of `producer` as seen through its output pin `from_pin`.
    fn value_of(&self, producer: &Node, from_pin: Option<&Pin>) -> Result<Definition> {
        let Some(op) = self.find(&producer.id) else {
            bail!(GeneratorError::NotEmitted {
                node: producer.id.clone()
            });
        };
        let Some(ty) = op.ty.clone() else {
            bail!(GeneratorError::VoidValue {
                node: producer.id.clone()
            });
        };

        if let (NodeKind::Split { .. }, Some(pin)) = (&producer.kind, from_pin) {
            let component = ty
                .element()
                .map(SType::scalar)
                .unwrap_or_else(SType::unknown);
            return Ok(Definition {
                name: format!("{}.{}", op.name, pin.label()),
                ty: component,
                source: Some(op.name.clone()),
            });
        }

        if let (SType::Struct(struct_name), Some(pin)) = (&ty, from_pin) {
            match self.find_struct(struct_name) {
                Some(decl) => {
                    if let Some(field) = decl.field(pin.label()) {
                        return Ok(Definition {
                            name: format!("{}.{}", op.name, field.name),
                            ty: field.ty.without_semantic(),
                            source: Some(op.name.clone()),
                        });
                    }
                }
                // Declared outside this compilation: trust the pin name.
                None => {
                    return Ok(Definition {
                        name: format!("{}.{}", op.name, pin.label()),
                        ty: self.parse_type(pin.ty.as_deref()).unwrap_or_else(SType::unknown),
                        source: Some(op.name.clone()),
                    });
                }
            }
        }

        let name = if self.inline && op.can_inline() {
            parenthesize(&op.definition)
        } else {
            op.name.clone()
        };
        Ok(Definition {
            name,
            ty,
            source: Some(op.name.clone()),
        })
    }

    /// Value of `node` as a whole, not read through any particular pin.
    pub fn get_node_value(&self, node: &Node) -> Result<Definition> {
        self.value_of(node, None)
    }

    /// Resolve the value `producer` delivers into `consumer.pin`.
    pub fn get_variable(
        &self,
        graph: &ShaderGraph,
        pin: &Pin,
        consumer: &Node,
        producer: Option<&Node>,
    ) -> Result<Definition> {
        let Some(producer) = producer else {
            bail!(GeneratorError::UnresolvedLink {
                pin: pin.id.clone()
            });
        };
        match graph.find_source_link(&producer.id, &consumer.id, &pin.id) {
            Some(link) => self.value_of(producer, producer.pin(&link.from.pin_id)),
            // Only a struct value needs the link to know which field is read.
            None if self.produces_struct(producer) => bail!(GeneratorError::MissingSourceLink {
                pin: pin.id.clone(),
                producer: producer.id.clone(),
            }),
            None => self.value_of(producer, None),
        }
    }

    fn produces_struct(&self, producer: &Node) -> bool {
        self.find(&producer.id)
            .and_then(|op| op.ty.as_ref())
            .is_some_and(SType::is_struct)
    }

    pub fn try_get_variable(
        &self,
        graph: &ShaderGraph,
        pin: &Pin,
        consumer: &Node,
        producer: Option<&Node>,
    ) -> Option<Definition> {
        self.get_variable(graph, pin, consumer, producer).ok()
    }

    pub fn get_variable_from_link(&self, graph: &ShaderGraph, link: &Link) -> Result<Definition> {
        let producer = graph.find_node(&link.from.node_id)?;
        self.value_of(producer, producer.pin(&link.from.pin_id))
    }

    pub fn try_get_variable_from_link(
        &self,
        graph: &ShaderGraph,
        link: Option<&Link>,
    ) -> Option<Definition> {
        link.and_then(|l| self.get_variable_from_link(graph, l).ok())
    }

    /// Value of the first link into `pin`, or the pin's fallback when it is unconnected.
    pub fn get_variable_first_link(
        &self,
        graph: &ShaderGraph,
        node: &Node,
        pin: &Pin,
    ) -> Result<Definition> {
        match graph.incoming_link(&node.id, &pin.id) {
            Some(link) => self.get_variable_from_link(graph, link),
            None => Ok(self.pin_fallback(node, pin)),
        }
    }

    /// `None` when the pin is unconnected or its producer cannot be read.
    pub fn try_get_variable_first_link(
        &self,
        graph: &ShaderGraph,
        node: &Node,
        pin: &Pin,
    ) -> Option<Definition> {
        self.try_get_variable_from_link(graph, graph.incoming_link(&node.id, &pin.id))
    }

    /// Value of the `index`-th input pin of `node`.
    pub fn get_variable_link(
        &self,
        graph: &ShaderGraph,
        node: &Node,
        index: usize,
    ) -> Result<Definition> {
        match node.input(index) {
            Some(pin) => self.get_variable_first_link(graph, node, pin),
            None => {
                warn!(
                    "node {} has no input pin {index}, using literal 0",
                    node.id
                );
                Ok(Definition::literal("0", SType::unknown()))
            }
        }
    }

    /// Default literal for an unconnected pin, typed from the pin, then the node.
    fn pin_fallback(&self, node: &Node, pin: &Pin) -> Definition {
        let ty = self
            .parse_type(pin.ty.as_deref())
            .or_else(|| self.parse_type(node.kind.value_type()))
            .unwrap_or_else(SType::unknown);

        match pin.default_value.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Definition::literal(value, ty),
            _ => {
                if ty.is_unknown() {
                    warn!(
                        "pin {}.{} is unconnected and untyped, using literal 0",
                        node.id, pin.id
                    );
                }
                Definition::literal("0", ty)
            }
        }
    }

    fn bind(&mut self, node: &Node, operation: Operation) -> usize {
        let idx = self.table.add_variable(operation);
        self.mapping.insert(node.id.clone(), idx);
        if let Some(op) = self.table.operation(idx) {
            trace!("node {} ({}) -> {:?}", node.id, node.kind.label(), op.name);
        }
        idx
    }

    /// Declare a new local for `node`, named after the node (or `fallback`).
    pub fn add_variable(
        &mut self,
        node: &Node,
        fallback: &str,
        ty: SType,
        definition: impl Into<String>,
        allow_inline: bool,
    ) -> usize {
        let name = self
            .table
            .get_unique_name(&variable_base(&node.name, fallback));
        self.bind(
            node,
            Operation::new(Some(node.id.clone()), name, ty, definition, allow_inline),
        )
    }

    /// Emit `definition;` for `node` without binding a value.
    pub fn add_unnamed(&mut self, node: &Node, definition: impl Into<String>) -> usize {
        self.bind(node, Operation::unnamed(Some(node.id.clone()), definition))
    }

    /// Bind `node` to an existing name without emitting code.
    pub fn add_alias(&mut self, node: &Node, name: impl Into<String>, ty: SType) -> usize {
        self.bind(node, Operation::alias(Some(node.id.clone()), name, ty))
    }

    /// Bind the input placeholder node to the stage input variable. Only one may exist.
    pub fn bind_input(&mut self, node: &Node) -> Result<usize> {
        if self.input_node.is_some() {
            bail!(GeneratorError::DuplicateInput {
                node: node.id.clone()
            });
        }
        let Some(idx) = self.input_var else {
            bail!(GeneratorError::NotEmitted {
                node: node.id.clone()
            });
        };
        self.input_node = Some(node.id.clone());
        self.mapping.insert(node.id.clone(), idx);
        trace!("node {} (Input) -> {:?}", node.id, self.input_var_name());
        Ok(idx)
    }

    /// Count one use of every operand in `defs` by the operation at `consumer`.
    pub fn add_refs(&mut self, defs: &[Definition], consumer: usize) {
        let consumer = match self.table.operation(consumer) {
            Some(op) if !op.name.is_empty() => op.name.clone(),
            Some(op) => op.node.clone().unwrap_or_default(),
            None => return,
        };
        for def in defs {
            if let Some(source) = &def.source {
                self.table.add_ref(source, &consumer);
            }
        }
    }

    fn resource_suffix(node: &Node) -> String {
        let squashed: String = node.name.chars().filter(|c| !c.is_whitespace()).collect();
        if squashed.is_empty() {
            "Texture".to_string()
        } else {
            sanitize_ident(&squashed)
        }
    }

    /// Allocate `Srv<Name>` for a texture node and record its slot.
    pub fn add_srv(&mut self, node: &Node) -> String {
        let name = self
            .table
            .get_unique_name(&format!("Srv{}", Self::resource_suffix(node)));
        let srv = self.table.add_shader_resource_view(ShaderResourceView::new(
            name,
            SType::Texture(TextureType::Texture2D),
            Some(SType::float_n(4)),
        ));
        let (name, slot) = (srv.name.clone(), srv.slot);
        self.texture_slots.insert(node.id.clone(), slot);
        name
    }

    /// Allocate `Sampler<Name>` for a texture node and record its slot.
    pub fn add_sampler(&mut self, node: &Node) -> String {
        let name = self
            .table
            .get_unique_name(&format!("Sampler{}", Self::resource_suffix(node)));
        let sampler = self.table.add_sampler_state(SamplerState::new(
            name,
            SType::Sampler(SamplerType::SamplerState),
        ));
        let (name, slot) = (sampler.name.clone(), sampler.slot);
        self.sampler_slots.insert(node.id.clone(), slot);
        name
    }

    /// `func(arg0, arg1, ...)` bound to `node`; a statement when `ty` is `None`.
    /// Math calls count a reference on each operand.
    pub fn build_function_call(
        &mut self,
        defs: &[Definition],
        ty: Option<SType>,
        node: &Node,
        func: &str,
        is_math: bool,
    ) -> usize {
        let args: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        let expr = format!("{func}({})", args.join(", "));
        let idx = match ty {
            Some(ty) => self.add_variable(node, func, ty, expr, true),
            None => self.add_unnamed(node, expr),
        };
        if is_math {
            self.add_refs(defs, idx);
        }
        idx
    }

    /// `lhs OP rhs`, casting each operand that differs from `ty` when the operands are
    /// mismatched non-scalars.
    pub fn build_operator_call(
        &mut self,
        left: &Definition,
        right: &Definition,
        ty: SType,
        node: &Node,
        op: &str,
    ) -> Result<usize> {
        let expr = if SType::need_cast_per_component_math(&left.ty, &right.ty) {
            format!(
                "{}{} {op} {}{}",
                SType::from_cast_to(&left.ty, &ty)?,
                left.name,
                SType::from_cast_to(&right.ty, &ty)?,
                right.name
            )
        } else {
            format!("{} {op} {}", left.name, right.name)
        };
        let idx = self.add_variable(node, "op", ty, expr, true);
        self.add_refs(&[left.clone(), right.clone()], idx);
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::types::ScalarType;

    fn ctx() -> GenerationContext {
        GenerationContext::new(TypeRegistry::new())
    }

    #[test]
    fn test_unconnected_pin_uses_default() {
        let ctx = ctx();
        let node = Node::new("n", "N", NodeKind::Pack { ty: "float2".into() })
            .with_pin(Pin::input("x", "x").with_type("float").with_default("0.25"))
            .with_pin(Pin::input("y", "y"));
        let graph = ShaderGraph::new(vec![node.clone()], vec![]);

        let x = ctx.get_variable_link(&graph, &node, 0).unwrap();
        assert_eq!(x, Definition::literal("0.25", SType::float()));

        // No pin type: the node's declared type is used.
        let y = ctx.get_variable_link(&graph, &node, 1).unwrap();
        assert_eq!(y, Definition::literal("0", SType::float_n(2)));

        // No such pin.
        let z = ctx.get_variable_link(&graph, &node, 7).unwrap();
        assert_eq!(z, Definition::literal("0", SType::unknown()));
    }

    #[test]
    fn test_untyped_fallback_is_unknown_zero() {
        let ctx = ctx();
        let node = Node::new("v", "V", NodeKind::FuncCallVoid { func: "clip".into() })
            .with_pin(Pin::input("a", "a"));
        let graph = ShaderGraph::new(vec![node.clone()], vec![]);
        let def = ctx.get_variable_link(&graph, &node, 0).unwrap();
        assert_eq!(def.name, "0");
        assert!(def.ty.is_unknown());
    }

    #[test]
    fn test_get_variable_without_producer_fails() {
        let ctx = ctx();
        let node = Node::new("n", "N", NodeKind::Output).with_pin(Pin::input("p", "p"));
        let graph = ShaderGraph::new(vec![node.clone()], vec![]);
        let err = ctx
            .get_variable(&graph, &node.pins[0], &node, None)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<GeneratorError>(),
            Some(&GeneratorError::UnresolvedLink {
                pin: "p".to_string()
            })
        );
        assert!(ctx.try_get_variable(&graph, &node.pins[0], &node, None).is_none());
        assert!(ctx.try_get_variable_first_link(&graph, &node, &node.pins[0]).is_none());
    }

    #[test]
    fn test_get_variable_missing_source_link() {
        let mut ctx = ctx();
        ctx.input = Struct::new("Surface").with_field("albedo", SType::float_n(3));
        let producer = Node::new("s", "Surf", NodeKind::FuncCall {
            func: "surface".into(),
            ty: "Surface".into(),
        })
        .with_pin(Pin::output("albedo", "albedo"));
        let consumer = Node::new("n", "N", NodeKind::Output).with_pin(Pin::input("p", "p"));
        let graph = ShaderGraph::new(vec![producer.clone(), consumer.clone()], vec![]);
        ctx.add_variable(&producer, "call", SType::structure("Surface"), "surface()", true);

        let err = ctx
            .get_variable(&graph, &consumer.pins[0], &consumer, Some(&producer))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GeneratorError>(),
            Some(GeneratorError::MissingSourceLink { .. })
        ));

        let graph = ShaderGraph::new(
            vec![producer.clone(), consumer.clone()],
            vec![Link::new("s", "albedo", "n", "p")],
        );
        let def = ctx
            .get_variable(&graph, &consumer.pins[0], &consumer, Some(&producer))
            .unwrap();
        assert_eq!(def.name, "surf.albedo");
        assert_eq!(def.ty, SType::float_n(3));
    }

    #[test]
    fn test_get_variable_scalar_producer_needs_no_link() {
        let mut ctx = ctx();
        let producer = Node::new("c", "C", NodeKind::Constant { ty: "float".into() })
            .with_pin(Pin::output("o", "o").with_default("1.0"));
        let consumer = Node::new("n", "N", NodeKind::Output).with_pin(Pin::input("p", "p"));
        let graph = ShaderGraph::new(vec![producer.clone(), consumer.clone()], vec![]);
        ctx.add_variable(&producer, "constant", SType::float(), "1.0", true);

        let def = ctx
            .get_variable(&graph, &consumer.pins[0], &consumer, Some(&producer))
            .unwrap();
        assert_eq!(def.name, "c");
        assert_eq!(def.ty, SType::float());
        assert_eq!(def.source.as_deref(), Some("c"));
    }

    #[test]
    fn test_unregistered_struct_field_is_still_accessed() {
        let mut ctx = ctx();
        let surf = Node::new("s", "Surf", NodeKind::FuncCall {
            func: "sample_surface".into(),
            ty: "Surface".into(),
        })
        .with_pin(Pin::output("albedo", "albedo").with_type("float3"))
        .with_pin(Pin::output("rough", "rough"));
        let consumer = Node::new("n", "N", NodeKind::Output)
            .with_pin(Pin::input("a", "a"))
            .with_pin(Pin::input("b", "b"));
        let graph = ShaderGraph::new(
            vec![surf.clone(), consumer.clone()],
            vec![Link::new("s", "albedo", "n", "a"), Link::new("s", "rough", "n", "b")],
        );
        ctx.add_variable(&surf, "call", SType::structure("Surface"), "sample_surface()", true);

        let albedo = ctx.get_variable_link(&graph, &consumer, 0).unwrap();
        assert_eq!(albedo.name, "surf.albedo");
        assert_eq!(albedo.ty, SType::float_n(3));

        let rough = ctx.get_variable_link(&graph, &consumer, 1).unwrap();
        assert_eq!(rough.name, "surf.rough");
        assert!(rough.ty.is_unknown());
    }

    #[test]
    fn test_struct_producer_reads_field() {
        let mut ctx = ctx();
        ctx.input = Struct::new("PixelInput").with_field("tex", SType::float_n(2));
        let input = Node::new("in", "Input", NodeKind::Input).with_pin(Pin::output("tex", "tex"));
        let consumer = Node::new("n", "N", NodeKind::Output).with_pin(Pin::input("p", "p"));
        let graph = ShaderGraph::new(
            vec![input.clone(), consumer.clone()],
            vec![Link::new("in", "tex", "n", "p")],
        );
        ctx.input_var = Some(ctx.table.add_variable(Operation::alias(
            None,
            "pixelinput",
            SType::structure("PixelInput"),
        )));
        ctx.bind_input(&input).unwrap();

        let def = ctx.get_variable_link(&graph, &consumer, 0).unwrap();
        assert_eq!(def.name, "pixelinput.tex");
        assert_eq!(def.ty, SType::float_n(2));

        let err = ctx.bind_input(&input).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GeneratorError>(),
            Some(GeneratorError::DuplicateInput { .. })
        ));
    }

    #[test]
    fn test_inline_substitutes_definition() {
        let mut ctx = ctx();
        let add = Node::new("a", "Add", NodeKind::Operator {
            op: "+".into(),
            ty: "float".into(),
        })
        .with_pin(Pin::output("o", "o"));
        let consumer = Node::new("n", "N", NodeKind::Output).with_pin(Pin::input("p", "p"));
        let graph = ShaderGraph::new(
            vec![add.clone(), consumer.clone()],
            vec![Link::new("a", "o", "n", "p")],
        );
        ctx.add_variable(&add, "op", SType::float(), "x + y", true);

        assert_eq!(ctx.get_variable_link(&graph, &consumer, 0).unwrap().name, "add");
        ctx.inline = true;
        let def = ctx.get_variable_link(&graph, &consumer, 0).unwrap();
        assert_eq!(def.name, "(x + y)");
        assert_eq!(def.source.as_deref(), Some("add"));
    }

    #[test]
    fn test_operator_casts_mismatched_vectors() {
        let mut ctx = ctx();
        let node = Node::new("m", "Mul", NodeKind::Operator {
            op: "*".into(),
            ty: "float3".into(),
        });
        let a = Definition::literal("a", SType::float_n(4));
        let b = Definition::literal("b", SType::float_n(3));
        let idx = ctx
            .build_operator_call(&a, &b, SType::float_n(3), &node, "*")
            .unwrap();
        assert_eq!(ctx.table.operation(idx).unwrap().definition, "(float3)a * b");

        let node = Node::new("s", "Scale", NodeKind::Operator {
            op: "*".into(),
            ty: "float3".into(),
        });
        let s = Definition::literal("s", SType::scalar(ScalarType::Float));
        let idx = ctx
            .build_operator_call(&b, &s, SType::float_n(3), &node, "*")
            .unwrap();
        assert_eq!(ctx.table.operation(idx).unwrap().definition, "b * s");
    }

    #[test]
    fn test_texture_resources_record_slots() {
        let mut ctx = ctx();
        let a = Node::new("t0", "Albedo Map", NodeKind::Texture);
        let b = Node::new("t1", "", NodeKind::Texture);
        assert_eq!(ctx.add_srv(&a), "SrvAlbedoMap");
        assert_eq!(ctx.add_sampler(&a), "SamplerAlbedoMap");
        assert_eq!(ctx.add_srv(&b), "SrvTexture");
        assert_eq!(ctx.texture_slots.get("t0"), Some(&0));
        assert_eq!(ctx.texture_slots.get("t1"), Some(&1));
        assert_eq!(ctx.sampler_slots.get("t0"), Some(&0));
    }
}

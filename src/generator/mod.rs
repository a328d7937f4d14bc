//! Shader graph to HLSL source compiler.
//!
//! [`ShaderGenerator::generate`] runs one compilation: it clears the symbol table, seeds the
//! reserved names, synthesizes the stage structs, emits one operation per linked node in
//! dependency order and assembles the header and entry point. It returns the source text
//! together with the texture and sampler slot maps the renderer binds against.

pub mod assembler;
pub mod context;
pub mod error;
pub mod keywords;
pub mod node_compiler;
pub mod table;
pub mod types;
pub mod utils;
pub mod writer;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

pub use assembler::EntryPoint;
pub use error::GeneratorError;

use crate::dsl::{CompileRequest, NodeKind, ShaderGraph};
use crate::graph::topo_sort;
use context::GenerationContext;
use keywords::KeywordSet;
use table::VariableTable;
use types::TypeRegistry;
use writer::CodeWriter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    /// Substitute inlinable operations at their use sites instead of declaring them.
    pub inline: bool,
    /// Semantic attached to an entry point that returns a single value.
    pub pixel_output_semantic: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            inline: false,
            pixel_output_semantic: "SV_TARGET".to_string(),
        }
    }
}

/// Result of one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledShader {
    pub source: String,
    /// Texture node id → SRV slot.
    pub texture_slots: BTreeMap<String, u32>,
    /// Texture node id → sampler slot.
    pub sampler_slots: BTreeMap<String, u32>,
}

type TableHook = Box<dyn FnMut(&mut VariableTable)>;

/// Compiles shader graphs. Not `Sync`: give each thread its own generator.
pub struct ShaderGenerator {
    context: GenerationContext,
    keywords: KeywordSet,
    options: GeneratorOptions,
    pre_build_table: Vec<TableHook>,
    post_build_table: Vec<TableHook>,
}

impl Default for ShaderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderGenerator {
    pub const VERSION_STRING: &'static str = "v1.0.0";
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_registry(TypeRegistry::new())
    }

    /// Generator over a custom type registry; the reserved names are derived from it.
    pub fn with_registry(registry: TypeRegistry) -> Self {
        let keywords = KeywordSet::hlsl(&registry);
        Self {
            context: GenerationContext::new(registry),
            keywords,
            options: GeneratorOptions::default(),
            pre_build_table: Vec::new(),
            post_build_table: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: KeywordSet) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn set_inline(&mut self, inline: bool) {
        self.options.inline = inline;
    }

    /// Runs right after the table is cleared, before reserved names and stage structs.
    /// Register constant buffers and UAVs here.
    pub fn on_pre_build_table(&mut self, hook: impl FnMut(&mut VariableTable) + 'static) {
        self.pre_build_table.push(Box::new(hook));
    }

    /// Runs after every node is emitted, before the source is assembled.
    pub fn on_post_build_table(&mut self, hook: impl FnMut(&mut VariableTable) + 'static) {
        self.post_build_table.push(Box::new(hook));
    }

    /// Compile `graph` into one entry point whose outputs come from the node `root`.
    pub fn generate(
        &mut self,
        graph: &ShaderGraph,
        root: &str,
        entry: &EntryPoint,
    ) -> Result<CompiledShader> {
        let ctx = &mut self.context;
        ctx.reset();
        ctx.inline = self.options.inline;

        for hook in &mut self.pre_build_table {
            hook(&mut ctx.table);
        }
        for name in self.keywords.iter() {
            ctx.table.add_keyword(name);
        }
        ctx.table.add_keyword(&entry.entry_name);
        // Declared function names are claimed before any local is named.
        for node in &graph.nodes {
            if let NodeKind::FuncCallDeclaration { method, .. } = &node.kind {
                ctx.table
                    .reserve_method(method)
                    .with_context(|| format!("failed to declare function for node {}", node.id))?;
            }
        }
        assembler::define_io_structs(ctx, entry);

        let root = graph.find_node(root).context("root node")?;
        let order = topo_sort(graph)?;
        for node in &order {
            node_compiler::compile_node(ctx, graph, node)
                .with_context(|| format!("failed to compile node {}", node.id))?;
        }
        // A root without links still has to produce a value.
        if root.kind != NodeKind::Output && !ctx.is_mapped(&root.id) {
            node_compiler::compile_node(ctx, graph, root)
                .with_context(|| format!("failed to compile root node {}", root.id))?;
        }

        for hook in &mut self.post_build_table {
            hook(&mut ctx.table);
        }

        let mut w = CodeWriter::new();
        ctx.table.build(&mut w);
        assembler::build_body(
            ctx,
            graph,
            root,
            &entry.entry_name,
            &self.options.pixel_output_semantic,
            &mut w,
        )?;

        debug!(
            "generated {}: {} nodes, {} emitted, inline={}",
            entry.entry_name,
            graph.nodes.len(),
            order.len(),
            ctx.inline
        );

        Ok(CompiledShader {
            source: w.into_string(),
            texture_slots: ctx.texture_slots.clone(),
            sampler_slots: ctx.sampler_slots.clone(),
        })
    }

    /// Compile a JSON compile request, adopting its options.
    pub fn compile_request(&mut self, request: &CompileRequest) -> Result<CompiledShader> {
        self.options = request.options.clone();
        let registry = &self.context.registry;
        let entry = EntryPoint::new(
            request.entry_name.clone(),
            request.input_signature.to_struct(registry),
            request.output_signature.to_struct(registry),
        )
        .define_structs(request.define_input_struct, request.define_output_struct);
        self.generate(&request.graph, &request.root, &entry)
    }

    /// Symbol table of the last compilation.
    pub fn table(&self) -> &VariableTable {
        &self.context.table
    }

    pub fn texture_mapping(&self) -> &BTreeMap<String, u32> {
        &self.context.texture_slots
    }

    pub fn sampler_mapping(&self) -> &BTreeMap<String, u32> {
        &self.context.sampler_slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{Link, Node, Pin};
    use crate::generator::node_compiler::test_utils::{constant, input_node, output_node};
    use crate::generator::table::{ConstantBuffer, StructField, Struct};
    use crate::generator::types::SType;

    fn scalar_entry() -> EntryPoint {
        EntryPoint::new(
            "main",
            Struct::new("PixelInput")
                .with_field("pos", SType::float_n(4).with_semantic("SV_POSITION"))
                .with_field("tex", SType::float_n(2)),
            Struct::new("Output").with_field("Value", SType::float()),
        )
    }

    fn add_graph() -> ShaderGraph {
        let add = Node::new("add", "Add", NodeKind::Operator {
            op: "+".to_string(),
            ty: "float".to_string(),
        })
        .with_pin(Pin::input("a", "a"))
        .with_pin(Pin::input("b", "b"))
        .with_pin(Pin::output("out", "out"));
        ShaderGraph::new(
            vec![
                constant("x", "X", "float", "1.0"),
                constant("y", "Y", "float", "2.0"),
                add,
                output_node("o", &["Value"]),
            ],
            vec![
                Link::new("x", "out", "add", "a"),
                Link::new("y", "out", "add", "b"),
                Link::new("add", "out", "o", "Value"),
            ],
        )
    }

    #[test]
    fn test_generate_scalar_chain() {
        let mut generator = ShaderGenerator::new();
        let out = generator.generate(&add_graph(), "o", &scalar_entry()).unwrap();
        let expected = "\
float main(PixelInput pixelinput) : SV_TARGET
{
    float x = 1.0;
    float y = 2.0;
    float add = x + y;
    return add;
}
";
        assert_eq!(out.source, expected);
        assert!(out.texture_slots.is_empty());
    }

    #[test]
    fn test_generate_inline() {
        let mut generator = ShaderGenerator::new().with_options(GeneratorOptions {
            inline: true,
            ..GeneratorOptions::default()
        });
        let out = generator.generate(&add_graph(), "o", &scalar_entry()).unwrap();
        let expected = "\
float main(PixelInput pixelinput) : SV_TARGET
{
    return (1.0 + 2.0);
}
";
        assert_eq!(out.source, expected);
    }

    #[test]
    fn test_keywords_are_not_reused() {
        let mut generator = ShaderGenerator::new();
        let graph = ShaderGraph::new(
            vec![constant("c", "Float", "float", "0.5"), output_node("o", &["Value"])],
            vec![Link::new("c", "out", "o", "Value")],
        );
        let out = generator.generate(&graph, "o", &scalar_entry()).unwrap();
        assert!(out.source.contains("float float0 = 0.5;"));
    }

    #[test]
    fn test_custom_keyword_set() {
        let mut keywords = KeywordSet::empty();
        keywords.insert("x");
        let mut generator = ShaderGenerator::new().with_keywords(keywords);
        let out = generator.generate(&add_graph(), "o", &scalar_entry()).unwrap();
        assert!(out.source.contains("float x0 = 1.0;"));
        assert!(out.source.contains("float add = x0 + y;"));
    }

    fn declared_call_graph(method: &str) -> ShaderGraph {
        let source = format!("float {method}(float3 c)\n{{\n    return c.g;\n}}");
        let call = Node::new("r", "Result", NodeKind::FuncCallDeclaration {
            method: method.to_string(),
            ty: Some("float".to_string()),
            source,
        })
        .with_pin(Pin::input("c", "c"))
        .with_pin(Pin::output("out", "out"));
        ShaderGraph::new(
            vec![
                constant("col", "Luma", "float3", "float3(1.0, 1.0, 1.0)"),
                call,
                output_node("o", &["Value"]),
            ],
            vec![
                Link::new("col", "out", "r", "c"),
                Link::new("r", "out", "o", "Value"),
            ],
        )
    }

    #[test]
    fn test_declared_function_name_is_claimed_before_locals() {
        let mut generator = ShaderGenerator::new();
        let out = generator
            .generate(&declared_call_graph("luma"), "o", &scalar_entry())
            .unwrap();
        assert!(!out.source.contains("float3 luma = "));
        assert!(out.source.contains("float3 luma0 = float3(1.0, 1.0, 1.0);"));
        assert!(out.source.contains("float result = luma(luma0);"));
        assert!(out.source.starts_with("// Functions\nfloat luma(float3 c)\n"));
    }

    #[test]
    fn test_declared_function_cannot_shadow_keyword() {
        let mut generator = ShaderGenerator::new();
        let err = generator
            .generate(&declared_call_graph("float"), "o", &scalar_entry())
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<GeneratorError>(),
            Some(&GeneratorError::NameTaken {
                name: "float".to_string()
            })
        );
    }

    #[test]
    fn test_hooks_register_resources() {
        let mut generator = ShaderGenerator::new();
        generator.on_pre_build_table(|table| {
            table.add_constant_buffer(ConstantBuffer::new(
                "MaterialParams",
                vec![StructField::new("tint", SType::float_n(4))],
            ));
        });
        generator.on_post_build_table(|table| {
            assert!(table.operation_count() > 0);
        });
        let out = generator.generate(&add_graph(), "o", &scalar_entry()).unwrap();
        assert!(out.source.starts_with(
            "// Constant Buffers\ncbuffer MaterialParams : register(b0)\n{\n    float4 tint;\n};\n\n"
        ));
    }

    #[test]
    fn test_table_is_cleared_between_runs() {
        let mut generator = ShaderGenerator::new();
        let first = generator.generate(&add_graph(), "o", &scalar_entry()).unwrap();
        let second = generator.generate(&add_graph(), "o", &scalar_entry()).unwrap();
        assert_eq!(first, second);
        assert_eq!(generator.table().operation_by_name("x").unwrap().refs, 1);
        assert_eq!(generator.table().operation_by_name("add").unwrap().refs, 0);
    }

    #[test]
    fn test_unlinked_non_output_root_is_compiled() {
        let mut generator = ShaderGenerator::new();
        let graph = ShaderGraph::new(vec![constant("c", "Value", "float", "0.5")], vec![]);
        let out = generator.generate(&graph, "c", &scalar_entry()).unwrap();
        assert!(out.source.contains("float value = 0.5;\n    return value;"));
    }

    #[test]
    fn test_unknown_root_fails() {
        let mut generator = ShaderGenerator::new();
        let err = generator
            .generate(&add_graph(), "nope", &scalar_entry())
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<GeneratorError>(),
            Some(&GeneratorError::MissingNode {
                node: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_input_node_fields() {
        let mut generator = ShaderGenerator::new();
        let entry = EntryPoint::new(
            "main",
            Struct::new("PixelInput").with_field("tex", SType::float_n(2)),
            Struct::new("Output").with_field("Value", SType::float_n(2)),
        )
        .define_structs(true, false);
        let graph = ShaderGraph::new(
            vec![input_node("in"), output_node("o", &["Value"])],
            vec![Link::new("in", "tex", "o", "Value")],
        );
        let out = generator.generate(&graph, "o", &entry).unwrap();
        let expected = "\
// Structures
struct PixelInput
{
    float2 tex;
};

float2 main(PixelInput pixelinput) : SV_TARGET
{
    return pixelinput.tex;
}
";
        assert_eq!(out.source, expected);
    }
}

use std::collections::HashSet;

use node_forge_shadergen::dsl::{Link, Node, NodeKind, Pin, ShaderGraph};
use node_forge_shadergen::generator::keywords::{INTRINSICS, KEYWORDS};
use node_forge_shadergen::generator::table::{ConstantBuffer, Struct, StructField};
use node_forge_shadergen::generator::types::SType;
use node_forge_shadergen::generator::{CompiledShader, EntryPoint, ShaderGenerator};
use proptest::prelude::*;

const NAMES: &[&str] = &["Value", "Add", "float", "Color", "", "Tint"];
const OPS: &[&str] = &["+", "-", "*", "/"];
/// Declared function names; each one collides with a lower-cased node name above.
const METHODS: &[&str] = &["value", "add", "color", "tint"];

#[derive(Debug, Clone)]
struct GraphShape {
    constants: usize,
    textures: usize,
    /// (method index, input seed)
    declarations: Vec<(usize, usize)>,
    /// (name index, left seed, right seed, op index)
    operators: Vec<(usize, usize, usize, usize)>,
}

fn shape() -> impl Strategy<Value = GraphShape> {
    (
        1usize..4,
        0usize..3,
        prop::collection::vec((0usize..4, any::<usize>()), 0..3),
        prop::collection::vec((0usize..6, any::<usize>(), any::<usize>(), 0usize..4), 1..10),
    )
        .prop_map(|(constants, textures, declarations, operators)| GraphShape {
            constants,
            textures,
            declarations,
            operators,
        })
}

fn build_graph(shape: &GraphShape) -> ShaderGraph {
    let mut nodes = Vec::new();
    let mut links = Vec::new();
    let mut sources: Vec<(String, &str)> = Vec::new();

    for i in 0..shape.constants {
        let id = format!("c{i}");
        nodes.push(
            Node::new(&id, NAMES[i % NAMES.len()], NodeKind::Constant { ty: "float4".into() })
                .with_pin(
                    Pin::output("out", "out")
                        .with_type("float4")
                        .with_default("float4(1.0, 1.0, 1.0, 1.0)"),
                ),
        );
        sources.push((id, "out"));
    }
    for i in 0..shape.textures {
        let id = format!("t{i}");
        nodes.push(
            Node::new(&id, "Albedo", NodeKind::Texture)
                .with_pin(
                    Pin::input("uv", "uv")
                        .with_type("float2")
                        .with_default("float2(0.0, 0.0)"),
                )
                .with_pin(Pin::output("color", "color")),
        );
        sources.push((id, "color"));
    }
    for (i, (method, seed)) in shape.declarations.iter().enumerate() {
        let id = format!("f{i}");
        let method = METHODS[*method];
        nodes.push(
            Node::new(&id, NAMES[(i + 1) % NAMES.len()], NodeKind::FuncCallDeclaration {
                method: method.to_string(),
                ty: Some("float4".into()),
                source: format!("float4 {method}(float4 v)\n{{\n    return v;\n}}"),
            })
            .with_pin(Pin::input("v", "v"))
            .with_pin(Pin::output("out", "out")),
        );
        let (from, from_pin) = &sources[seed % sources.len()];
        links.push(Link::new(from, from_pin, &id, "v"));
        sources.push((id, "out"));
    }
    for (i, (name, left, right, op)) in shape.operators.iter().enumerate() {
        let id = format!("op{i}");
        nodes.push(
            Node::new(&id, NAMES[*name], NodeKind::Operator {
                op: OPS[*op].to_string(),
                ty: "float4".into(),
            })
            .with_pin(Pin::input("a", "a"))
            .with_pin(Pin::input("b", "b"))
            .with_pin(Pin::output("out", "out")),
        );
        let (l, lp) = &sources[left % sources.len()];
        let (r, rp) = &sources[right % sources.len()];
        links.push(Link::new(l, lp, &id, "a"));
        links.push(Link::new(r, rp, &id, "b"));
        sources.push((id, "out"));
    }

    let (last, last_pin) = &sources[sources.len() - 1];
    links.push(Link::new(last, last_pin, "out", "Value"));
    nodes.push(Node::new("out", "Output", NodeKind::Output).with_pin(Pin::input("Value", "Value")));
    ShaderGraph::new(nodes, links)
}

fn entry() -> EntryPoint {
    EntryPoint::new(
        "main",
        Struct::new("PixelInput").with_field("pos", SType::float_n(4).with_semantic("SV_POSITION")),
        Struct::new("Output").with_field("Value", SType::float_n(4)),
    )
}

fn compile(graph: &ShaderGraph, inline: bool) -> (ShaderGenerator, CompiledShader) {
    let mut generator = ShaderGenerator::new();
    generator.set_inline(inline);
    // Same name an unnamed operator would take.
    generator.on_pre_build_table(|table| {
        table.add_constant_buffer(ConstantBuffer::new(
            "op",
            vec![StructField::new("scale", SType::float_n(4))],
        ));
    });
    let compiled = generator
        .generate(graph, "out", &entry())
        .unwrap_or_else(|e| panic!("compile failed: {e:#}"));
    (generator, compiled)
}

fn declaration_line(lines: &[&str], name: &str) -> Option<usize> {
    lines
        .iter()
        .position(|l| l.split_whitespace().nth(1) == Some(name) && l.contains(" = "))
}

proptest! {
    #[test]
    fn generation_is_deterministic(shape in shape(), inline in any::<bool>()) {
        let graph = build_graph(&shape);
        let (_, first) = compile(&graph, inline);
        let (_, second) = compile(&graph, inline);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn emitted_names_are_unique_and_unreserved(shape in shape()) {
        let graph = build_graph(&shape);
        let (generator, _) = compile(&graph, false);
        let table = generator.table();

        let mut names: Vec<&str> = table
            .operations()
            .iter()
            .filter(|op| op.emits_code() && !op.name.is_empty())
            .map(|op| op.name.as_str())
            .collect();
        names.extend(table.shader_resource_views().iter().map(|r| r.name.as_str()));
        names.extend(table.samplers().iter().map(|r| r.name.as_str()));
        names.extend(table.structs().iter().map(|s| s.name.as_str()));
        names.extend(table.constant_buffers().iter().map(|c| c.name.as_str()));
        names.extend(table.functions().iter().map(|f| f.name.as_str()));

        let unique: HashSet<&str> = names.iter().copied().collect();
        prop_assert_eq!(unique.len(), names.len());
        for name in &names {
            prop_assert!(!KEYWORDS.contains(name) && !INTRINSICS.contains(name), "{} is reserved", name);
            prop_assert_ne!(*name, "main");
        }
    }

    #[test]
    fn declarations_precede_their_uses(shape in shape()) {
        let graph = build_graph(&shape);
        let (generator, compiled) = compile(&graph, false);
        let lines: Vec<&str> = compiled.source.lines().map(str::trim).collect();

        for op in generator.table().operations() {
            if !op.emits_code() {
                continue;
            }
            let producer = declaration_line(&lines, &op.name);
            prop_assert!(producer.is_some(), "{} not declared", op.name);
            for consumer in &op.consumers {
                let consumer_line = declaration_line(&lines, consumer);
                prop_assert!(consumer_line.is_some(), "{} not declared", consumer);
                prop_assert!(producer < consumer_line);
            }
        }
    }

    #[test]
    fn resource_slots_are_dense(shape in shape()) {
        let graph = build_graph(&shape);
        let (generator, compiled) = compile(&graph, false);
        let table = generator.table();

        let srv: Vec<u32> = table.shader_resource_views().iter().map(|r| r.slot).collect();
        let samplers: Vec<u32> = table.samplers().iter().map(|r| r.slot).collect();
        let expected: Vec<u32> = (0..srv.len() as u32).collect();
        prop_assert_eq!(&srv, &expected);
        prop_assert_eq!(&samplers, &expected);
        prop_assert_eq!(compiled.texture_slots.len(), srv.len());
        prop_assert!(srv.len() <= shape.textures);
    }

    #[test]
    fn inline_mode_declares_nothing_inlinable(shape in shape()) {
        let graph = build_graph(&shape);
        let (_, compiled) = compile(&graph, true);
        let body: Vec<&str> = compiled
            .source
            .lines()
            .skip_while(|l| !l.starts_with("float4 main("))
            .collect();
        prop_assert!(!body.is_empty());
        prop_assert!(body.iter().all(|l| !l.contains(" = ")), "{:?}", body);
        prop_assert!(body.iter().any(|l| l.trim_start().starts_with("return ")));
    }
}

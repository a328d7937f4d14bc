//! Compiler for texture sample nodes.

use anyhow::Result;

use super::super::context::GenerationContext;
use super::super::types::SType;
use crate::dsl::{Node, ShaderGraph};

/// Compile a Texture node.
///
/// Every texture node gets its own SRV and sampler; identical textures on two nodes are
/// bound twice. The slots are recorded under the node id in the context's slot maps.
///
/// # Inputs
/// - pin 0: uv (`float2`)
///
/// # Output
/// - Type: `float4`
///
/// # Example
/// ```hlsl
/// float4 albedo = SrvAlbedo.Sample(SamplerAlbedo, pixelinput.tex);
/// ```
pub fn compile_texture(ctx: &mut GenerationContext, graph: &ShaderGraph, node: &Node) -> Result<usize> {
    let uv = ctx.get_variable_link(graph, node, 0)?;
    let srv = ctx.add_srv(node);
    let sampler = ctx.add_sampler(node);
    let idx = ctx.add_variable(
        node,
        "texture",
        SType::float_n(4),
        format!("{srv}.Sample({sampler}, {})", uv.name),
        true,
    );
    ctx.add_refs(&[uv], idx);
    Ok(idx)
}

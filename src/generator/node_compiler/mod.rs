//! Node compiler dispatch.
//!
//! Every node kind maps to exactly one compile function; the match below is exhaustive,
//! so adding a kind to [`NodeKind`] without a compiler does not build.

pub mod input_nodes;
pub mod math_nodes;
pub mod texture_nodes;
pub mod vector_nodes;

use anyhow::Result;

use super::context::GenerationContext;
use crate::dsl::{Node, NodeKind, ShaderGraph};

/// Emit the operation for one node. Returns the operation index, or `None` for the
/// output node, which is consumed by the assembler instead.
pub fn compile_node(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
) -> Result<Option<usize>> {
    let idx = match &node.kind {
        NodeKind::Texture => texture_nodes::compile_texture(ctx, graph, node)?,

        NodeKind::Operator { op, ty } => math_nodes::compile_operator(ctx, graph, node, op, ty)?,
        NodeKind::FuncCall { func, ty } => {
            math_nodes::compile_func_call(ctx, graph, node, func, ty)?
        }
        NodeKind::FuncCallVoid { func } => {
            math_nodes::compile_func_call_void(ctx, graph, node, func)?
        }
        NodeKind::FuncCallDeclaration { method, ty, source } => {
            math_nodes::compile_func_call_declaration(
                ctx,
                graph,
                node,
                method,
                ty.as_deref(),
                source,
            )?
        }

        NodeKind::Convert { value } => vector_nodes::compile_convert(ctx, graph, node, *value)?,
        NodeKind::ComponentMask { mask, ty } => {
            vector_nodes::compile_component_mask(ctx, graph, node, mask, ty)?
        }
        NodeKind::Pack { ty } => vector_nodes::compile_pack(ctx, graph, node, ty)?,
        NodeKind::Split { ty } => vector_nodes::compile_split(ctx, graph, node, ty)?,

        NodeKind::Constant { ty } => input_nodes::compile_constant(ctx, node, ty)?,
        NodeKind::Input => input_nodes::compile_input(ctx, node)?,

        NodeKind::Output => return Ok(None),
    };
    Ok(Some(idx))
}

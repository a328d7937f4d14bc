//! Compilers for operator and function call nodes (Operator, FuncCall, FuncCallVoid,
//! FuncCallDeclaration).

use anyhow::Result;

use super::super::context::{Definition, GenerationContext};
use crate::dsl::{Node, ShaderGraph};

/// Resolve every input pin of `node`, in pin order.
fn resolve_inputs(
    ctx: &GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
) -> Result<Vec<Definition>> {
    node.inputs()
        .map(|pin| ctx.get_variable_first_link(graph, node, pin))
        .collect()
}

/// Compile an Operator node.
///
/// # Inputs
/// - pin 0: left operand
/// - pin 1: right operand
///
/// # Output
/// - Type: the node's declared type. When both operands are non-scalar and differ, each
///   operand whose type differs from the result is cast to it.
///
/// # Example
/// ```hlsl
/// float3 add = (float3)color + normal;
/// ```
pub fn compile_operator(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
    op: &str,
    ty: &str,
) -> Result<usize> {
    let left = ctx.get_variable_link(graph, node, 0)?;
    let right = ctx.get_variable_link(graph, node, 1)?;
    let ty = ctx.registry.parse(ty);
    ctx.build_operator_call(&left, &right, ty, node, op)
}

/// Compile a FuncCall node: `func(arg0, arg1, ...)` over all input pins.
pub fn compile_func_call(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
    func: &str,
    ty: &str,
) -> Result<usize> {
    let args = resolve_inputs(ctx, graph, node)?;
    let ty = ctx.registry.parse(ty);
    Ok(ctx.build_function_call(&args, Some(ty), node, func, true))
}

/// Compile a FuncCallVoid node into a bare statement, e.g. `clip(alpha);`.
pub fn compile_func_call_void(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
    func: &str,
) -> Result<usize> {
    let args = resolve_inputs(ctx, graph, node)?;
    Ok(ctx.build_function_call(&args, None, node, func, true))
}

/// Compile a FuncCallDeclaration node.
///
/// Registers the function body with the table the first time `method` is seen, then calls
/// it like a FuncCall. Operands are not reference counted: the call is opaque.
pub fn compile_func_call_declaration(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
    method: &str,
    ty: Option<&str>,
    source: &str,
) -> Result<usize> {
    ctx.table.define_method(method, source)?;
    let args = resolve_inputs(ctx, graph, node)?;
    let ty = ty
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| ctx.registry.parse(t));
    Ok(ctx.build_function_call(&args, ty, node, method, false))
}

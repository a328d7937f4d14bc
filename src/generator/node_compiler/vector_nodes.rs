//! Compilers for vector shaping nodes (Convert, ComponentMask, Pack, Split).

use anyhow::{Result, bail};

use super::super::context::GenerationContext;
use super::super::error::GeneratorError;
use super::super::types::SType;
use super::super::utils::{fmt_f32, parenthesize};
use crate::dsl::{Node, ShaderGraph};

/// Component count of a scalar/vector type keyword, 1 to 4.
fn float_arity(ctx: &GenerationContext, node: &Node, ty: &str) -> Result<u8> {
    match ctx.registry.parse(ty).components() {
        Some(n @ 1..=4) => Ok(n),
        _ => bail!(GeneratorError::UnsupportedType {
            node: node.id.clone(),
            ty: ty.to_string(),
        }),
    }
}

/// Compile a Convert node: widen a `float3` to `float4` with a constant last component.
///
/// # Example
/// ```hlsl
/// float4 convert = float4(color, 1.0);
/// ```
pub fn compile_convert(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
    value: f32,
) -> Result<usize> {
    let input = ctx.get_variable_link(graph, node, 0)?;
    let expr = format!("float4({}, {})", input.name, fmt_f32(value));
    let idx = ctx.add_variable(node, "convert", SType::float_n(4), expr, true);
    ctx.add_refs(&[input], idx);
    Ok(idx)
}

/// Compile a ComponentMask node: `value.mask`, typed `float`..`float4` after the
/// node's declared type.
pub fn compile_component_mask(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
    mask: &str,
    ty: &str,
) -> Result<usize> {
    let arity = float_arity(ctx, node, ty)?;
    let input = ctx.get_variable_link(graph, node, 0)?;
    let expr = format!("{}.{mask}", parenthesize(&input.name));
    let idx = ctx.add_variable(node, "mask", SType::float_n(arity), expr, true);
    ctx.add_refs(&[input], idx);
    Ok(idx)
}

/// Compile a Pack node: `floatN(x, y, ...)` over the first N input pins.
pub fn compile_pack(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
    ty: &str,
) -> Result<usize> {
    let arity = float_arity(ctx, node, ty)?;
    let out = SType::float_n(arity);
    let args = (0..arity as usize)
        .map(|i| ctx.get_variable_link(graph, node, i))
        .collect::<Result<Vec<_>>>()?;
    let names: Vec<&str> = args.iter().map(|d| d.name.as_str()).collect();
    let expr = format!("{}({})", out, names.join(", "));
    let idx = ctx.add_variable(node, "pack", out, expr, true);
    ctx.add_refs(&args, idx);
    Ok(idx)
}

/// Compile a Split node.
///
/// Emits nothing: the node is bound to its input's name so consumers can read components
/// directly through the output pins (`x`/`y`/`z`/`w` or `r`/`g`/`b`/`a`).
pub fn compile_split(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    node: &Node,
    ty: &str,
) -> Result<usize> {
    let input = ctx.get_variable_link(graph, node, 0)?;
    let declared = if ty.trim().is_empty() {
        SType::unknown()
    } else {
        ctx.registry.parse(ty)
    };
    let ty = if declared.is_unknown() {
        input.ty.clone()
    } else {
        declared
    };
    Ok(ctx.add_alias(node, parenthesize(&input.name), ty))
}

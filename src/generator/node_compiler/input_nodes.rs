//! Compilers for value source nodes (Constant, Input).

use anyhow::{Result, bail};
use log::warn;

use super::super::context::GenerationContext;
use super::super::error::GeneratorError;
use crate::dsl::Node;

/// Compile a Constant node into a named local holding the literal of its output pin.
///
/// # Output
/// - Type: the node's declared type, else the output pin's type.
///
/// # Example
/// ```hlsl
/// float roughness = 0.5;
/// ```
pub fn compile_constant(ctx: &mut GenerationContext, node: &Node, ty: &str) -> Result<usize> {
    let pin = node.outputs().next();
    let declared = if ty.trim().is_empty() {
        pin.and_then(|p| p.ty.as_deref()).unwrap_or("")
    } else {
        ty
    };
    if declared.trim().is_empty() {
        bail!(GeneratorError::UnsupportedType {
            node: node.id.clone(),
            ty: String::new(),
        });
    }
    let ty = ctx.registry.parse(declared);

    let value = match pin
        .and_then(|p| p.default_value.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        Some(v) => v.to_string(),
        None => {
            warn!("constant {} has no value, using literal 0", node.id);
            "0".to_string()
        }
    };

    Ok(ctx.add_variable(node, "constant", ty, value, true))
}

/// Compile the Input placeholder: binds the node to the stage input variable.
pub fn compile_input(ctx: &mut GenerationContext, node: &Node) -> Result<usize> {
    ctx.bind_input(node)
}

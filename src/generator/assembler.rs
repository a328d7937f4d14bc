//! Stage I/O struct synthesis and entry-point assembly.

use anyhow::Result;

use super::context::{Definition, GenerationContext};
use super::table::{Operation, Struct};
use super::types::SType;
use super::utils::variable_base;
use super::writer::CodeWriter;
use crate::dsl::{Node, NodeKind, ShaderGraph};

/// Entry point name and stage I/O of one compilation.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    pub entry_name: String,
    pub input: Struct,
    pub output: Struct,
    /// Declare the input struct in the header; otherwise it is assumed to exist.
    pub define_input_struct: bool,
    pub define_output_struct: bool,
}

impl EntryPoint {
    pub fn new(entry_name: impl Into<String>, input: Struct, output: Struct) -> Self {
        Self {
            entry_name: entry_name.into(),
            input,
            output,
            define_input_struct: false,
            define_output_struct: false,
        }
    }

    pub fn define_structs(mut self, input: bool, output: bool) -> Self {
        self.define_input_struct = input;
        self.define_output_struct = output;
        self
    }
}

/// The type the entry point returns: a single scalar/vector field when the output struct
/// is not declared here, the output struct otherwise.
fn output_type(entry: &EntryPoint) -> SType {
    if !entry.define_output_struct {
        if let [field] = entry.output.fields.as_slice() {
            if field.ty.is_scalar() || field.ty.is_vector() {
                return field.ty.without_semantic();
            }
        }
    }
    SType::structure(entry.output.name.clone())
}

/// Register the stage structs and the input variable every Input node aliases.
pub fn define_io_structs(ctx: &mut GenerationContext, entry: &EntryPoint) {
    let input = entry.input.clone();
    if entry.define_input_struct {
        ctx.table.add_struct(input.clone());
    } else {
        ctx.table.add_keyword(&input.name);
    }
    let var_name = ctx
        .table
        .get_unique_name(&variable_base(&input.name, "input"));
    ctx.input_var = Some(ctx.table.add_variable(Operation::alias(
        None,
        var_name,
        SType::structure(input.name.clone()),
    )));
    ctx.input = input;

    let output = entry.output.clone();
    ctx.output_type = output_type(entry);
    if ctx.output_type.is_struct() && output.name != ctx.input.name {
        if entry.define_output_struct {
            ctx.table.add_struct(output.clone());
        } else {
            ctx.table.add_keyword(&output.name);
        }
    }
    ctx.output = output;
}

/// Value written to output field `index`.
///
/// An Output root feeds fields from its input pins in order. Any other root returns its own
/// value when the entry point returns a single value, and feeds struct fields from its input
/// pins like an Output node.
fn root_value(
    ctx: &GenerationContext,
    graph: &ShaderGraph,
    root: &Node,
    index: usize,
) -> Result<Definition> {
    if root.kind != NodeKind::Output && !ctx.output_type.is_struct() {
        return ctx.get_node_value(root);
    }
    ctx.get_variable_link(graph, root, index)
}

fn write_root(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    root: &Node,
    w: &mut CodeWriter,
) -> Result<()> {
    if !ctx.output_type.is_struct() {
        let value = root_value(ctx, graph, root, 0)?;
        w.write_line(&format!("return {};", value.name));
        return Ok(());
    }

    let out_type = ctx.output_type.name();
    let name = if out_type == ctx.input.name {
        ctx.input_var_name().to_string()
    } else {
        let name = ctx
            .table
            .get_unique_name(&variable_base(&out_type, "output"));
        ctx.table.add_keyword(&name);
        w.write_line(&format!("{out_type} {name};"));
        name
    };

    for (i, field) in ctx.output.fields.iter().enumerate() {
        let value = root_value(ctx, graph, root, i)?;
        w.write_line(&format!("{name}.{} = {};", field.name, value.name));
    }
    w.write_line(&format!("return {name};"));
    Ok(())
}

/// Emit the entry point: signature, every non-inlined operation in table order, then the
/// root's output writes and `return`.
pub fn build_body(
    ctx: &mut GenerationContext,
    graph: &ShaderGraph,
    root: &Node,
    entry_name: &str,
    pixel_output_semantic: &str,
    w: &mut CodeWriter,
) -> Result<()> {
    let head = format!(
        "{} {}({} {})",
        ctx.output_type,
        entry_name,
        ctx.input.name,
        ctx.input_var_name()
    );
    let signature = if ctx.output_type.is_struct() {
        head
    } else {
        format!("{head} : {pixel_output_semantic}")
    };

    w.push_block(&signature);
    for op in ctx.table.operations() {
        if ctx.inline && op.can_inline() {
            continue;
        }
        op.append(w);
    }
    write_root(ctx, graph, root, w)?;
    w.pop_block("}");
    Ok(())
}

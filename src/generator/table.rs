//! Symbol table for one compilation.
//!
//! Owns every declared identifier (keywords, resources, structs, functions and local
//! operations), hands out collision-free names and allocates resource slots.

use std::collections::HashSet;

use log::debug;

use super::error::GeneratorError;
use super::types::SType;
use super::writer::CodeWriter;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructField {
    pub name: String,
    pub ty: SType,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: SType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    fn declaration(&self) -> String {
        match self.ty.semantic() {
            Some(semantic) => format!("{} {} : {};", self.ty.name(), self.name, semantic),
            None => format!("{} {};", self.ty.name(), self.name),
        }
    }
}

/// A named, ordered list of fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<StructField>,
}

impl Struct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: SType) -> Self {
        self.fields.push(StructField::new(name, ty));
        self
    }

    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn build(&self, w: &mut CodeWriter) {
        w.push_block(&format!("struct {}", self.name));
        for field in &self.fields {
            w.write_line(&field.declaration());
        }
        w.pop_block("};");
    }
}

/// A local variable bound to a graph node.
#[derive(Clone, Debug)]
pub struct Operation {
    /// Id of the node that produced this operation; `None` for the stage input variable.
    pub node: Option<String>,
    /// Declared name. Empty for operations that are emitted as bare statements.
    pub name: String,
    /// `None` for operations without a value (void calls).
    pub ty: Option<SType>,
    /// Expression text. Empty for aliases that emit nothing.
    pub definition: String,
    pub allow_inline: bool,
    pub refs: usize,
    /// Names of the operations that consumed this one, in order of use.
    pub consumers: Vec<String>,
}

impl Operation {
    pub fn new(
        node: Option<String>,
        name: impl Into<String>,
        ty: SType,
        definition: impl Into<String>,
        allow_inline: bool,
    ) -> Self {
        Self {
            node,
            name: name.into(),
            ty: Some(ty),
            definition: definition.into(),
            allow_inline,
            refs: 0,
            consumers: Vec::new(),
        }
    }

    /// A statement with no value, e.g. a call to a void function.
    pub fn unnamed(node: Option<String>, definition: impl Into<String>) -> Self {
        Self {
            node,
            name: String::new(),
            ty: None,
            definition: definition.into(),
            allow_inline: false,
            refs: 0,
            consumers: Vec::new(),
        }
    }

    /// A name binding that emits no code of its own.
    pub fn alias(node: Option<String>, name: impl Into<String>, ty: SType) -> Self {
        Self::new(node, name, ty, String::new(), false)
    }

    pub fn emits_code(&self) -> bool {
        !self.definition.is_empty()
    }

    /// Inline candidates: allowed by their builder and not struct-typed.
    pub fn can_inline(&self) -> bool {
        self.allow_inline && !self.ty.as_ref().is_some_and(SType::is_struct)
    }

    pub fn append(&self, w: &mut CodeWriter) {
        if !self.emits_code() {
            return;
        }
        match &self.ty {
            Some(ty) if !self.name.is_empty() => {
                w.write_line(&format!("{} {} = {};", ty.name(), self.name, self.definition));
            }
            _ => w.write_line(&format!("{};", self.definition)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderResourceView {
    pub name: String,
    pub ty: SType,
    /// Template element type, e.g. `float4` in `Texture2D<float4>`.
    pub element: Option<SType>,
    pub slot: u32,
}

impl ShaderResourceView {
    pub fn new(name: impl Into<String>, ty: SType, element: Option<SType>) -> Self {
        Self {
            name: name.into(),
            ty,
            element,
            slot: 0,
        }
    }

    pub fn build(&self, w: &mut CodeWriter) {
        w.write_line(&format!(
            "{} {} : register(t{});",
            templated(&self.ty, self.element.as_ref()),
            self.name,
            self.slot
        ));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerState {
    pub name: String,
    pub ty: SType,
    pub slot: u32,
}

impl SamplerState {
    pub fn new(name: impl Into<String>, ty: SType) -> Self {
        Self {
            name: name.into(),
            ty,
            slot: 0,
        }
    }

    pub fn build(&self, w: &mut CodeWriter) {
        w.write_line(&format!(
            "{} {} : register(s{});",
            self.ty.name(),
            self.name,
            self.slot
        ));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstantBuffer {
    pub name: String,
    pub fields: Vec<StructField>,
    pub slot: u32,
}

impl ConstantBuffer {
    pub fn new(name: impl Into<String>, fields: Vec<StructField>) -> Self {
        Self {
            name: name.into(),
            fields,
            slot: 0,
        }
    }

    pub fn build(&self, w: &mut CodeWriter) {
        w.push_block(&format!("cbuffer {} : register(b{})", self.name, self.slot));
        for field in &self.fields {
            w.write_line(&field.declaration());
        }
        w.pop_block("};");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnorderedAccessView {
    pub name: String,
    pub ty: SType,
    pub element: Option<SType>,
    pub slot: u32,
}

impl UnorderedAccessView {
    pub fn new(name: impl Into<String>, ty: SType, element: Option<SType>) -> Self {
        Self {
            name: name.into(),
            ty,
            element,
            slot: 0,
        }
    }

    pub fn build(&self, w: &mut CodeWriter) {
        w.write_line(&format!(
            "{} {} : register(u{});",
            templated(&self.ty, self.element.as_ref()),
            self.name,
            self.slot
        ));
    }
}

/// A user function registered by a declared-function node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub source: String,
}

impl FunctionDeclaration {
    pub fn build(&self, w: &mut CodeWriter) {
        for line in self.source.trim_end().lines() {
            w.write_line(line.trim_end());
        }
    }
}

fn templated(ty: &SType, element: Option<&SType>) -> String {
    match element {
        Some(element) => format!("{}<{}>", ty.name(), element.name()),
        None => ty.name(),
    }
}

#[derive(Default, Debug)]
pub struct VariableTable {
    unordered_access_views: Vec<UnorderedAccessView>,
    shader_resource_views: Vec<ShaderResourceView>,
    constant_buffers: Vec<ConstantBuffer>,
    samplers: Vec<SamplerState>,
    identifiers: HashSet<String>,
    /// Identifiers claimed by declared functions.
    methods: HashSet<String>,
    operations: Vec<Operation>,
    structs: Vec<Struct>,
    functions: Vec<FunctionDeclaration>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.unordered_access_views.clear();
        self.shader_resource_views.clear();
        self.constant_buffers.clear();
        self.samplers.clear();
        self.identifiers.clear();
        self.methods.clear();
        self.operations.clear();
        self.structs.clear();
        self.functions.clear();
    }

    /// Reserve a name without declaring anything.
    pub fn add_keyword(&mut self, name: &str) {
        self.identifiers.insert(name.to_string());
    }

    pub fn identifier_exists(&self, name: &str) -> bool {
        self.identifiers.contains(name)
    }

    /// First of `name`, `name0`, `name1`, ... that is not yet taken.
    pub fn get_unique_name(&self, name: &str) -> String {
        if !self.identifier_exists(name) {
            return name.to_string();
        }
        let mut suffix = 0usize;
        loop {
            let candidate = format!("{name}{suffix}");
            if !self.identifier_exists(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Register an operation and return its index in emission order.
    pub fn add_variable(&mut self, operation: Operation) -> usize {
        if !operation.name.is_empty() {
            self.identifiers.insert(operation.name.clone());
        }
        self.operations.push(operation);
        self.operations.len() - 1
    }

    pub fn add_struct(&mut self, s: Struct) -> &Struct {
        self.identifiers.insert(s.name.clone());
        self.structs.push(s);
        &self.structs[self.structs.len() - 1]
    }

    pub fn add_shader_resource_view(&mut self, mut srv: ShaderResourceView) -> &ShaderResourceView {
        self.identifiers.insert(srv.name.clone());
        srv.slot = self.shader_resource_views.len() as u32;
        debug!("srv {} -> t{}", srv.name, srv.slot);
        self.shader_resource_views.push(srv);
        &self.shader_resource_views[self.shader_resource_views.len() - 1]
    }

    pub fn add_sampler_state(&mut self, mut sampler: SamplerState) -> &SamplerState {
        self.identifiers.insert(sampler.name.clone());
        sampler.slot = self.samplers.len() as u32;
        debug!("sampler {} -> s{}", sampler.name, sampler.slot);
        self.samplers.push(sampler);
        &self.samplers[self.samplers.len() - 1]
    }

    pub fn add_constant_buffer(&mut self, mut cbuffer: ConstantBuffer) -> &ConstantBuffer {
        self.identifiers.insert(cbuffer.name.clone());
        cbuffer.slot = self.constant_buffers.len() as u32;
        debug!("cbuffer {} -> b{}", cbuffer.name, cbuffer.slot);
        self.constant_buffers.push(cbuffer);
        &self.constant_buffers[self.constant_buffers.len() - 1]
    }

    pub fn add_unordered_access_view(
        &mut self,
        mut uav: UnorderedAccessView,
    ) -> &UnorderedAccessView {
        self.identifiers.insert(uav.name.clone());
        uav.slot = self.unordered_access_views.len() as u32;
        debug!("uav {} -> u{}", uav.name, uav.slot);
        self.unordered_access_views.push(uav);
        &self.unordered_access_views[self.unordered_access_views.len() - 1]
    }

    /// Claim `name` for a declared function so no local or resource can take it.
    pub fn reserve_method(&mut self, name: &str) -> Result<(), GeneratorError> {
        if self.methods.contains(name) {
            return Ok(());
        }
        if self.identifier_exists(name) {
            return Err(GeneratorError::NameTaken {
                name: name.to_string(),
            });
        }
        self.identifiers.insert(name.to_string());
        self.methods.insert(name.to_string());
        Ok(())
    }

    /// Register a function body once. Returns `Ok(false)` when `name` was already defined.
    pub fn define_method(&mut self, name: &str, source: &str) -> Result<bool, GeneratorError> {
        if self.functions.iter().any(|f| f.name == name) {
            return Ok(false);
        }
        self.reserve_method(name)?;
        self.functions.push(FunctionDeclaration {
            name: name.to_string(),
            source: source.to_string(),
        });
        Ok(true)
    }

    /// Count one use of the operation named `name` by `consumer`.
    pub fn add_ref(&mut self, name: &str, consumer: &str) {
        if let Some(op) = self.operations.iter_mut().find(|op| op.name == name) {
            op.refs += 1;
            op.consumers.push(consumer.to_string());
        }
    }

    pub fn operation(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn operation_by_name(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn operation_by_node(&self, node_id: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.node.as_deref() == Some(node_id))
    }

    pub fn structs(&self) -> &[Struct] {
        &self.structs
    }

    pub fn get_struct(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn shader_resource_views(&self) -> &[ShaderResourceView] {
        &self.shader_resource_views
    }

    pub fn samplers(&self) -> &[SamplerState] {
        &self.samplers
    }

    pub fn constant_buffers(&self) -> &[ConstantBuffer] {
        &self.constant_buffers
    }

    pub fn unordered_access_views(&self) -> &[UnorderedAccessView] {
        &self.unordered_access_views
    }

    pub fn functions(&self) -> &[FunctionDeclaration] {
        &self.functions
    }

    /// Emit every declaration: UAVs, SRVs, samplers, structs, constant buffers, functions.
    /// Empty sections are skipped; each emitted section ends with a blank line.
    pub fn build(&self, w: &mut CodeWriter) {
        if !self.unordered_access_views.is_empty() {
            w.write_line("// Unordered Access Views");
            for uav in &self.unordered_access_views {
                uav.build(w);
            }
            w.blank_line();
        }
        if !self.shader_resource_views.is_empty() {
            w.write_line("// Shader Resource Views");
            for srv in &self.shader_resource_views {
                srv.build(w);
            }
            w.blank_line();
        }
        if !self.samplers.is_empty() {
            w.write_line("// Samplers");
            for sampler in &self.samplers {
                sampler.build(w);
            }
            w.blank_line();
        }
        if !self.structs.is_empty() {
            w.write_line("// Structures");
            for s in &self.structs {
                s.build(w);
            }
            w.blank_line();
        }
        if !self.constant_buffers.is_empty() {
            w.write_line("// Constant Buffers");
            for cbuffer in &self.constant_buffers {
                cbuffer.build(w);
            }
            w.blank_line();
        }
        if !self.functions.is_empty() {
            w.write_line("// Functions");
            for function in &self.functions {
                function.build(w);
            }
            w.blank_line();
        }
    }
}

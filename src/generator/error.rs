//! Failure kinds raised while compiling a shader graph.
//!
//! All fallible generator APIs return `anyhow::Result`; these variants are wrapped
//! so callers can `downcast_ref::<GeneratorError>()` when they need to tell them apart.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// A lookup was asked to resolve a pin that has no producer node.
    #[error("unresolved link into pin {pin}")]
    UnresolvedLink { pin: String },

    /// A consumer asked for a field of a struct-typed producer, but no link
    /// from that producer reaches the consumer pin.
    #[error("no link from {producer} into pin {pin}")]
    MissingSourceLink { pin: String, producer: String },

    /// A producer node was referenced before any operation was emitted for it.
    #[error("node {node} is referenced before it was emitted")]
    NotEmitted { node: String },

    /// A cast string was requested for a type that has no C-style cast form.
    #[error("invalid cast to {ty}")]
    InvalidCast { ty: String },

    #[error("cycle detected in shader graph at node {node}")]
    CycleDetected { node: String },

    #[error("link references missing node: {node}")]
    MissingNode { node: String },

    /// A declared function's name is already held by a keyword, resource or local.
    #[error("function name {name} is already declared")]
    NameTaken { name: String },

    #[error("graph has more than one input node (second: {node})")]
    DuplicateInput { node: String },

    /// The value of a void function call was consumed by another node.
    #[error("node {node} produces no value")]
    VoidValue { node: String },

    #[error("node {node}: unsupported value type {ty}")]
    UnsupportedType { node: String, ty: String },
}

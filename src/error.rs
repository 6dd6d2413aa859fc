//! Typed failures surfaced by the compiler and virtual machine.
//!
//! The evaluator does not use these: per its design, every evaluator
//! failure is a first-class `Object::Error` value (see [`crate::evaluator`])
//! rather than a `Result` error. These types cover the two surfaces that
//! *do* propagate as ordinary `Result`s: compilation and bytecode
//! execution.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("unsupported node for compilation: {0}")]
    UnsupportedNode(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VmError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("unsupported types for binary operation: {0} {1}")]
    UnsupportedBinaryTypes(String, String),

    #[error("unknown integer operator: {0}")]
    UnknownIntegerOperator(String),

    #[error("{0}")]
    Bytecode(String),
}

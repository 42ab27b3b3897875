//! Error type for graph construction and resolution.

use thiserror::Error;

use crate::graph::FunctionId;

/// Failures surfaced while building or resolving a [`FunctionGraph`](crate::FunctionGraph).
///
/// None of these are recoverable for the build request that triggered them: a
/// malformed graph never produces partial output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("no root functions requested")]
    EmptyRoots,

    #[error("function id {id} does not belong to this graph")]
    UnknownFunction { id: FunctionId },

    #[error("function #{index} has no recognizable header; give it an explicit name")]
    MissingFunctionName { index: usize },

    /// `cycle` lists the function names along the include chain, starting and
    /// ending with `function`.
    #[error("cyclic include of `{function}`: {}", .cycle.join(" -> "))]
    CyclicDependency { function: String, cycle: Vec<String> },

    /// Two nodes emit the same function. Overloads are told apart by parameter
    /// types; when either node has no readable header, `signature` is the bare
    /// function name and any shared name conflicts.
    #[error("`{signature}` is defined by both {first} and {second}")]
    ConflictingDefinition {
        signature: String,
        first: FunctionId,
        second: FunctionId,
    },
}

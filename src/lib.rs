//! Assembles shader function fragments into one program body.
//!
//! A [`FunctionGraph`] holds GLSL fragments, each defining one function, and
//! the functions each one includes. [`FunctionGraph::resolve`] expands a set of
//! root functions into a duplicate-free list ordered so every function follows
//! its includes, and [`CodeAssembler`] concatenates that list verbatim.
//!
//! ```ignore
//! use shader_function_graph::{CodeAssembler, catalog};
//!
//! let c = catalog::blinn_phong();
//! let glsl = CodeAssembler::new()
//!     .assemble_roots(&c.graph, &[c.re_direct_blinn_phong, c.re_indirect_diffuse_blinn_phong])?;
//! ```

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod resolve;
pub mod signature;
pub mod validation;

pub use assemble::CodeAssembler;
pub use error::AssemblyError;
pub use graph::{FunctionGraph, FunctionGraphBuilder, FunctionId, FunctionNode};
pub use resolve::Resolution;
pub use signature::FunctionSignature;

//! Concatenation of resolved fragments into one source blob.
//!
//! Fragments are copied byte for byte. Conditional-compilation directives are
//! left for whatever preprocessor consumes the output.

use crate::{
    error::AssemblyError,
    graph::{FunctionGraph, FunctionId},
    resolve::Resolution,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAssembler {
    /// Inserted between consecutive fragments.
    pub separator: String,
    /// Prefix each fragment with a `// <name>` line.
    pub annotate: bool,
    /// End a non-empty blob with `\n` if the last fragment doesn't.
    pub trailing_newline: bool,
}

impl Default for CodeAssembler {
    fn default() -> Self {
        Self {
            separator: "\n\n".to_string(),
            annotate: false,
            trailing_newline: true,
        }
    }
}

impl CodeAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assemble(&self, resolution: &Resolution<'_>) -> String {
        let capacity = resolution
            .nodes()
            .map(|n| n.source().len() + self.separator.len())
            .sum();
        let mut out = String::with_capacity(capacity);

        for (i, node) in resolution.nodes().enumerate() {
            if i > 0 {
                out.push_str(&self.separator);
            }
            if self.annotate {
                out.push_str("// ");
                out.push_str(node.name());
                out.push('\n');
            }
            out.push_str(node.source());
        }

        if self.trailing_newline && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    /// `resolve` followed by `assemble`.
    pub fn assemble_roots(
        &self,
        graph: &FunctionGraph,
        roots: &[FunctionId],
    ) -> Result<String, AssemblyError> {
        let resolution = graph.resolve(roots)?;
        Ok(self.assemble(&resolution))
    }
}

//! JSON description of a user function library.
//!
//! ```json
//! {
//!   "name": "toon",
//!   "functions": [
//!     { "id": "ramp", "sourcePath": "ramp.glsl" },
//!     { "id": "shade", "source": "vec3 shade() { ... }", "includes": ["ramp"] }
//!   ],
//!   "roots": ["shade"]
//! }
//! ```
//!
//! Ids are local to the manifest and may be referenced before they are
//! declared. `sourcePath` is relative to the manifest file.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::graph::{FunctionGraph, FunctionId, FunctionNode};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    pub functions: Vec<ManifestFunction>,
    #[serde(default)]
    pub roots: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFunction {
    pub id: String,
    /// Function name, when the header in the source can't be read.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    #[serde(default)]
    pub includes: Vec<String>,
}

/// A manifest turned into a frozen graph.
#[derive(Debug)]
pub struct LoadedLibrary {
    pub name: Option<String>,
    pub graph: FunctionGraph,
    pub ids: HashMap<String, FunctionId>,
    pub roots: Vec<FunctionId>,
}

impl LoadedLibrary {
    pub fn id(&self, manifest_id: &str) -> Option<FunctionId> {
        self.ids.get(manifest_id).copied()
    }
}

pub fn load_manifest_from_path(path: impl AsRef<Path>) -> Result<LoadedLibrary> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("invalid manifest json in {}", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest
        .build(base_dir)
        .with_context(|| format!("failed to build library from {}", path.display()))
}

impl Manifest {
    /// `base_dir` anchors relative `sourcePath` entries.
    pub fn build(&self, base_dir: &Path) -> Result<LoadedLibrary> {
        let mut builder = FunctionGraph::builder();
        let mut ids: HashMap<String, FunctionId> = HashMap::with_capacity(self.functions.len());

        for f in &self.functions {
            let source = f.load_source(base_dir)?;
            let node = match &f.name {
                Some(name) => FunctionNode::named(name.clone(), source),
                None => FunctionNode::new(source),
            };
            if node.signature().is_none() && f.name.is_none() {
                bail!(
                    "function `{}` has no recognizable header; set \"name\" explicitly",
                    f.id
                );
            }
            let id = builder.add(node);
            if ids.insert(f.id.clone(), id).is_some() {
                bail!("duplicate function id `{}`", f.id);
            }
        }

        for f in &self.functions {
            let includes = f
                .includes
                .iter()
                .map(|inc| {
                    ids.get(inc)
                        .copied()
                        .ok_or_else(|| anyhow!("function `{}` includes unknown id `{inc}`", f.id))
                })
                .collect::<Result<Vec<_>>>()?;
            builder.set_includes(ids[&f.id], includes);
        }

        let roots = self
            .roots
            .iter()
            .map(|r| {
                ids.get(r)
                    .copied()
                    .ok_or_else(|| anyhow!("unknown root id `{r}`"))
            })
            .collect::<Result<Vec<_>>>()?;

        let graph = builder.build()?;
        tracing::debug!(
            name = self.name.as_deref().unwrap_or("<unnamed>"),
            functions = graph.len(),
            roots = roots.len(),
            "loaded function library"
        );

        Ok(LoadedLibrary {
            name: self.name.clone(),
            graph,
            ids,
            roots,
        })
    }
}

impl ManifestFunction {
    fn load_source(&self, base_dir: &Path) -> Result<String> {
        match (&self.source, &self.source_path) {
            (Some(source), None) => Ok(source.clone()),
            (None, Some(rel)) => {
                let path = base_dir.join(rel);
                std::fs::read_to_string(&path).with_context(|| {
                    format!("failed to read source of `{}` from {}", self.id, path.display())
                })
            }
            (Some(_), Some(_)) => bail!("function `{}` sets both source and sourcePath", self.id),
            (None, None) => bail!("function `{}` needs source or sourcePath", self.id),
        }
    }
}

//! Arena of shader function fragments and their include edges.
//!
//! Nodes are addressed by [`FunctionId`]. Include lists are written while the
//! graph is still a [`FunctionGraphBuilder`]; `build()` freezes them, so a
//! [`FunctionGraph`] is read-only and can be shared between threads.

use std::{
    borrow::Cow,
    collections::{HashMap, HashSet, hash_map::Entry},
    fmt,
    sync::{Arc, RwLock},
};

use crate::{
    error::AssemblyError,
    signature::{FunctionSignature, scan_signature},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u32);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One shading-language function plus the functions it calls.
#[derive(Debug, Clone)]
pub struct FunctionNode {
    source: Cow<'static, str>,
    name: Option<String>,
    signature: Option<FunctionSignature>,
    includes: Vec<FunctionId>,
}

impl FunctionNode {
    /// The name is taken from the function header in `source`.
    pub fn new(source: impl Into<Cow<'static, str>>) -> Self {
        let source = source.into();
        let signature = scan_signature(&source);
        Self {
            name: signature.as_ref().map(|s| s.name.clone()),
            signature,
            source,
            includes: Vec::new(),
        }
    }

    /// For fragments whose header the scanner can't read (macro-generated
    /// declarations and the like).
    pub fn named(name: impl Into<String>, source: impl Into<Cow<'static, str>>) -> Self {
        let mut node = Self::new(source);
        node.name = Some(name.into());
        node
    }

    /// Replaces the include list.
    pub fn with_includes(mut self, includes: impl IntoIterator<Item = FunctionId>) -> Self {
        self.includes = includes.into_iter().collect();
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn signature(&self) -> Option<&FunctionSignature> {
        self.signature.as_ref()
    }

    pub fn includes(&self) -> &[FunctionId] {
        &self.includes
    }

    /// Overload key (`name(types)`) when the header names this node's function.
    /// `None` for nodes named explicitly over an unreadable or different header;
    /// those can only be compared by name.
    pub(crate) fn overload_key(&self) -> Option<String> {
        self.signature
            .as_ref()
            .filter(|sig| Some(&sig.name) == self.name.as_ref())
            .map(FunctionSignature::key)
    }
}

#[derive(Debug, Default)]
pub struct FunctionGraphBuilder {
    nodes: Vec<FunctionNode>,
    /// First id passed to `set_includes` that named no node.
    stray: Option<FunctionId>,
}

impl FunctionGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: FunctionNode) -> FunctionId {
        let id = FunctionId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Replaces the include list of an already added node. `includes` may
    /// reference nodes added later.
    ///
    /// Ids that don't belong to this builder are reported by [`build`](Self::build).
    pub fn set_includes(
        &mut self,
        id: FunctionId,
        includes: impl IntoIterator<Item = FunctionId>,
    ) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.includes = includes.into_iter().collect();
        } else {
            self.stray.get_or_insert(id);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Freezes the graph. Cycles are not checked here; they surface on the
    /// first resolution that reaches them.
    pub fn build(self) -> Result<FunctionGraph, AssemblyError> {
        if let Some(id) = self.stray {
            return Err(AssemblyError::UnknownFunction { id });
        }

        let len = self.nodes.len();
        for (index, node) in self.nodes.iter().enumerate() {
            if node.name.is_none() {
                return Err(AssemblyError::MissingFunctionName { index });
            }
            if let Some(id) = node.includes.iter().find(|id| id.index() >= len) {
                return Err(AssemblyError::UnknownFunction { id: *id });
            }
        }

        let mut by_name: HashMap<String, FunctionId> = HashMap::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let id = FunctionId(index as u32);
            match by_name.entry(node.name().to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
                Entry::Occupied(first) => {
                    tracing::warn!(
                        name = node.name(),
                        first = %first.get(),
                        duplicate = %id,
                        "function name declared twice; lookup by name returns the first"
                    );
                }
            }
        }

        Ok(FunctionGraph {
            nodes: self.nodes,
            by_name,
            resolved: RwLock::new(HashMap::new()),
        })
    }
}

/// Frozen include graph.
///
/// Resolutions are memoized per root list. The graph can't change after
/// `build()`, so memoized orders never go stale.
#[derive(Debug)]
pub struct FunctionGraph {
    nodes: Vec<FunctionNode>,
    by_name: HashMap<String, FunctionId>,
    pub(crate) resolved: RwLock<HashMap<Vec<FunctionId>, Arc<[FunctionId]>>>,
}

impl FunctionGraph {
    pub fn builder() -> FunctionGraphBuilder {
        FunctionGraphBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: FunctionId) -> Option<&FunctionNode> {
        self.nodes.get(id.index())
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        id.index() < self.nodes.len()
    }

    /// First node (in insertion order) declaring the function `name`.
    pub fn find(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &FunctionNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (FunctionId(i as u32), n))
    }

    /// Nodes that list `id` among their direct includes.
    pub fn dependents(&self, id: FunctionId) -> Vec<FunctionId> {
        self.iter()
            .filter(|(_, n)| n.includes.contains(&id))
            .map(|(dep, _)| dep)
            .collect()
    }

    /// Every node reachable from `roots` through includes, roots included.
    /// Unknown ids are ignored. Unlike resolution this tolerates cycles.
    pub fn reachable_from(&self, roots: &[FunctionId]) -> HashSet<FunctionId> {
        let mut visited: HashSet<FunctionId> = HashSet::new();
        let mut stack: Vec<FunctionId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !visited.insert(id) {
                continue;
            }
            stack.extend(node.includes.iter().copied());
        }
        visited
    }

    pub(crate) fn name_of(&self, id: FunctionId) -> &str {
        self.node(id).map(FunctionNode::name).unwrap_or_default()
    }
}

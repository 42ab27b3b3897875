//! Dependency resolution: roots in, include-ordered function list out.
//!
//! The walk is a depth-first post-order over each root in request order, with
//! includes visited in declared order. A node is emitted once its includes are
//! emitted and is skipped on every later encounter, so the output is
//! duplicate-free and reproducible for a given graph.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::AssemblyError,
    graph::{FunctionGraph, FunctionId, FunctionNode},
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Ordered, duplicate-free list of functions covering a set of roots.
#[derive(Debug, Clone)]
pub struct Resolution<'g> {
    graph: &'g FunctionGraph,
    order: Arc<[FunctionId]>,
}

impl<'g> Resolution<'g> {
    pub fn graph(&self) -> &'g FunctionGraph {
        self.graph
    }

    pub fn ids(&self) -> &[FunctionId] {
        &self.order
    }

    pub fn nodes(&self) -> impl Iterator<Item = &'g FunctionNode> + '_ {
        self.order.iter().filter_map(|id| self.graph.node(*id))
    }

    pub fn names(&self) -> Vec<&'g str> {
        self.nodes().map(FunctionNode::name).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position(&self, id: FunctionId) -> Option<usize> {
        self.order.iter().position(|x| *x == id)
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        self.position(id).is_some()
    }
}

impl FunctionGraph {
    /// Resolve `roots` into an order where every function follows all of its
    /// includes.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::EmptyRoots`] / [`AssemblyError::UnknownFunction`] for
    ///   bad input, before any traversal.
    /// - [`AssemblyError::CyclicDependency`] if an include chain loops.
    /// - [`AssemblyError::ConflictingDefinition`] if two distinct nodes in the
    ///   result define the same function signature.
    pub fn resolve(&self, roots: &[FunctionId]) -> Result<Resolution<'_>, AssemblyError> {
        if roots.is_empty() {
            return Err(AssemblyError::EmptyRoots);
        }
        if let Some(id) = roots.iter().find(|id| !self.contains(**id)) {
            return Err(AssemblyError::UnknownFunction { id: *id });
        }

        if let Some(order) = self.cached(roots) {
            tracing::trace!(roots = roots.len(), "function resolution cache hit");
            return Ok(Resolution { graph: self, order });
        }

        let order = self.post_order(roots)?;
        self.check_conflicts(&order)?;

        tracing::debug!(
            roots = ?roots.iter().map(|id| self.name_of(*id)).collect::<Vec<_>>(),
            resolved = order.len(),
            "resolved function graph"
        );

        let order: Arc<[FunctionId]> = order.into();
        if let Ok(mut cache) = self.resolved.write() {
            cache.insert(roots.to_vec(), order.clone());
        }
        Ok(Resolution { graph: self, order })
    }

    /// Resolve by function name; see [`FunctionGraph::find`].
    pub fn resolve_names(&self, names: &[&str]) -> anyhow::Result<Resolution<'_>> {
        let roots = names
            .iter()
            .map(|name| {
                self.find(name)
                    .ok_or_else(|| anyhow::anyhow!("unknown function: {name}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(self.resolve(&roots)?)
    }

    fn cached(&self, roots: &[FunctionId]) -> Option<Arc<[FunctionId]>> {
        self.resolved.read().ok()?.get(roots).cloned()
    }

    fn post_order(&self, roots: &[FunctionId]) -> Result<Vec<FunctionId>, AssemblyError> {
        let mut marks = vec![Mark::Unvisited; self.len()];
        let mut order: Vec<FunctionId> = Vec::new();
        // (node, index of the next include to visit)
        let mut stack: Vec<(FunctionId, usize)> = Vec::new();

        for &root in roots {
            if marks[root.index()] != Mark::Unvisited {
                continue;
            }
            marks[root.index()] = Mark::OnStack;
            stack.push((root, 0));

            while let Some((id, next)) = stack.last_mut() {
                let includes = self.node(*id).map(FunctionNode::includes).unwrap_or_default();
                let Some(&child) = includes.get(*next) else {
                    marks[id.index()] = Mark::Done;
                    order.push(*id);
                    stack.pop();
                    continue;
                };
                *next += 1;

                match marks[child.index()] {
                    Mark::Done => {}
                    Mark::OnStack => return Err(self.cycle_error(&stack, child)),
                    Mark::Unvisited => {
                        marks[child.index()] = Mark::OnStack;
                        stack.push((child, 0));
                    }
                }
            }
        }

        Ok(order)
    }

    fn cycle_error(&self, stack: &[(FunctionId, usize)], repeated: FunctionId) -> AssemblyError {
        let start = stack
            .iter()
            .position(|(id, _)| *id == repeated)
            .unwrap_or_default();
        let mut cycle: Vec<String> = stack[start..]
            .iter()
            .map(|(id, _)| self.name_of(*id).to_string())
            .collect();
        cycle.push(self.name_of(repeated).to_string());

        AssemblyError::CyclicDependency {
            function: self.name_of(repeated).to_string(),
            cycle,
        }
    }

    fn check_conflicts(&self, order: &[FunctionId]) -> Result<(), AssemblyError> {
        let mut overloads: HashMap<String, FunctionId> = HashMap::with_capacity(order.len());
        // First node per name, and whether it carries an overload key.
        let mut names: HashMap<&str, (FunctionId, bool)> = HashMap::with_capacity(order.len());

        for &id in order {
            let Some(node) = self.node(id) else {
                continue;
            };
            let key = node.overload_key();

            if let Some(&(first, first_keyed)) = names.get(node.name()) {
                // Without both signatures there is no way to tell overloads apart.
                if !first_keyed || key.is_none() {
                    return Err(AssemblyError::ConflictingDefinition {
                        signature: node.name().to_string(),
                        first,
                        second: id,
                    });
                }
            } else {
                names.insert(node.name(), (id, key.is_some()));
            }

            if let Some(key) = key {
                if let Some(&first) = overloads.get(&key) {
                    return Err(AssemblyError::ConflictingDefinition {
                        signature: key,
                        first,
                        second: id,
                    });
                }
                overloads.insert(key, id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FunctionGraphBuilder;

    fn leaf(b: &mut FunctionGraphBuilder, name: &str) -> FunctionId {
        b.add(FunctionNode::new(format!("float {name}() {{ return 1.0; }}")))
    }

    #[test]
    fn test_post_order_follows_declared_include_order() {
        let mut b = FunctionGraph::builder();
        let f = leaf(&mut b, "f");
        let g = leaf(&mut b, "g");
        let d = leaf(&mut b, "d");
        let brdf = leaf(&mut b, "brdf");
        let lambert = leaf(&mut b, "lambert");
        let direct = leaf(&mut b, "direct");
        b.set_includes(brdf, [f, g, d])
            .set_includes(direct, [brdf, lambert]);
        let graph = b.build().unwrap();

        let res = graph.resolve(&[direct]).unwrap();
        assert_eq!(res.names(), vec!["f", "g", "d", "brdf", "lambert", "direct"]);
    }

    #[test]
    fn test_shared_include_is_emitted_once() {
        let mut b = FunctionGraph::builder();
        let shared = leaf(&mut b, "shared");
        let a = leaf(&mut b, "a");
        let c = leaf(&mut b, "c");
        b.set_includes(a, [shared]).set_includes(c, [shared, a]);
        let graph = b.build().unwrap();

        let res = graph.resolve(&[a, c, shared]).unwrap();
        assert_eq!(res.ids(), &[shared, a, c]);
    }

    #[test]
    fn test_rejects_empty_and_foreign_roots() {
        let mut b = FunctionGraph::builder();
        leaf(&mut b, "a");
        let graph = b.build().unwrap();

        assert_eq!(graph.resolve(&[]).unwrap_err(), AssemblyError::EmptyRoots);

        let mut other = FunctionGraph::builder();
        leaf(&mut other, "x");
        let foreign = leaf(&mut other, "y");
        assert_eq!(
            graph.resolve(&[foreign]).unwrap_err(),
            AssemblyError::UnknownFunction { id: foreign }
        );
    }

    #[test]
    fn test_cycle_reports_path() {
        let mut b = FunctionGraph::builder();
        let top = leaf(&mut b, "top");
        let x = leaf(&mut b, "x");
        let y = leaf(&mut b, "y");
        let z = leaf(&mut b, "z");
        b.set_includes(top, [x])
            .set_includes(x, [y])
            .set_includes(y, [z])
            .set_includes(z, [x]);
        let graph = b.build().unwrap();

        let err = graph.resolve(&[top]).unwrap_err();
        assert_eq!(
            err,
            AssemblyError::CyclicDependency {
                function: "x".to_string(),
                cycle: vec!["x".into(), "y".into(), "z".into(), "x".into()],
            }
        );
        assert_eq!(err.to_string(), "cyclic include of `x`: x -> y -> z -> x");
    }

    #[test]
    fn test_self_include_is_a_cycle() {
        let mut b = FunctionGraph::builder();
        let a = leaf(&mut b, "a");
        b.set_includes(a, [a]);
        let graph = b.build().unwrap();
        assert!(matches!(
            graph.resolve(&[a]),
            Err(AssemblyError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_conflicting_definitions() {
        let mut b = FunctionGraph::builder();
        let one = b.add(FunctionNode::new("float pick(float x) { return x; }"));
        let two = b.add(FunctionNode::new("float pick(const in float y) { return -y; }"));
        let graph = b.build().unwrap();

        assert_eq!(
            graph.resolve(&[one, two]).unwrap_err(),
            AssemblyError::ConflictingDefinition {
                signature: "pick(float)".to_string(),
                first: one,
                second: two,
            }
        );
        // Either one alone is fine.
        assert_eq!(graph.resolve(&[two]).unwrap().ids(), &[two]);
    }

    #[test]
    fn test_named_node_conflicts_with_same_name_by_header() {
        let mut b = FunctionGraph::builder();
        let named = b.add(FunctionNode::named("pick", "DEFINE_PICK(pick)"));
        let header = b.add(FunctionNode::new("float pick() { return 1.0; }"));
        let graph = b.build().unwrap();

        for roots in [[named, header], [header, named]] {
            assert_eq!(
                graph.resolve(&roots).unwrap_err(),
                AssemblyError::ConflictingDefinition {
                    signature: "pick".to_string(),
                    first: roots[0],
                    second: roots[1],
                }
            );
        }
    }

    #[test]
    fn test_overloads_are_not_conflicts() {
        let mut b = FunctionGraph::builder();
        let a = b.add(FunctionNode::new("float pick(float x) { return x; }"));
        let c = b.add(FunctionNode::new("vec2 pick(vec2 x) { return x; }"));
        let graph = b.build().unwrap();
        assert_eq!(graph.resolve(&[a, c]).unwrap().len(), 2);
    }

    #[test]
    fn test_cached_resolution_matches_fresh() {
        let mut b = FunctionGraph::builder();
        let a = leaf(&mut b, "a");
        let c = leaf(&mut b, "c");
        b.set_includes(c, [a]);
        let graph = b.build().unwrap();

        let first = graph.resolve(&[c]).unwrap();
        let second = graph.resolve(&[c]).unwrap();
        assert_eq!(first.ids(), second.ids());
        assert!(Arc::ptr_eq(&first.order, &second.order));
        assert_eq!(graph.resolved.read().unwrap().len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut b = FunctionGraph::builder();
        let a = leaf(&mut b, "a");
        b.set_includes(a, [a]);
        let graph = b.build().unwrap();
        assert!(graph.resolve(&[a]).is_err());
        assert!(graph.resolve(&[a]).is_err());
        assert!(graph.resolved.read().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_names() {
        let mut b = FunctionGraph::builder();
        let a = leaf(&mut b, "a");
        let c = leaf(&mut b, "c");
        b.set_includes(c, [a]);
        let graph = b.build().unwrap();

        assert_eq!(graph.resolve_names(&["c"]).unwrap().ids(), &[a, c]);
        let err = graph.resolve_names(&["missing"]).unwrap_err();
        assert!(format!("{err:#}").contains("unknown function: missing"));
    }
}

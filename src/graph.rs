//! Dependency graph over binding keys.
//!
//! Vertices are the keys an injector provides; an edge runs from a
//! dependency to each binding that requires it, so a topological order
//! of the graph instantiates dependencies before their dependents.

use std::fmt;

use indexmap::IndexMap;

use crate::errors::InjectorError;
use crate::key::BindingKey;

const WHITE: u8 = 0;
const GRAY: u8 = 1;
const BLACK: u8 = 2;

/// The edges of a dependency cycle, rendered one `A --> B` pair per line.
#[derive(Debug, Default)]
pub struct CycleEdges(Vec<(BindingKey, BindingKey)>);

impl CycleEdges {
    pub fn edges(&self) -> &[(BindingKey, BindingKey)] {
        &self.0
    }
}

impl fmt::Display for CycleEdges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (from, to)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{from} --> {to}")?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct BindingGraph {
    // key -> indices of dependent vertices
    vertices: IndexMap<BindingKey, Vec<usize>>,
}

impl BindingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Adds a vertex for the key. The key must not already be present.
    pub fn add_dependency(&mut self, key: BindingKey) -> Result<(), InjectorError> {
        if self.vertices.contains_key(&key) {
            return Err(InjectorError::DuplicateBinding { key });
        }
        self.vertices.insert(key, Vec::new());
        Ok(())
    }

    pub fn has_dependency(&self, key: &BindingKey) -> bool {
        self.vertices.contains_key(key)
    }

    /// Records that `dependent` requires `independent`. Both keys must
    /// already be vertices; unknown keys are ignored.
    pub fn add_relationship(&mut self, independent: &BindingKey, dependent: &BindingKey) {
        let Some(to) = self.vertices.get_index_of(dependent) else {
            return;
        };
        if let Some(edges) = self.vertices.get_mut(independent) {
            if !edges.contains(&to) {
                edges.push(to);
            }
        }
    }

    /// Reports whether the graph contains a cycle. When it does, the
    /// edges of the first cycle found are appended to `cycle`, with a
    /// self-dependency reported as a single `(key, key)` edge.
    pub fn has_cycles(&self, cycle: &mut Vec<(BindingKey, BindingKey)>) -> bool {
        let mut colors = vec![WHITE; self.vertices.len()];
        let mut path = Vec::new();
        for index in 0..self.vertices.len() {
            if colors[index] == WHITE && self.visit(index, &mut colors, &mut path, cycle) {
                return true;
            }
        }
        false
    }

    fn visit(
        &self,
        index: usize,
        colors: &mut [u8],
        path: &mut Vec<usize>,
        cycle: &mut Vec<(BindingKey, BindingKey)>,
    ) -> bool {
        colors[index] = GRAY;
        path.push(index);
        if let Some((_, dependents)) = self.vertices.get_index(index) {
            for &next in dependents {
                if colors[next] == GRAY {
                    let start = path.iter().position(|&p| p == next).unwrap_or(0);
                    for pair in path[start..].windows(2) {
                        cycle.push((self.key_at(pair[0]), self.key_at(pair[1])));
                    }
                    cycle.push((self.key_at(index), self.key_at(next)));
                    path.pop();
                    return true;
                }
                if colors[next] == WHITE && self.visit(next, colors, path, cycle) {
                    path.pop();
                    return true;
                }
            }
        }
        path.pop();
        colors[index] = BLACK;
        false
    }

    fn key_at(&self, index: usize) -> BindingKey {
        match self.vertices.get_index(index) {
            Some((key, _)) => key.clone(),
            None => unreachable!("vertex index out of range"),
        }
    }

    /// Keys in dependency order: for every recorded relationship, the
    /// independent key appears before its dependents. Only meaningful
    /// on an acyclic graph.
    pub fn dependency_order(&self) -> Vec<BindingKey> {
        let mut colors = vec![WHITE; self.vertices.len()];
        let mut postorder = Vec::with_capacity(self.vertices.len());
        for index in 0..self.vertices.len() {
            if colors[index] == WHITE {
                self.postorder_visit(index, &mut colors, &mut postorder);
            }
        }
        postorder.reverse();
        postorder.into_iter().map(|i| self.key_at(i)).collect()
    }

    fn postorder_visit(&self, index: usize, colors: &mut [u8], out: &mut Vec<usize>) {
        colors[index] = GRAY;
        if let Some((_, dependents)) = self.vertices.get_index(index) {
            for &next in dependents {
                if colors[next] == WHITE {
                    self.postorder_visit(next, colors, out);
                }
            }
        }
        colors[index] = BLACK;
        out.push(index);
    }
}

impl From<Vec<(BindingKey, BindingKey)>> for CycleEdges {
    fn from(edges: Vec<(BindingKey, BindingKey)>) -> Self {
        Self(edges)
    }
}

impl fmt::Display for BindingGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, dependents) in &self.vertices {
            write!(f, "{key}")?;
            for &index in dependents {
                write!(f, "\n    --> {}", self.key_at(index))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

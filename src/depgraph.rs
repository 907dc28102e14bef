//! Dependency sequencing: layers items into groups so that every item sits
//! strictly deeper than everything it depends on.
//!
//! Items without dependencies have depth 0. Sequencing is performed lazily
//! (Kahn's algorithm) the first time a depth is asked for after the graph
//! changed.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Write};
use std::hash::Hash;

use thiserror::Error;

use crate::config::GraphFormat;

/// Raised by the sequencing queries when the graph has a cycle; the
/// participants are available from [`Sequencer::cycles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cycle detected in the dependency graph")]
pub struct CycleDetected;

#[derive(Debug, Clone)]
struct Vertex<T> {
    item: T,
    depth: Option<usize>,
    parents: BTreeSet<usize>,
    children: BTreeSet<usize>,
}

#[derive(Debug, Clone)]
pub struct Sequencer<T> {
    index: HashMap<T, usize>,
    vertices: Vec<Vertex<T>>,
    needs_sequencing: bool,
    /// Vertex indices per depth.
    groups: Vec<Vec<usize>>,
    /// Vertices in a cycle, or between cycles, in insertion order.
    cycles: Vec<usize>,
}

impl<T: Clone + Eq + Hash> Default for Sequencer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> Sequencer<T> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            vertices: Vec::new(),
            needs_sequencing: false,
            groups: Vec::new(),
            cycles: Vec::new(),
        }
    }

    /// Add `child` with a dependency on each of `parents`.
    pub fn add(&mut self, child: T, parents: impl IntoIterator<Item = T>) {
        let c = self.get_or_add(child);
        for parent in parents {
            let p = self.get_or_add(parent);
            if self.vertices[c].parents.insert(p) {
                self.vertices[p].children.insert(c);
                self.needs_sequencing = true;
            }
        }
    }

    fn get_or_add(&mut self, item: T) -> usize {
        if let Some(&v) = self.index.get(&item) {
            return v;
        }
        let v = self.vertices.len();
        self.index.insert(item.clone(), v);
        self.vertices.push(Vertex { item, depth: None, parents: BTreeSet::new(), children: BTreeSet::new() });
        self.needs_sequencing = true;
        v
    }

    pub fn has(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Items depending on `item`; `None` if the item is unknown.
    pub fn children(&self, item: &T) -> Option<Vec<T>> {
        let v = self.index.get(item)?;
        Some(self.items(&self.vertices[*v].children))
    }

    /// Items `item` depends on; `None` if the item is unknown.
    pub fn parents(&self, item: &T) -> Option<Vec<T>> {
        let v = self.index.get(item)?;
        Some(self.items(&self.vertices[*v].parents))
    }

    fn items<'a>(&self, vs: impl IntoIterator<Item = &'a usize>) -> Vec<T> {
        vs.into_iter().map(|&v| self.vertices[v].item.clone()).collect()
    }

    /// Depth of `item`, `None` if it is unknown.
    pub fn depth(&mut self, item: &T) -> Result<Option<usize>, CycleDetected> {
        self.sequence()?;
        Ok(self.index.get(item).and_then(|&v| self.vertices[v].depth))
    }

    /// Number of distinct depths.
    pub fn depth_count(&mut self) -> Result<usize, CycleDetected> {
        self.sequence()?;
        Ok(self.groups.len())
    }

    /// Items at `depth`, empty when out of range.
    pub fn group(&mut self, depth: usize) -> Result<Vec<T>, CycleDetected> {
        self.sequence()?;
        Ok(self.groups.get(depth).map(|g| self.items(g)).unwrap_or_default())
    }

    /// Items grouped by depth, leaves first.
    pub fn all_groups(&mut self) -> Result<Vec<Vec<T>>, CycleDetected> {
        self.sequence()?;
        Ok(self.groups.iter().map(|g| self.items(g)).collect())
    }

    /// Items that could not be sequenced: members of a cycle and items on
    /// paths between cycles. Empty when the graph is acyclic.
    pub fn cycles(&mut self) -> Vec<T> {
        self.perform_sequencing();
        self.items(&self.cycles)
    }

    fn sequence(&mut self) -> Result<(), CycleDetected> {
        self.perform_sequencing();
        if self.cycles.is_empty() { Ok(()) } else { Err(CycleDetected) }
    }

    fn perform_sequencing(&mut self) {
        if !self.needs_sequencing {
            return;
        }
        self.needs_sequencing = false;
        self.groups.clear();
        self.cycles.clear();
        for v in &mut self.vertices {
            v.depth = None;
        }

        // Leaves first; a vertex is ready once all of its parents have a depth.
        let mut waiting: Vec<usize> = self.vertices.iter().map(|v| v.parents.len()).collect();
        let mut ready: Vec<usize> = (0..self.vertices.len()).filter(|&v| waiting[v] == 0).collect();
        let mut remaining = self.vertices.len() - ready.len();
        while let Some(v) = ready.pop() {
            self.write_depth(v);
            for &c in &self.vertices[v].children {
                waiting[c] -= 1;
                if waiting[c] == 0 {
                    ready.push(c);
                    remaining -= 1;
                }
            }
        }
        if remaining == 0 {
            self.validate_groups();
            return;
        }

        // Prune dependents hanging off the cycles, starting from the roots.
        let stuck: HashSet<usize> =
            (0..self.vertices.len()).filter(|&v| self.vertices[v].depth.is_none()).collect();
        let mut pending: HashMap<usize, usize> = stuck
            .iter()
            .map(|&v| (v, self.vertices[v].children.iter().filter(|c| stuck.contains(c)).count()))
            .collect();
        let mut roots: Vec<usize> = pending.iter().filter(|&(_, &n)| n == 0).map(|(&v, _)| v).collect();
        let mut pruned = HashSet::new();
        while let Some(v) = roots.pop() {
            pruned.insert(v);
            for p in &self.vertices[v].parents {
                if let Some(n) = pending.get_mut(p) {
                    *n -= 1;
                    if *n == 0 {
                        roots.push(*p);
                    }
                }
            }
        }
        assert!(
            pruned.len() < stuck.len(),
            "sequencer logic error: pruning cycles left no items in the cycles"
        );
        self.cycles = (0..self.vertices.len()).filter(|v| stuck.contains(v) && !pruned.contains(v)).collect();
    }

    fn write_depth(&mut self, v: usize) {
        let depth = self.vertices[v]
            .parents
            .iter()
            .filter_map(|&p| self.vertices[p].depth)
            .max()
            .map_or(0, |d| d + 1);
        self.vertices[v].depth = Some(depth);
        if self.groups.len() <= depth {
            self.groups.resize_with(depth + 1, Vec::new);
        }
        self.groups[depth].push(v);
    }

    fn validate_groups(&self) {
        let count: usize = self.groups.iter().map(Vec::len).sum();
        assert_eq!(count, self.vertices.len(), "sequencer logic error: grouped vertex count");
        for (depth, group) in self.groups.iter().enumerate() {
            assert!(!group.is_empty(), "sequencer logic error: group {depth} is empty");
            for &v in group {
                let parent_depths = self.vertices[v].parents.iter().filter_map(|&p| self.vertices[p].depth);
                debug_assert!(parent_depths.clone().all(|d| d < depth));
                debug_assert!(depth == 0 || parent_depths.clone().any(|d| d + 1 == depth));
            }
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────

/// Options for [`Sequencer::to_graph`].
pub struct GraphOptions<'a, T> {
    /// Unique node label; `{:?}` when unset.
    pub item_to_string: Option<&'a dyn Fn(&T) -> String>,
    /// Only show items that could not be sequenced.
    pub filter_cycles: bool,
    /// Only show matching items plus their direct parents and children.
    pub item_filter: Option<&'a dyn Fn(&T) -> bool>,
    /// Drop the parents and children of filtered items.
    pub strict_filter: bool,
    pub format: GraphFormat,
    pub hide_groups: bool,
    pub label_items_with_group_number: bool,
}

impl<T> Default for GraphOptions<'_, T> {
    fn default() -> Self {
        Self {
            item_to_string: None,
            filter_cycles: false,
            item_filter: None,
            strict_filter: false,
            format: GraphFormat::Dot,
            hide_groups: false,
            label_items_with_group_number: false,
        }
    }
}

impl<T: Clone + Eq + Hash + Debug> Sequencer<T> {
    /// Render the graph for debugging. Never fails: items in cycles are
    /// highlighted and get no group.
    pub fn to_graph(&mut self, options: &GraphOptions<'_, T>) -> String {
        self.perform_sequencing();
        let cyclic: HashSet<usize> = self.cycles.iter().copied().collect();

        let included = self.included(options, &cyclic);
        let mut nodes: Vec<(String, usize)> = included
            .iter()
            .map(|&v| {
                let item = &self.vertices[v].item;
                let name = match options.item_to_string {
                    Some(to_string) => to_string(item),
                    None => format!("{item:?}"),
                };
                (name, v)
            })
            .collect();
        nodes.sort();
        let ids: HashMap<usize, String> = nodes.iter().enumerate().map(|(i, (_, v))| (*v, format!("v{i}"))).collect();
        let to_ids = |vs: &mut dyn Iterator<Item = &usize>| -> Vec<String> {
            let mut out: Vec<String> = vs.filter_map(|v| ids.get(v).cloned()).collect();
            out.sort();
            out
        };

        let label = |name: &str, v: usize| match self.vertices[v].depth {
            Some(depth) if options.label_items_with_group_number => format!("{name} [{depth}]"),
            _ => name.to_string(),
        };
        let groups: Vec<(usize, Vec<String>)> = if options.hide_groups {
            Vec::new()
        } else {
            self.groups
                .iter()
                .enumerate()
                .rev()
                .map(|(depth, group)| (depth, to_ids(&mut group.iter())))
                .filter(|(_, ids)| !ids.is_empty())
                .collect()
        };

        let mut buf = String::new();
        match options.format {
            GraphFormat::Dot => {
                buf.push_str("digraph G {\n");
                for (name, v) in &nodes {
                    let _ = write!(buf, "\t{}[label={:?}", ids[v], label(name, *v));
                    if cyclic.contains(v) {
                        buf.push_str(",color=red");
                    }
                    buf.push_str("]\n");
                }
                for (_, v) in &nodes {
                    let parents = to_ids(&mut self.vertices[*v].parents.iter());
                    if !parents.is_empty() {
                        let _ = writeln!(buf, "\t{} -> {{{}}}", ids[v], parents.join(" "));
                    }
                }
                for (depth, members) in &groups {
                    let _ = writeln!(buf, "\tsubgraph depth_{depth} {{");
                    let _ = writeln!(buf, "\t\tlabel = \"Depth {depth}\"");
                    let _ = writeln!(buf, "\t\t{};", members.join("; "));
                    buf.push_str("\t}\n");
                }
                buf.push_str("}\n");
            }
            GraphFormat::Mermaid => {
                buf.push_str("flowchart TB\n");
                if nodes.iter().any(|(_, v)| cyclic.contains(v)) {
                    buf.push_str("  classDef partOfCycle stroke:#f00\n");
                }
                for (name, v) in &nodes {
                    let _ = write!(buf, "  {}[{:?}]", ids[v], label(name, *v));
                    if cyclic.contains(v) {
                        buf.push_str(":::partOfCycle");
                    }
                    let parents = to_ids(&mut self.vertices[*v].parents.iter());
                    if !parents.is_empty() {
                        let _ = write!(buf, " --> {}", parents.join(" & "));
                    }
                    buf.push('\n');
                }
                for (depth, members) in &groups {
                    let _ = writeln!(buf, "  subgraph Depth {depth}");
                    let _ = writeln!(buf, "    {}", members.join(" & "));
                    buf.push_str("  end\n");
                }
            }
        }
        buf
    }

    fn included(&self, options: &GraphOptions<'_, T>, cyclic: &HashSet<usize>) -> BTreeSet<usize> {
        let base: Vec<usize> = if options.filter_cycles {
            self.cycles.clone()
        } else {
            (0..self.vertices.len()).collect()
        };
        let Some(filter) = options.item_filter else {
            return base.into_iter().collect();
        };
        let mut included = BTreeSet::new();
        for v in base.into_iter().filter(|&v| filter(&self.vertices[v].item)) {
            included.insert(v);
            if !options.strict_filter {
                let vertex = &self.vertices[v];
                let neighbors = vertex.parents.iter().chain(&vertex.children);
                included.extend(neighbors.filter(|n| !options.filter_cycles || cyclic.contains(n)));
            }
        }
        included
    }
}

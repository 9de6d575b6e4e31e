//! Flat topology description and validation
//!
//! Plain-old-data node and edge descriptors, safe to snapshot and compare
//! deterministically. Parameter *values* live in the parameter bridge; the
//! graph stores only shape and connections.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable numeric node identifier (unique within a project).
pub type NodeId = u16;

/// Node kind code from the application's type registry (track, master, ...).
pub type NodeKind = u16;

/// Default node cap.
pub const MAX_NODES: usize = 64;

/// Per-node parameter cap.
pub const MAX_PARAMS_PER_NODE: u16 = 32;

/// Flat node description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDesc {
    pub id: NodeId,
    pub kind: NodeKind,
    pub param_count: u16,
}

impl NodeDesc {
    pub fn new(id: NodeId, kind: NodeKind, param_count: u16) -> Self {
        Self {
            id,
            kind,
            param_count,
        }
    }
}

/// Directed edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDesc {
    pub from: NodeId,
    pub to: NodeId,
}

impl EdgeDesc {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

/// Topology validation failures (off-RT configuration errors).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("node cap exceeded ({MAX_NODES})")]
    TooManyNodes,

    #[error("node {0} exceeds parameter cap ({MAX_PARAMS_PER_NODE})")]
    ParamOverrun(NodeId),

    #[error("edge references unknown node {0}")]
    UnknownNode(NodeId),

    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),

    #[error("duplicate edge {0} -> {1}")]
    DuplicateEdge(NodeId, NodeId),

    #[error("graph contains a cycle")]
    Cycle,

    #[error("schema tag mismatch: expected {expected}, found {found}")]
    Schema { expected: String, found: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// A declared graph: nodes plus directed edges, DAG by contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    nodes: Vec<NodeDesc>,
    edges: Vec<EdgeDesc>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeDesc) {
        self.nodes.push(node);
    }

    pub fn add_edge(&mut self, edge: EdgeDesc) {
        self.edges.push(edge);
    }

    pub fn nodes(&self) -> &[NodeDesc] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeDesc] {
        &self.edges
    }

    /// Sort nodes by id and edges by (from, to) for deterministic external
    /// representations.
    pub fn normalize(&mut self) {
        self.nodes.sort_by_key(|n| n.id);
        self.edges.sort_by_key(|e| (e.from, e.to));
    }

    /// Validate shape invariants: unique ids, caps, edge endpoints,
    /// no self-loops or duplicate edges, and acyclicity.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.len() > MAX_NODES {
            return Err(GraphError::TooManyNodes);
        }

        let mut ids: Vec<NodeId> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if ids.contains(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            if node.param_count > MAX_PARAMS_PER_NODE {
                return Err(GraphError::ParamOverrun(node.id));
            }
            ids.push(node.id);
        }

        let mut seen: Vec<(NodeId, NodeId)> = Vec::with_capacity(self.edges.len());
        for edge in &self.edges {
            if edge.from == edge.to {
                return Err(GraphError::SelfLoop(edge.from));
            }
            if !ids.contains(&edge.from) {
                return Err(GraphError::UnknownNode(edge.from));
            }
            if !ids.contains(&edge.to) {
                return Err(GraphError::UnknownNode(edge.to));
            }
            if seen.contains(&(edge.from, edge.to)) {
                return Err(GraphError::DuplicateEdge(edge.from, edge.to));
            }
            seen.push((edge.from, edge.to));
        }

        self.check_acyclic(&ids)
    }

    /// Kahn's algorithm: every node must be orderable.
    fn check_acyclic(&self, ids: &[NodeId]) -> Result<(), GraphError> {
        let index_of = |id: NodeId| ids.iter().position(|&i| i == id);

        let mut in_degree = vec![0usize; ids.len()];
        for edge in &self.edges {
            if let Some(to) = index_of(edge.to) {
                in_degree[to] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..ids.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut ordered = 0;

        while let Some(n) = queue.pop() {
            ordered += 1;
            for edge in &self.edges {
                if index_of(edge.from) == Some(n) {
                    if let Some(to) = index_of(edge.to) {
                        in_degree[to] -= 1;
                        if in_degree[to] == 0 {
                            queue.push(to);
                        }
                    }
                }
            }
        }

        if ordered == ids.len() {
            Ok(())
        } else {
            Err(GraphError::Cycle)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

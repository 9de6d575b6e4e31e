//! Topology codec (JSON)
//!
//! Deterministic serialization for project persistence: the topology is
//! validated and normalized before writing, and the schema tag is checked
//! on the way back in.

use serde::{Deserialize, Serialize};

use crate::topology::{EdgeDesc, GraphError, NodeDesc, Topology};

/// Default schema tag embedded in serialized graphs.
pub const DEFAULT_SCHEMA_TAG: &str = "loopforge.graph@1";

/// Codec options.
#[derive(Debug, Clone)]
pub struct GraphCodecConfig {
    pub schema_tag: String,
    pub pretty: bool,
}

impl Default for GraphCodecConfig {
    fn default() -> Self {
        Self {
            schema_tag: DEFAULT_SCHEMA_TAG.to_string(),
            pretty: false,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct GraphDoc {
    schema: String,
    nodes: Vec<NodeDesc>,
    edges: Vec<EdgeDesc>,
}

/// Serialize a validated topology. Output is deterministic: nodes sorted by
/// id, edges by (from, to).
pub fn serialize(topology: &Topology, cfg: &GraphCodecConfig) -> Result<String, GraphError> {
    topology.validate()?;

    let mut normalized = topology.clone();
    normalized.normalize();

    let doc = GraphDoc {
        schema: cfg.schema_tag.clone(),
        nodes: normalized.nodes().to_vec(),
        edges: normalized.edges().to_vec(),
    };

    let encode = if cfg.pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    };
    encode.map_err(|e| GraphError::Parse(e.to_string()))
}

/// Parse, schema-check, and validate a serialized topology.
pub fn deserialize(data: &str, cfg: &GraphCodecConfig) -> Result<Topology, GraphError> {
    let doc: GraphDoc = serde_json::from_str(data).map_err(|e| GraphError::Parse(e.to_string()))?;

    if doc.schema != cfg.schema_tag {
        return Err(GraphError::Schema {
            expected: cfg.schema_tag.clone(),
            found: doc.schema,
        });
    }

    let mut topology = Topology::new();
    for node in doc.nodes {
        topology.add_node(node);
    }
    for edge in doc.edges {
        topology.add_edge(edge);
    }
    topology.validate()?;
    Ok(topology)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

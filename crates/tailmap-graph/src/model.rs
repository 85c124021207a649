//! the network graph output model.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tailmap_policy::{AclAction, RuleKind};

/// what a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// a group or autogroup.
    Group,
    /// a tag.
    Tag,
    /// a host alias, address, user or unresolved identifier.
    Host,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Group => f.write_str("group"),
            NodeType::Tag => f.write_str("tag"),
            NodeType::Host => f.write_str("host"),
        }
    }
}

/// which rule dialects referenced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleOrigin {
    /// only acl rules.
    #[serde(rename = "ACL")]
    AclOnly,
    /// only grant rules.
    #[serde(rename = "Grant")]
    GrantOnly,
    /// both acl and grant rules.
    Mixed,
}

impl RuleOrigin {
    /// classify from the set of rule kinds that referenced a node.
    ///
    /// returns none for an empty set; every node is referenced by at least
    /// one rule, so the builder never sees that case.
    pub fn from_kinds(kinds: &BTreeSet<RuleKind>) -> Option<Self> {
        match (
            kinds.contains(&RuleKind::Acl),
            kinds.contains(&RuleKind::Grant),
        ) {
            (true, true) => Some(RuleOrigin::Mixed),
            (true, false) => Some(RuleOrigin::AclOnly),
            (false, true) => Some(RuleOrigin::GrantOnly),
            (false, false) => None,
        }
    }

    /// the display shape for nodes of this origin.
    pub fn shape(&self) -> NodeShape {
        match self {
            RuleOrigin::AclOnly => NodeShape::Dot,
            RuleOrigin::GrantOnly => NodeShape::Triangle,
            RuleOrigin::Mixed => NodeShape::Hexagon,
        }
    }
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOrigin::AclOnly => f.write_str("ACL"),
            RuleOrigin::GrantOnly => f.write_str("Grant"),
            RuleOrigin::Mixed => f.write_str("Mixed"),
        }
    }
}

/// node shape used by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    /// acl only.
    Dot,
    /// grant only.
    Triangle,
    /// referenced by both dialects.
    Hexagon,
}

/// a principal or resource named by at least one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// the raw rule token, unique within a graph.
    pub id: String,
    /// display label (the id).
    pub label: String,
    /// inferred type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// which dialects referenced this node.
    pub rule_type: RuleOrigin,
    /// display color, from the node type.
    pub color: String,
    /// display shape, from the rule origin.
    pub shape: NodeShape,
    /// multi-line hover text.
    pub tooltip: String,
    /// group members, tag owners or the host address.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

/// one declared (src, dst) access from one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// source node id.
    pub from: String,
    /// destination node id.
    pub to: String,
    /// the rule dialect this edge came from.
    pub rule_type: RuleKind,
    /// 1-based line of the rule, or 0 when unknown.
    pub line_number: usize,
    /// acl action; none for grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<AclAction>,
    /// acl protocol or grant ip specs, as written.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    /// grant via targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<String>,
    /// grant source postures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub src_posture: Vec<String>,
    /// grant destination postures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dst_posture: Vec<String>,
    /// grant application capability names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<String>,
    /// display color.
    pub color: String,
}

impl Edge {
    /// this edge's key in [`GraphMetadata::edges`].
    pub fn key(&self) -> String {
        edge_key(&self.from, &self.to)
    }
}

/// the search-index key for an edge.
pub fn edge_key(from: &str, to: &str) -> String {
    format!("{}->{}", from, to)
}

/// searchable summary of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// node id.
    pub id: String,
    /// node type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// rule origin.
    pub rule_type: RuleOrigin,
    /// group members, tag owners or the host address.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    /// protocols of every rule that referenced the node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    /// via targets of every grant that referenced the node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via_routing: Vec<String>,
    /// postures of every grant that referenced the node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posture: Vec<String>,
    /// applications of every grant that referenced the node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<String>,
    /// sorted lines of every rule that referenced the node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_numbers: Vec<usize>,
}

/// searchable summary of one rule's contribution to an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    /// source node id.
    pub from: String,
    /// destination node id.
    pub to: String,
    /// acl protocol or grant ip specs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    /// grant via targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via_routing: Vec<String>,
    /// grant src and dst postures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posture: Vec<String>,
    /// grant application names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<String>,
    /// the contributing rule's dialect.
    pub rule_type: RuleKind,
    /// the contributing rule's line, when known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_numbers: Vec<usize>,
}

impl From<&Edge> for EdgeMetadata {
    fn from(edge: &Edge) -> Self {
        Self {
            from: edge.from.clone(),
            to: edge.to.clone(),
            protocols: edge.protocols.clone(),
            via_routing: edge.via.clone(),
            posture: edge
                .src_posture
                .iter()
                .chain(edge.dst_posture.iter())
                .cloned()
                .collect(),
            applications: edge.applications.clone(),
            rule_type: edge.rule_type,
            line_numbers: if edge.line_number > 0 {
                vec![edge.line_number]
            } else {
                Vec::new()
            },
        }
    }
}

/// the search index shipped alongside the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// node id to node summary.
    pub nodes: BTreeMap<String, NodeMetadata>,
    /// `"from->to"` to one entry per contributing rule, in rule order.
    pub edges: BTreeMap<String, Vec<EdgeMetadata>>,
}

/// a degradation noticed while building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphWarning {
    /// no source line was found for a rule; its edges carry line 0.
    MissingLineNumber {
        /// the rule's dialect.
        rule: RuleKind,
        /// the rule's index in its list.
        index: usize,
    },
    /// a bare identifier that is not a host, group or tag.
    UnresolvedTarget {
        /// the raw token.
        target: String,
    },
}

impl fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphWarning::MissingLineNumber { rule, index } => {
                write!(f, "no line number for {} rule {}", rule, index)
            }
            GraphWarning::UnresolvedTarget { target } => {
                write!(f, "target '{}' does not match any host, group or tag", target)
            }
        }
    }
}

/// node and edge counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// number of nodes.
    pub total_nodes: usize,
    /// number of edges.
    pub total_edges: usize,
    /// nodes per type.
    pub nodes_by_type: BTreeMap<NodeType, usize>,
    /// nodes per rule origin.
    pub nodes_by_rule_type: BTreeMap<RuleOrigin, usize>,
}

/// the derived access graph.
///
/// invariants: node ids are unique, every edge endpoint is a node, and no
/// node or edge refers to the `*` wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkGraph {
    /// node id to node.
    pub nodes: BTreeMap<String, Node>,
    /// edges in rule order, acls before grants.
    pub edges: Vec<Edge>,
    /// the search index.
    pub metadata: GraphMetadata,
    /// degradations noticed while building.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<GraphWarning>,
}

impl NetworkGraph {
    /// look up a node.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// whether a node exists.
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// nodes of one type, in id order.
    pub fn nodes_by_type(&self, node_type: NodeType) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| n.node_type == node_type)
            .collect()
    }

    /// nodes of one rule origin, in id order.
    pub fn nodes_by_origin(&self, origin: RuleOrigin) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| n.rule_type == origin)
            .collect()
    }

    /// every edge from `from` to `to`, in rule order.
    pub fn edges_between(&self, from: &str, to: &str) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.from == from && e.to == to)
            .collect()
    }

    /// search metadata for every rule that connects `from` to `to`.
    pub fn edge_metadata(&self, from: &str, to: &str) -> &[EdgeMetadata] {
        self.metadata
            .edges
            .get(&edge_key(from, to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// node and edge counts.
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            ..GraphStats::default()
        };
        for node in self.nodes.values() {
            *stats.nodes_by_type.entry(node.node_type).or_default() += 1;
            *stats.nodes_by_rule_type.entry(node.rule_type).or_default() += 1;
        }
        stats
    }
}

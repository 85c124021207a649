//! derives a [`NetworkGraph`] from a validated policy document.
//!
//! the build runs in passes:
//! 1. acl rules: nodes for every src/dst token, one edge per (src, dst)
//! 2. grant rules: same, plus nodes for via targets
//! 3. classification: each node's origin from the set of rule kinds that
//!    referenced it, so the result does not depend on pass order
//! 4. metadata: display attributes, tooltips and the search index
//!
//! the `*` wildcard never becomes a node, and pairs involving it never become
//! edges.

use std::collections::{BTreeMap, BTreeSet};

use tailmap_policy::target::{AUTOGROUP_PREFIX, GROUP_PREFIX, TAG_PREFIX, parse_address};
use tailmap_policy::{AclAction, PolicyDocument, RuleKind, RuleLineIndex, Target};
use tailmap_types::{Email, NodeColors};
use tracing::{debug, info, warn};

use crate::model::{
    Edge, EdgeMetadata, GraphMetadata, GraphWarning, NetworkGraph, Node, NodeMetadata, NodeType,
    RuleOrigin,
};

const WILDCARD: &str = "*";

/// builds a [`NetworkGraph`] from a document and its rule line index.
#[derive(Debug, Clone)]
pub struct GraphBuilder<'a> {
    document: &'a PolicyDocument,
    lines: &'a RuleLineIndex,
    colors: NodeColors,
}

/// everything the rules said about one node.
#[derive(Debug, Default)]
struct Evidence {
    kinds: BTreeSet<RuleKind>,
    lines: BTreeSet<usize>,
    protocols: BTreeSet<String>,
    via: BTreeSet<String>,
    posture: BTreeSet<String>,
    applications: BTreeSet<String>,
}

/// the parts of one rule that every node and edge it produces shares.
struct RuleFacts<'r> {
    kind: RuleKind,
    line: usize,
    action: Option<AclAction>,
    protocols: Vec<String>,
    via: &'r [String],
    src_posture: &'r [String],
    dst_posture: &'r [String],
    applications: Vec<String>,
}

#[derive(Debug, Default)]
struct BuildState {
    evidence: BTreeMap<String, Evidence>,
    edges: Vec<Edge>,
    warnings: Vec<GraphWarning>,
}

impl<'a> GraphBuilder<'a> {
    /// create a builder with the default palette.
    pub fn new(document: &'a PolicyDocument, lines: &'a RuleLineIndex) -> Self {
        Self {
            document,
            lines,
            colors: NodeColors::default(),
        }
    }

    /// use a custom palette.
    pub fn with_colors(mut self, colors: NodeColors) -> Self {
        self.colors = colors;
        self
    }

    /// build the graph. Never fails; see [`NetworkGraph::warnings`].
    pub fn build(&self) -> NetworkGraph {
        self.build_in_order([RuleKind::Acl, RuleKind::Grant])
    }

    fn build_in_order(&self, order: [RuleKind; 2]) -> NetworkGraph {
        let mut state = BuildState::default();

        for kind in order {
            match kind {
                RuleKind::Acl => self.acl_pass(&mut state),
                RuleKind::Grant => self.grant_pass(&mut state),
            }
        }

        let graph = self.finish(state);
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            warnings = graph.warnings.len(),
            "built network graph"
        );
        graph
    }

    fn acl_pass(&self, state: &mut BuildState) {
        debug!(rules = self.document.acls.len(), "processing acl rules");
        for (index, rule) in self.document.acls.iter().enumerate() {
            let facts = RuleFacts {
                kind: RuleKind::Acl,
                line: self.rule_line(state, RuleKind::Acl, index),
                action: rule.action_kind(),
                protocols: rule.proto.iter().cloned().collect(),
                via: &[],
                src_posture: &[],
                dst_posture: &[],
                applications: Vec::new(),
            };
            self.add_rule(state, &facts, &rule.src, &rule.dst);
        }
    }

    fn grant_pass(&self, state: &mut BuildState) {
        debug!(rules = self.document.grants.len(), "processing grant rules");
        for (index, rule) in self.document.grants.iter().enumerate() {
            let facts = RuleFacts {
                kind: RuleKind::Grant,
                line: self.rule_line(state, RuleKind::Grant, index),
                action: None,
                protocols: rule.ip.clone(),
                via: &rule.via,
                src_posture: &rule.src_posture,
                dst_posture: &rule.dst_posture,
                applications: rule.applications(),
            };
            self.add_rule(state, &facts, &rule.src, &rule.dst);
        }
    }

    fn rule_line(&self, state: &mut BuildState, kind: RuleKind, index: usize) -> usize {
        if let Some(line) = self.lines.line(kind, index) {
            return line;
        }
        warn!(rule = %kind, index, "no source line for rule, using 0");
        state
            .warnings
            .push(GraphWarning::MissingLineNumber { rule: kind, index });
        0
    }

    fn add_rule(&self, state: &mut BuildState, facts: &RuleFacts<'_>, src: &[String], dst: &[String]) {
        for token in src.iter().chain(dst).chain(facts.via) {
            if token != WILDCARD {
                note(state, token, facts);
            }
        }

        for from in src.iter().filter(|t| *t != WILDCARD) {
            for to in dst.iter().filter(|t| *t != WILDCARD) {
                state.edges.push(Edge {
                    from: from.clone(),
                    to: to.clone(),
                    rule_type: facts.kind,
                    line_number: facts.line,
                    action: facts.action,
                    protocols: facts.protocols.clone(),
                    via: facts.via.to_vec(),
                    src_posture: facts.src_posture.to_vec(),
                    dst_posture: facts.dst_posture.to_vec(),
                    applications: facts.applications.clone(),
                    color: self.colors.edge.clone(),
                });
            }
        }
    }

    fn finish(&self, state: BuildState) -> NetworkGraph {
        let BuildState {
            evidence,
            edges,
            mut warnings,
        } = state;

        let mut nodes = BTreeMap::new();
        let mut metadata = GraphMetadata::default();

        for (id, evidence) in evidence {
            let Some(origin) = RuleOrigin::from_kinds(&evidence.kinds) else {
                continue;
            };
            let node_type = self.node_type(&id);
            let members = self.members(&id, node_type);

            if self.is_unresolved(&id, node_type) {
                warn!(target = %id, "rule target does not match any host, group or tag");
                warnings.push(GraphWarning::UnresolvedTarget { target: id.clone() });
            }

            metadata.nodes.insert(
                id.clone(),
                NodeMetadata {
                    id: id.clone(),
                    node_type,
                    rule_type: origin,
                    members: members.clone(),
                    protocols: evidence.protocols.into_iter().collect(),
                    via_routing: evidence.via.into_iter().collect(),
                    posture: evidence.posture.into_iter().collect(),
                    applications: evidence.applications.into_iter().collect(),
                    line_numbers: evidence.lines.into_iter().collect(),
                },
            );

            nodes.insert(
                id.clone(),
                Node {
                    tooltip: tooltip(&id, node_type, origin, &members),
                    label: id.clone(),
                    id,
                    node_type,
                    rule_type: origin,
                    color: self.color(node_type),
                    shape: origin.shape(),
                    members,
                },
            );
        }

        for edge in &edges {
            metadata
                .edges
                .entry(edge.key())
                .or_default()
                .push(EdgeMetadata::from(edge));
        }

        NetworkGraph {
            nodes,
            edges,
            metadata,
            warnings,
        }
    }

    /// prefix, then the groups, tagOwners and hosts maps; anything else is a host.
    fn node_type(&self, id: &str) -> NodeType {
        let doc = self.document;
        if id.starts_with(GROUP_PREFIX) || id.starts_with(AUTOGROUP_PREFIX) {
            NodeType::Group
        } else if id.starts_with(TAG_PREFIX) {
            NodeType::Tag
        } else if doc.groups.contains_key(id) || doc.autogroups.contains_key(id) {
            NodeType::Group
        } else if doc.tag_owners.contains_key(id) {
            NodeType::Tag
        } else {
            NodeType::Host
        }
    }

    // emails and addresses are literal, only bare names need a hosts entry
    fn is_unresolved(&self, id: &str, node_type: NodeType) -> bool {
        if node_type != NodeType::Host || !matches!(Target::parse(id), Ok(Target::Host(_))) {
            return false;
        }
        // acl destinations carry a port suffix (`db:5432`, `*:*`)
        let name = id.rsplit_once(':').map_or(id, |(name, _)| name);
        name != WILDCARD
            && !self.document.is_host(name)
            && !Email::is_valid(name)
            && parse_address(name).is_none()
    }

    fn members(&self, id: &str, node_type: NodeType) -> Vec<String> {
        let doc = self.document;
        match node_type {
            NodeType::Group => doc.group_members(id).map(<[String]>::to_vec),
            NodeType::Tag => doc.tag_owners(id).map(<[String]>::to_vec),
            NodeType::Host => doc.host_ip(id).map(|ip| vec![ip.to_string()]),
        }
        .unwrap_or_default()
    }

    fn color(&self, node_type: NodeType) -> String {
        match node_type {
            NodeType::Group => self.colors.group.clone(),
            NodeType::Tag => self.colors.tag.clone(),
            NodeType::Host => self.colors.host.clone(),
        }
    }
}

fn note(state: &mut BuildState, token: &str, facts: &RuleFacts<'_>) {
    let evidence = state.evidence.entry(token.to_string()).or_default();
    evidence.kinds.insert(facts.kind);
    if facts.line > 0 {
        evidence.lines.insert(facts.line);
    }
    evidence.protocols.extend(facts.protocols.iter().cloned());
    evidence.via.extend(facts.via.iter().cloned());
    evidence.posture.extend(
        facts
            .src_posture
            .iter()
            .chain(facts.dst_posture)
            .cloned(),
    );
    evidence
        .applications
        .extend(facts.applications.iter().cloned());
}

fn tooltip(id: &str, node_type: NodeType, origin: RuleOrigin, members: &[String]) -> String {
    let mut tooltip = format!("{}\nType: {}\nRule: {}\n", id, node_type, origin);
    if !members.is_empty() {
        let label = match node_type {
            NodeType::Group => "Members",
            NodeType::Tag => "Owners",
            NodeType::Host => "IP",
        };
        tooltip.push_str(&format!("{}: {}\n", label, members.join(", ")));
    }
    tooltip
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeShape;
    use tailmap_policy::ParsedPolicy;

    fn parse(raw: &str) -> ParsedPolicy {
        tailmap_policy::parse(raw).unwrap()
    }

    fn build(parsed: &ParsedPolicy) -> NetworkGraph {
        GraphBuilder::new(&parsed.document, &parsed.lines).build()
    }

    const ADMIN_ACL: &str = r#"{
  "groups": {"group:admin": ["a@x.com"]},
  "hosts": {"s1": "10.0.0.1"},
  "acls": [
    {"action": "accept", "src": ["group:admin"], "dst": ["s1"]}
  ]
}"#;

    const ADMIN_ACL_AND_GRANT: &str = r#"{
  "groups": {"group:admin": ["a@x.com"]},
  "hosts": {"s1": "10.0.0.1"},
  "acls": [
    {"action": "accept", "src": ["group:admin"], "dst": ["s1"]}
  ],
  "grants": [
    {"src": ["group:admin"], "dst": ["s1"], "ip": ["tcp:22"]}
  ]
}"#;

    #[test]
    fn test_two_node_acl_graph() {
        let graph = build(&parse(ADMIN_ACL));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let admin = graph.node("group:admin").unwrap();
        assert_eq!(admin.node_type, NodeType::Group);
        assert_eq!(admin.rule_type, RuleOrigin::AclOnly);
        assert_eq!(admin.shape, NodeShape::Dot);
        assert_eq!(admin.color, "#FFFF00");

        let s1 = graph.node("s1").unwrap();
        assert_eq!(s1.node_type, NodeType::Host);
        assert_eq!(s1.rule_type, RuleOrigin::AclOnly);
        assert_eq!(s1.members, vec!["10.0.0.1"]);

        let edge = &graph.edges[0];
        assert_eq!(edge.action, Some(AclAction::Accept));
        assert_eq!(edge.line_number, 5);
        assert!(graph.warnings.is_empty());
    }

    #[test]
    fn test_acl_and_grant_make_mixed() {
        let graph = build(&parse(ADMIN_ACL_AND_GRANT));
        assert_eq!(graph.node_count(), 2);
        for id in ["group:admin", "s1"] {
            let node = graph.node(id).unwrap();
            assert_eq!(node.rule_type, RuleOrigin::Mixed);
            assert_eq!(node.shape, NodeShape::Hexagon);
        }

        let edges = graph.edges_between("group:admin", "s1");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].rule_type, RuleKind::Acl);
        assert_eq!(edges[1].rule_type, RuleKind::Grant);
        assert_eq!(edges[1].protocols, vec!["tcp:22"]);

        // every contributing rule keeps its own metadata entry
        let meta = graph.edge_metadata("group:admin", "s1");
        assert_eq!(meta.len(), 2);
        assert_eq!(meta[0].rule_type, RuleKind::Acl);
        assert_eq!(meta[0].line_numbers, vec![5]);
        assert_eq!(meta[1].rule_type, RuleKind::Grant);
        assert_eq!(meta[1].line_numbers, vec![8]);
    }

    #[test]
    fn test_classification_independent_of_pass_order() {
        let parsed = parse(ADMIN_ACL_AND_GRANT);
        let builder = GraphBuilder::new(&parsed.document, &parsed.lines);
        let forward = builder.build_in_order([RuleKind::Acl, RuleKind::Grant]);
        let reverse = builder.build_in_order([RuleKind::Grant, RuleKind::Acl]);
        assert_eq!(forward.nodes, reverse.nodes);
        assert_eq!(forward.metadata.nodes, reverse.metadata.nodes);
    }

    #[test]
    fn test_wildcard_source() {
        let parsed = parse(
            r#"{"groups": {"group:admin": ["a@x.com"]},
                "acls": [{"action": "accept", "src": ["*"], "dst": ["group:admin"]}]}"#,
        );
        let graph = build(&parsed);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.has_node("group:admin"));
        assert!(!graph.has_node("*"));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_via_creates_standalone_node() {
        let parsed = parse(
            r#"{
  "hosts": {"gateway": "10.0.0.254"},
  "grants": [
    {"src": ["group:dev"], "dst": ["tag:dev"], "via": ["gateway"]}
  ]
}"#,
        );
        let graph = build(&parsed);
        assert_eq!(graph.node_count(), 3);
        let gateway = graph.node("gateway").unwrap();
        assert_eq!(gateway.node_type, NodeType::Host);
        assert_eq!(gateway.rule_type, RuleOrigin::GrantOnly);
        assert_eq!(gateway.shape, NodeShape::Triangle);
        assert!(graph.edges.iter().all(|e| e.from != "gateway" && e.to != "gateway"));

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges[0].via, vec!["gateway"]);
        assert_eq!(
            graph.metadata.nodes["group:dev"].via_routing,
            vec!["gateway"]
        );
    }

    #[test]
    fn test_type_inference_from_maps() {
        let parsed = parse(
            r#"{
  "groups": {"group:eng": ["a@x.com"]},
  "tagOwners": {"tag:web": ["a@x.com"]},
  "acls": [
    {"action": "accept", "src": ["group:eng", "a@x.com"], "dst": ["tag:web", "autogroup:internet", "10.0.0.0/8"]}
  ]
}"#,
        );
        let graph = build(&parsed);
        assert_eq!(graph.node("group:eng").unwrap().node_type, NodeType::Group);
        assert_eq!(
            graph.node("autogroup:internet").unwrap().node_type,
            NodeType::Group
        );
        assert_eq!(graph.node("tag:web").unwrap().node_type, NodeType::Tag);
        assert_eq!(graph.node("a@x.com").unwrap().node_type, NodeType::Host);
        assert_eq!(graph.node("10.0.0.0/8").unwrap().node_type, NodeType::Host);
        assert_eq!(graph.edge_count(), 6);
        // emails and cidrs are literal, not unresolved
        assert!(graph.warnings.is_empty());

        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 5);
        assert_eq!(stats.nodes_by_type[&NodeType::Group], 2);
        assert_eq!(stats.nodes_by_type[&NodeType::Host], 2);
        assert_eq!(stats.nodes_by_rule_type[&RuleOrigin::AclOnly], 5);
        assert_eq!(graph.nodes_by_type(NodeType::Tag).len(), 1);
        assert_eq!(graph.nodes_by_origin(RuleOrigin::Mixed).len(), 0);
    }

    #[test]
    fn test_tooltips() {
        let graph = build(&parse(ADMIN_ACL));
        assert_eq!(
            graph.node("group:admin").unwrap().tooltip,
            "group:admin\nType: group\nRule: ACL\nMembers: a@x.com\n"
        );
        assert_eq!(
            graph.node("s1").unwrap().tooltip,
            "s1\nType: host\nRule: ACL\nIP: 10.0.0.1\n"
        );
    }

    #[test]
    fn test_unresolved_target_warning() {
        let parsed = parse(
            r#"{"acls": [{"action": "accept", "src": ["mystery"], "dst": ["mystery", "*"]}]}"#,
        );
        let graph = build(&parsed);
        assert_eq!(
            graph.warnings,
            vec![GraphWarning::UnresolvedTarget {
                target: "mystery".to_string()
            }]
        );
        // self edge, the wildcard pair is dropped
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_port_suffixed_destinations_resolve() {
        let parsed = parse(
            r#"{
  "hosts": {"db": "10.0.0.5"},
  "acls": [
    {"action": "accept", "src": ["group:eng"], "dst": ["db:5432", "*:*", "10.0.0.9:22", "cache:6379"]}
  ]
}"#,
        );
        let graph = build(&parsed);
        // port-suffixed tokens stay raw node ids
        assert!(graph.has_node("db:5432"));
        assert!(graph.has_node("*:*"));
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(
            graph.warnings,
            vec![GraphWarning::UnresolvedTarget {
                target: "cache:6379".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_line_numbers_degrade_to_zero() {
        let document = tailmap_policy::decode(
            r#"{"grants": [{"src": ["tag:a"], "dst": ["tag:b"]}, {"src": ["tag:b"], "dst": ["tag:c"]}]}"#,
        )
        .unwrap();
        let lines = RuleLineIndex {
            acls: vec![],
            grants: vec![4],
        };
        let graph = GraphBuilder::new(&document, &lines).build();
        assert_eq!(graph.edges[0].line_number, 4);
        assert_eq!(graph.edges[1].line_number, 0);
        assert_eq!(
            graph.warnings,
            vec![GraphWarning::MissingLineNumber {
                rule: RuleKind::Grant,
                index: 1
            }]
        );
        assert_eq!(graph.metadata.nodes["tag:b"].line_numbers, vec![4]);
        assert!(graph.edge_metadata("tag:b", "tag:c")[0].line_numbers.is_empty());
    }

    #[test]
    fn test_node_metadata_collects_rule_details() {
        let parsed = parse(
            r#"{
  "postures": {"posture:latest": ["node:tsVersion >= '1.40'"]},
  "acls": [
    {"action": "accept", "src": ["tag:a"], "dst": ["tag:b"], "proto": "udp"}
  ],
  "grants": [
    {
      "src": ["tag:a"],
      "dst": ["tag:c"],
      "ip": ["tcp:443"],
      "srcPosture": ["posture:latest"],
      "app": {"tailscale.com/cap/drive": [{}]}
    }
  ]
}"#,
        );
        let graph = build(&parsed);
        let meta = &graph.metadata.nodes["tag:a"];
        assert_eq!(meta.rule_type, RuleOrigin::Mixed);
        assert_eq!(meta.protocols, vec!["tcp:443", "udp"]);
        assert_eq!(meta.posture, vec!["posture:latest"]);
        assert_eq!(meta.applications, vec!["tailscale.com/cap/drive"]);
        assert_eq!(meta.line_numbers, vec![4, 7]);

        let grant_meta = graph.edge_metadata("tag:a", "tag:c");
        assert_eq!(grant_meta[0].posture, vec!["posture:latest"]);
        assert_eq!(grant_meta[0].applications, vec!["tailscale.com/cap/drive"]);
    }

    #[test]
    fn test_custom_colors() {
        let parsed = parse(ADMIN_ACL);
        let colors = NodeColors {
            host: "#000000".to_string(),
            edge: "#111111".to_string(),
            ..NodeColors::default()
        };
        let graph = GraphBuilder::new(&parsed.document, &parsed.lines)
            .with_colors(colors)
            .build();
        assert_eq!(graph.node("s1").unwrap().color, "#000000");
        assert_eq!(graph.edges[0].color, "#111111");
    }

    #[test]
    fn test_build_is_deterministic() {
        let parsed = parse(ADMIN_ACL_AND_GRANT);
        assert_eq!(build(&parsed), build(&parsed));
    }
}

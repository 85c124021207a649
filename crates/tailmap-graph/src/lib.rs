//! network graph derivation for tailmap.
//!
//! a [`GraphBuilder`] turns a validated [`tailmap_policy::PolicyDocument`]
//! into a [`NetworkGraph`]: one node per distinct non-wildcard rule target,
//! one edge per (src, dst) pair per rule, and a search index keyed by node id
//! and by `"from->to"`. Building never fails; anything the builder could not
//! resolve is reported through [`NetworkGraph::warnings`].

#![warn(missing_docs)]

pub mod builder;
pub mod model;

pub use builder::GraphBuilder;
pub use model::{
    Edge, EdgeMetadata, GraphMetadata, GraphStats, GraphWarning, NetworkGraph, Node, NodeMetadata,
    NodeShape, NodeType, RuleOrigin, edge_key,
};

//! shared graph state for tailmap.
//!
//! a long-running host keeps the most recent [`NetworkGraph`] in a
//! [`GraphStore`]. Readers grab the current snapshot and keep using it for as
//! long as they like; a reload builds the next graph off to the side and swaps
//! it in, so readers never observe a half-built graph.
//!
//! [`NetworkGraph`]: tailmap_graph::NetworkGraph

#![warn(missing_docs)]

mod graph_store;

pub use graph_store::{GraphSnapshot, GraphStore};

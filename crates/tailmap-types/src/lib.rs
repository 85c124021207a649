//! core types for tailmap - a tailscale policy topology mapper.
//!
//! this crate provides the value types shared by the rest of the workspace:
//! - [`config`]: application configuration
//! - [`email`]: validated email addresses used by policy identities
//! - [`check_policy_size`]: the input size limit for policy files

mod config;
mod email;
mod error;
mod policy_size;

pub use config::{Config, NodeColors};
pub use email::{Email, EmailError};
pub use error::Error;
pub use policy_size::{MAX_POLICY_SIZE, PolicyTooLarge, check_policy_size};

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

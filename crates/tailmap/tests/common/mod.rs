//! shared test utilities for pipeline tests

#![allow(dead_code)] // Test utilities may not all be used in every test file

use std::path::PathBuf;

use tempfile::TempDir;

/// a small office network in hujson, exercising both rule dialects
pub const OFFICE_POLICY: &str = r#"{
  // people
  "groups": {
    "group:eng": ["alice@example.com", "bob@example.com"],
    "group:ops": ["carol@example.com"],
  },
  "hosts": {
    "db": "10.0.0.5",
    "gateway": "10.0.0.254",
  },
  "tagOwners": {
    "tag:web": ["carol@example.com"],
  },
  "postures": {
    "posture:latest": ["node:tsVersion >= '1.40'"],
  },
  "acls": [
    {"action": "accept", "src": ["group:eng"], "dst": ["db"]},
    {"action": "accept", "src": ["*"], "dst": ["tag:web"]},
  ],
  "grants": [
    {
      "src": ["group:eng"],
      "dst": ["tag:web"],
      "ip": ["tcp:443"],
      "via": ["gateway"],
      "srcPosture": ["posture:latest"],
    },
  ],
}
"#;

/// the same network after ops loses access to everything but the database
pub const REDUCED_POLICY: &str = r#"{
  "groups": {"group:ops": ["carol@example.com"]},
  "hosts": {"db": "10.0.0.5"},
  "acls": [
    {"action": "accept", "src": ["group:ops"], "dst": ["db"]}
  ]
}"#;

/// fails validation: unknown protocol in the first grant
pub const BROKEN_POLICY: &str = r#"{
  "grants": [{"src": ["group:eng"], "dst": ["tag:web"], "ip": ["xx:80"]}]
}"#;

/// a temp dir holding a policy file and room for output
pub struct Workspace {
    pub dir: TempDir,
    pub policy: PathBuf,
    pub output: PathBuf,
}

impl Workspace {
    /// create a workspace with `policy` written to `policy.hujson`
    pub fn new(policy: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let workspace = Self {
            policy: dir.path().join("policy.hujson"),
            output: dir.path().join("graph.json"),
            dir,
        };
        workspace.write_policy(policy);
        workspace
    }

    /// replace the policy file contents
    pub fn write_policy(&self, policy: &str) {
        std::fs::write(&self.policy, policy).unwrap();
    }

    /// read the output file as json
    pub fn read_output(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(&self.output).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

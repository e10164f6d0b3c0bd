//! Provenance descriptors written next to every generated run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic version describing the schema of serialized manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

/// Provenance record stored as `run_manifest.json` in each run directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Manifest schema.
    #[serde(default)]
    pub schema: SchemaVersion,
    /// Index of the run within the generated sweep (matches `run_number`).
    pub run_number: u64,
    /// Seed handed to the engine for this run.
    pub seed: u64,
    /// Master seed the run seed was derived from.
    pub master_seed: u64,
    /// Stable hash of the sweep specification that produced the run.
    pub sweep_hash: String,
    /// RFC 3339 timestamp recording when the run directory was written.
    pub created_at: String,
    /// Version map for the tools involved in setup.
    #[serde(default)]
    pub tool_versions: BTreeMap<String, String>,
}

#![deny(missing_docs)]
#![doc = "Shared error, seeding and serialization types for the epirun sweep tooling."]

pub mod errors;
/// Stable content hashes.
pub mod hash;
pub mod provenance;
pub mod rng;
/// Canonical JSON and YAML helpers.
pub mod serde;

pub use errors::{io_error, ErrorInfo, SweepError};
pub use hash::stable_hash_string;
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_run_seed, RngHandle, SeedPolicy, DEFAULT_SAMPLING_SEED};
pub use self::serde::{
    from_json_slice, from_yaml_slice, to_canonical_json_bytes, to_canonical_json_pretty,
};

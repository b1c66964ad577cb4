//! Control-plane integration

pub mod reporter;

pub use reporter::{patch_url, ClusterReporter, PodIdentity, PodPatch, STRATEGIC_MERGE_PATCH};

//! AutoFile: AI-assisted, bundle-aware collaborator dump intake.
//!
//! Pipeline: `scanner` partitions a dump into bundle roots and loose files;
//! `rules` and `ai` classify loose files; `planner` merges everything into
//! a path-keyed plan; `apply` routes files into the fixed project skeleton
//! and maintains the append-only manifest and log.

pub mod ai;
pub mod apply;
pub mod category;
pub mod config;
pub mod error;
pub mod fsio;
pub mod model;
pub mod planner;
pub mod rules;
pub mod scanner;
pub mod skeleton;

pub use apply::{apply_plan, write_plan_artifact, ApplyOutcome};
pub use category::{Category, DestLayout};
pub use config::{IntakeMarker, IntakeOptions};
pub use error::AutofileError;
pub use model::{BundleRoot, ClassificationDecision, FileRecord, ManifestRow, Plan, PlanEntry};
pub use planner::build_plan;
pub use rules::classify_by_rule;
pub use scanner::{scan_dump, ScanOutcome};

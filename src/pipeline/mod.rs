//! Per-candidate pipeline stages.
//!
//! Each submodule implements exactly one step of processing a single
//! candidate file. The orchestrator in [`crate::batch`] strings them together
//! and owns the failure accounting.
//!
//! ## Data Flow
//!
//! ```text
//! (download) ──▶ scratch ──▶ convert ──▶ enrich ──▶ record
//!  (remote)      (adopt)     (external)  (txt only)
//! ```
//!
//! 1. [`scratch`]: take charge of a finished download and delete it on
//!    drop, so no download outlives its iteration whatever happens after it
//! 2. [`naming`]: sanitise remote names and derive collision-free output
//!    paths
//! 3. [`convert`]: dispatch to the external converter for the requested
//!    format; the only stage that runs foreign code
//! 4. [`enrich`]: prepend the provenance header to text output

pub mod convert;
pub mod enrich;
pub mod naming;
pub mod scratch;

//! Module metadata as seen by the evaluator.
//!
//! The debuggee hands over each loaded module's metadata as a raw byte range. This module reads
//! just enough of it to identify modules and assemblies, and organises the ranges into the
//! snapshots and reference sets a compilation is built from.
//!
//! # Key Components
//!
//! - [`block::MetadataBlock`] - identity-tagged view onto one module's metadata
//! - [`snapshot::MetadataSnapshot`] - ordered blocks of a debug scope, intrinsics last
//! - [`references::AssemblyReferences`] - the subset of a snapshot a context is created from
//! - [`resolver::AssemblyReferenceResolver`] - best-match lookup of assembly identities
//! - [`identity`] - assembly identities, versions and strong names
//! - [`root`], [`streams`], [`view`] - ECMA-335 metadata parsing
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24 - Metadata physical layout

pub mod block;
pub mod identity;
pub mod references;
pub mod resolver;
pub mod root;
pub mod snapshot;
pub mod streams;
pub mod token;
pub mod view;

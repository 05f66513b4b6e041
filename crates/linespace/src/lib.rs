#![warn(missing_docs)]

//! Layout design-space construction for tiled tensor workloads.
//!
//! Given a multi-level buffer hierarchy, a tiled loop nest, and the geometry
//! of the tensors it touches, this crate derives the layout *concordant* with
//! the mapping — which loop iterations land inside a single memory line and
//! which span lines — then enumerates every legal way to reshape it: *splits*
//! that push oversized lines back under the per-level line capacity and
//! *packs* that fill slack capacity with iterations pulled in from across
//! lines. The enumeration is exposed as two flat integer spaces so an outer
//! search can walk candidates by ID and materialize any of them on demand.

/// Building blocks of the engine: workload geometry, mapping, architecture
/// view, layouts, and the design-space machinery itself.
pub mod components;

pub mod yaml;

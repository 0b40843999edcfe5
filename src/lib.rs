//! Gridstone is a simulation core for voxel worlds made of cubical blocks:
//! each grid cell holds a typed, immutable block state, and this crate models
//! how those states are defined, how their derived geometry is computed and
//! cached, and how the consequences of one cell changing propagate to its
//! neighbors.
//!
//! ## Data model
//!
//! * A [`Property`] is a named, finite-domain attribute of a block type
//!   (on/off, orientation, an integer level).
//! * A [`BlockState`] is an immutable flyweight: one block type plus one legal
//!   assignment of its properties. Every legal combination is interned exactly
//!   once ([`StateDefinition`]), so states compare by identity.
//! * The [`Registry`] owns every definition, a dense global state-id table,
//!   and the wire power strategy. It is built once and thereafter read-only.
//! * World storage is not owned here: hosts implement [`Grid`] (and
//!   [`EffectSink`] for drops and audiovisual effects); [`SparseGrid`] is a
//!   ready-made hash-map grid for tests and small hosts.
//!
//! ## Simulation
//!
//! All mutation goes through an [`UpdateSession`], which applies a state
//! change, dispatches per-kind reactions ([`behavior::Behavior`]), visits the
//! six neighbors in a fixed deterministic order, and bounds the whole cascade
//! with an update budget so that cyclic configurations terminate. The hardest
//! client of this machinery is redstone wire ([`wire`]): per-direction
//! connectivity including diagonal climbs, the dot/cross presentation law,
//! and network power resolution behind a swappable [`wire::SignalEvaluator`].
//!
//! Everything is synchronous and single-threaded per session; the only shared
//! mutable structure is the bounded full-cube cache inside the registry. The
//! face-occlusion cache ([`shape::OcclusionCache`]) is deliberately
//! per-caller, passed by `&mut`.
//!
//! This crate writes log messages via the [`log`] facade and otherwise has no
//! global state. [`euclid`] is re-exported through [`math`]'s type aliases.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::cast_lossless)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::uninlined_format_args)]

pub mod behavior;
pub mod content;
pub mod math;
pub mod property;
pub mod registry;
pub mod scan;
pub mod shape;
pub mod state;
pub mod update;
pub mod wire;
pub mod world;

pub use behavior::BlockKind;
pub use math::{Face4, Face6, GridPoint, GridVector};
pub use property::{Property, PropertyValue};
pub use registry::{Registry, RegistryBuilder, RegistryError};
pub use state::{BlockState, StateDefinition, StateFlags, StateId};
pub use update::{UpdateFlags, UpdateSession, UPDATE_BUDGET};
pub use world::{EffectSink, Fluid, Grid, SparseGrid};

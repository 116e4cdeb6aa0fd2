//! # Profile Harvest Core
//!
//! Runtime-agnostic logic for Profile Harvest: the entity registry,
//! lookup resolution, row denormalization, per-user grouping, composite
//! document assembly, batching, and document flattening.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Database
//! access goes through the [`source`] traits, which the application
//! crate implements over Postgres.
//!
//! ## Pipeline
//!
//! ```text
//! user ids ──▶ batch ──▶ for each entity type:
//!                          extract ──▶ denormalize ──▶ group
//!                                         ▲
//!                                    lookup tables
//!                       ──▶ assemble one document per user
//! ```

pub mod assemble;
pub mod batch;
pub mod codes;
pub mod denormalize;
pub mod entity;
pub mod error;
pub mod extract;
pub mod flatten;
pub mod group;
pub mod lookup;
pub mod models;
pub mod source;

pub use assemble::Assembler;
pub use entity::{EntitySpec, LookupSpec, REGISTRY};
pub use error::{PipelineError, PipelineResult};
pub use lookup::LookupResolver;
pub use models::{EntityRecord, RawRow, UserDocument, UserId};

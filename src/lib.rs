//! # Profile Harvest
//!
//! Batch extraction of per-user profile records into composite JSON
//! documents for a downstream search indexer.
//!
//! Every entity type (skills, qualifications, work experience, ...) is
//! queried for a whole batch of users at once. Foreign keys are resolved
//! against reference tables in a second database, rows are grouped by
//! user, and one document per user is appended to the output artifact.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  primary   │──▶│   extract    │──▶│  denormalize │◀── secondary
//! │ (profiles) │   │ + code decode│   │  (lookups)   │   (reference)
//! └────────────┘   └──────────────┘   └──────┬───────┘
//!                                            ▼
//!                  ┌──────────────┐   ┌──────────────┐
//!                  │ data.json    │◀──│ group+assemble│
//!                  │ (per batch)  │   │  per batch   │
//!                  └──────┬───────┘   └──────────────┘
//!                         ▼
//!                  harvest payload (JSONL for embedding)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! harvest check                    # both databases reachable?
//! harvest users                    # how many users, how many batches
//! harvest run                      # write data/data.json
//! harvest run --start-batch 7      # resume after a failed batch
//! harvest payload --output payload.jsonl
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Postgres connection pools |
//! | [`pg_source`] | Postgres-backed entity and lookup sources |
//! | [`users`] | Resolving the run's user identifiers |
//! | [`export`] | Batch export runner |
//! | [`payload`] | Embedding payloads from an export artifact |
//! | [`progress`] | Export progress reporting |
//! | [`sources`] | `check`, `entities`, and `users` commands |
//!
//! The pipeline itself lives in `profile-harvest-core`.

pub mod config;
pub mod db;
pub mod export;
pub mod payload;
pub mod pg_source;
pub mod progress;
pub mod sources;
pub mod users;

//! # Shared Types Crate
//!
//! Domain entities shared between the Proof-of-Devotion consensus engine and
//! the collaborators around it (chain store, pools, account manager, network).
//!
//! ## Clusters
//!
//! - **Chain**: [`Block`], [`ConsensusRoot`], [`ConsensusState`], [`Transaction`]
//! - **Identity**: [`Address`], [`Hash`], [`SignatureAlgorithm`]
//! - **Governance**: [`PodPayload`], [`PodAction`], [`Report`], [`EvilKind`]
//! - **Observability**: [`Event`], [`MinerStats`]
//!
//! All cross-crate types live here so the engine and its adapters agree on a
//! single wire and storage form.

pub mod address;
pub mod constants;
pub mod entities;
pub mod errors;
pub mod payload;

pub use address::Address;
pub use constants::*;
pub use entities::*;
pub use errors::TypeError;
pub use payload::{EvilKind, PodAction, PodPayload, Report};

//! Resolution protocol for selfup.
//!
//! A [`Resolver`] maps the running version to either "no update" or an
//! [`UpdatePayload`] archive stream. Concrete release sources live in other
//! crates; this crate holds the contract, the shared data model, and the
//! version/asset selection policy every source applies.

mod error;
mod policy;
mod traits;
mod types;

pub use error::{NetworkStage, ResolutionError};
pub use policy::{VersionPolicy, is_update_available, select_asset};
pub use traits::Resolver;
pub use types::{
    ArchiveFormat, AssetDescriptor, ReleaseDescriptor, ResolveRequest, UpdateOutcome,
    UpdatePayload,
};

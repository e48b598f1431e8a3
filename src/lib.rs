//! civicmap - civic boundary map state and officials lookup.
//!
//! Core library: observable UI state, the one-shot boundary loader with
//! TopoJSON conversion, and the officials directory.

pub mod boundaries;
pub mod config;
pub mod error;
pub mod layers;
pub mod location;
pub mod officials;
pub mod state;
pub mod store;
pub mod topology;

pub use boundaries::{BoundaryLoader, LoadState};
pub use error::{BoundaryError, LookupError, OfficialsError, TopologyError};
pub use layers::LayerRegistry;
pub use location::{InitialState, LngLat};
pub use officials::{Official, OfficialDirectory};
pub use state::AppState;
pub use store::{Subscription, Writable};

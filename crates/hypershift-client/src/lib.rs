//! Hosted control plane adapter
//!
//! Wraps the `oc` and `hypershift` binaries behind [`ControlPlaneClientTrait`].
//! Responses are decoded into typed resources at this boundary.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod control_plane_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::HypershiftClient;
pub use control_plane_trait::ControlPlaneClientTrait;
pub use error::ControlPlaneError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockControlPlaneClient;

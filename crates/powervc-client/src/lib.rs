//! PowerVC REST API Client
//!
//! A Rust client for the OpenStack-compatible API of IBM PowerVC.
//! Authenticates with Keystone v3 and resolves service endpoints from the catalog.
//!
//! # Example
//!
//! ```no_run
//! use powervc_client::{AuthOptions, PowerVcClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PowerVcClient::new(AuthOptions {
//!     auth_url: "https://powervc:5000/v3".to_string(),
//!     username: "admin".to_string(),
//!     password: "secret".to_string(),
//!     project_name: "ibm-default".to_string(),
//!     user_domain_name: "Default".to_string(),
//!     project_domain_name: "Default".to_string(),
//!     insecure: true,
//! })?;
//!
//! let networks = client.list_networks("vlan100").await?;
//! let servers = client.list_servers("demo-worker").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod powervc_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use auth::{AuthOptions, Service};
pub use client::PowerVcClient;
pub use error::PowerVcError;
pub use models::*;
pub use powervc_trait::PowerVcClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockPowerVcClient;

//! IBM Cloud Internet Services DNS client
//!
//! Manages DNS records in a CIS domain by driving `ibmcloud cis`. The client
//! logs in and resolves the domain ID once when it is created.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod dns_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::CisClient;
pub use dns_trait::DnsClientTrait;
pub use error::CisError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockCisClient;

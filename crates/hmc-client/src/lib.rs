//! HMC / VIOS Client
//!
//! Drives the Hardware Management Console and the Virtual I/O Server over SSH to
//! attach an installer image to a partition as virtual optical media.
//!
//! Both hosts only offer a restricted shell, so every operation is a single
//! remote command whose plain-text output is parsed by [`parser`]. The
//! transport is [`SshSession`], a russh client.

pub mod client;
pub mod error;
pub mod parser;
pub mod ssh;
#[path = "trait.rs"]
pub mod hmc_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{HmcClient, BOOT_STRING};
pub use error::HmcError;
pub use hmc_trait::{HmcClientTrait, RemoteShell};
pub use ssh::{SshSession, SshTarget, COMMAND_TIMEOUT, SSH_PORT, UPLOAD_TIMEOUT};
#[cfg(feature = "test-util")]
pub use mock::MockHmcClient;

//! External command runner
//!
//! Every CLI the orchestrator drives (`oc`, `hypershift`, `ibmcloud`) is
//! executed through [`CommandRunner`]. The production implementation spawns
//! processes with tokio; tests swap in [`ScriptedRunner`] (feature `test-util`).
//!
//! # Example
//!
//! ```no_run
//! use cli_runner::{CommandRunner, Invocation, ProcessRunner};
//!
//! # async fn example() -> Result<(), cli_runner::ExecError> {
//! let runner = ProcessRunner::default();
//! let output = runner
//!     .run_checked(&Invocation::new("oc").args(["get", "hc", "-n", "clusters"]))
//!     .await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod invocation;
pub mod process;
#[path = "trait.rs"]
pub mod runner_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use error::ExecError;
pub use invocation::{CommandOutput, Invocation};
pub use process::ProcessRunner;
pub use runner_trait::CommandRunner;
#[cfg(feature = "test-util")]
pub use mock::ScriptedRunner;

//! Orchestrator error types.
//!
//! Client crates report their own errors; this module maps them onto the
//! kinds the orchestrator acts on and adds step context.

use cis_client::CisError;
use cli_runner::ExecError;
use hmc_client::HmcError;
use hypershift_client::ControlPlaneError;
use powervc_client::PowerVcError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while creating or destroying a cluster.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Required input missing or invalid
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A resource or record the workflow depends on does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An external command or API call failed
    #[error("{0}")]
    ExternalCommand(String),

    /// A poll or external wait exceeded its bound
    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    /// An agent instance reached a failed/error state
    #[error("Agent {name} reached terminal state {state}: {details}")]
    TerminalAgentState {
        name: String,
        state: String,
        details: String,
    },

    /// The provider holds a different number of agent instances than requested
    #[error("Group {group} has {found} instance(s), expected {expected}")]
    AgentCount {
        group: String,
        expected: u32,
        found: usize,
    },

    /// Expected token or field absent from external output
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A create step failed
    #[error("{step} failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<ControllerError>,
    },

    /// One or more destroy steps failed
    #[error(transparent)]
    Teardown(TeardownError),
}

impl ControllerError {
    /// Wrap with the name of the step that produced it
    pub fn in_step(self, step: impl fmt::Display) -> Self {
        ControllerError::Step {
            step: step.to_string(),
            source: Box::new(self),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ControllerError::NotFound(_))
    }
}

impl From<PowerVcError> for ControllerError {
    fn from(err: PowerVcError) -> Self {
        match err {
            PowerVcError::NotFound(what) => ControllerError::NotFound(what),
            PowerVcError::Serialization(e) => ControllerError::Parse(format!("PowerVC response: {e}")),
            other => ControllerError::ExternalCommand(format!("PowerVC: {other}")),
        }
    }
}

impl From<HmcError> for ControllerError {
    fn from(err: HmcError) -> Self {
        match err {
            HmcError::TokenNotFound { .. } => ControllerError::Parse(err.to_string()),
            HmcError::Timeout {
                host,
                operation,
                timeout,
            } => ControllerError::Timeout {
                what: format!("{operation} on {host}"),
                after: timeout,
            },
            other => ControllerError::ExternalCommand(other.to_string()),
        }
    }
}

impl From<CisError> for ControllerError {
    fn from(err: CisError) -> Self {
        match err {
            CisError::RecordNotExist(_) | CisError::DomainNotFound(_) => ControllerError::NotFound(err.to_string()),
            CisError::Serialization(e) => ControllerError::Parse(format!("ibmcloud output: {e}")),
            CisError::Exec(e) => e.into(),
        }
    }
}

impl From<ControlPlaneError> for ControllerError {
    fn from(err: ControlPlaneError) -> Self {
        match err {
            ControlPlaneError::Exec(e) => e.into(),
            ControlPlaneError::Serialization(e) => ControllerError::Parse(format!("oc output: {e}")),
            ControlPlaneError::MissingField { .. } => ControllerError::Parse(err.to_string()),
            ControlPlaneError::InvalidManifest(_) => ControllerError::Parse(err.to_string()),
        }
    }
}

impl From<ExecError> for ControllerError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Timeout { command, timeout } => ControllerError::Timeout {
                what: command,
                after: timeout,
            },
            other => ControllerError::ExternalCommand(other.to_string()),
        }
    }
}

/// Outcome of a best-effort teardown: every failed step, in execution order
#[derive(Debug, Default)]
pub struct TeardownError {
    failures: Vec<(String, ControllerError)>,
}

impl TeardownError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: impl fmt::Display, error: ControllerError) {
        self.failures.push((step.to_string(), error));
    }

    pub fn any_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures(&self) -> &[(String, ControllerError)] {
        &self.failures
    }

    /// `Ok` when nothing failed, otherwise every failure in one error
    pub fn into_result(self) -> Result<(), ControllerError> {
        if self.any_failed() {
            Err(ControllerError::Teardown(self))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} teardown step(s) failed", self.failures.len())?;
        for (step, error) in &self.failures {
            write!(f, "\n  {step}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_context_in_message() {
        let err = ControllerError::NotFound("network vlan100".to_string()).in_step("resolve network");
        assert_eq!(err.to_string(), "resolve network failed: Not found: network vlan100");
    }

    #[test]
    fn test_teardown_lists_every_failure() {
        let mut teardown = TeardownError::new();
        assert!(!teardown.any_failed());
        teardown.push("destroy control plane", ControllerError::ExternalCommand("boom".to_string()));
        teardown.push("remove DNS record", ControllerError::NotFound("api.demo".to_string()));
        assert!(teardown.any_failed());
        assert_eq!(teardown.failures().len(), 2);
        let message = teardown.to_string();
        assert!(message.starts_with("2 teardown step(s) failed"));
        assert!(message.contains("destroy control plane: boom"));
        assert!(message.contains("remove DNS record: Not found: api.demo"));
    }

    #[test]
    fn test_powervc_not_found_maps_to_not_found() {
        let err: ControllerError = PowerVcError::NotFound("volume v1".to_string()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_command_timeout_maps_to_timeout() {
        let err: ControllerError = ExecError::Timeout {
            command: "oc wait hc demo".to_string(),
            timeout: Duration::from_secs(660),
        }
        .into();
        assert!(matches!(err, ControllerError::Timeout { .. }));
    }
}

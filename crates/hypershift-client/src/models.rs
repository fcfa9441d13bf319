//! Request and policy types for the control plane CLIs

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// HostedCluster condition waited on with `oc wait`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostedClusterCondition {
    /// Control plane is serving
    Available,
    /// Hosted cluster finished installing
    ClusterVersionAvailable,
}

impl HostedClusterCondition {
    /// Argument for `--for=condition=...`
    pub fn as_wait_arg(self) -> &'static str {
        match self {
            HostedClusterCondition::Available => "Available",
            HostedClusterCondition::ClusterVersionAvailable => "ClusterVersionAvailable=True",
        }
    }

    /// Bound applied to the wait
    pub fn timeout(self) -> Duration {
        match self {
            HostedClusterCondition::Available => Duration::from_secs(10 * 60),
            HostedClusterCondition::ClusterVersionAvailable => Duration::from_secs(30 * 60),
        }
    }
}

impl fmt::Display for HostedClusterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wait_arg())
    }
}

/// Inputs to `hypershift create cluster agent --render`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub name: String,
    pub agent_namespace: String,
    pub pull_secret: PathBuf,
    pub base_domain: String,
    pub ssh_key: PathBuf,
    pub release_image: String,
}

/// Format a duration the way `oc wait --timeout` expects
pub fn oc_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if seconds % 60 == 0 {
        format!("{}m", seconds / 60)
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_wait_args() {
        assert_eq!(HostedClusterCondition::Available.as_wait_arg(), "Available");
        assert_eq!(
            HostedClusterCondition::ClusterVersionAvailable.as_wait_arg(),
            "ClusterVersionAvailable=True"
        );
        assert_eq!(oc_duration(HostedClusterCondition::Available.timeout()), "10m");
        assert_eq!(oc_duration(HostedClusterCondition::ClusterVersionAvailable.timeout()), "30m");
        assert_eq!(oc_duration(Duration::from_secs(90)), "90s");
    }
}

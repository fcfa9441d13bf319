//! Infrastructure configuration
//!
//! Everything that is not specific to one cluster comes from the environment
//! and is read once at start-up. Missing variables are reported together.

use crate::error::ControllerError;
use hmc_client::{SshTarget, SSH_PORT};
use powervc_client::AuthOptions;

/// PowerVC, HMC, VIOS and IBM Cloud settings
#[derive(Clone)]
pub struct InfraConfig {
    /// Storage template (volume type) for boot volumes
    pub storage_template: String,
    pub network_name: String,
    /// Display name of the managed system agents are placed on
    pub host: String,
    pub hmc: SshTarget,
    pub vios: SshTarget,
    pub vios_home: String,
    pub ibmcloud_api_key: String,
    pub powervc: AuthOptions,
}

impl std::fmt::Debug for InfraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfraConfig")
            .field("storage_template", &self.storage_template)
            .field("network_name", &self.network_name)
            .field("host", &self.host)
            .field("hmc", &self.hmc)
            .field("vios", &self.vios)
            .field("vios_home", &self.vios_home)
            .field("powervc", &self.powervc)
            .finish_non_exhaustive()
    }
}

impl InfraConfig {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |key: &'static str| match lookup(key).filter(|value| !value.is_empty()) {
            Some(value) => value,
            None => {
                missing.push(key);
                String::new()
            }
        };

        let storage_template = required("POWERVC_STORAGE_TEMPLATE");
        let network_name = required("POWERVC_NETWORK_NAME");
        let host = required("POWERVC_HOST");
        let hmc = SshTarget {
            host: required("HMC_IP"),
            port: SSH_PORT,
            username: required("HMC_USERNAME"),
            password: required("HMC_PASSWORD"),
        };
        let vios = SshTarget {
            host: required("VIOS_IP"),
            port: SSH_PORT,
            username: required("VIOS_USERNAME"),
            password: required("VIOS_PASSWORD"),
        };
        let vios_home = required("VIOS_HOMEDIR");
        let ibmcloud_api_key = required("IBMCLOUD_API_KEY");
        let auth_url = required("OS_AUTH_URL");
        let username = required("OS_USERNAME");
        let password = required("OS_PASSWORD");
        let project_name = required("OS_PROJECT_NAME");

        if !missing.is_empty() {
            return Err(ControllerError::Validation(format!(
                "environment variables not set: {}",
                missing.join(", ")
            )));
        }

        let powervc = AuthOptions {
            auth_url,
            username,
            password,
            project_name,
            user_domain_name: lookup("OS_USER_DOMAIN_NAME").unwrap_or_else(|| "Default".to_string()),
            project_domain_name: lookup("OS_PROJECT_DOMAIN_NAME").unwrap_or_else(|| "Default".to_string()),
            insecure: lookup("OS_INSECURE").is_some_and(|value| is_truthy(&value)),
        };

        Ok(Self {
            storage_template,
            network_name,
            host,
            hmc,
            vios,
            vios_home,
            ibmcloud_api_key,
            powervc,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("POWERVC_STORAGE_TEMPLATE", "ssp-template"),
            ("POWERVC_NETWORK_NAME", "vlan100"),
            ("POWERVC_HOST", "p10-host-1"),
            ("HMC_IP", "10.1.0.5"),
            ("HMC_USERNAME", "hscroot"),
            ("HMC_PASSWORD", "hmc-secret"),
            ("VIOS_IP", "10.1.0.6"),
            ("VIOS_USERNAME", "padmin"),
            ("VIOS_PASSWORD", "vios-secret"),
            ("VIOS_HOMEDIR", "/home/padmin"),
            ("IBMCLOUD_API_KEY", "api-key"),
            ("OS_AUTH_URL", "https://powervc:5000/v3"),
            ("OS_USERNAME", "admin"),
            ("OS_PASSWORD", "os-secret"),
            ("OS_PROJECT_NAME", "ibm-default"),
        ])
    }

    #[test]
    fn test_from_lookup_defaults() {
        let env = full_env();
        let config = InfraConfig::from_lookup(|key| env.get(key).map(ToString::to_string)).unwrap();
        assert_eq!(config.network_name, "vlan100");
        assert_eq!(config.hmc.username, "hscroot");
        assert_eq!(config.vios_home, "/home/padmin");
        assert_eq!(config.powervc.user_domain_name, "Default");
        assert_eq!(config.powervc.project_domain_name, "Default");
        assert!(!config.powervc.insecure);
    }

    #[test]
    fn test_reports_all_missing_variables() {
        let mut env = full_env();
        env.remove("HMC_PASSWORD");
        env.remove("VIOS_HOMEDIR");
        env.insert("IBMCLOUD_API_KEY", "");
        let err = InfraConfig::from_lookup(|key| env.get(key).map(ToString::to_string)).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ControllerError::Validation(_)));
        assert!(message.contains("HMC_PASSWORD"));
        assert!(message.contains("VIOS_HOMEDIR"));
        assert!(message.contains("IBMCLOUD_API_KEY"));
    }

    #[test]
    fn test_insecure_flag() {
        let mut env = full_env();
        env.insert("OS_INSECURE", "true");
        let config = InfraConfig::from_lookup(|key| env.get(key).map(ToString::to_string)).unwrap();
        assert!(config.powervc.insecure);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let env = full_env();
        let config = InfraConfig::from_lookup(|key| env.get(key).map(ToString::to_string)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("api-key"));
    }
}

//! Keystone v3 password authentication and service catalog lookup

use crate::error::PowerVcError;
use serde::Deserialize;

/// Credentials and scope for a Keystone v3 password login
#[derive(Clone)]
pub struct AuthOptions {
    /// Identity endpoint, with or without the trailing `/v3`
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub user_domain_name: String,
    pub project_domain_name: String,
    /// Accept self-signed TLS certificates (PowerVC appliances ship with one)
    pub insecure: bool,
}

impl std::fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOptions")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("project_name", &self.project_name)
            .field("user_domain_name", &self.user_domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}

impl AuthOptions {
    /// Full URL of the token endpoint
    pub fn tokens_url(&self) -> String {
        let base = self.auth_url.trim_end_matches('/');
        if base.ends_with("/v3") {
            format!("{base}/auth/tokens")
        } else {
            format!("{base}/v3/auth/tokens")
        }
    }

    /// Request body for a project-scoped password token
    pub fn token_request(&self) -> serde_json::Value {
        serde_json::json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.username,
                            "domain": { "name": self.user_domain_name },
                            "password": self.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": self.project_name,
                        "domain": { "name": self.project_domain_name },
                    }
                }
            }
        })
    }
}

/// OpenStack services the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Compute,
    Network,
    Volume,
    Image,
}

impl Service {
    /// Catalog types accepted for this service, in preference order
    fn catalog_types(self) -> &'static [&'static str] {
        match self {
            Service::Compute => &["compute"],
            Service::Network => &["network"],
            Service::Volume => &["volumev3", "block-storage", "volumev2", "volume"],
            Service::Image => &["image"],
        }
    }

    /// API version path that catalog URLs for this service omit
    fn version_suffix(self) -> Option<&'static str> {
        match self {
            Service::Network => Some("/v2.0"),
            Service::Image => Some("/v2"),
            Service::Compute | Service::Volume => None,
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Service::Compute => "compute",
            Service::Network => "network",
            Service::Volume => "volume",
            Service::Image => "image",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenBody {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

/// One service in the token's catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    pub url: String,
}

/// An issued token together with the catalog it was issued with
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub catalog: Vec<CatalogEntry>,
}

impl Session {
    /// Public endpoint URL for `service`, without a trailing slash
    pub fn endpoint(&self, service: Service) -> Result<String, PowerVcError> {
        let url = service
            .catalog_types()
            .iter()
            .find_map(|wanted| {
                self.catalog
                    .iter()
                    .filter(|entry| entry.service_type == *wanted)
                    .flat_map(|entry| entry.endpoints.iter())
                    .find(|endpoint| endpoint.interface == "public")
            })
            .map(|endpoint| endpoint.url.trim_end_matches('/').to_string())
            .ok_or_else(|| PowerVcError::MissingEndpoint(service.to_string()))?;

        Ok(match service.version_suffix() {
            Some(suffix) if !url.ends_with(suffix) => format!("{url}{suffix}"),
            _ => url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(auth_url: &str) -> AuthOptions {
        AuthOptions {
            auth_url: auth_url.to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            project_name: "ibm-default".to_string(),
            user_domain_name: "Default".to_string(),
            project_domain_name: "Default".to_string(),
            insecure: true,
        }
    }

    fn session() -> Session {
        let body = serde_json::json!({
            "token": {
                "catalog": [
                    { "type": "compute", "endpoints": [
                        { "interface": "internal", "url": "http://internal:8774/v2.1/p1" },
                        { "interface": "public", "url": "https://pvc:8774/v2.1/p1/" }
                    ]},
                    { "type": "network", "endpoints": [
                        { "interface": "public", "url": "https://pvc:9696/" }
                    ]},
                    { "type": "volumev2", "endpoints": [
                        { "interface": "public", "url": "https://pvc:9000/v2/p1" }
                    ]},
                    { "type": "volumev3", "endpoints": [
                        { "interface": "public", "url": "https://pvc:9000/v3/p1" }
                    ]},
                    { "type": "image", "endpoints": [
                        { "interface": "public", "url": "https://pvc:9292/v2" }
                    ]}
                ]
            }
        });
        let parsed: TokenResponse = serde_json::from_value(body).unwrap();
        Session {
            token: "tok".to_string(),
            catalog: parsed.token.catalog,
        }
    }

    #[test]
    fn test_tokens_url() {
        assert_eq!(options("https://pvc:5000/v3/").tokens_url(), "https://pvc:5000/v3/auth/tokens");
        assert_eq!(options("https://pvc:5000").tokens_url(), "https://pvc:5000/v3/auth/tokens");
    }

    #[test]
    fn test_token_request_scopes_project() {
        let body = options("https://pvc:5000/v3").token_request();
        assert_eq!(body["auth"]["scope"]["project"]["name"], "ibm-default");
        assert_eq!(body["auth"]["identity"]["password"]["user"]["domain"]["name"], "Default");
    }

    #[test]
    fn test_debug_hides_password() {
        assert!(!format!("{:?}", options("https://pvc:5000")).contains("secret"));
    }

    #[test]
    fn test_endpoint_resolution() {
        let session = session();
        assert_eq!(session.endpoint(Service::Compute).unwrap(), "https://pvc:8774/v2.1/p1");
        assert_eq!(session.endpoint(Service::Network).unwrap(), "https://pvc:9696/v2.0");
        assert_eq!(session.endpoint(Service::Volume).unwrap(), "https://pvc:9000/v3/p1");
        assert_eq!(session.endpoint(Service::Image).unwrap(), "https://pvc:9292/v2");
    }

    #[test]
    fn test_missing_endpoint() {
        let session = Session {
            token: "tok".to_string(),
            catalog: Vec::new(),
        };
        assert!(matches!(
            session.endpoint(Service::Image),
            Err(PowerVcError::MissingEndpoint(_))
        ));
    }
}

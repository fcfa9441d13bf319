//! PowerVC API client
//!
//! Implements the subset of the OpenStack compute, network, block storage and
//! image APIs that PowerVC exposes and the orchestrator needs. Endpoints come
//! from the Keystone service catalog.

use crate::auth::{AuthOptions, Service, Session, TokenResponse};
use crate::error::PowerVcError;
use crate::models::*;
use crate::powervc_trait::PowerVcClientTrait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Request body variants
#[derive(Debug, Clone)]
enum Body {
    Empty,
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

#[derive(Deserialize)]
struct VolumeTypesEnvelope {
    volume_types: Vec<VolumeType>,
}

#[derive(Deserialize)]
struct VolumesEnvelope {
    volumes: Vec<Volume>,
}

#[derive(Deserialize)]
struct VolumeEnvelope {
    volume: Volume,
}

#[derive(Deserialize)]
struct ImagesEnvelope {
    images: Vec<Image>,
}

#[derive(Deserialize)]
struct FlavorEnvelope {
    flavor: Flavor,
}

#[derive(Deserialize)]
struct NetworksEnvelope {
    networks: Vec<Network>,
}

#[derive(Deserialize)]
struct SubnetsEnvelope {
    subnets: Vec<Subnet>,
}

#[derive(Deserialize)]
struct HypervisorsEnvelope {
    hypervisors: Vec<Hypervisor>,
}

#[derive(Deserialize)]
struct ServersEnvelope {
    servers: Vec<Server>,
}

#[derive(Deserialize)]
struct ServerEnvelope {
    server: Server,
}

/// PowerVC API client
pub struct PowerVcClient {
    client: Client,
    auth: AuthOptions,
    session: RwLock<Option<Session>>,
}

impl std::fmt::Debug for PowerVcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerVcClient")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl PowerVcClient {
    /// Create a new PowerVC client
    ///
    /// No request is made until the first API call (or [`PowerVcClient::authenticate`]).
    pub fn new(auth: AuthOptions) -> Result<Self, PowerVcError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .danger_accept_invalid_certs(auth.insecure)
            .build()?;

        Ok(Self {
            client,
            auth,
            session: RwLock::new(None),
        })
    }

    /// Obtain a fresh token and catalog, replacing any cached session
    pub async fn authenticate(&self) -> Result<(), PowerVcError> {
        let url = self.auth.tokens_url();
        debug!("Authenticating against {}", url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&self.auth.token_request())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PowerVcError::Authentication(format!("{status} - {body}")));
        }

        let token = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| {
                PowerVcError::Authentication("response carried no X-Subject-Token header".to_string())
            })?;
        let parsed: TokenResponse = response.json().await?;

        debug!("Authenticated, catalog has {} services", parsed.token.catalog.len());
        *self.session.write().await = Some(Session {
            token,
            catalog: parsed.token.catalog,
        });
        Ok(())
    }

    async fn current_session(&self) -> Result<Session, PowerVcError> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.clone());
        }
        self.authenticate().await?;
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| PowerVcError::Authentication("no session after login".to_string()))
    }

    async fn send_once(
        &self,
        method: &Method,
        service: Service,
        path: &str,
        query: &[(&str, &str)],
        body: &Body,
    ) -> Result<Response, PowerVcError> {
        let session = self.current_session().await?;
        let url = format!("{}{}", session.endpoint(service)?, path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("X-Auth-Token", &session.token)
            .header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Bytes(bytes) => request
                .header("Content-Type", "application/octet-stream")
                .body(bytes.clone()),
        };
        Ok(request.send().await?)
    }

    /// Send a request, re-authenticating once if the token has expired
    async fn send(
        &self,
        method: Method,
        service: Service,
        path: &str,
        query: &[(&str, &str)],
        body: Body,
    ) -> Result<Response, PowerVcError> {
        let response = self.send_once(&method, service, path, query, &body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        warn!("PowerVC rejected the token, re-authenticating");
        self.authenticate().await?;
        self.send_once(&method, service, path, query, &body).await
    }

    async fn check(response: Response, what: &str) -> Result<Response, PowerVcError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PowerVcError::NotFound(what.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PowerVcError::Authentication(format!("{what}: {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PowerVcError::Api(format!("{what}: {status} - {body}")));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, PowerVcError> {
        let response = self.send(Method::GET, service, path, query, Body::Empty).await?;
        let response = Self::check(response, what).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            PowerVcError::Api(format!(
                "error decoding {what}: {e} - Response (first 500 chars): {}",
                text.chars().take(500).collect::<String>()
            ))
        })
    }

    async fn delete(&self, service: Service, path: &str, what: &str) -> Result<(), PowerVcError> {
        let response = self.send(Method::DELETE, service, path, &[], Body::Empty).await?;
        Self::check(response, what).await?;
        Ok(())
    }

    /// List storage templates (volume types)
    pub async fn list_volume_types(&self) -> Result<Vec<VolumeType>, PowerVcError> {
        let envelope: VolumeTypesEnvelope = self
            .get_json(Service::Volume, "/types", &[], "list volume types")
            .await?;
        Ok(envelope.volume_types)
    }

    /// List volumes with the given name
    pub async fn list_volumes(&self, name: &str) -> Result<Vec<Volume>, PowerVcError> {
        let envelope: VolumesEnvelope = self
            .get_json(Service::Volume, "/volumes/detail", &[("name", name)], "list volumes")
            .await?;
        Ok(envelope.volumes)
    }

    pub async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume, PowerVcError> {
        debug!("Creating volume {} ({} GiB)", request.name, request.size);
        let body = serde_json::json!({ "volume": request });
        let response = self
            .send(Method::POST, Service::Volume, "/volumes", &[], Body::Json(body))
            .await?;
        let response = Self::check(response, "create volume").await?;
        let envelope: VolumeEnvelope = response.json().await?;
        Ok(envelope.volume)
    }

    pub async fn delete_volume(&self, id: &str) -> Result<(), PowerVcError> {
        debug!("Deleting volume {}", id);
        self.delete(Service::Volume, &format!("/volumes/{id}"), &format!("volume {id}"))
            .await
    }

    /// List images with the given name carrying the given tag
    pub async fn list_images(&self, name: &str, tag: &str) -> Result<Vec<Image>, PowerVcError> {
        let envelope: ImagesEnvelope = self
            .get_json(Service::Image, "/images", &[("name", name), ("tag", tag)], "list images")
            .await?;
        Ok(envelope.images)
    }

    pub async fn create_image(&self, request: &CreateImageRequest) -> Result<Image, PowerVcError> {
        debug!("Creating image {}", request.name);
        let body = serde_json::to_value(request)?;
        let response = self
            .send(Method::POST, Service::Image, "/images", &[], Body::Json(body))
            .await?;
        let response = Self::check(response, "create image").await?;
        Ok(response.json().await?)
    }

    pub async fn upload_image_data(&self, id: &str, data: Vec<u8>) -> Result<(), PowerVcError> {
        debug!("Uploading {} bytes of data to image {}", data.len(), id);
        let response = self
            .send(Method::PUT, Service::Image, &format!("/images/{id}/file"), &[], Body::Bytes(data))
            .await?;
        Self::check(response, &format!("upload image {id}")).await?;
        Ok(())
    }

    pub async fn delete_image(&self, id: &str) -> Result<(), PowerVcError> {
        debug!("Deleting image {}", id);
        self.delete(Service::Image, &format!("/images/{id}"), &format!("image {id}"))
            .await
    }

    /// Get a flavor by ID, `NotFound` if absent
    pub async fn get_flavor(&self, id: &str) -> Result<Flavor, PowerVcError> {
        let envelope: FlavorEnvelope = self
            .get_json(Service::Compute, &format!("/flavors/{id}"), &[], &format!("flavor {id}"))
            .await?;
        Ok(envelope.flavor)
    }

    pub async fn create_flavor(&self, request: &CreateFlavorRequest) -> Result<Flavor, PowerVcError> {
        debug!("Creating flavor {}", request.id);
        let body = serde_json::json!({ "flavor": request });
        let response = self
            .send(Method::POST, Service::Compute, "/flavors", &[], Body::Json(body))
            .await?;
        let response = Self::check(response, "create flavor").await?;
        let envelope: FlavorEnvelope = response.json().await?;
        Ok(envelope.flavor)
    }

    pub async fn create_flavor_extra_specs(
        &self,
        id: &str,
        specs: &BTreeMap<String, String>,
    ) -> Result<(), PowerVcError> {
        debug!("Setting {} extra specs on flavor {}", specs.len(), id);
        let body = serde_json::json!({ "extra_specs": specs });
        let response = self
            .send(
                Method::POST,
                Service::Compute,
                &format!("/flavors/{id}/os-extra_specs"),
                &[],
                Body::Json(body),
            )
            .await?;
        Self::check(response, &format!("extra specs for flavor {id}")).await?;
        Ok(())
    }

    pub async fn delete_flavor(&self, id: &str) -> Result<(), PowerVcError> {
        debug!("Deleting flavor {}", id);
        self.delete(Service::Compute, &format!("/flavors/{id}"), &format!("flavor {id}"))
            .await
    }

    pub async fn list_networks(&self, name: &str) -> Result<Vec<Network>, PowerVcError> {
        let envelope: NetworksEnvelope = self
            .get_json(Service::Network, "/networks", &[("name", name)], "list networks")
            .await?;
        Ok(envelope.networks)
    }

    pub async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>, PowerVcError> {
        let envelope: SubnetsEnvelope = self
            .get_json(Service::Network, "/subnets", &[("network_id", network_id)], "list subnets")
            .await?;
        Ok(envelope.subnets)
    }

    pub async fn list_hypervisors(&self) -> Result<Vec<Hypervisor>, PowerVcError> {
        let envelope: HypervisorsEnvelope = self
            .get_json(Service::Compute, "/os-hypervisors/detail", &[], "list hypervisors")
            .await?;
        Ok(envelope.hypervisors)
    }

    pub async fn list_servers(&self, name: &str) -> Result<Vec<Server>, PowerVcError> {
        let envelope: ServersEnvelope = self
            .get_json(Service::Compute, "/servers/detail", &[("name", name)], "list servers")
            .await?;
        Ok(envelope.servers)
    }

    pub async fn create_servers(&self, request: &CreateServersRequest) -> Result<(), PowerVcError> {
        debug!("Creating {} servers named {}", request.min_count, request.name);
        let body = serde_json::json!({ "server": request });
        let response = self
            .send(Method::POST, Service::Compute, "/servers", &[], Body::Json(body))
            .await?;
        Self::check(response, "create servers").await?;
        Ok(())
    }

    pub async fn get_server(&self, id: &str) -> Result<Server, PowerVcError> {
        let envelope: ServerEnvelope = self
            .get_json(Service::Compute, &format!("/servers/{id}"), &[], &format!("server {id}"))
            .await?;
        Ok(envelope.server)
    }

    pub async fn reboot_server(&self, id: &str, reboot_type: RebootType) -> Result<(), PowerVcError> {
        debug!("Rebooting server {} ({:?})", id, reboot_type);
        let body = serde_json::json!({ "reboot": { "type": reboot_type } });
        let response = self
            .send(
                Method::POST,
                Service::Compute,
                &format!("/servers/{id}/action"),
                &[],
                Body::Json(body),
            )
            .await?;
        Self::check(response, &format!("reboot server {id}")).await?;
        Ok(())
    }

    pub async fn delete_server(&self, id: &str) -> Result<(), PowerVcError> {
        debug!("Deleting server {}", id);
        self.delete(Service::Compute, &format!("/servers/{id}"), &format!("server {id}"))
            .await
    }
}

#[async_trait::async_trait]
impl PowerVcClientTrait for PowerVcClient {
    async fn list_volume_types(&self) -> Result<Vec<VolumeType>, PowerVcError> {
        self.list_volume_types().await
    }

    async fn list_volumes(&self, name: &str) -> Result<Vec<Volume>, PowerVcError> {
        self.list_volumes(name).await
    }

    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume, PowerVcError> {
        self.create_volume(request).await
    }

    async fn delete_volume(&self, id: &str) -> Result<(), PowerVcError> {
        self.delete_volume(id).await
    }

    async fn list_images(&self, name: &str, tag: &str) -> Result<Vec<Image>, PowerVcError> {
        self.list_images(name, tag).await
    }

    async fn create_image(&self, request: &CreateImageRequest) -> Result<Image, PowerVcError> {
        self.create_image(request).await
    }

    async fn upload_image_data(&self, id: &str, data: Vec<u8>) -> Result<(), PowerVcError> {
        self.upload_image_data(id, data).await
    }

    async fn delete_image(&self, id: &str) -> Result<(), PowerVcError> {
        self.delete_image(id).await
    }

    async fn get_flavor(&self, id: &str) -> Result<Flavor, PowerVcError> {
        self.get_flavor(id).await
    }

    async fn create_flavor(&self, request: &CreateFlavorRequest) -> Result<Flavor, PowerVcError> {
        self.create_flavor(request).await
    }

    async fn create_flavor_extra_specs(&self, id: &str, specs: &BTreeMap<String, String>) -> Result<(), PowerVcError> {
        self.create_flavor_extra_specs(id, specs).await
    }

    async fn delete_flavor(&self, id: &str) -> Result<(), PowerVcError> {
        self.delete_flavor(id).await
    }

    async fn list_networks(&self, name: &str) -> Result<Vec<Network>, PowerVcError> {
        self.list_networks(name).await
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>, PowerVcError> {
        self.list_subnets(network_id).await
    }

    async fn list_hypervisors(&self) -> Result<Vec<Hypervisor>, PowerVcError> {
        self.list_hypervisors().await
    }

    async fn list_servers(&self, name: &str) -> Result<Vec<Server>, PowerVcError> {
        self.list_servers(name).await
    }

    async fn create_servers(&self, request: &CreateServersRequest) -> Result<(), PowerVcError> {
        self.create_servers(request).await
    }

    async fn get_server(&self, id: &str) -> Result<Server, PowerVcError> {
        self.get_server(id).await
    }

    async fn reboot_server(&self, id: &str, reboot_type: RebootType) -> Result<(), PowerVcError> {
        self.reboot_server(id, reboot_type).await
    }

    async fn delete_server(&self, id: &str) -> Result<(), PowerVcError> {
        self.delete_server(id).await
    }
}

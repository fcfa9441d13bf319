//! `ibmcloud cis` wrapper

use crate::dns_trait::DnsClientTrait;
use crate::error::CisError;
use crate::models::{CisDomain, DnsRecord, RecordType};
use cli_runner::{CommandRunner, Invocation};
use std::sync::Arc;
use tracing::{debug, info};

const IBMCLOUD: &str = "ibmcloud";

/// CIS DNS client bound to one domain
pub struct CisClient {
    runner: Arc<dyn CommandRunner>,
    api_key: String,
    domain: String,
    domain_id: String,
}

impl std::fmt::Debug for CisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CisClient")
            .field("domain", &self.domain)
            .field("domain_id", &self.domain_id)
            .finish_non_exhaustive()
    }
}

impl CisClient {
    /// Log in with the API key and resolve the ID of `domain`
    pub async fn connect(
        runner: Arc<dyn CommandRunner>,
        api_key: impl Into<String>,
        domain: impl Into<String>,
    ) -> Result<Self, CisError> {
        let mut client = Self {
            runner,
            api_key: api_key.into(),
            domain: domain.into(),
            domain_id: String::new(),
        };
        client.login().await?;
        client.domain_id = client.resolve_domain_id().await?;
        info!(domain = %client.domain, domain_id = %client.domain_id, "CIS domain resolved");
        Ok(client)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn domain_id(&self) -> &str {
        &self.domain_id
    }

    fn ibmcloud<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(IBMCLOUD)
            .args(args)
            .env("IBMCLOUD_API_KEY", self.api_key.clone())
    }

    async fn login(&self) -> Result<(), CisError> {
        debug!("Logging in to IBM Cloud");
        self.runner
            .run_strict(&self.ibmcloud(["login", "--no-region", "--quiet"]))
            .await?;
        Ok(())
    }

    async fn resolve_domain_id(&self) -> Result<String, CisError> {
        let output = self
            .runner
            .run_strict(&self.ibmcloud(["cis", "domains", "--output", "json"]))
            .await?;
        let domains: Vec<CisDomain> = serde_json::from_str(&output.stdout)?;
        domains
            .into_iter()
            .find(|domain| domain.name == self.domain)
            .map(|domain| domain.id)
            .ok_or_else(|| CisError::DomainNotFound(self.domain.clone()))
    }

    pub async fn get_record_id(&self, name: &str) -> Result<String, CisError> {
        let output = self
            .runner
            .run_strict(&self.ibmcloud([
                "cis",
                "dns-records",
                self.domain_id.as_str(),
                "--name",
                name,
                "--output",
                "JSON",
            ]))
            .await?;
        let records: Vec<DnsRecord> = serde_json::from_str(&output.stdout)?;
        records
            .into_iter()
            .next()
            .map(|record| record.id)
            .ok_or_else(|| CisError::RecordNotExist(name.to_string()))
    }

    pub async fn create_record(&self, record_type: RecordType, name: &str, content: &str) -> Result<(), CisError> {
        debug!(record = name, %record_type, content, "creating DNS record");
        self.runner
            .run_strict(&self.ibmcloud([
                "cis",
                "dns-record-create",
                self.domain_id.as_str(),
                "--type",
                record_type.as_str(),
                "--name",
                name,
                "--content",
                content,
            ]))
            .await?;
        Ok(())
    }

    pub async fn update_record(&self, record_id: &str, content: &str) -> Result<(), CisError> {
        debug!(record_id, content, "updating DNS record");
        self.runner
            .run_strict(&self.ibmcloud([
                "cis",
                "dns-record-update",
                self.domain_id.as_str(),
                record_id,
                "--content",
                content,
            ]))
            .await?;
        Ok(())
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<(), CisError> {
        debug!(record_id, "deleting DNS record");
        self.runner
            .run_strict(&self.ibmcloud(["cis", "dns-record-delete", self.domain_id.as_str(), record_id]))
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsClientTrait for CisClient {
    async fn get_record_id(&self, name: &str) -> Result<String, CisError> {
        self.get_record_id(name).await
    }

    async fn create_record(&self, record_type: RecordType, name: &str, content: &str) -> Result<(), CisError> {
        self.create_record(record_type, name, content).await
    }

    async fn update_record(&self, record_id: &str, content: &str) -> Result<(), CisError> {
        self.update_record(record_id, content).await
    }

    async fn delete_record(&self, record_id: &str) -> Result<(), CisError> {
        self.delete_record(record_id).await
    }
}

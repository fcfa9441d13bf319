//! DNS record reconciliation
//!
//! Names are passed in fully qualified; this module does not derive them.

use crate::error::ControllerError;
use cis_client::{DnsClientTrait, RecordType};
use std::sync::Arc;
use tracing::info;

pub struct DnsReconciler {
    dns: Arc<dyn DnsClientTrait>,
}

impl std::fmt::Debug for DnsReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsReconciler").finish_non_exhaustive()
    }
}

impl DnsReconciler {
    pub fn new(dns: Arc<dyn DnsClientTrait>) -> Self {
        Self { dns }
    }

    /// Point `name` at `content`, updating the record if it exists
    pub async fn upsert_record(&self, record_type: RecordType, name: &str, content: &str) -> Result<(), ControllerError> {
        match self.dns.get_record_id(name).await {
            Ok(id) => {
                info!(record = name, content, "Updating DNS record");
                self.dns.update_record(&id, content).await?;
            }
            Err(e) if e.is_not_exist() => {
                info!(record = name, %record_type, content, "Creating DNS record");
                self.dns.create_record(record_type, name, content).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Delete `name`; a record that does not exist is already deleted
    pub async fn delete_record(&self, name: &str) -> Result<(), ControllerError> {
        let id = match self.dns.get_record_id(name).await {
            Ok(id) => id,
            Err(e) if e.is_not_exist() => {
                info!(record = name, "DNS record already absent");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.dns.delete_record(&id).await?;
        info!(record = name, "Deleted DNS record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cis_client::MockCisClient;

    #[tokio::test]
    async fn test_upsert_creates_when_absent() {
        let mock = MockCisClient::new();
        let reconciler = DnsReconciler::new(Arc::new(mock.clone()));

        reconciler
            .upsert_record(RecordType::Cname, "api.demo.example.com", "lb.example.com")
            .await
            .unwrap();

        assert_eq!(mock.call_count("create_record"), 1);
        assert_eq!(mock.call_count("update_record"), 0);
        assert_eq!(mock.content_of("api.demo.example.com").as_deref(), Some("lb.example.com"));
    }

    #[tokio::test]
    async fn test_upsert_updates_when_present() {
        let mock = MockCisClient::new();
        mock.add_record("rec-9", RecordType::A, "*.apps.demo.example.com", "10.0.0.99");
        let reconciler = DnsReconciler::new(Arc::new(mock.clone()));

        reconciler
            .upsert_record(RecordType::A, "*.apps.demo.example.com", "10.0.0.11")
            .await
            .unwrap();

        assert_eq!(mock.call_count("create_record"), 0);
        assert_eq!(mock.call_count("update_record"), 1);
        assert_eq!(mock.content_of("*.apps.demo.example.com").as_deref(), Some("10.0.0.11"));
    }

    #[tokio::test]
    async fn test_upsert_propagates_lookup_failure() {
        let mock = MockCisClient::new();
        mock.fail("get_record_id", "session expired");
        let reconciler = DnsReconciler::new(Arc::new(mock.clone()));

        reconciler
            .upsert_record(RecordType::A, "*.apps.demo.example.com", "10.0.0.11")
            .await
            .unwrap_err();

        assert_eq!(mock.call_count("create_record"), 0);
        assert_eq!(mock.call_count("update_record"), 0);
    }

    #[tokio::test]
    async fn test_delete_record() {
        let mock = MockCisClient::new();
        mock.add_record("rec-1", RecordType::Cname, "api.demo.example.com", "lb.example.com");
        let reconciler = DnsReconciler::new(Arc::new(mock.clone()));

        reconciler.delete_record("api.demo.example.com").await.unwrap();
        assert!(mock.records().is_empty());

        reconciler.delete_record("api.demo.example.com").await.unwrap();
        assert_eq!(mock.call_count("delete_record"), 1);
    }

    #[tokio::test]
    async fn test_delete_propagates_lookup_failure() {
        let mock = MockCisClient::new();
        mock.fail("get_record_id", "session expired");
        let reconciler = DnsReconciler::new(Arc::new(mock.clone()));

        reconciler.delete_record("api.demo.example.com").await.unwrap_err();
        assert_eq!(mock.call_count("delete_record"), 0);
    }
}

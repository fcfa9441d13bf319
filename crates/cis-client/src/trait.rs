//! DnsClient trait for mocking

use crate::error::CisError;
use crate::models::RecordType;

/// DNS record operations
///
/// Record names are used exactly as given.
#[async_trait::async_trait]
pub trait DnsClientTrait: Send + Sync {
    /// ID of the first record named `name`; [`CisError::RecordNotExist`] when there is none
    async fn get_record_id(&self, name: &str) -> Result<String, CisError>;

    async fn create_record(&self, record_type: RecordType, name: &str, content: &str) -> Result<(), CisError>;

    async fn update_record(&self, record_id: &str, content: &str) -> Result<(), CisError>;

    async fn delete_record(&self, record_id: &str) -> Result<(), CisError>;
}

//! Mock CIS DNS client for unit testing

use crate::dns_trait::DnsClientTrait;
use crate::error::CisError;
use crate::models::{DnsRecord, RecordType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory DNS zone
#[derive(Clone, Default)]
pub struct MockCisClient {
    pub(crate) records: Arc<Mutex<Vec<DnsRecord>>>,
    pub(crate) failures: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockCisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCisClient").finish_non_exhaustive()
    }
}

impl MockCisClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&self, id: &str, record_type: RecordType, name: &str, content: &str) {
        self.records.lock().unwrap().push(DnsRecord {
            id: id.to_string(),
            name: Some(name.to_string()),
            record_type: Some(record_type.to_string()),
            content: Some(content.to_string()),
        });
    }

    /// Make every call of `operation` fail
    pub fn fail(&self, operation: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), message.to_string());
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Content of the record named `name`, if present
    pub fn content_of(&self, name: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.name.as_deref() == Some(name))
            .and_then(|record| record.content.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.split(':').next() == Some(operation))
            .count()
    }

    fn record_call(&self, operation: &str, argument: &str) -> Result<(), CisError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{argument}"));
        match self.failures.lock().unwrap().get(operation) {
            Some(message) => Err(CisError::Exec(cli_runner::ExecError::Failed {
                command: format!("ibmcloud cis {operation}"),
                status: "exit status 1".to_string(),
                stderr: message.clone(),
            })),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl DnsClientTrait for MockCisClient {
    async fn get_record_id(&self, name: &str) -> Result<String, CisError> {
        self.record_call("get_record_id", name)?;
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.name.as_deref() == Some(name))
            .map(|record| record.id.clone())
            .ok_or_else(|| CisError::RecordNotExist(name.to_string()))
    }

    async fn create_record(&self, record_type: RecordType, name: &str, content: &str) -> Result<(), CisError> {
        self.record_call("create_record", name)?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("rec-{next}")
        };
        self.add_record(&id, record_type, name, content);
        Ok(())
    }

    async fn update_record(&self, record_id: &str, content: &str) -> Result<(), CisError> {
        self.record_call("update_record", record_id)?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == record_id)
            .ok_or_else(|| CisError::RecordNotExist(record_id.to_string()))?;
        record.content = Some(content.to_string());
        Ok(())
    }

    async fn delete_record(&self, record_id: &str) -> Result<(), CisError> {
        self.record_call("delete_record", record_id)?;
        self.records
            .lock()
            .unwrap()
            .retain(|record| record.id != record_id);
        Ok(())
    }
}

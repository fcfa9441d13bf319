//! Mock HmcClient for unit testing
//!
//! Every partition gets an LPAR ID, vhost and vtopt derived from its position
//! in the order it was first looked up, unless a failure was injected for the
//! operation. All calls are recorded as `operation:argument`.

use crate::error::HmcError;
use crate::hmc_trait::HmcClientTrait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Mock HmcClient for testing
#[derive(Clone, Default)]
pub struct MockHmcClient {
    pub(crate) lpar_ids: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) vios_files: Arc<Mutex<Vec<String>>>,
    pub(crate) failures: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
}

impl std::fmt::Debug for MockHmcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHmcClient").finish_non_exhaustive()
    }
}

impl MockHmcClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `operation` fail with a missing-token error
    pub fn fail(&self, operation: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), message.to_string());
    }

    /// Recorded calls as `operation:argument`, oldest first
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

    /// Files currently present in the VIOS home directory
    pub fn vios_files(&self) -> Vec<String> {
        self.vios_files.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, argument: &str) -> Result<(), HmcError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{argument}"));
        match self.failures.lock().unwrap().get(operation) {
            Some(message) => Err(HmcError::TokenNotFound {
                token: operation.to_string(),
                command: operation.to_string(),
                output: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl HmcClientTrait for MockHmcClient {
    async fn get_lpar_id(&self, _host: &str, partition: &str) -> Result<String, HmcError> {
        self.record("get_lpar_id", partition)?;
        let mut ids = self.lpar_ids.lock().unwrap();
        let next = ids.len() + 2;
        Ok(ids
            .entry(partition.to_string())
            .or_insert_with(|| next.to_string())
            .clone())
    }

    async fn get_vhost(&self, lpar_id: &str) -> Result<String, HmcError> {
        self.record("get_vhost", lpar_id)?;
        Ok(format!("vhost{lpar_id}"))
    }

    async fn create_vopt(&self, vopt_name: &str, _file_name: &str) -> Result<(), HmcError> {
        self.record("create_vopt", vopt_name)
    }

    async fn map_vopt(&self, vhost: &str, vopt_name: &str) -> Result<String, HmcError> {
        self.record("map_vopt", &format!("{vhost}/{vopt_name}"))?;
        Ok(format!("vtopt{}", vhost.trim_start_matches("vhost")))
    }

    async fn set_boot_string(&self, _host: &str, partition: &str) -> Result<(), HmcError> {
        self.record("set_boot_string", partition)
    }

    async fn copy_to_vios(&self, local: &Path) -> Result<String, HmcError> {
        let file_name = local
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| HmcError::InvalidPath(local.display().to_string()))?
            .to_string();
        self.record("copy_to_vios", &file_name)?;
        self.vios_files.lock().unwrap().push(file_name.clone());
        Ok(format!("/home/padmin/{file_name}"))
    }

    async fn remove_from_vios(&self, file_name: &str) -> Result<(), HmcError> {
        self.record("remove_from_vios", file_name)?;
        self.vios_files
            .lock()
            .unwrap()
            .retain(|file| file != file_name);
        Ok(())
    }

    async fn close(&self) -> Result<(), HmcError> {
        self.record("close", "")
    }
}

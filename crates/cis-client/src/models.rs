//! CIS CLI response models

use serde::{Deserialize, Serialize};

/// Domain (zone) managed by CIS
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CisDomain {
    pub id: String,
    pub name: String,
}

/// DNS record as listed by `ibmcloud cis dns-records`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Supported record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Cname,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

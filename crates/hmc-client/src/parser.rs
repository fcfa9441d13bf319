//! Parsers for HMC and VIOS command output
//!
//! Each command has its own small parser. A missing token is always
//! [`HmcError::TokenNotFound`], never an empty string.

use crate::error::HmcError;

fn token_not_found(token: &str, command: &str, output: &str) -> HmcError {
    HmcError::TokenNotFound {
        token: token.to_string(),
        command: command.to_string(),
        output: output.to_string(),
    }
}

/// Split one `lshwres`-style record into `key=value` fields.
///
/// Fields are comma separated. Double quotes group a value that itself
/// contains commas (`"virtual_slots=2,3"`); the quotes are dropped.
pub fn split_fields(record: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in record.chars() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
        .into_iter()
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect()
}

/// Value of the first field whose key is exactly `key`, scanning every line
pub fn find_key_value(output: &str, key: &str, command: &str) -> Result<String, HmcError> {
    output
        .lines()
        .flat_map(split_fields)
        .find_map(|field| {
            let (k, v) = field.split_once('=')?;
            (k.trim() == key && !v.trim().is_empty()).then(|| v.trim().to_string())
        })
        .ok_or_else(|| token_not_found(key, command, output))
}

/// Virtual host adapter name from `ioscli lsmap -all -dec -cpid <id>`.
///
/// The table has a header line and a dashed rule; the adapter is the first
/// column of the first row after the rule.
pub fn parse_lsmap_vhost(output: &str, command: &str) -> Result<String, HmcError> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with('-'))
        .skip(1)
        .find_map(|line| line.split_whitespace().next())
        .map(ToString::to_string)
        .ok_or_else(|| token_not_found("vhost", command, output))
}

/// Virtual target device from `ioscli mkvdev` output (`vtopt0 Available`)
pub fn parse_available_device(output: &str, command: &str) -> Result<String, HmcError> {
    output
        .lines()
        .find(|line| line.contains("Available"))
        .and_then(|line| line.split_whitespace().next())
        .filter(|device| *device != "Available")
        .map(ToString::to_string)
        .ok_or_else(|| token_not_found("Available", command, output))
}

/// Acknowledgement from a remote `scp -t` sink.
///
/// `0` accepts; `1` (warning) and `2` (fatal) are followed by a message line.
pub fn parse_scp_ack(response: &[u8], remote_path: &str) -> Result<(), HmcError> {
    match response.split_first() {
        Some((0, _)) => Ok(()),
        Some((_, message)) => Err(HmcError::Transfer {
            remote_path: remote_path.to_string(),
            message: String::from_utf8_lossy(message).trim().to_string(),
        }),
        None => Err(HmcError::Transfer {
            remote_path: remote_path.to_string(),
            message: "empty acknowledgement".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSHWRES: &str = "slot_num=2,state=1,is_required=0,adapter_type=client,\
lpar_name=demo-worker-1-0000002a,lpar_id=7,remote_lpar_id=1,remote_lpar_name=vios1,\
remote_slot_num=12,\"backing_devices=none\"\n";

    #[test]
    fn test_split_fields_respects_quotes() {
        let fields = split_fields("a=1,\"b=2,3\",c=4");
        assert_eq!(fields, vec!["a=1", "b=2,3", "c=4"]);
    }

    #[test]
    fn test_find_key_value_exact_key() {
        let id = find_key_value(LSHWRES, "lpar_id", "lshwres").unwrap();
        assert_eq!(id, "7");
        let remote = find_key_value(LSHWRES, "remote_lpar_id", "lshwres").unwrap();
        assert_eq!(remote, "1");
    }

    #[test]
    fn test_find_key_value_missing() {
        let err = find_key_value("No results were found.", "lpar_id", "lshwres").unwrap_err();
        match err {
            HmcError::TokenNotFound { token, .. } => assert_eq!(token, "lpar_id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_key_value_ignores_empty_value() {
        assert!(find_key_value("lpar_id=,slot_num=3", "lpar_id", "lshwres").is_err());
    }

    #[test]
    fn test_parse_lsmap_vhost() {
        let output = "SVSA            Physloc                                      Client Partition ID\n\
--------------- -------------------------------------------- ------------------\n\
vhost3          U8286.42A.21AAAAA-V1-C12                     7\n\
\n\
VTD                   NO VIRTUAL TARGET DEVICE FOUND\n";
        assert_eq!(parse_lsmap_vhost(output, "lsmap").unwrap(), "vhost3");
    }

    #[test]
    fn test_parse_lsmap_vhost_empty() {
        assert!(parse_lsmap_vhost("", "lsmap").is_err());
        let header_only = "SVSA            Physloc      Client Partition ID\n------- ------- -------\n";
        assert!(parse_lsmap_vhost(header_only, "lsmap").is_err());
    }

    #[test]
    fn test_parse_available_device() {
        assert_eq!(parse_available_device("vtopt0 Available\n", "mkvdev").unwrap(), "vtopt0");
        assert_eq!(
            parse_available_device("some banner\nvtopt12 Available\n", "mkvdev").unwrap(),
            "vtopt12"
        );
    }

    #[test]
    fn test_parse_available_device_missing() {
        assert!(parse_available_device("vtopt0 Defined\n", "mkvdev").is_err());
        assert!(parse_available_device("Available\n", "mkvdev").is_err());
    }

    #[test]
    fn test_parse_scp_ack() {
        assert!(parse_scp_ack(&[0], "/home/padmin/demo.iso").is_ok());
        match parse_scp_ack(b"\x01scp: /home/padmin: Permission denied\n", "/home/padmin/demo.iso") {
            Err(HmcError::Transfer { message, .. }) => {
                assert_eq!(message, "scp: /home/padmin: Permission denied");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_scp_ack(&[], "/home/padmin/demo.iso").is_err());
    }
}

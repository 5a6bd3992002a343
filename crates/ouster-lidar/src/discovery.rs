//! Network discovery through the vendor command-line tool.

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;

use crate::types::{LidarError, LidarResult};

const UNKNOWN: &str = "unknown";

/// A sensor found on the local network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSensor {
    pub hostname: String,
    pub ip: String,
    pub serial: String,
    pub product_line: String,
    pub firmware_version: String,
    pub connection_status: String,
}

impl DiscoveredSensor {
    fn from_fields(get: impl Fn(&[&str]) -> Option<String>) -> Self {
        let field = |names: &[&str]| get(names).unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            hostname: field(&["hostname"]),
            ip: field(&["ip", "i"]),
            serial: field(&["sn", "serial"]),
            product_line: field(&["prod_line", "product_line", "model"]),
            firmware_version: field(&["fw_rev", "firmware_version"]),
            connection_status: "discovered".to_string(),
        }
    }
}

/// Parse the output of the discovery command.
///
/// Accepts a JSON array of sensor objects, falling back to the text listing
/// where each sensor starts with a `Sensor:` (or `S:`) line followed by
/// `key: value` lines.
pub fn parse_discovery_output(stdout: &str) -> Vec<DiscoveredSensor> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<Value>>(trimmed) {
        Ok(entries) => entries
            .iter()
            .map(|entry| {
                DiscoveredSensor::from_fields(|names| {
                    names.iter().find_map(|n| match entry.get(*n)? {
                        Value::String(s) => Some(s.clone()),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                })
            })
            .collect(),
        Err(e) => {
            tracing::debug!("Discovery output is not JSON ({e}), parsing as text");
            parse_text(trimmed)
        }
    }
}

fn parse_text(text: &str) -> Vec<DiscoveredSensor> {
    let mut blocks: Vec<Vec<(String, String)>> = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(host) = line
            .strip_prefix("Sensor:")
            .or_else(|| line.strip_prefix("S:"))
        {
            blocks.push(vec![("hostname".to_string(), host.trim().to_string())]);
        } else if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase().replace(' ', "_");
            if let Some(block) = blocks.last_mut() {
                block.push((key, value.trim().to_string()));
            }
        }
    }

    blocks
        .iter()
        .map(|block| {
            DiscoveredSensor::from_fields(|names| {
                names
                    .iter()
                    .find_map(|n| block.iter().find(|(k, _)| k == n).map(|(_, v)| v.clone()))
            })
        })
        .collect()
}

/// Run `command` (program followed by arguments) and parse its output.
pub async fn run_discovery(command: &str, timeout: Duration) -> LidarResult<Vec<DiscoveredSensor>> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| LidarError::Discovery("discovery command is empty".to_string()))?;

    tracing::info!("Searching for sensors with `{command}`");

    let child = Command::new(program)
        .args(parts)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| LidarError::Discovery(format!("failed to run `{program}`: {e}")))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            LidarError::Discovery(format!(
                "discovery command timed out after {} seconds",
                timeout.as_secs()
            ))
        })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LidarError::Discovery(format!(
            "`{command}` exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(parse_discovery_output(&String::from_utf8_lossy(&output.stdout)))
}

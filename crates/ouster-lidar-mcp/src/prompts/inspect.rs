//! Prompt: inspect_sensor

use serde_json::Value;

use crate::types::{McpResult, PromptGetResult, PromptMessage, ToolContent};

use super::registry::required_str;

pub fn expand(args: Value) -> McpResult<PromptGetResult> {
    let hostname = required_str(&args, "hostname")?;

    let text = format!(
        "Inspect the Ouster sensor at {hostname}.\n\n\
         Please:\n\
         1. Use connect_sensor with hostname \"{hostname}\"\n\
         2. Use get_sensor_info to read its current metadata\n\
         3. Report the model, serial number, firmware, lidar mode, and status\n\
         4. Point out anything unusual, such as a status other than RUNNING or a narrowed azimuth window"
    );

    Ok(PromptGetResult {
        description: Some(format!("Inspect sensor {hostname}")),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: ToolContent::Text { text },
        }],
    })
}

//! Prompt: survey_scene

use serde_json::Value;

use crate::types::{McpResult, PromptGetResult, PromptMessage, ToolContent};

use super::registry::required_str;

pub fn expand(args: Value) -> McpResult<PromptGetResult> {
    let hostname = required_str(&args, "hostname")?;
    let distance = match args.get("max_distance") {
        Some(Value::Number(n)) => format!(" with max_distance {n}"),
        Some(Value::String(s)) if !s.trim().is_empty() => format!(" with max_distance {}", s.trim()),
        _ => String::new(),
    };

    let text = format!(
        "Survey the scene around the Ouster sensor at {hostname}.\n\n\
         Please:\n\
         1. Make sure the sensor is connected (connect_sensor)\n\
         2. Use capture_single_scan to check that it returns data\n\
         3. Use process_point_cloud{distance} to analyze the surroundings\n\
         4. Describe the extent of the scene, where points are densest, and the height profile"
    );

    Ok(PromptGetResult {
        description: Some(format!("Survey the scene around {hostname}")),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: ToolContent::Text { text },
        }],
    })
}

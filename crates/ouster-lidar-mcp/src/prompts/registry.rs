//! Prompt registration and dispatch.

use serde_json::Value;

use crate::types::{McpError, McpResult, PromptArgument, PromptDefinition, PromptGetResult};

use super::{inspect, survey};

pub struct PromptRegistry;

impl PromptRegistry {
    pub fn list_prompts() -> Vec<PromptDefinition> {
        vec![
            PromptDefinition {
                name: "inspect_sensor".to_string(),
                description: Some("Connect to a sensor and report its identity and health".to_string()),
                arguments: Some(vec![hostname_argument()]),
            },
            PromptDefinition {
                name: "survey_scene".to_string(),
                description: Some("Capture a scan and describe the surrounding scene".to_string()),
                arguments: Some(vec![
                    hostname_argument(),
                    PromptArgument {
                        name: "max_distance".to_string(),
                        description: Some("Only consider points within this many meters".to_string()),
                        required: false,
                    },
                ]),
            },
        ]
    }

    pub async fn get(name: &str, arguments: Option<Value>) -> McpResult<PromptGetResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "inspect_sensor" => inspect::expand(args),
            "survey_scene" => survey::expand(args),
            _ => Err(McpError::PromptNotFound(name.to_string())),
        }
    }
}

fn hostname_argument() -> PromptArgument {
    PromptArgument {
        name: "hostname".to_string(),
        description: Some("Sensor hostname or IP address".to_string()),
        required: true,
    }
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> McpResult<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| McpError::InvalidParams(format!("'{name}' argument is required")))
}

use serde::Serialize;

pub const SET_CASE_METADATA: &str = "set_case_metadata";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Tool {
    #[serde(rename = "function")]
    Function(FunctionTool),
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionTool {
    /// The name of the function
    name: String,

    /// The description of the function
    description: String,

    /// The parameters of the function in JSON Schema format
    parameters: serde_json::Value,
}

impl FunctionTool {
    pub fn new(name: String, description: String, parameters: serde_json::Value) -> Self {
        Self {
            name,
            description,
            parameters,
        }
    }
}

/// The tool the interviewer LLM calls when it presents a market sizing case.
pub fn set_case_metadata_tool() -> Tool {
    Tool::Function(FunctionTool::new(
        SET_CASE_METADATA.to_string(),
        "Called when presenting the market sizing case question to set metadata.".to_string(),
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The complete market sizing question being asked"
                },
                "difficulty": {
                    "type": "string",
                    "enum": ["easy", "medium", "hard"],
                    "description": "The difficulty level - must be one of: easy, medium, or hard"
                }
            },
            "required": ["question", "difficulty"]
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_shape() {
        let value = serde_json::to_value(set_case_metadata_tool()).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["name"], SET_CASE_METADATA);
        assert_eq!(
            value["parameters"]["properties"]["difficulty"]["enum"],
            serde_json::json!(["easy", "medium", "hard"])
        );
        assert_eq!(
            value["parameters"]["required"],
            serde_json::json!(["question", "difficulty"])
        );
    }
}

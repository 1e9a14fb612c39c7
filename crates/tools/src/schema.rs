//! JSON-schema definitions for the tools advertised to the model.

use codewright_core::ToolDefinition;
use serde_json::json;

/// The five file-operation tool definitions, in advertisement order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "read_file".into(),
            description: "Read the content of a single file from the project".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The path of the file to read, relative to the project root"
                    }
                },
                "required": ["file_path"]
            }),
        },
        ToolDefinition {
            name: "read_multiple_files".into(),
            description: "Read the contents of multiple files at once".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_paths": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Paths of the files to read, relative to the project root"
                    }
                },
                "required": ["file_paths"]
            }),
        },
        ToolDefinition {
            name: "create_file".into(),
            description: "Create a new file or overwrite an existing one with the given content"
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The path of the file to create"
                    },
                    "content": {
                        "type": "string",
                        "description": "The full content to write"
                    }
                },
                "required": ["file_path", "content"]
            }),
        },
        ToolDefinition {
            name: "create_multiple_files".into(),
            description: "Create several files in one call".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "files": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "path": { "type": "string" },
                                "content": { "type": "string" }
                            },
                            "required": ["path", "content"]
                        },
                        "description": "The files to create, each with a path and content"
                    }
                },
                "required": ["files"]
            }),
        },
        ToolDefinition {
            name: "edit_file".into(),
            description: "Edit a file by replacing an exact snippet that occurs exactly once"
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The path of the file to edit"
                    },
                    "original_snippet": {
                        "type": "string",
                        "description": "The exact text to find (must occur exactly once)"
                    },
                    "new_snippet": {
                        "type": "string",
                        "description": "The text to replace it with"
                    }
                },
                "required": ["file_path", "original_snippet", "new_snippet"]
            }),
        },
    ]
}

//! OpenAPI 3.0 description of the webhook API, served at `/openapi.json`.
//! Watson Assistant imports this document when the webhook extension is registered.

use crate::config::{ApiConfig, ApiServer};
use crate::webhook::protocol::MAX_TEXT_CHARS;
use serde_json::{json, Map, Value};

/// Build the document from API metadata. Pure data.
pub fn document(api: &ApiConfig) -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": api.title,
            "version": api.version,
        },
        "servers": api.servers.iter().map(server_entry).collect::<Vec<_>>(),
        "paths": {
            "/": {
                "get": {
                    "summary": "Health check",
                    "operationId": "healthCheck",
                    "responses": {
                        "200": {
                            "description": "Service is running",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Health" } } }
                        }
                    }
                }
            },
            "/chat": {
                "post": {
                    "summary": "Chat with the completion model in Watson Assistant webhook format",
                    "operationId": "chat",
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/WatsonRequest" } } }
                    },
                    "responses": {
                        "200": {
                            "description": "Reply, or a fallback message with diagnostics in context",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/WatsonResponse" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Health": {
                    "type": "object",
                    "properties": {
                        "status": { "type": "string" },
                        "message": { "type": "string" }
                    }
                },
                "WatsonRequest": {
                    "type": "object",
                    "required": ["text"],
                    "additionalProperties": false,
                    "properties": {
                        "text": { "type": "string", "minLength": 1, "maxLength": MAX_TEXT_CHARS },
                        "context": { "type": "object", "additionalProperties": {} }
                    }
                },
                "WatsonResponse": {
                    "type": "object",
                    "required": ["text"],
                    "properties": {
                        "response_type": { "type": "string", "default": "text" },
                        "text": { "type": "string" },
                        "context": { "type": "object", "additionalProperties": {} }
                    }
                }
            }
        }
    })
}

fn server_entry(server: &ApiServer) -> Value {
    let mut entry = Map::new();
    entry.insert("url".to_string(), Value::String(server.url.clone()));
    if let Some(ref description) = server.description {
        entry.insert("description".to_string(), Value::String(description.clone()));
    }
    if !server.variables.is_empty() {
        let variables: Map<String, Value> = server
            .variables
            .iter()
            .map(|v| {
                let mut var = json!({ "default": v.default });
                if let Some(ref d) = v.description {
                    var["description"] = Value::String(d.clone());
                }
                (v.name.clone(), var)
            })
            .collect();
        entry.insert("variables".to_string(), Value::Object(variables));
    }
    Value::Object(entry)
}

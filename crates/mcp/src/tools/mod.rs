//! Tool registry and the content tool catalogue.

mod ai_actions;
mod assets;
pub mod clients;
mod context;
mod entries;
mod health;
mod locales;
pub mod registry;
pub mod schema;

pub use clients::ClientCache;
pub use context::INSTRUCTIONS;
pub use registry::{
    tool_fn, FnHandler, RegistryError, ToolError, ToolHandler, ToolMetadata, ToolRegistry,
};
pub use schema::{
    json_schema_array, json_schema_boolean, json_schema_number, json_schema_object,
    json_schema_string, open_object_schema, Field, FieldKind, ParameterSchema,
};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tessera_sdk::ContentClient;

/// Register every content tool.
pub fn register_content_tools(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    health::register(registry)?;
    context::register(registry)?;
    entries::register(registry)?;
    assets::register(registry)?;
    locales::register(registry)?;
    ai_actions::register(registry)?;
    Ok(())
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(ToolError::invalid_arguments)
}

/// Client for the tenant of the ambient scope.
fn client() -> Result<ContentClient, ToolError> {
    clients::current_client()
}

/// `{"message": ..., ..data}`
fn success(message: &str, data: Value) -> Value {
    let mut body = Map::new();
    body.insert("message".to_string(), Value::String(message.to_string()));
    if let Value::Object(data) = data {
        body.extend(data);
    }
    Value::Object(body)
}

fn id_field(name: &str, description: &str) -> Field {
    Field::required(name, FieldKind::String, description)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_core::tenant::{TenantContext, TenantCredentials};

    #[test]
    fn test_catalogue_registers_every_tool() {
        let context = TenantContext::new(TenantCredentials::new("cfpat-0123456789", "s1")).unwrap();
        let mut registry = ToolRegistry::new(context);
        register_content_tools(&mut registry).unwrap();

        let names: Vec<_> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                "delete_ai_action",
                "delete_asset",
                "delete_entry",
                "delete_locale",
                "get_ai_action",
                "get_ai_action_invocation",
                "get_asset",
                "get_entry",
                "get_initial_context",
                "get_locale",
                "ping",
                "publish_ai_action",
                "publish_entry",
                "unpublish_ai_action",
                "unpublish_entry",
            ]
        );

        // a second pass collides on the first name
        assert!(matches!(
            register_content_tools(&mut registry),
            Err(RegistryError::DuplicateTool(_))
        ));
    }

    #[test]
    fn test_success_merges_data() {
        let body = success("Done", json!({"entryId": "e1"}));
        assert_eq!(body, json!({"message": "Done", "entryId": "e1"}));
    }
}

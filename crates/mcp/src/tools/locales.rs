// Locale tools

use crate::tools::{
    client, id_field, parse_args, success, tool_fn, ParameterSchema, RegistryError, ToolError,
    ToolRegistry,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocaleArgs {
    locale_id: String,
}

pub(crate) fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        "get_locale",
        "Retrieve a locale of the environment",
        ParameterSchema::Fields(vec![id_field("localeId", "The ID of the locale to retrieve")]),
        tool_fn(get_locale),
    )?;
    registry.register(
        "delete_locale",
        "Delete a locale from the environment",
        ParameterSchema::Fields(vec![id_field("localeId", "The ID of the locale to delete")]),
        tool_fn(delete_locale),
    )
}

async fn get_locale(arguments: Value) -> Result<Value, ToolError> {
    let args: LocaleArgs = parse_args(arguments)?;
    let locale = client()?.locales().get(&args.locale_id).await?;

    Ok(success("Locale retrieved successfully", json!({ "locale": locale })))
}

async fn delete_locale(arguments: Value) -> Result<Value, ToolError> {
    let args: LocaleArgs = parse_args(arguments)?;
    let client = client()?;

    let locale = client.locales().get(&args.locale_id).await?;
    client.locales().delete(&args.locale_id).await?;

    Ok(success("Locale deleted successfully", json!({ "locale": locale })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::tenant_for;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_delete_locale_not_found_skips_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/s1/environments/master/locales/de"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/spaces/s1/environments/master/locales/de"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let mut registry = ToolRegistry::new(tenant_for(&server, "s1"));
        register(&mut registry).unwrap();

        let err = registry
            .call("delete_locale", json!({"localeId": "de"}))
            .await
            .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("Resource not found"), "{rendered}");
        assert!(rendered.contains("get locale"), "{rendered}");
    }
}

// Entry tools

use crate::tools::{
    client, id_field, parse_args, success, tool_fn, ParameterSchema, RegistryError, ToolError,
    ToolRegistry,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryArgs {
    entry_id: String,
}

fn entry_schema(action: &str) -> ParameterSchema {
    ParameterSchema::Fields(vec![id_field("entryId", &format!("The ID of the entry to {}", action))])
}

pub(crate) fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        "get_entry",
        "Retrieve an existing entry",
        entry_schema("retrieve"),
        tool_fn(get_entry),
    )?;
    registry.register(
        "delete_entry",
        "Delete a specific entry",
        entry_schema("delete"),
        tool_fn(delete_entry),
    )?;
    registry.register(
        "publish_entry",
        "Publish an entry at its current version",
        entry_schema("publish"),
        tool_fn(publish_entry),
    )?;
    registry.register(
        "unpublish_entry",
        "Unpublish an entry",
        entry_schema("unpublish"),
        tool_fn(unpublish_entry),
    )
}

async fn get_entry(arguments: Value) -> Result<Value, ToolError> {
    let args: EntryArgs = parse_args(arguments)?;
    let entry = client()?.entries().get(&args.entry_id).await?;

    Ok(success("Entry retrieved successfully", json!({ "entry": entry })))
}

async fn delete_entry(arguments: Value) -> Result<Value, ToolError> {
    let args: EntryArgs = parse_args(arguments)?;
    let client = client()?;

    let entry = client.entries().get(&args.entry_id).await?;
    client.entries().delete(&args.entry_id).await?;

    Ok(success("Entry deleted successfully", json!({ "entry": entry })))
}

async fn publish_entry(arguments: Value) -> Result<Value, ToolError> {
    let args: EntryArgs = parse_args(arguments)?;
    let client = client()?;

    let entry = client.entries().get(&args.entry_id).await?;
    let published = client
        .entries()
        .publish(&args.entry_id, entry.sys.current_version())
        .await?;

    Ok(success(
        "Entry published successfully",
        json!({
            "entryId": args.entry_id,
            "version": published.sys.published_version,
        }),
    ))
}

async fn unpublish_entry(arguments: Value) -> Result<Value, ToolError> {
    let args: EntryArgs = parse_args(arguments)?;
    let entry = client()?.entries().unpublish(&args.entry_id).await?;

    Ok(success(
        "Entry unpublished successfully",
        json!({
            "entryId": args.entry_id,
            "version": entry.sys.version,
        }),
    ))
}

// Asset tools

use crate::tools::{
    client, id_field, parse_args, success, tool_fn, ParameterSchema, RegistryError, ToolError,
    ToolRegistry,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetArgs {
    asset_id: String,
}

pub(crate) fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        "get_asset",
        "Retrieve an asset",
        ParameterSchema::Fields(vec![id_field("assetId", "The ID of the asset to retrieve")]),
        tool_fn(get_asset),
    )?;
    registry.register(
        "delete_asset",
        "Delete an asset",
        ParameterSchema::Fields(vec![id_field("assetId", "The ID of the asset to delete")]),
        tool_fn(delete_asset),
    )
}

async fn get_asset(arguments: Value) -> Result<Value, ToolError> {
    let args: AssetArgs = parse_args(arguments)?;
    let asset = client()?.assets().get(&args.asset_id).await?;

    Ok(success("Asset retrieved successfully", json!({ "asset": asset })))
}

async fn delete_asset(arguments: Value) -> Result<Value, ToolError> {
    let args: AssetArgs = parse_args(arguments)?;
    let client = client()?;

    let asset = client.assets().get(&args.asset_id).await?;
    client.assets().delete(&args.asset_id).await?;

    Ok(success("Asset deleted successfully", json!({ "asset": asset })))
}

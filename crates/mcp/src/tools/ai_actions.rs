// AI action tools

use crate::tools::{
    client, id_field, parse_args, success, tool_fn, ParameterSchema, RegistryError, ToolError,
    ToolRegistry,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiActionArgs {
    ai_action_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvocationArgs {
    ai_action_id: String,
    invocation_id: String,
}

fn action_schema(action: &str) -> ParameterSchema {
    ParameterSchema::Fields(vec![id_field(
        "aiActionId",
        &format!("The ID of the AI action to {}", action),
    )])
}

pub(crate) fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        "get_ai_action",
        "Retrieve an AI action",
        action_schema("retrieve"),
        tool_fn(get_ai_action),
    )?;
    registry.register(
        "delete_ai_action",
        "Delete an AI action",
        action_schema("delete"),
        tool_fn(delete_ai_action),
    )?;
    registry.register(
        "publish_ai_action",
        "Publish an AI action at its current version",
        action_schema("publish"),
        tool_fn(publish_ai_action),
    )?;
    registry.register(
        "unpublish_ai_action",
        "Unpublish an AI action",
        action_schema("unpublish"),
        tool_fn(unpublish_ai_action),
    )?;
    registry.register(
        "get_ai_action_invocation",
        "Retrieve the result of an AI action invocation",
        ParameterSchema::Fields(vec![
            id_field("aiActionId", "The ID of the AI action"),
            id_field("invocationId", "The ID of the invocation to retrieve"),
        ]),
        tool_fn(get_ai_action_invocation),
    )
}

async fn get_ai_action(arguments: Value) -> Result<Value, ToolError> {
    let args: AiActionArgs = parse_args(arguments)?;
    let action = client()?.ai_actions().get(&args.ai_action_id).await?;

    Ok(success("AI action retrieved successfully", json!({ "aiAction": action })))
}

async fn delete_ai_action(arguments: Value) -> Result<Value, ToolError> {
    let args: AiActionArgs = parse_args(arguments)?;
    let client = client()?;

    let action = client.ai_actions().get(&args.ai_action_id).await?;
    client.ai_actions().delete(&args.ai_action_id).await?;

    Ok(success("AI action deleted successfully", json!({ "aiAction": action })))
}

async fn publish_ai_action(arguments: Value) -> Result<Value, ToolError> {
    let args: AiActionArgs = parse_args(arguments)?;
    let client = client()?;

    let action = client.ai_actions().get(&args.ai_action_id).await?;
    let published = client
        .ai_actions()
        .publish(&args.ai_action_id, action.sys.current_version())
        .await?;

    Ok(success(
        "AI action published successfully",
        json!({
            "aiActionId": args.ai_action_id,
            "version": published.sys.published_version,
        }),
    ))
}

async fn unpublish_ai_action(arguments: Value) -> Result<Value, ToolError> {
    let args: AiActionArgs = parse_args(arguments)?;
    client()?.ai_actions().unpublish(&args.ai_action_id).await?;

    Ok(success(
        "AI action unpublished successfully",
        json!({ "aiActionId": args.ai_action_id }),
    ))
}

async fn get_ai_action_invocation(arguments: Value) -> Result<Value, ToolError> {
    let args: InvocationArgs = parse_args(arguments)?;
    let invocation = client()?
        .ai_action_invocations()
        .get(&args.ai_action_id, &args.invocation_id)
        .await?;

    Ok(success(
        "AI action invocation retrieved successfully",
        json!({ "invocation": invocation }),
    ))
}

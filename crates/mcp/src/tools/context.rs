// Initial context tool

use crate::tools::{tool_fn, ParameterSchema, RegistryError, ToolError, ToolRegistry};
use serde_json::Value;
use tessera_core::context::require_context;

/// Guidance returned by `initialize` and `get_initial_context`.
pub const INSTRUCTIONS: &str = "\
You are connected to a content-management space through Tessera. \
Call get_initial_context once before any other tool. \
Entries, assets and locales are read from the configured environment; \
AI actions live at the space level. \
Fetch a resource before deleting or publishing it so you can report what changed.";

pub(crate) fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let session = registry.session().clone();

    registry.register(
        "get_initial_context",
        "IMPORTANT: Call this before using any other tool. Returns the current space configuration and usage instructions",
        ParameterSchema::none(),
        tool_fn(move |_arguments: Value| {
            let session = session.clone();
            async move {
                let context = require_context()?;

                let message = format!(
                    "{INSTRUCTIONS}\n\n\
                     This is the initial context for your content space:\n\n\
                     <context>\n\
                     Current Configuration:\n\
                     \x20 - Space ID: {}\n\
                     \x20 - Environment ID: {}\n\
                     \x20 - API Host: {}\n\
                     </context>\n\n\
                     <todaysDate>{}</todaysDate>",
                    context.space_id(),
                    context.environment_id(),
                    context.host(),
                    chrono::Utc::now().format("%Y-%m-%d"),
                );

                session.mark_initial_context_loaded();
                Ok::<_, ToolError>(Value::String(message))
            }
        }),
    )
}

//! Resource-scoped API groups.
//!
//! Each group borrows the [`ContentClient`](crate::client::ContentClient) and
//! routes every verb through `ContentClient::call`, so retry and error
//! classification apply uniformly.

mod ai_actions;
mod assets;
mod entries;
mod environments;
mod locales;
mod spaces;

pub use ai_actions::{AiActionInvocationsApi, AiActionsApi};
pub use assets::AssetsApi;
pub use entries::{EntriesApi, EntryFields};
pub use environments::EnvironmentsApi;
pub use locales::LocalesApi;
pub use spaces::SpacesApi;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// System metadata shared by every resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sys {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Sys {
    /// The version to send in `X-Contentful-Version` for the next write.
    pub fn current_version(&self) -> u64 {
        self.version.unwrap_or(1)
    }
}

/// A resource as returned by the API: `sys` plus whatever else it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub sys: Sys,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Resource {
    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }
}

/// A page of resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub limit: u64,
}

/// Query parameters for list endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(rename = "content_type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ListQuery {
    pub fn page(limit: u32, skip: u32) -> Self {
        Self {
            limit: Some(limit),
            skip: Some(skip),
            ..Default::default()
        }
    }
}

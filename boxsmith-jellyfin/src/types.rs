//! Jellyfin API response types (PascalCase on the wire).

use std::collections::HashMap;

use boxsmith_core::ExternalId;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<BaseItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider_ids: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub image_tags: HashMap<String, String>,
}

impl BaseItem {
    /// TMDb id from `ProviderIds`, whichever casing the server used.
    pub fn tmdb_id(&self) -> Option<ExternalId> {
        ["Tmdb", "tmdb", "TMDB"]
            .iter()
            .filter_map(|k| self.provider_ids.get(*k))
            .find_map(ExternalId::from_json)
    }

    pub fn has_primary_image(&self) -> bool {
        self.image_tags.contains_key("Primary")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Older servers put the flag at the top level.
    #[serde(default)]
    pub is_disabled: Option<bool>,
    #[serde(default)]
    pub policy: Option<UserPolicy>,
}

impl UserDto {
    pub fn is_disabled(&self) -> bool {
        self.is_disabled
            .or_else(|| self.policy.as_ref().map(|p| p.is_disabled))
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPolicy {
    #[serde(default)]
    pub is_disabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct CollectionCreated {
    #[serde(alias = "id", rename = "Id")]
    pub id: String,
}

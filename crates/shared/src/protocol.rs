use serde::{Deserialize, Serialize};

use crate::{
    domain::{Item, PrincipalId},
    error::ApiError,
};

/// Name of the per-namespace item collection.
pub const ITEMS_COLLECTION: &str = "items";

/// Response header carrying the revision of the snapshot that first includes
/// a write.
pub const SNAPSHOT_REVISION_HEADER: &str = "x-snapshot-revision";

/// `namespace/items`, the collection every item of `namespace` lives in.
pub fn collection_path(namespace: &str) -> String {
    format!("{namespace}/{ITEMS_COLLECTION}")
}

pub fn items_route(namespace: &str) -> String {
    format!("/namespaces/{namespace}/{ITEMS_COLLECTION}")
}

pub fn item_route(namespace: &str, item_id: &str) -> String {
    format!("/namespaces/{namespace}/{ITEMS_COLLECTION}/{item_id}")
}

pub fn item_toggle_route(namespace: &str, item_id: &str) -> String {
    format!("{}/toggle", item_route(namespace, item_id))
}

pub fn live_channel_route(namespace: &str) -> String {
    format!("/namespaces/{namespace}/ws")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub principal_id: PrincipalId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalQuery {
    pub principal_id: String,
}

/// Complete item set of one namespace at one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub namespace: String,
    pub revision: u64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    Snapshot(ItemSnapshot),
    Error(ApiError),
}

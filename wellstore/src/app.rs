//! The wellness application's collections and the record shapes it reads and writes.
//!
//! Field names are camelCase on disk, so index key fields (`userId`, `toolType`, ...)
//! match the serialized models.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wellstore_core::{CollectionSpec, IndexSpec, Model, Schema, SchemaError, StorageEngine, StoreHandle};

pub const DATABASE: &str = "wellness";
pub const VERSION: u32 = 3;

pub fn app_schema() -> Result<Schema, SchemaError> {
    Schema::builder(DATABASE, VERSION)
        .collection(CollectionSpec::new(User::COLLECTION, "id").index(IndexSpec::unique("email", "email")))
        .collection(
            CollectionSpec::new(Emotion::COLLECTION, "id")
                .index(IndexSpec::new("userId", "userId"))
                .index(IndexSpec::new("timestamp", "timestamp")),
        )
        .collection(CollectionSpec::new(Assessment::COLLECTION, "id").index(IndexSpec::new("userId", "userId")))
        .collection(
            CollectionSpec::new(ToolUsage::COLLECTION, "id")
                .index(IndexSpec::new("userId", "userId"))
                .index(IndexSpec::new("toolType", "toolType")),
        )
        .collection(CollectionSpec::new(Settings::COLLECTION, "userId"))
        .collection(
            CollectionSpec::new(Monitoring::COLLECTION, "id")
                .index(IndexSpec::new("parentId", "parentId"))
                .index(IndexSpec::new("childId", "childId")),
        )
        .collection(
            CollectionSpec::new(Post::COLLECTION, "id").index(IndexSpec::new("authorId", "authorId")).index(IndexSpec::new("createdAt", "createdAt")),
        )
        .build()
}

/// A handle on the wellness database. Nothing is opened until the first operation.
pub fn open(engine: Arc<dyn StorageEngine>) -> Result<StoreHandle, SchemaError> { Ok(StoreHandle::new(Arc::new(app_schema()?), engine)) }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub is_parent: bool,
    pub created_at: i64,
}

impl Model for User {
    const COLLECTION: &'static str = "users";
}

/// One emotion diary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emotion {
    pub id: String,
    pub user_id: String,
    pub mood: String,
    /// 1 (barely) to 5 (overwhelming).
    pub intensity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Unix seconds.
    pub timestamp: i64,
}

impl Model for Emotion {
    const COLLECTION: &'static str = "emotions";
}

/// A completed stress questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub user_id: String,
    pub questionnaire: String,
    pub answers: Vec<u8>,
    pub score: u32,
    pub completed_at: i64,
}

impl Model for Assessment {
    const COLLECTION: &'static str = "assessments";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsage {
    pub id: String,
    pub user_id: String,
    /// Which coping tool was used, e.g. `breathing` or `journaling`.
    pub tool_type: String,
    pub duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helpful: Option<bool>,
    pub used_at: i64,
}

impl Model for ToolUsage {
    const COLLECTION: &'static str = "toolUsage";
}

/// Per-user settings, keyed by the owner's id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub user_id: String,
    #[serde(default)]
    pub reminders_enabled: bool,
    /// Coping methods in the order the user prefers them.
    #[serde(default)]
    pub coping_priorities: Vec<String>,
    /// Coping methods the user asked not to be offered again.
    #[serde(default)]
    pub rejected_coping_methods: Vec<String>,
}

impl Model for Settings {
    const COLLECTION: &'static str = "settings";
}

/// A parent's view of one child's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitoring {
    pub id: String,
    pub parent_id: String,
    pub child_id: String,
    #[serde(default)]
    pub share_emotions: bool,
    #[serde(default)]
    pub share_assessments: bool,
    pub created_at: i64,
}

impl Model for Monitoring {
    const COLLECTION: &'static str = "monitoring";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub body: String,
    #[serde(default)]
    pub anonymous: bool,
    pub created_at: i64,
}

impl Model for Post {
    const COLLECTION: &'static str = "posts";
}

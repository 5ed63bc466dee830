use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DraftError;

/// Principal recorded as owner of items created without authentication.
pub const LOCAL_PRINCIPAL: &str = "local-user";

/// Backend-assigned item identifier.
///
/// The local backend hands out increasing integers; the remote document store
/// assigns opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Local(i64),
    Remote(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(id) => write!(f, "{id}"),
            Self::Remote(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn local() -> Self {
        Self(LOCAL_PRINCIPAL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item fields as persisted, without the backend-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDocument {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    pub is_purchased: bool,
    pub created_at: i64,
    pub owner_id: PrincipalId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    pub is_purchased: bool,
    pub created_at: i64,
    pub owner_id: PrincipalId,
}

impl Item {
    pub fn from_document(id: ItemId, document: ItemDocument) -> Self {
        Self {
            id,
            name: document.name,
            quantity: document.quantity,
            price: document.price,
            is_purchased: document.is_purchased,
            created_at: document.created_at,
            owner_id: document.owner_id,
        }
    }

    pub fn to_document(&self) -> ItemDocument {
        ItemDocument {
            name: self.name.clone(),
            quantity: self.quantity,
            price: self.price,
            is_purchased: self.is_purchased,
            created_at: self.created_at,
            owner_id: self.owner_id.clone(),
        }
    }
}

/// Caller-supplied fields for a new item.
///
/// `created_at` is stamped by whoever initiates the write; stores fill it in
/// with the current time when it is left empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    pub owner_id: PrincipalId,
    pub created_at: Option<i64>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, quantity: u32, owner_id: PrincipalId) -> Self {
        Self {
            name: name.into(),
            quantity,
            price: 0.0,
            owner_id,
            created_at: None,
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Checks the shared item constraints and returns the draft with its
    /// name trimmed.
    pub fn validate(&self) -> Result<ItemDraft, DraftError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DraftError::EmptyName);
        }
        if self.quantity < 1 {
            return Err(DraftError::QuantityBelowOne);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DraftError::InvalidPrice(self.price));
        }
        Ok(ItemDraft {
            name: name.to_string(),
            ..self.clone()
        })
    }

    /// Converts a validated draft into the persisted document shape.
    pub fn into_document(self, created_at: i64) -> ItemDocument {
        ItemDocument {
            name: self.name,
            quantity: self.quantity,
            price: self.price,
            is_purchased: false,
            created_at: self.created_at.unwrap_or(created_at),
            owner_id: self.owner_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregates {
    pub total: usize,
    pub purchased_count: usize,
}

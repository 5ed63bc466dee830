use shared::{
    domain::{Item, ItemDocument, ItemDraft, PrincipalId},
    error::{ApiError, ErrorCode},
    protocol::ItemSnapshot,
};
use storage::{PrincipalKind, Storage, TargetedWrite};
use tracing::{info, warn};
use uuid::Uuid;

pub mod auth;

use auth::{verify_custom_token, AuthConfig};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub auth: AuthConfig,
}

/// Result of a committed write: the namespace snapshot to fan out to live
/// subscribers.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub snapshot: ItemSnapshot,
}

pub async fn sign_in_anonymously(ctx: &ApiContext) -> Result<PrincipalId, ApiError> {
    let principal = PrincipalId(format!("anon-{}", Uuid::new_v4().simple()));
    ctx.storage
        .register_principal(&principal, PrincipalKind::Anonymous)
        .await
        .map_err(internal)?;
    info!(principal_id = %principal, "auth: anonymous sign-in");
    Ok(principal)
}

pub async fn sign_in_with_token(ctx: &ApiContext, token: &str) -> Result<PrincipalId, ApiError> {
    let principal = verify_custom_token(&ctx.auth, token).map_err(|err| {
        warn!(%err, "auth: custom token rejected");
        ApiError::new(ErrorCode::Unauthorized, err.to_string())
    })?;
    ctx.storage
        .register_principal(&principal, PrincipalKind::Token)
        .await
        .map_err(internal)?;
    info!(principal_id = %principal, "auth: token sign-in");
    Ok(principal)
}

pub async fn list_items(
    ctx: &ApiContext,
    principal: &PrincipalId,
    namespace: &str,
) -> Result<ItemSnapshot, ApiError> {
    ensure_principal(ctx, principal).await?;
    validate_namespace(namespace)?;
    ctx.storage.snapshot(namespace).await.map_err(internal)
}

pub async fn create_item(
    ctx: &ApiContext,
    principal: &PrincipalId,
    namespace: &str,
    document: ItemDocument,
) -> Result<Committed<Item>, ApiError> {
    ensure_principal(ctx, principal).await?;
    validate_namespace(namespace)?;

    let draft = ItemDraft {
        name: document.name,
        quantity: document.quantity,
        price: document.price,
        owner_id: document.owner_id,
        created_at: Some(document.created_at),
    }
    .validate()?;
    let document = draft.into_document(document.created_at);

    let (item, revision) = ctx
        .storage
        .insert_item(namespace, document)
        .await
        .map_err(internal)?;
    info!(namespace, item_id = %item.id, revision, "api: item created");
    let snapshot = ctx.storage.snapshot(namespace).await.map_err(internal)?;
    Ok(Committed {
        value: item,
        snapshot,
    })
}

pub async fn toggle_item(
    ctx: &ApiContext,
    principal: &PrincipalId,
    namespace: &str,
    item_id: &str,
) -> Result<Committed<()>, ApiError> {
    ensure_principal(ctx, principal).await?;
    validate_namespace(namespace)?;
    match ctx
        .storage
        .toggle_item(namespace, item_id)
        .await
        .map_err(internal)?
    {
        TargetedWrite::Applied { revision } => {
            info!(namespace, item_id, revision, "api: item toggled");
        }
        TargetedWrite::Missing => return Err(item_not_found(item_id)),
    }
    let snapshot = ctx.storage.snapshot(namespace).await.map_err(internal)?;
    Ok(Committed {
        value: (),
        snapshot,
    })
}

pub async fn delete_item(
    ctx: &ApiContext,
    principal: &PrincipalId,
    namespace: &str,
    item_id: &str,
) -> Result<Committed<()>, ApiError> {
    ensure_principal(ctx, principal).await?;
    validate_namespace(namespace)?;
    match ctx
        .storage
        .delete_item(namespace, item_id)
        .await
        .map_err(internal)?
    {
        TargetedWrite::Applied { revision } => {
            info!(namespace, item_id, revision, "api: item deleted");
        }
        TargetedWrite::Missing => return Err(item_not_found(item_id)),
    }
    let snapshot = ctx.storage.snapshot(namespace).await.map_err(internal)?;
    Ok(Committed {
        value: (),
        snapshot,
    })
}

pub async fn ensure_principal(ctx: &ApiContext, principal: &PrincipalId) -> Result<(), ApiError> {
    let known = ctx
        .storage
        .principal_exists(principal)
        .await
        .map_err(internal)?;
    if !known {
        return Err(ApiError::new(
            ErrorCode::Unauthorized,
            "principal is not signed in",
        ));
    }
    Ok(())
}

fn validate_namespace(namespace: &str) -> Result<(), ApiError> {
    let valid = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("invalid namespace '{namespace}'"),
        ));
    }
    Ok(())
}

fn item_not_found(item_id: &str) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("item {item_id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

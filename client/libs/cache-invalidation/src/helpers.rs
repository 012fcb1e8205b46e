//! Helper functions for cache key management

use crate::{EntityType, InvalidationError, Result};

/// Build cache key from entity type and optional scope ID
///
/// Unscoped entities (the session, the post list) use the bare type name.
///
/// # Example
///
/// ```
/// use cache_invalidation::{build_cache_key, EntityType};
///
/// assert_eq!(build_cache_key(&EntityType::PostList, None), "posts");
/// assert_eq!(build_cache_key(&EntityType::Comments, Some("5")), "comments:5");
/// ```
pub fn build_cache_key(entity_type: &EntityType, entity_id: Option<&str>) -> String {
    match entity_id {
        Some(id) => format!("{}:{}", entity_type, id),
        None => entity_type.to_string(),
    }
}

/// Parse cache key into entity type and optional scope ID
///
/// # Example
///
/// ```
/// use cache_invalidation::{parse_cache_key, EntityType};
///
/// let (entity_type, entity_id) = parse_cache_key("comments:12").unwrap();
/// assert_eq!(entity_type, EntityType::Comments);
/// assert_eq!(entity_id.as_deref(), Some("12"));
/// ```
pub fn parse_cache_key(key: &str) -> Result<(EntityType, Option<String>)> {
    let mut parts = key.splitn(2, ':');
    let entity_type = parts.next().unwrap_or_default();

    if entity_type.is_empty() {
        return Err(InvalidationError::InvalidMessage(format!(
            "Invalid cache key format: {}. Expected format: <type>[:<id>]",
            key
        )));
    }

    match parts.next() {
        Some("") => Err(InvalidationError::InvalidMessage(format!(
            "Cache key {} has an empty scope",
            key
        ))),
        Some(id) => Ok((EntityType::from(entity_type), Some(id.to_string()))),
        None => Ok((EntityType::from(entity_type), None)),
    }
}

//! Shared key validation and pagination for the local and in-memory backends.

use crate::traits::{ListPage, StorageError, StorageResult};

/// Reject keys that could escape the bucket root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Bucket names are a single path segment.
pub fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty()
        || bucket.contains('/')
        || bucket.contains('\\')
        || bucket == ".."
        || bucket == "."
    {
        return Err(StorageError::InvalidKey(format!("Invalid bucket name: {}", bucket)));
    }
    Ok(())
}

/// Cut one page out of a sorted key listing.
///
/// Keys strictly after `continuation` that start with `prefix` are returned, at most
/// `page_size` of them. The last returned key is the next token when more remain.
pub fn paginate<'a, I>(
    sorted_keys: I,
    prefix: &str,
    continuation: Option<&str>,
    page_size: usize,
) -> ListPage
where
    I: IntoIterator<Item = &'a String>,
{
    let mut matching = sorted_keys
        .into_iter()
        .filter(|key| key.starts_with(prefix))
        .filter(|key| continuation.map_or(true, |token| key.as_str() > token));

    let keys: Vec<String> = matching.by_ref().take(page_size).cloned().collect();
    let next_token = if matching.next().is_some() {
        keys.last().cloned()
    } else {
        None
    };

    ListPage { keys, next_token }
}

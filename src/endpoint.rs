//! Base-URL resolution and classification.
//!
//! The common failure mode for a chat client and a separately hosted
//! inference server is a loopback URL: `localhost` resolves to the machine
//! running the client, not the one running the server. Every URL-accepting
//! operation needs to be able to flag that case separately from generic
//! unreachability, so the classification lives here as plain functions.

use crate::error::ApiError;
use crate::prefs::{KeyValueStore, API_URL_KEY, MODEL_KEY};

/// Base URL used when no preference has been saved. LM Studio's local
/// server listens on port 1234 by default.
pub const DEFAULT_API_URL: &str = "http://localhost:1234";

/// Placeholder model id used until the user picks one from the server.
pub const DEFAULT_MODEL: &str = "local-model";

/// Effective API base URL: the stored preference, or the default when the
/// preference is unset, empty, or unreadable.
pub fn resolve(store: &dyn KeyValueStore) -> String {
    match store.get(API_URL_KEY) {
        Ok(Some(url)) if !url.is_empty() => url,
        _ => DEFAULT_API_URL.to_string(),
    }
}

/// Effective model id, same fallback rules as [`resolve`].
pub fn resolve_model(store: &dyn KeyValueStore) -> String {
    match store.get(MODEL_KEY) {
        Ok(Some(model)) if !model.is_empty() => model,
        _ => DEFAULT_MODEL.to_string(),
    }
}

/// True when the URL addresses the local machine rather than a network host.
pub fn is_loopback(url: &str) -> bool {
    url.contains("localhost") || url.contains("127.0.0.1")
}

/// Validate a user-entered base URL, returning the trimmed form.
pub fn validate(url: &str) -> Result<String, ApiError> {
    let clean = url.trim();
    if clean.is_empty() {
        return Err(ApiError::InvalidUrl("URL cannot be empty".to_string()));
    }
    if !clean.starts_with("http://") && !clean.starts_with("https://") {
        return Err(ApiError::InvalidUrl(
            "URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(clean.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::FileStore;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("settings.json"));
        (dir, store)
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let (_dir, store) = temp_store();
        assert_eq!(resolve(&store), DEFAULT_API_URL);
    }

    #[test]
    fn resolve_returns_stored_value_verbatim() {
        let (_dir, store) = temp_store();
        store.set(API_URL_KEY, "http://192.168.1.100:1234").unwrap();
        assert_eq!(resolve(&store), "http://192.168.1.100:1234");
    }

    #[test]
    fn resolve_treats_empty_as_unset() {
        let (_dir, store) = temp_store();
        store.set(API_URL_KEY, "").unwrap();
        assert_eq!(resolve(&store), DEFAULT_API_URL);
    }

    #[test]
    fn resolve_model_falls_back_to_placeholder() {
        let (_dir, store) = temp_store();
        assert_eq!(resolve_model(&store), DEFAULT_MODEL);
        store.set(MODEL_KEY, "qwen2.5-coder-7b").unwrap();
        assert_eq!(resolve_model(&store), "qwen2.5-coder-7b");
    }

    #[test]
    fn loopback_detection() {
        assert!(is_loopback("http://localhost:1234"));
        assert!(is_loopback("http://127.0.0.1:1234"));
        assert!(!is_loopback("http://192.168.1.100:1234"));
        // Case-sensitive, as stored.
        assert!(!is_loopback("http://LOCALHOST:1234"));
    }

    #[test]
    fn validate_rejects_empty_and_wrong_scheme() {
        assert!(matches!(validate(""), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(validate("   "), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(validate("ftp://x"), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn validate_accepts_and_trims_http_urls() {
        assert_eq!(validate("http://1.2.3.4:1234").unwrap(), "http://1.2.3.4:1234");
        assert_eq!(
            validate("  https://host.local:1234  ").unwrap(),
            "https://host.local:1234"
        );
    }
}

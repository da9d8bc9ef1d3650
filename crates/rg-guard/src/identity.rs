//! Per-session client identity.

use rg_core::{ClientId, KeyValueStore};
use uuid::Uuid;

/// Session-storage slot holding the identifier.
pub const CLIENT_ID_KEY: &str = "client_session_id";

/// Returns the session's client id, creating and persisting one on first use.
///
/// New ids carry a v4 UUID (122 random bits). If the session store refuses
/// the write the fresh id is still returned; the next call will simply mint
/// another one.
pub fn get_or_create_client_id(session: &dyn KeyValueStore) -> ClientId {
    if let Some(existing) = session.get(CLIENT_ID_KEY).filter(|id| !id.trim().is_empty()) {
        return ClientId::new(existing);
    }

    let id = format!("client_{}", Uuid::new_v4().simple());
    if let Err(e) = session.set(CLIENT_ID_KEY, &id) {
        tracing::warn!("could not persist client id for this session: {}", e);
    } else {
        tracing::debug!(client = %id, "new client identity");
    }
    ClientId::new(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_kv_memory::MemoryKvStore;

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("quota exceeded")
        }
        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_idempotent_within_session() {
        let session = MemoryKvStore::new();
        let first = get_or_create_client_id(&session);
        let second = get_or_create_client_id(&session);
        assert_eq!(first, second);
        assert_eq!(session.get(CLIENT_ID_KEY).as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_format_and_uniqueness() {
        let a = get_or_create_client_id(&MemoryKvStore::new());
        let b = get_or_create_client_id(&MemoryKvStore::new());
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("client_"));
        assert_eq!(a.as_str().len(), "client_".len() + 32);
    }

    #[test]
    fn test_blank_slot_is_replaced() {
        let session = MemoryKvStore::new();
        session.set(CLIENT_ID_KEY, "  ").unwrap();
        let id = get_or_create_client_id(&session);
        assert!(id.as_str().starts_with("client_"));
    }

    #[test]
    fn test_failed_persist_still_returns_id() {
        let id = get_or_create_client_id(&ReadOnlyStore);
        assert!(!id.as_str().is_empty());
    }
}

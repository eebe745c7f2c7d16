#[cfg(test)]
mod tests {
    use crate::objects::memory::MemoryObjectStore;
    use crate::objects::{object_key, ObjectStore};
    use std::time::Duration;

    #[test]
    fn test_object_key_format() {
        assert_eq!(object_key("user-1", "report.pdf"), "user-1/report.pdf");
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryObjectStore::new();
        store.put("owner/file.txt", b"hello".to_vec());

        let bytes = store.get("owner/file.txt").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn test_missing_object_is_an_error() {
        let store = MemoryObjectStore::new();

        assert!(store.get("owner/ghost.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_presigned_urls_carry_expiry() {
        let store = MemoryObjectStore::new();

        let url = store
            .presign_get("owner/file.txt", Duration::from_secs(900))
            .await
            .unwrap();

        assert!(url.contains("owner/file.txt"));
        assert!(url.contains("expires_in=900"));
    }
}

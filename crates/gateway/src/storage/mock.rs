//! テスト用のインメモリストレージバックエンド。呼び出しを記録する。

use std::collections::BTreeMap;
use std::sync::Mutex;

use dynstore_types::{StoredObject, UrlMetadata};

use super::StorageBackend;
use crate::error::GatewayError;

/// 署名付きURLの有効期限として返す固定値
pub const MOCK_EXPIRES_AT: u64 = 1_700_000_000_000 + 7 * 24 * 60 * 60 * 1000;

#[derive(Default)]
pub struct MockStorage {
    calls: Mutex<Vec<String>>,
    objects: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
    /// 設定時は永続URLを返す
    public_base: Option<String>,
    fail_connection: bool,
    fail_metadata: bool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public_base(mut self, base: &str) -> Self {
        self.public_base = Some(base.to_string());
        self
    }

    pub fn failing_connection(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn failing_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    pub fn with_object(self, key: &str, data: &[u8]) -> Self {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            (data.to_vec(), "application/octet-stream".to_string()),
        );
        self
    }

    /// 記録された呼び出し（`操作:キー` 形式）
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// 保存されたオブジェクトのデータとContent-Type
    pub fn object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl StorageBackend for MockStorage {
    async fn url_metadata(&self, key: &str) -> Result<UrlMetadata, GatewayError> {
        self.record(format!("url_metadata:{key}"));
        if self.fail_metadata {
            return Err(GatewayError::Storage("presign failed".to_string()));
        }
        Ok(match &self.public_base {
            Some(base) => UrlMetadata::permanent(format!("{base}/{key}")),
            None => UrlMetadata::expiring(
                format!("https://signed.example.com/{key}?sig=1"),
                MOCK_EXPIRES_AT,
            ),
        })
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expiry_secs: u32,
    ) -> Result<String, GatewayError> {
        self.record(format!("presign_upload:{key}"));
        Ok(format!(
            "https://signed.example.com/{key}?method=PUT&type={content_type}&expires={expiry_secs}"
        ))
    }

    async fn presign_download(&self, key: &str, expiry_secs: u32) -> Result<String, GatewayError> {
        self.record(format!("presign_download:{key}"));
        Ok(format!("https://signed.example.com/{key}?method=GET&expires={expiry_secs}"))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, GatewayError> {
        self.record(format!("list:{prefix}"));
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (data, _))| StoredObject {
                key: key.clone(),
                size: data.len() as u64,
                last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            })
            .collect())
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), GatewayError> {
        self.record(format!("put:{key}"));
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.record(format!("delete:{key}"));
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn rename(&self, key: &str, new_key: &str) -> Result<(), GatewayError> {
        self.record(format!("rename:{key}->{new_key}"));
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .remove(key)
            .ok_or_else(|| GatewayError::Storage(format!("no such key: {key}")))?;
        objects.insert(new_key.to_string(), object);
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), GatewayError> {
        self.record("test_connection".to_string());
        if self.fail_connection {
            return Err(GatewayError::Storage("connection refused".to_string()));
        }
        Ok(())
    }

    fn provider(&self) -> &str {
        "Mock"
    }
}

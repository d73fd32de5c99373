use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dynstore_types::{UrlMapping, UrlMetadata};

use super::UrlMappingService;
use crate::clock::ManualClock;
use crate::error::MappingError;
use crate::store::{MappingStore, MemoryMappingStore};

/// テスト開始時刻（UNIXミリ秒）
const T0: u64 = 1_700_000_000_000;

#[derive(Debug, thiserror::Error)]
enum TestError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("ストレージに接続できません")]
    Unreachable,
}

/// 書き込み回数を記録するストア。読み書きはMemoryMappingStoreに委譲する。
#[derive(Default)]
struct RecordingStore {
    inner: MemoryMappingStore,
    sets: AtomicUsize,
}

impl RecordingStore {
    fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MappingStore for RecordingStore {
    async fn get(&self, identifier: &str) -> Result<Option<UrlMapping>, MappingError> {
        self.inner.get(identifier).await
    }

    async fn set(&self, mapping: UrlMapping) -> Result<(), MappingError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(mapping).await
    }

    async fn delete(&self, identifier: &str) -> Result<(), MappingError> {
        self.inner.delete(identifier).await
    }

    async fn get_all(&self) -> Result<Vec<UrlMapping>, MappingError> {
        self.inner.get_all().await
    }
}

/// 全操作が失敗するストア
struct BrokenStore;

#[async_trait]
impl MappingStore for BrokenStore {
    async fn get(&self, _identifier: &str) -> Result<Option<UrlMapping>, MappingError> {
        Err(MappingError::Store("接続が切断されました".to_string()))
    }

    async fn set(&self, _mapping: UrlMapping) -> Result<(), MappingError> {
        Err(MappingError::Store("接続が切断されました".to_string()))
    }

    async fn delete(&self, _identifier: &str) -> Result<(), MappingError> {
        Err(MappingError::Store("接続が切断されました".to_string()))
    }

    async fn get_all(&self) -> Result<Vec<UrlMapping>, MappingError> {
        Err(MappingError::Store("接続が切断されました".to_string()))
    }
}

/// RecordingStore + ManualClock でサービスを構築するヘルパー
fn setup() -> (UrlMappingService, Arc<RecordingStore>, Arc<ManualClock>) {
    let store = Arc::new(RecordingStore::default());
    let clock = Arc::new(ManualClock::new(T0));
    let service = UrlMappingService::with_clock(store.clone(), clock.clone());
    (service, store, clock)
}

/// 呼ばれたらテストを失敗させるリフレッシュコールバック
async fn must_not_refresh(key: String) -> Result<UrlMetadata, TestError> {
    panic!("リフレッシュが呼ばれてはならない: {key}");
}

/// 公開URLのレコードは期限に関わらずリフレッシュも書き込みも行わない
#[tokio::test]
async fn test_permanent_short_circuit() {
    let (service, store, _clock) = setup();
    store
        .inner
        .set(UrlMapping {
            identifier: "storage-file://logo.png".to_string(),
            url: "https://cdn.example.com/logo.png".to_string(),
            is_permanent: true,
            expires_at: Some(T0 - 1),
            created_at: 0,
            updated_at: 0,
        })
        .await
        .unwrap();

    let metadata = service
        .resolve("storage-file://logo.png", must_not_refresh)
        .await
        .unwrap();

    assert_eq!(metadata, UrlMetadata::permanent("https://cdn.example.com/logo.png"));
    assert_eq!(store.set_count(), 0);
}

/// 有効期限内のレコードはそのまま返し、書き込みを行わない
#[tokio::test]
async fn test_cache_hit() {
    let (service, store, _clock) = setup();
    store
        .inner
        .set(UrlMapping::new(
            "storage-file://a.png",
            UrlMetadata::expiring("https://s3/a.png?sig=1", T0 + 1),
            T0,
        ))
        .await
        .unwrap();

    let metadata = service
        .resolve("storage-file://a.png", must_not_refresh)
        .await
        .unwrap();

    assert_eq!(metadata, UrlMetadata::expiring("https://s3/a.png?sig=1", T0 + 1));
    assert_eq!(store.set_count(), 0);
}

/// expires_at == now は失効扱いでリフレッシュされる
#[tokio::test]
async fn test_expiry_boundary_is_inclusive() {
    let (service, store, _clock) = setup();
    store
        .inner
        .set(UrlMapping::new(
            "storage-file://a.png",
            UrlMetadata::expiring("https://s3/a.png?sig=old", T0),
            T0 - 1000,
        ))
        .await
        .unwrap();

    let metadata = service
        .resolve("storage-file://a.png", |key| async move {
            assert_eq!(key, "a.png");
            Ok::<_, TestError>(UrlMetadata::expiring("https://s3/a.png?sig=new", T0 + 5000))
        })
        .await
        .unwrap();

    assert_eq!(metadata.url, "https://s3/a.png?sig=new");
    assert_eq!(store.set_count(), 1);
    let stored = store.inner.get("storage-file://a.png").await.unwrap().unwrap();
    assert_eq!(stored.url, "https://s3/a.png?sig=new");
    assert_eq!(stored.expires_at, Some(T0 + 5000));
}

/// 未登録の識別子はコールバックを1回だけ呼び、次の解決はキャッシュヒットになる
#[tokio::test]
async fn test_missing_record_refreshes_once() {
    let (service, store, _clock) = setup();
    let calls = AtomicUsize::new(0);

    let first = service
        .resolve("storage-file://docs/report.pdf", |key| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                assert_eq!(key, "docs/report.pdf");
                Ok::<_, TestError>(UrlMetadata::expiring("https://s3/report?sig", T0 + 60_000))
            }
        })
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.set_count(), 1);

    let second = service
        .resolve("storage-file://docs/report.pdf", must_not_refresh)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(store.set_count(), 1);
}

/// 登録 → キャッシュヒット → 時刻経過後のリフレッシュ の一連の流れ
#[tokio::test]
async fn test_register_then_expire_end_to_end() {
    let (service, store, clock) = setup();
    let original = UrlMetadata::expiring("https://x/a.png", T0 + 1000);
    service
        .register("storage-file://a.png", original.clone())
        .await
        .unwrap();

    let cached = service
        .resolve("storage-file://a.png", must_not_refresh)
        .await
        .unwrap();
    assert_eq!(cached, original);

    clock.advance(1001);

    let refreshed_key = std::sync::Mutex::new(None);
    let refreshed = service
        .resolve("storage-file://a.png", |key| {
            *refreshed_key.lock().unwrap() = Some(key);
            async { Ok::<_, TestError>(UrlMetadata::expiring("https://x/a.png?v=2", T0 + 9000)) }
        })
        .await
        .unwrap();

    assert_eq!(refreshed_key.lock().unwrap().as_deref(), Some("a.png"));
    assert_eq!(refreshed.url, "https://x/a.png?v=2");
    let stored = store.inner.get("storage-file://a.png").await.unwrap().unwrap();
    assert_eq!(stored.metadata(), refreshed);
    assert_eq!(stored.updated_at, T0 + 1001);
}

/// リフレッシュ失敗時はエラーを返し、既存レコードを書き換えない
#[tokio::test]
async fn test_failed_refresh_leaves_store_untouched() {
    let (service, store, _clock) = setup();
    let stale = UrlMapping::new(
        "storage-file://a.png",
        UrlMetadata::expiring("https://s3/a.png?sig=old", T0 - 1),
        T0 - 5000,
    );
    store.inner.set(stale.clone()).await.unwrap();

    let result = service
        .resolve("storage-file://a.png", |_key| async { Err::<UrlMetadata, _>(TestError::Unreachable) })
        .await;
    assert!(matches!(result, Err(TestError::Unreachable)));

    let missing = service
        .resolve("storage-file://b.png", |_key| async { Err::<UrlMetadata, _>(TestError::Unreachable) })
        .await;
    assert!(missing.is_err());

    assert_eq!(store.set_count(), 0);
    assert_eq!(store.inner.get("storage-file://a.png").await.unwrap(), Some(stale));
    assert_eq!(store.inner.get("storage-file://b.png").await.unwrap(), None);
}

/// expires_atを持たない非公開レコードは失効せず、キャッシュとして返り続ける
#[tokio::test]
async fn test_non_permanent_without_expiry_never_refreshes() {
    let (service, store, clock) = setup();
    let unbounded = UrlMetadata {
        url: "https://s3/a.png".to_string(),
        is_permanent: false,
        expires_at: None,
    };
    service
        .register("storage-file://a.png", unbounded.clone())
        .await
        .unwrap();

    clock.advance(365 * 24 * 60 * 60 * 1000);

    let metadata = service
        .resolve("storage-file://a.png", must_not_refresh)
        .await
        .unwrap();
    assert_eq!(metadata, unbounded);
    assert_eq!(service.cleanup().await.unwrap(), 0);
    assert_eq!(store.set_count(), 1);
}

/// 再登録はレコードを全置換するため created_at もリセットされる
#[tokio::test]
async fn test_register_resets_created_at() {
    let (service, store, clock) = setup();
    service
        .register("storage-file://a.png", UrlMetadata::expiring("v1", T0 + 10))
        .await
        .unwrap();

    clock.advance(500);
    service
        .register("storage-file://a.png", UrlMetadata::expiring("v2", T0 + 1000))
        .await
        .unwrap();

    let stored = store.inner.get("storage-file://a.png").await.unwrap().unwrap();
    assert_eq!(stored.url, "v2");
    assert_eq!(stored.created_at, T0 + 500);
    assert_eq!(stored.updated_at, T0 + 500);
}

/// 公開・失効済み・有効の3件から、失効済みの1件だけが削除される
#[tokio::test]
async fn test_cleanup_selectivity() {
    let (service, _store, clock) = setup();
    service
        .register("storage-file://permanent", UrlMetadata::permanent("p"))
        .await
        .unwrap();
    service
        .register("storage-file://expired", UrlMetadata::expiring("e", T0 + 10))
        .await
        .unwrap();
    service
        .register("storage-file://live", UrlMetadata::expiring("l", T0 + 10_000))
        .await
        .unwrap();

    clock.advance(100);
    assert_eq!(service.cleanup().await.unwrap(), 1);

    let mut remaining: Vec<String> = service
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.identifier)
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["storage-file://live", "storage-file://permanent"]);
}

/// cleanupを実装しないストアではデフォルトの走査で削除される
#[tokio::test]
async fn test_default_cleanup_sweep() {
    let store = Arc::new(RecordingStore::default());
    let clock = Arc::new(ManualClock::new(T0));
    let service = UrlMappingService::with_clock(store.clone(), clock.clone());

    for i in 0..5u64 {
        service
            .register(
                &service.create_identifier(&format!("k{i}")),
                UrlMetadata::expiring("u", T0 + i * 10),
            )
            .await
            .unwrap();
    }

    clock.set(T0 + 20);
    assert_eq!(service.cleanup().await.unwrap(), 3);
    assert_eq!(store.inner.len(), 2);
    assert!(store.inner.get("storage-file://k3").await.unwrap().is_some());
}

/// `get_all` が取得時点のスナップショットを返すストア。
/// スナップショット取得後の再登録を再現するため、記録済みの古い一覧を返す。
struct StaleSnapshotStore {
    inner: MemoryMappingStore,
    snapshot: Vec<UrlMapping>,
}

#[async_trait]
impl MappingStore for StaleSnapshotStore {
    async fn get(&self, identifier: &str) -> Result<Option<UrlMapping>, MappingError> {
        self.inner.get(identifier).await
    }

    async fn set(&self, mapping: UrlMapping) -> Result<(), MappingError> {
        self.inner.set(mapping).await
    }

    async fn delete(&self, identifier: &str) -> Result<(), MappingError> {
        self.inner.delete(identifier).await
    }

    async fn get_all(&self) -> Result<Vec<UrlMapping>, MappingError> {
        Ok(self.snapshot.clone())
    }
}

/// 走査後にリフレッシュされたレコードはデフォルトの走査で削除されず、件数にも数えない
#[tokio::test]
async fn test_default_cleanup_keeps_refreshed_record() {
    let stale = UrlMapping::new("storage-file://a", UrlMetadata::expiring("old", T0 + 10), T0);
    let gone = UrlMapping::new("storage-file://b", UrlMetadata::expiring("old", T0 + 10), T0);
    let store = StaleSnapshotStore {
        inner: MemoryMappingStore::new(),
        snapshot: vec![stale, gone.clone()],
    };
    store
        .inner
        .set(UrlMapping::new(
            "storage-file://a",
            UrlMetadata::expiring("fresh", T0 + 10_000),
            T0 + 50,
        ))
        .await
        .unwrap();
    store.inner.set(gone).await.unwrap();

    assert_eq!(store.cleanup(T0 + 100).await.unwrap(), 1);

    let kept = store.inner.get("storage-file://a").await.unwrap().unwrap();
    assert_eq!(kept.url, "fresh");
    assert!(store.inner.get("storage-file://b").await.unwrap().is_none());
}

/// 存在しない識別子の削除はエラーにならない
#[tokio::test]
async fn test_delete_missing_is_ok() {
    let (service, store, _clock) = setup();
    service.delete("storage-file://missing").await.unwrap();

    service
        .register("storage-file://a.png", UrlMetadata::permanent("u"))
        .await
        .unwrap();
    service.delete("storage-file://a.png").await.unwrap();
    assert!(store.inner.is_empty());
}

/// ストアのエラーは呼び出し側のエラー型に変換されて伝播する
#[tokio::test]
async fn test_store_error_propagates() {
    let service = UrlMappingService::new(Arc::new(BrokenStore));

    let result = service
        .resolve("storage-file://a.png", must_not_refresh)
        .await;
    assert!(matches!(result, Err(TestError::Mapping(MappingError::Store(_)))));

    assert!(service.cleanup().await.is_err());
    assert!(service.get_all().await.is_err());
}

/// 同じ識別子への並行解決は最大2回リフレッシュし、最後の書き込みが残る
#[tokio::test]
async fn test_concurrent_resolve_same_identifier() {
    let (service, store, _clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));

    let refresh = |calls: Arc<AtomicUsize>| {
        move |key: String| async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, TestError>(UrlMetadata::expiring(format!("https://s3/{key}?n={n}"), T0 + 60_000))
        }
    };

    let (a, b) = tokio::join!(
        service.resolve("storage-file://race.png", refresh(calls.clone())),
        service.resolve("storage-file://race.png", refresh(calls.clone())),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let total = calls.load(Ordering::SeqCst);
    assert!((1..=2).contains(&total), "refresh calls: {total}");
    assert_eq!(store.set_count(), total);

    let stored = store.inner.get("storage-file://race.png").await.unwrap().unwrap();
    assert!(stored.url == a.url || stored.url == b.url);
    assert_eq!(stored.expires_at, Some(T0 + 60_000));
}

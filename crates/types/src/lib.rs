//! # Dynamic Storage 共有型定義
//!
//! Gateway・Core間、およびクライアントとのJSONワイヤ形式をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - フィールド名: camelCase（既存クライアントとの互換性のため）
//! - 時刻: UNIXエポックからのミリ秒（u64）

use serde::{Deserialize, Serialize};

/// バイナリアップロード（PUT）でストレージキーを受け取るヘッダー名
pub const STORAGE_KEY_HEADER: &str = "x-storage-key";

/// Content-Typeが指定されなかった場合のデフォルト
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// URLメタデータ / マッピングレコード
// ---------------------------------------------------------------------------

/// オブジェクトにアクセスするためのURLと、その有効期限情報。
///
/// `is_permanent` が true の場合、`expires_at` は存在しないか無視される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMetadata {
    /// アクセスURL（公開URLまたは署名付きURL）
    pub url: String,
    /// 期限のない公開URLかどうか
    pub is_permanent: bool,
    /// 署名付きURLの有効期限（UNIXミリ秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl UrlMetadata {
    /// 期限のない公開URLのメタデータを作る。
    pub fn permanent(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_permanent: true,
            expires_at: None,
        }
    }

    /// `expires_at`（UNIXミリ秒）で失効する署名付きURLのメタデータを作る。
    pub fn expiring(url: impl Into<String>, expires_at: u64) -> Self {
        Self {
            url: url.into(),
            is_permanent: false,
            expires_at: Some(expires_at),
        }
    }
}

/// 識別子 → URLの永続化レコード。
///
/// 更新は常に全置換で行われるため、`created_at` は最後に登録された時刻を表す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMapping {
    /// 主キー（`storage-file://<key>` 形式）
    pub identifier: String,
    /// キャッシュされたアクセスURL
    pub url: String,
    /// 期限のない公開URLかどうか
    pub is_permanent: bool,
    /// 署名付きURLの有効期限（UNIXミリ秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// 登録時刻（UNIXミリ秒）
    pub created_at: u64,
    /// 更新時刻（UNIXミリ秒）
    pub updated_at: u64,
}

impl UrlMapping {
    /// メタデータから新しいレコードを作る。`created_at` と `updated_at` は共に `now`。
    pub fn new(identifier: impl Into<String>, metadata: UrlMetadata, now: u64) -> Self {
        Self {
            identifier: identifier.into(),
            url: metadata.url,
            is_permanent: metadata.is_permanent,
            expires_at: metadata.expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// レコードのURL部分をメタデータとして取り出す。
    pub fn metadata(&self) -> UrlMetadata {
        UrlMetadata {
            url: self.url.clone(),
            is_permanent: self.is_permanent,
            expires_at: self.expires_at,
        }
    }

    /// `now` 時点で失効済み（クリーンアップ対象）かどうか。
    ///
    /// 公開URL、および `expires_at` を持たない（または0の）レコードは失効しない。
    /// 境界は `expires_at <= now`（同時刻は失効扱い）。
    pub fn is_expired_at(&self, now: u64) -> bool {
        !self.is_permanent
            && self
                .expires_at
                .is_some_and(|expires_at| expires_at != 0 && expires_at <= now)
    }
}

// ---------------------------------------------------------------------------
// POST /api/storage リクエスト
// ---------------------------------------------------------------------------

/// POSTエンドポイントのリクエストボディ。
///
/// `action` で処理を切り替える。各フィールドの要否はアクションごとに異なるため、
/// ここでは全てOptionalとして受け取り、Gateway側で検証する。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// アクション名（`resolveUrl`, `upload`, `rename` 等）
    #[serde(default)]
    pub action: Option<String>,
    /// 対象のストレージキー
    #[serde(default)]
    pub key: Option<String>,
    /// アップロードするオブジェクトのMIMEタイプ
    #[serde(default)]
    pub content_type: Option<String>,
    /// 一覧取得のプレフィックス
    #[serde(default)]
    pub prefix: Option<String>,
    /// 解決対象の識別子
    #[serde(default)]
    pub identifier: Option<String>,
    /// リネーム後のストレージキー
    #[serde(default)]
    pub new_key: Option<String>,
}

// ---------------------------------------------------------------------------
// レスポンス
// ---------------------------------------------------------------------------

/// エラーレスポンス。全エンドポイント共通。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// エラーメッセージ
    pub error: String,
}

/// `publicUrl` のレスポンス。登録された識別子を含む。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUrlResponse {
    /// 生成されたURLメタデータ
    #[serde(flatten)]
    pub metadata: UrlMetadata,
    /// マッピングに登録された識別子
    pub identifier: String,
}

/// `upload` のレスポンス（署名付きアップロードURL）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    /// PUT用署名付きURL
    pub url: String,
    /// アップロード先のストレージキー
    pub key: String,
}

/// `download` のレスポンス（署名付きダウンロードURL）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadUrlResponse {
    /// GET用署名付きURL
    pub url: String,
}

/// バケット内のオブジェクト1件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// ストレージキー
    pub key: String,
    /// サイズ（バイト）
    pub size: u64,
    /// 最終更新日時（ストレージが返す文字列そのまま）
    pub last_modified: String,
}

/// `list` のレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// オブジェクト一覧
    pub files: Vec<StoredObject>,
}

/// `delete` のレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// `rename` のレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameResponse {
    pub success: bool,
    /// リネーム後のストレージキー
    pub new_key: String,
}

/// `cleanup` のレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    /// 削除された失効済みマッピングの件数
    pub deleted_count: usize,
}

/// `mappings` のレスポンス（デバッグ用の全件スナップショット）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingsResponse {
    pub mappings: Vec<UrlMapping>,
}

/// `test` のレスポンス。成功時は `message`/`provider`、失敗時は `error` を持つ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 設定されたストレージプロバイダ名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// PUT（バイナリアップロード）のレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutUploadResponse {
    pub message: String,
    /// アップロード先のストレージキー
    pub key: String,
}

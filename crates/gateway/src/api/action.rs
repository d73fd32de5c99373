//! # POSTアクション
//!
//! `action` フィールドを閉じた列挙型に変換し、アクションごとの必須フィールドを検証する。

use dynstore_types::ActionRequest;

use crate::error::GatewayError;

/// アクション名。未知の名前は [`GatewayError::InvalidAction`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ResolveUrl,
    PublicUrl,
    Upload,
    List,
    Delete,
    Rename,
    Download,
    Cleanup,
    Mappings,
    Test,
}

impl ActionKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "resolveUrl" => Some(ActionKind::ResolveUrl),
            "publicUrl" => Some(ActionKind::PublicUrl),
            "upload" => Some(ActionKind::Upload),
            "list" => Some(ActionKind::List),
            "delete" => Some(ActionKind::Delete),
            "rename" => Some(ActionKind::Rename),
            "download" => Some(ActionKind::Download),
            "cleanup" => Some(ActionKind::Cleanup),
            "mappings" => Some(ActionKind::Mappings),
            "test" => Some(ActionKind::Test),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::ResolveUrl => "resolveUrl",
            ActionKind::PublicUrl => "publicUrl",
            ActionKind::Upload => "upload",
            ActionKind::List => "list",
            ActionKind::Delete => "delete",
            ActionKind::Rename => "rename",
            ActionKind::Download => "download",
            ActionKind::Cleanup => "cleanup",
            ActionKind::Mappings => "mappings",
            ActionKind::Test => "test",
        }
    }

    /// 認可が必要なアクションか。
    /// `resolveUrl`, `publicUrl`, `download` は未認可でも実行できる。
    pub fn requires_auth(self) -> bool {
        matches!(
            self,
            ActionKind::Upload
                | ActionKind::Delete
                | ActionKind::Rename
                | ActionKind::Cleanup
                | ActionKind::Mappings
                | ActionKind::Test
                | ActionKind::List
        )
    }
}

/// 必須フィールド検証済みのアクション。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageAction {
    ResolveUrl { identifier: String },
    PublicUrl { key: String },
    Upload { key: String, content_type: String },
    List { prefix: String },
    Delete { key: String },
    Rename { key: String, new_key: String },
    Download { key: String },
    Cleanup,
    Mappings,
    Test,
}

impl StorageAction {
    /// リクエストボディから必須フィールドを取り出す。空文字列は欠落扱い。
    pub fn from_request(kind: ActionKind, request: ActionRequest) -> Result<Self, GatewayError> {
        let action = kind.name();
        let require = |value: Option<String>, field: &str| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GatewayError::missing_field(field, action))
        };

        Ok(match kind {
            ActionKind::ResolveUrl => StorageAction::ResolveUrl {
                identifier: require(request.identifier, "identifier")?,
            },
            ActionKind::PublicUrl => StorageAction::PublicUrl {
                key: require(request.key, "key")?,
            },
            ActionKind::Upload => StorageAction::Upload {
                key: require(request.key, "key")?,
                content_type: require(request.content_type, "contentType")?,
            },
            ActionKind::List => StorageAction::List {
                prefix: request
                    .prefix
                    .filter(|prefix| !prefix.is_empty())
                    .or(request.key)
                    .unwrap_or_default(),
            },
            ActionKind::Delete => StorageAction::Delete {
                key: require(request.key, "key")?,
            },
            ActionKind::Rename => StorageAction::Rename {
                key: require(request.key, "key")?,
                new_key: require(request.new_key, "newKey")?,
            },
            ActionKind::Download => StorageAction::Download {
                key: require(request.key, "key")?,
            },
            ActionKind::Cleanup => StorageAction::Cleanup,
            ActionKind::Mappings => StorageAction::Mappings,
            ActionKind::Test => StorageAction::Test,
        })
    }
}

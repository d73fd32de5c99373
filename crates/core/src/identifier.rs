//! # 識別子の生成と逆変換
//!
//! ストレージキーと論理識別子は固定プレフィックスの連結のみで対応する（エスケープなし）。

/// 識別子のスキームプレフィックス
pub const IDENTIFIER_PREFIX: &str = "storage-file://";

/// ストレージキーから識別子を生成する。
///
/// 例: `"path/to/file.jpg"` → `"storage-file://path/to/file.jpg"`
pub fn create_identifier(key: &str) -> String {
    format!("{IDENTIFIER_PREFIX}{key}")
}

/// 識別子からストレージキーを取り出す。
///
/// プレフィックスを持たない文字列はそのままキーとして扱う。
pub fn extract_key(identifier: &str) -> &str {
    identifier
        .strip_prefix(IDENTIFIER_PREFIX)
        .unwrap_or(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 任意のキーで create → extract が元に戻ることを確認
    #[test]
    fn test_roundtrip() {
        let keys = [
            "a.png",
            "path/to/file.jpg",
            "",
            "with space/and%20escape?x=1#frag",
            "日本語/ファイル.txt",
            "trailing/",
            "/leading",
            "storage-file:/almost",
        ];
        for key in keys {
            assert_eq!(extract_key(&create_identifier(key)), key, "key: {key:?}");
        }
    }

    #[test]
    fn test_create_identifier_format() {
        assert_eq!(create_identifier("a.png"), "storage-file://a.png");
    }

    /// プレフィックスのない文字列は直接キーとして扱う
    #[test]
    fn test_extract_key_fallback() {
        assert_eq!(extract_key("plain/key.png"), "plain/key.png");
        assert_eq!(extract_key("s3-file://legacy.png"), "s3-file://legacy.png");
    }

    /// プレフィックスは1回だけ取り除かれる
    #[test]
    fn test_extract_key_strips_once() {
        assert_eq!(
            extract_key("storage-file://storage-file://nested"),
            "storage-file://nested"
        );
    }
}

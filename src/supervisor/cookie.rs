//! Node authentication cookie.

use std::fmt;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::SupervisorError;

/// Opaque authentication token issued by the node.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cookie(String);

impl Cookie {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Decode raw cookie file contents.
    ///
    /// Text cookies are trimmed; binary cookies are hex encoded. Returns
    /// `None` for an empty file, which the node leaves behind mid-write.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let token = match std::str::from_utf8(bytes) {
            Ok(text) => text.trim().to_string(),
            Err(_) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
        };
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cookie(<redacted>)")
    }
}

/// Cookie file contents together with the file's modification time.
///
/// Two snapshots differ when the node rewrote the file, even with the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSnapshot {
    pub cookie: Cookie,
    pub modified: Option<SystemTime>,
}

/// Read the cookie file, returning `None` if it does not exist yet.
///
/// # Errors
///
/// Returns `SupervisorError::CookieRead` if the file exists but cannot be read.
pub async fn read_cookie(path: &Path) -> Result<Option<CookieSnapshot>, SupervisorError> {
    let read_error = |source| SupervisorError::CookieRead {
        path: path.to_path_buf(),
        source,
    };

    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(read_error(e)),
    };
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Cookie::from_bytes(&bytes).map(|cookie| CookieSnapshot {
            cookie,
            modified: metadata.modified().ok(),
        })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(read_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_cookie_is_trimmed() {
        let cookie = Cookie::from_bytes(b"  abc123\n").unwrap();
        assert_eq!(cookie.as_str(), "abc123");
    }

    #[test]
    fn test_binary_cookie_is_hex_encoded() {
        let cookie = Cookie::from_bytes(&[0xde, 0xad, 0xbe, 0xef, 0xff]).unwrap();
        assert_eq!(cookie.as_str(), "deadbeefff");
    }

    #[test]
    fn test_empty_cookie_is_none() {
        assert!(Cookie::from_bytes(b"").is_none());
        assert!(Cookie::from_bytes(b" \n").is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let cookie = Cookie::new("secret-token");
        assert!(!format!("{cookie:?}").contains("secret"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let cookie = Cookie::new("tok");
        assert_eq!(serde_json::to_string(&cookie).unwrap(), r#""tok""#);
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let cookie = read_cookie(&dir.path().join(".cookie")).await.unwrap();
        assert!(cookie.is_none());
    }

    #[tokio::test]
    async fn test_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cookie");
        std::fs::write(&path, "from-disk\n").unwrap();

        let snapshot = read_cookie(&path).await.unwrap().unwrap();
        assert_eq!(snapshot.cookie.as_str(), "from-disk");
        assert!(snapshot.modified.is_some());
    }

    #[tokio::test]
    async fn test_directory_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_cookie(dir.path()).await.unwrap_err();
        assert!(matches!(err, SupervisorError::CookieRead { .. }));
    }
}

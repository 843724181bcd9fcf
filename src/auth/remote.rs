//! HTTP client for the external auth service.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::directory::AccessDirectory;
use crate::config::RbacConfig;
use crate::{CabinetError, Result};

/// Connection timeout for the auth service.
const CONNECT_TIMEOUT_SECS: u64 = 2;

/// Largest response body accepted from the auth service.
const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

const USER_AGENT: &str = "cabinet/0.1 (rbac client)";

#[derive(Debug, Deserialize)]
struct PermissionsResponse {
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GroupsResponse {
    #[serde(default)]
    groups: Vec<GroupMembership>,
}

#[derive(Debug, Deserialize)]
struct GroupMembership {
    group_id: i64,
}

/// Directory that asks the auth service over HTTP.
///
/// Every failure is reported as [`CabinetError::RemoteUnavailable`]; turning
/// that into a denial is the caller's job (see `CachedDirectory`).
pub struct RemoteDirectory {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl RemoteDirectory {
    /// Create a client for the service at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(request_timeout))
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CabinetError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
        })
    }

    /// Create a client from the `[rbac]` config section.
    pub fn from_config(config: &RbacConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.auth_token,
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    fn user_url(&self, user_id: i64, resource: &str) -> String {
        format!("{}/api/v1/users/{user_id}/{resource}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "Querying auth service");

        let mut request = self.client.get(url);
        if !self.auth_token.is_empty() {
            request = request.bearer_auth(&self.auth_token);
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| CabinetError::RemoteUnavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CabinetError::RemoteUnavailable(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(length) = response.content_length() {
            if length > MAX_RESPONSE_SIZE as u64 {
                return Err(CabinetError::RemoteUnavailable(format!(
                    "response too large: {length} bytes (max {MAX_RESPONSE_SIZE} bytes)"
                )));
            }
        }

        // Compressed or chunked bodies carry no length, so cap while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CabinetError::RemoteUnavailable(format!("failed to read response: {e}")))?
        {
            if bytes.len() + chunk.len() > MAX_RESPONSE_SIZE {
                return Err(CabinetError::RemoteUnavailable(format!(
                    "response exceeds {MAX_RESPONSE_SIZE} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| CabinetError::RemoteUnavailable(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl AccessDirectory for RemoteDirectory {
    async fn has_permission(&self, user_id: i64, permission: &str) -> Result<bool> {
        let body: PermissionsResponse = self
            .get_json(&self.user_url(user_id, "permissions"))
            .await?;
        Ok(body.permissions.iter().any(|p| p == permission))
    }

    async fn user_groups(&self, user_id: i64) -> Result<HashSet<i64>> {
        let body: GroupsResponse = self.get_json(&self.user_url(user_id, "groups")).await?;
        Ok(body.groups.into_iter().map(|g| g.group_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn unreachable() -> RemoteDirectory {
        // Loopback discard port, connections are refused.
        RemoteDirectory::new("http://127.0.0.1:9/", "token", Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn test_user_url() {
        let directory = unreachable();
        assert_eq!(
            directory.user_url(42, "permissions"),
            "http://127.0.0.1:9/api/v1/users/42/permissions"
        );
    }

    #[test]
    fn test_parse_permissions_response() {
        let body: PermissionsResponse =
            serde_json::from_str(r#"{"permissions": ["manage_files", "upload"]}"#).unwrap();
        assert_eq!(body.permissions, vec!["manage_files", "upload"]);

        let empty: PermissionsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.permissions.is_empty());
    }

    #[test]
    fn test_parse_groups_response() {
        let body: GroupsResponse = serde_json::from_str(
            r#"{"groups": [{"group_id": 3, "name": "Finance"}, {"group_id": 7}]}"#,
        )
        .unwrap();
        let ids: Vec<i64> = body.groups.iter().map(|g| g.group_id).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    /// Serve one canned HTTP response on a loopback port.
    async fn serve_once(response: Vec<u8>) -> RemoteDirectory {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            }
        });
        RemoteDirectory::new(format!("http://{addr}"), "token", Duration::from_secs(5)).unwrap()
    }

    fn with_length(body: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_reads_small_response() {
        let directory = serve_once(with_length(r#"{"permissions": ["manage_files"]}"#)).await;
        assert!(directory.has_permission(1, "manage_files").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_oversized_content_length_before_reading() {
        // Only the headers are sent; the advertised body never arrives.
        let headers = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            MAX_RESPONSE_SIZE + 1
        );
        let directory = serve_once(headers.into_bytes()).await;

        let err = directory.user_groups(1).await.unwrap_err();
        match err {
            CabinetError::RemoteUnavailable(msg) => assert!(msg.contains("too large"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_oversized_chunked_body() {
        let mut response =
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n"
                .to_vec();
        let chunk = vec![b' '; 64 * 1024];
        for _ in 0..(MAX_RESPONSE_SIZE / chunk.len() + 2) {
            response.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
            response.extend_from_slice(&chunk);
            response.extend_from_slice(b"\r\n");
        }
        response.extend_from_slice(b"0\r\n\r\n");
        let directory = serve_once(response).await;

        let err = directory.has_permission(1, "manage_files").await.unwrap_err();
        match err {
            CabinetError::RemoteUnavailable(msg) => assert!(msg.contains("exceeds"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_remote_unavailable() {
        let directory = unreachable();

        let result = directory.has_permission(1, "manage_files").await;
        assert!(matches!(result, Err(CabinetError::RemoteUnavailable(_))));

        let result = directory.user_groups(1).await;
        assert!(matches!(result, Err(CabinetError::RemoteUnavailable(_))));
    }
}

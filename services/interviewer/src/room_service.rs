use crate::config::RoomServiceConfig;
use async_trait::async_trait;
use interview_core::publisher::{PublishError, RoomService};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const UPDATE_ROOM_METADATA_PATH: &str = "/twirp/livekit.RoomService/UpdateRoomMetadata";
const TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoGrant {
    room_admin: bool,
    room: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    iss: String,
    nbf: u64,
    exp: u64,
    video: VideoGrant,
}

#[derive(Debug, Serialize)]
struct UpdateRoomMetadataRequest<'a> {
    room: &'a str,
    metadata: &'a str,
}

/// Publishes room metadata through a LiveKit-compatible room service API.
pub struct LiveKitRoomService {
    client: Client,
    endpoint: String,
    api_key: String,
    api_secret: String,
}

impl LiveKitRoomService {
    pub fn new(config: &RoomServiceConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}{}", http_base_url(&config.url), UPDATE_ROOM_METADATA_PATH),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    /// Short-lived admin token scoped to a single room.
    fn access_token(&self, room: &str) -> Result<String, PublishError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| PublishError::Transport(format!("system clock error: {e}")))?
            .as_secs();
        let claims = AccessClaims {
            iss: self.api_key.clone(),
            nbf: now,
            exp: now + TOKEN_TTL.as_secs(),
            video: VideoGrant {
                room_admin: true,
                room: room.to_string(),
            },
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| PublishError::Transport(format!("failed to sign access token: {e}")))
    }
}

#[async_trait]
impl RoomService for LiveKitRoomService {
    async fn update_room_metadata(&self, room: &str, metadata: &str) -> Result<(), PublishError> {
        let token = self.access_token(room)?;
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&UpdateRoomMetadataRequest { room, metadata })
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(%room, "Room service accepted metadata update");
        Ok(())
    }
}

/// Stand-in used with `--dry-run`: logs what would have been published.
pub struct LogOnlyRoomService;

#[async_trait]
impl RoomService for LogOnlyRoomService {
    async fn update_room_metadata(&self, room: &str, metadata: &str) -> Result<(), PublishError> {
        tracing::info!(%room, "[dry run] Room metadata: {}", metadata);
        Ok(())
    }
}

/// Maps the websocket URL agents are usually configured with to the HTTP API base.
fn http_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    fn service() -> LiveKitRoomService {
        LiveKitRoomService::new(&RoomServiceConfig {
            url: "wss://interviews.example.com/".to_string(),
            api_key: "APIinterview".to_string(),
            api_secret: "a-very-secret-value".to_string(),
        })
    }

    #[test]
    fn test_http_base_url() {
        assert_eq!(http_base_url("wss://a.example.com"), "https://a.example.com");
        assert_eq!(http_base_url("ws://localhost:7880/"), "http://localhost:7880");
        assert_eq!(http_base_url("https://a.example.com"), "https://a.example.com");
    }

    #[test]
    fn test_endpoint_uses_room_service_path() {
        assert_eq!(
            service().endpoint,
            "https://interviews.example.com/twirp/livekit.RoomService/UpdateRoomMetadata"
        );
    }

    #[test]
    fn test_access_token_is_scoped_to_room() {
        let token = service().access_token("case-room").unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        let decoded = jsonwebtoken::decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(b"a-very-secret-value"),
            &validation,
        )
        .unwrap();
        let claims = decoded.claims;
        assert_eq!(claims.iss, "APIinterview");
        assert!(claims.video.room_admin);
        assert_eq!(claims.video.room, "case-room");
        assert_eq!(claims.exp - claims.nbf, TOKEN_TTL.as_secs());
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(UpdateRoomMetadataRequest {
            room: "case-room",
            metadata: r#"{"caseQuestion":"q","difficulty":"easy"}"#,
        })
        .unwrap();
        assert_eq!(body["room"], "case-room");
        assert_eq!(body["metadata"], r#"{"caseQuestion":"q","difficulty":"easy"}"#);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_transport_error() {
        let service = LiveKitRoomService::new(&RoomServiceConfig {
            url: "http://127.0.0.1:1".to_string(),
            api_key: "k".to_string(),
            api_secret: "s".to_string(),
        });
        let err = service
            .update_room_metadata("case-room", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Transport(_)));
    }
}

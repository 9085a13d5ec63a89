//! JSON wire types for the HTTP signaling endpoints.
//!
//! | Endpoint                     | Request body        | Response body          |
//! |------------------------------|---------------------|------------------------|
//! | `POST /iceServers`           | none                | `[IceServer, ...]`     |
//! | `POST /createPeerConnection` | `SessionDescription`| `SessionDescription`   |
//! | `POST /startVideo`           | `SessionDescription`| `SessionDescription`   |
//! | `POST /stopVideo`            | `SessionDescription`| `SessionDescription`   |
//!
//! The shapes mirror what a browser produces with `JSON.stringify(offer)` and
//! accepts in `new RTCPeerConnection({iceServers})`, so a server written for
//! browser clients works unchanged with this viewer.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ── ICE servers ───────────────────────────────────────────────────────────────

/// A STUN/TURN server descriptor as returned by `POST /iceServers`.
///
/// # Serde representation
///
/// ```json
/// {"urls":["stun:stun.l.google.com:19302"]}
/// {"urls":"turns:turn.example.org:5349","username":"free","credential":"free","credentialType":"password"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServer {
    /// One or more server URLs.  A single string is accepted on decode.
    #[serde(deserialize_with = "one_or_many")]
    pub urls: Vec<String>,

    /// TURN username, absent for STUN servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// TURN credential, absent for STUN servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,

    /// Credential kind (`"password"`).  Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,
}

impl IceServer {
    /// A STUN-only descriptor for a single URL.
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
            credential_type: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(url) => vec![url],
        OneOrMany::Many(urls) => urls,
    })
}

// ── Session descriptions ──────────────────────────────────────────────────────

/// SDP message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SdpType::Offer => "offer",
            SdpType::Pranswer => "pranswer",
            SdpType::Answer => "answer",
            SdpType::Rollback => "rollback",
        };
        f.write_str(s)
    }
}

/// An SDP offer or answer, `{"type": ..., "sdp": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    /// Wraps SDP text as an offer.
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Wraps SDP text as an answer.
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

// ── Endpoints ─────────────────────────────────────────────────────────────────

/// The named signaling endpoints exposed by the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalingEndpoint {
    /// ICE server configuration.
    IceServers,
    /// Base connection: placeholder data channel only, no media.
    CreatePeerConnection,
    /// Session start: receive-only video and audio transceivers attached.
    StartVideo,
    /// Session end renegotiation.
    StopVideo,
}

impl SignalingEndpoint {
    /// The request path, including the leading slash.
    pub fn path(&self) -> &'static str {
        match self {
            SignalingEndpoint::IceServers => "/iceServers",
            SignalingEndpoint::CreatePeerConnection => "/createPeerConnection",
            SignalingEndpoint::StartVideo => "/startVideo",
            SignalingEndpoint::StopVideo => "/stopVideo",
        }
    }
}

impl fmt::Display for SignalingEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ice_server_list_decodes_typical_server_payload() {
        // Arrange: the exact payload a typical server returns.
        let json = r#"[
            {"credentialType":"password","urls":["stun:stun.l.google.com:19302"]},
            {"credential":"free","credentialType":"password","urls":["turns:freeturn.tel:5349"],"username":"free"}
        ]"#;

        // Act
        let servers: Vec<IceServer> = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].urls, vec!["stun:stun.l.google.com:19302"]);
        assert_eq!(servers[0].username, None);
        assert_eq!(servers[1].username.as_deref(), Some("free"));
        assert_eq!(servers[1].credential.as_deref(), Some("free"));
        assert_eq!(servers[1].credential_type.as_deref(), Some("password"));
    }

    #[test]
    fn test_ice_server_accepts_single_url_string() {
        let server: IceServer = serde_json::from_str(r#"{"urls":"stun:example.org"}"#).unwrap();
        assert_eq!(server.urls, vec!["stun:example.org"]);
    }

    #[test]
    fn test_ice_server_without_urls_is_rejected() {
        assert!(serde_json::from_str::<IceServer>(r#"{"username":"x"}"#).is_err());
    }

    #[test]
    fn test_ice_server_omits_absent_credentials_when_serialized() {
        let json = serde_json::to_string(&IceServer::stun("stun:a")).unwrap();
        assert_eq!(json, r#"{"urls":["stun:a"]}"#);
    }

    #[test]
    fn test_session_description_uses_type_field() {
        // Arrange
        let offer = SessionDescription::offer("v=0\r\n");

        // Act
        let json = serde_json::to_string(&offer).unwrap();

        // Assert
        assert_eq!(json, r#"{"type":"offer","sdp":"v=0\r\n"}"#);
    }

    #[test]
    fn test_session_description_decodes_answer() {
        let desc: SessionDescription =
            serde_json::from_str(r#"{"type":"answer","sdp":"v=0"}"#).unwrap();
        assert_eq!(desc, SessionDescription::answer("v=0"));
    }

    #[test]
    fn test_session_description_rejects_unknown_type() {
        assert!(serde_json::from_str::<SessionDescription>(r#"{"type":"bogus","sdp":""}"#).is_err());
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(SignalingEndpoint::IceServers.path(), "/iceServers");
        assert_eq!(SignalingEndpoint::CreatePeerConnection.path(), "/createPeerConnection");
        assert_eq!(SignalingEndpoint::StartVideo.path(), "/startVideo");
        assert_eq!(SignalingEndpoint::StopVideo.to_string(), "/stopVideo");
    }
}

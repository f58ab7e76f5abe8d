//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Card, GenerationParameters, PlayerProgress, PlayerTier, Reward, VerificationData, VerificationMethod};
use crate::links::ShortLink;
use crate::session::SessionSnapshot;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    DrawCard {
        #[serde(default)]
        params: GenerationParameters,
    },
    /// Starts a card previously served to this connection by `draw_card`.
    StartChallenge {
        #[serde(rename = "cardId", default)]
        card_id: Option<String>,
    },
    CompleteChallenge,
    VerifyChallenge {
        method: VerificationMethod,
        #[serde(default)]
        data: VerificationData,
    },
    SubmitPhoto {
        data: String,
    },
    SubmitAudio {
        data: String,
    },
    SubmitGroupVerification {
        votes: u32,
        threshold: u32,
    },
    ClaimReward,
    RedeemReward {
        #[serde(rename = "rewardId")]
        reward_id: String,
    },
    ResetChallenge,
    ClearError,
    GetState,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Card {
        card: Card,
    },
    Session {
        session: SessionSnapshot,
        progress: PlayerProgress,
    },
    Verification {
        verified: bool,
        session: SessionSnapshot,
        progress: PlayerProgress,
    },
    Reward {
        reward: RewardOut,
        session: SessionSnapshot,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session: Option<SessionSnapshot>,
    },
}

/// Reward plus the encoded redemption code a client renders as a scannable graphic.
#[derive(Debug, Serialize)]
pub struct RewardOut {
    #[serde(flatten)]
    pub reward: Reward,
    pub redemption_code: String,
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct DeckIn {
    pub count: usize,
    #[serde(default)]
    pub params: GenerationParameters,
}

#[derive(Debug, Deserialize)]
pub struct TierQuery {
    pub completed: usize,
    pub score: u8,
}
#[derive(Debug, Serialize)]
pub struct TierOut {
    pub tier: PlayerTier,
    pub rewards: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkIn {
    pub target: String,
}
#[derive(Debug, Serialize)]
pub struct LinkOut {
    #[serde(flatten)]
    pub link: ShortLink,
}

/// Query string accepted on the WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub player: Option<String>,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_wire_json() {
        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"verify_challenge","method":"self"}"#).unwrap();
        assert!(matches!(msg, ClientWsMessage::VerifyChallenge { method: VerificationMethod::SelfReport, .. }));

        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"verify_challenge","method":"telepathy","data":{"content":"x"}}"#).unwrap();
        assert!(matches!(msg, ClientWsMessage::VerifyChallenge { method: VerificationMethod::Unknown, .. }));

        let msg: ClientWsMessage = serde_json::from_str(
            r#"{"type":"draw_card","params":{"challengeType":"duet","emotionalTier":"chaotic","brandId":"zerosum"}}"#,
        )
        .unwrap();
        match msg {
            ClientWsMessage::DrawCard { params } => {
                assert_eq!(params.brand_id.as_deref(), Some("zerosum"));
                assert!(params.prompt_type.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"start_challenge"}"#).unwrap();
        assert!(matches!(msg, ClientWsMessage::StartChallenge { card_id: None }));

        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"start_challenge","cardId":"card_1_abc"}"#).unwrap();
        assert!(matches!(msg, ClientWsMessage::StartChallenge { card_id: Some(ref id) } if id == "card_1_abc"));
    }

    #[test]
    fn error_without_session_omits_the_field() {
        let out = serde_json::to_value(ServerWsMessage::Error { message: "nope".into(), session: None }).unwrap();
        assert_eq!(out["type"], "error");
        assert!(out.get("session").is_none());
    }
}

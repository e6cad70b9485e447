use crate::model::peer::PeerId;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Characters allowed in a room code. Ambiguous glyphs (I, O, 0, 1)
/// are excluded so codes survive being read aloud.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_CODE_LEN: usize = 6;

#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RoomCodeError {
    #[error("room code must be {ROOM_CODE_LEN} characters, got {0}")]
    Length(usize),
    #[error("room code contains invalid character {0:?}")]
    Character(char),
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.chars().count() != ROOM_CODE_LEN {
            return Err(RoomCodeError::Length(code.chars().count()));
        }
        for c in code.chars() {
            if !c.is_ascii() || !ROOM_CODE_ALPHABET.contains(&(c as u8)) {
                return Err(RoomCodeError::Character(c));
            }
        }
        Ok(Self(code))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One room row as the external durable store sees it. Persistence
/// itself stays outside the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub code: RoomCode,
    pub host_id: PeerId,
    pub host_name: String,
    pub is_active: bool,
    pub is_sharing: bool,
    pub is_paused: bool,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Room {
    pub fn create(host_id: PeerId, host_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: RoomCode::generate(),
            host_id,
            host_name: host_name.into(),
            is_active: true,
            is_sharing: false,
            is_paused: false,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn end(&mut self) {
        self.is_active = false;
        self.ended_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A viewer asking to join; the host approves or rejects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: Uuid,
    pub room_id: Uuid,
    pub viewer_id: PeerId,
    pub viewer_name: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl JoinRequest {
    pub fn new(room_id: Uuid, viewer_id: PeerId, viewer_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            viewer_id,
            viewer_name: viewer_name.into(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn approve(&mut self) {
        self.status = RequestStatus::Approved;
    }

    pub fn reject(&mut self) {
        self.status = RequestStatus::Rejected;
    }

    pub fn is_approved(&self) -> bool {
        self.status == RequestStatus::Approved
    }
}

/// Presence roster entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewer {
    pub id: PeerId,
    pub name: String,
    pub online: bool,
}

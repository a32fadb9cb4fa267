use crate::telemetry::Snapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on a single request line; anything larger is rejected before
/// it reaches the JSON parser.
pub const MAX_REQUEST_SIZE: usize = 1_024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u32,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestKind {
    GetSnapshot,
    GetSubsystem { system: SubsystemKey },
    GetCrewMember { index: usize },
    GetAlerts { active_only: bool },
    AcknowledgeAlert { id: u64 },
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKey {
    Spacecraft,
    Crew,
    Eclss,
    Power,
    Propulsion,
    Communications,
    Timeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Ok,
    NotFound,
    InvalidRequest,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub id: u32,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl QueryResponse {
    pub fn ok(id: u32, payload: serde_json::Value) -> Self {
        Self {
            id,
            status: ResponseStatus::Ok,
            message: None,
            payload: Some(payload),
        }
    }

    pub fn not_found(id: u32, message: impl Into<String>) -> Self {
        Self {
            id,
            status: ResponseStatus::NotFound,
            message: Some(message.into()),
            payload: None,
        }
    }

    pub fn invalid(id: u32, message: impl Into<String>) -> Self {
        Self {
            id,
            status: ResponseStatus::InvalidRequest,
            message: Some(message.into()),
            payload: None,
        }
    }

    pub fn error(id: u32, message: impl Into<String>) -> Self {
        Self {
            id,
            status: ResponseStatus::Error,
            message: Some(message.into()),
            payload: None,
        }
    }
}

/// Liveness report served by the `Health` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub active_subscribers: usize,
    pub mission_elapsed_time: String,
}

/// Everything the server writes on a connection: pushed snapshots and
/// request responses, tagged so clients can demultiplex a shared stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Response(QueryResponse),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("request exceeds {MAX_REQUEST_SIZE} bytes")]
    MessageTooLarge,
}

pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    if line.len() > MAX_REQUEST_SIZE {
        return Err(ProtocolError::MessageTooLarge);
    }
    Ok(serde_json::from_str(line)?)
}

pub fn encode_message(message: &ServerMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

use thiserror::Error;

/// Trouble at the wire boundary. These never cross a handler: a payload that
/// fails to decode is dropped where it arrived, since neighbour misbehaviour
/// is an expected condition, not an exceptional one.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("malformed distance vector payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

//! Wire shapes for the external request/response boundary (§6). The
//! scheduling core never populates `image` itself — rendering to vector
//! graphics is an external collaborator's responsibility — but the field
//! exists so a caller can attach one after calling a renderer.

use serde::{Deserialize, Serialize};

use crate::notification::Notification;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    /// Opaque bytes produced by an external rendering collaborator. `None`
    /// when the caller has not (or does not intend to) render an image.
    pub image: Option<Vec<u8>>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub notifications: Vec<Notification>,
}

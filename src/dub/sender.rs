// src/dub/sender.rs
use crate::dub::client::TrackError;
use crate::normalize::{LeadRecord, SaleRecord};

/// Which Dub tracking endpoint a call goes to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    Lead,
    Sale,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Lead => "lead",
            TrackKind::Sale => "sale",
        }
    }

    /// Path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            TrackKind::Lead => "/track/lead",
            TrackKind::Sale => "/track/sale",
        }
    }
}

/// Trait for sending normalized records to Dub (abstracts HTTP client)
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait TrackSender {
    async fn track_lead(&self, record: &LeadRecord) -> Result<(), TrackError>;
    async fn track_sale(&self, record: &SaleRecord) -> Result<(), TrackError>;
}

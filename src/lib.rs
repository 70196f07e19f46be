// src/lib.rs
pub mod client;
pub mod config;
pub mod cookie;
pub mod dub;
pub mod event;
mod handler;
pub mod identity;
pub mod normalize;

// Re-export tracing for use in other modules
pub use tracing;

pub use client::{CookieScope, EventClient, HttpCookieClient, MemoryClient, SetOptions};
pub use config::{CookieNames, Settings};
pub use dub::{DubClient, TrackError, TrackKind, TrackSender};
pub use event::{EventKind, EventPayload, McEvent};
pub use handler::{Action, Delivery, Dispatcher, HandleResponse, TrackCall};
pub use normalize::{build_lead_record, build_sale_record, LeadRecord, SaleRecord};

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

#[cfg(not(target_arch = "wasm32"))]
pub use native::build_router;

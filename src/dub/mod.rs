// src/dub/mod.rs
pub mod client;
pub mod retry;
pub mod sender;

pub use client::{DubClient, TrackError};
pub use sender::{TrackKind, TrackSender};

//! Shared vocabulary of the stylist session client: conversation and audio
//! types, recommendation shapes, the error taxonomy, configuration, and the
//! events the session publishes to its rendering layer.

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use catalog::{NormalizedItem, OutfitSummary, RawItem, StockInfo, StockStatus, StoreLocation};
pub use config::StylistConfig;
pub use error::{Result, StylistError};
pub use events::SessionEvent;
pub use types::*;

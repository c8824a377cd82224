//! Journey tracking
//!
//! Turns storefront actions into journey events and delivers them, best effort, to
//! every configured sink:
//! - HTTP collectors (current and legacy schemas, dual-written)
//! - File (JSONL journal) - read back by `journey observe`
//! - Stdout - prints formatted events

pub mod bootstrap;
pub mod connectivity;
pub mod context;
pub mod emitter;
pub mod event;
pub mod session;
pub mod sink;
pub mod store;
pub mod track;

pub use bootstrap::{ClickTarget, init_journey_tracking};
pub use context::{PageSnapshot, SharedPage};
pub use emitter::{Dispatch, Emitter, SinkOutcome};
pub use event::{EventType, JourneyEvent};

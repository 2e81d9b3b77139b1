//! Assistant Supervisor (C6): a per-session wrapper over the Assistant
//! runtime's child-process contract (`start`/`addStreamMessage`/`stop` plus
//! a message callback).

pub mod error;
pub mod protocol;
pub mod supervisor;

pub use error::{AbortError, AssistantError, AssistantResult};
pub use protocol::{InboundMessage, OutboundMessage};
pub use supervisor::{AssistantSupervisor, StartParams};

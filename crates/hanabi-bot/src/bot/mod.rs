mod agent;
mod lock;
pub mod moves;
mod transport;

pub use agent::{Agent, AgentError, AgentOptions, AgentStatus, Received};
pub use lock::{FileTurnLock, LocalTurnLock, TurnLock};
pub use transport::{JsonLinesTransport, Transport, TransportError};

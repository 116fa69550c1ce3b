pub mod bot;
pub mod policy;

pub use bot::{
    Agent, AgentError, AgentOptions, AgentStatus, FileTurnLock, JsonLinesTransport,
    LocalTurnLock, Transport, TransportError, TurnLock,
};
pub use policy::{
    CATALOG, Genome, GenomeError, Proposal, RULE_COUNT, Rule, RuleContext, RuleOutcome,
    RulePolicy,
};

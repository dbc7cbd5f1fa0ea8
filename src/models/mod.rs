//! Data models and structures for the link diagnostics engine

pub mod config;
pub mod endpoint;
pub mod results;

// Re-export main model types
pub use config::Config;
pub use endpoint::{CandidateEndpoint, ServerCatalog};
pub use results::{
    outcome_id, BufferbloatResult, DnsTimings, HopRecord, JitterResult, NatStatus, PassFailure, PassOutcome,
    PassResult, ResolverTiming, SubTestFailure, SubTestOutcome, UdpStats,
};

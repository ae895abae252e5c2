//! The section engine
//!
//! Orchestration around the assistant service: pacing, conversation
//! handles, run execution and the section message pipeline.

mod executor;
mod limiter;
mod service;
mod threads;

pub use executor::RunExecutor;
pub use limiter::RateLimiter;
pub use service::{SectionReply, SectionService, SectionView};
pub use threads::ThreadRegistry;

//! flowgraph-agents: prebuilt agent patterns over the state-graph engine.
//!
//! Three patterns, each compiled down to a
//! [`CompiledGraph`](flowgraph_core::CompiledGraph):
//!
//! - **Reflection** ([`reflection`]): a bounded generate, critique, refine
//!   loop with structured quality scoring.
//! - **Plan-execute** ([`plan_execute`]): decompose into ordered steps, run
//!   them sequentially, synthesize, then critique the synthesis.
//! - **Assistant** ([`assistant`]): per-turn routing between a direct answer
//!   and a closed set of capabilities, with session memory.

pub mod assistant;
pub mod cache;
pub mod error;
pub mod plan_execute;
pub mod reflection;
pub mod tools;

pub use assistant::{Assistant, AssistantConfig};
pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use error::{AgentError, Result};
pub use plan_execute::{
    parse_plan, run_plan_execute, PlanExecuteConfig, MAX_REFLECTION_ITERATIONS,
};
pub use reflection::{
    parse_score, run_reflection, QualityScore, ReflectionConfig, DEFAULT_APPROVAL_THRESHOLD,
    DEFAULT_MAX_ITERATIONS,
};
pub use tools::{Dictionary, DocRetrieval, ToolKit, ToolRequest, WeatherLookup, WebSearch};

// Matching agent: retrieval tool binding, agent creation, and the per-turn
// conversation driver. All platform calls go through `foundry::AgentPlatform`.

pub mod factory;
pub mod runner;
pub mod tool;

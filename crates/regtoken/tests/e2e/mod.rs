//! End-to-end tests driving the engine through configuration and commands.

pub mod audit_flow_test;
pub mod genesis_flow_test;

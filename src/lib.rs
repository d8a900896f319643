//! Sibyl - deterministic squad tactics engine

pub mod battle;
pub mod core;
pub mod llm;

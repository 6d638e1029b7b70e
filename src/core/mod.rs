// src/core/mod.rs

pub mod alias_table;
pub mod config_store;
pub mod entity_resolver;
pub mod field_schema;
pub mod paths;
pub mod prompter;
pub mod repair_executor;

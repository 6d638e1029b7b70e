// src/cli/handlers/mod.rs

pub mod commons;
pub mod config;
pub mod confluence;
pub mod jira;
pub mod trello;

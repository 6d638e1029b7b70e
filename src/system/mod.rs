//! # System Interaction Layer
//!
//! The boundary between atlasman's core logic and the outside world.
//!
//! ## Modules
//!
//! - **`http`**: The blocking JSON client every vendor client is built on, and the single
//!   function that maps HTTP failures onto atlasman's remote error taxonomy.
//! - **`trello`**, **`jira`**, **`confluence`**: One client per vendor API. Each takes its
//!   credentials explicitly and implements the lookups the entity resolver needs.
//! - **`editor`**: Launches the user's text editor on a file and waits for it to exit.

pub mod confluence;
pub mod editor;
pub mod http;
pub mod jira;
pub mod trello;

// src/constants.rs

/// The name of the atlasman directory inside the user's config directory.
pub const CONFIG_DIR_NAME: &str = "atlas-man";

/// The name of the configuration document (inside the config directory).
pub const CONFIG_FILENAME: &str = "config.json";

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "ATLASMAN_CONFIG_DIR";

/// The key inside each service section holding the alias table.
pub const ALIAS_SECTION_KEY: &str = "alias_ids";

/// The Trello REST API root.
pub const TRELLO_API_URL: &str = "https://api.trello.com/1";

/// Path of the Jira REST API below `jira.base_url`.
pub const JIRA_API_PATH: &str = "rest/api/2";

/// Path of the Confluence REST API below `jira.base_url`.
pub const CONFLUENCE_API_PATH: &str = "wiki/rest/api";

/// Request timeout used when the config does not provide one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Project types offered when creating a Jira project interactively.
pub const JIRA_PROJECT_TYPES: &[&str] = &["software", "business", "service_desk"];

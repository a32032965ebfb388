//! The `commands` configuration module.
//!
//! Maps chat command words to account schemas: each key under the `commands`
//! section declares one command, whose subtree configures the account the
//! command operates on. A blank section is seeded with a default `balance`
//! command so a generated config file demonstrates the shape.

use std::sync::Arc;

use tracing::{debug, info};

use bursar_config::{ConfigModule, ConfigParser, ParseError};
use bursar_core::ServiceRegistry;
use bursar_schema::{AccountSchema, SchemaRegistry};

/// One configured chat command and the account schema it targets.
pub struct CommandEntry {
    name: String,
    command: String,
    schema: Arc<dyn AccountSchema>,
}

impl CommandEntry {
    /// The config key this entry was declared under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The chat word that triggers the command. Never contains whitespace.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The account schema the command operates on. Still shared with the
    /// config; specialize with
    /// [`clone_with_config`](AccountSchema::clone_with_config) before
    /// supplying variables.
    pub fn schema(&self) -> &Arc<dyn AccountSchema> {
        &self.schema
    }
}

/// Parsed `commands` section.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bursar_config::{ConfigModule, ConfigParser, Document};
/// use bursar_core::ServiceRegistry;
/// use bursar::commands::CommandsConfig;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let doc = Document::from_yaml("pay:\n  command: pay\n  type: currency\n").unwrap();
/// let parser = ConfigParser::root(doc);
///
/// let config = CommandsConfig::parse(parser, Arc::new(ServiceRegistry::new()))
///     .await
///     .unwrap();
/// assert!(config.entry_for("pay").is_some());
/// # }
/// ```
pub struct CommandsConfig {
    entries: Vec<CommandEntry>,
}

impl CommandsConfig {
    /// Name of the config section seeded when the section is blank.
    pub const DEFAULT_COMMAND: &'static str = "balance";

    /// All configured commands, in document order.
    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.iter()
    }

    /// Looks up the entry triggered by a chat command word.
    pub fn entry_for(&self, command: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|entry| entry.command == command)
    }

    /// Number of configured commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no commands are configured. Cannot occur through `parse`,
    /// which seeds a default command into a blank section.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConfigModule for CommandsConfig {
    const NAME: &'static str = "commands";
    const DOC: &'static str = "Chat commands and the accounts they operate on";

    async fn parse(
        parser: ConfigParser,
        registry: Arc<ServiceRegistry>,
    ) -> Result<Self, ParseError> {
        let schemas = registry
            .fetch::<SchemaRegistry>()
            .unwrap_or_else(|| Arc::new(SchemaRegistry::with_defaults()));

        let mut names = parser.keys();
        if names.is_empty() {
            // Seed a generated file with one working command.
            parser.enter(
                Self::DEFAULT_COMMAND,
                "Shows the balance of the player's account",
            );
            names.push(Self::DEFAULT_COMMAND.to_string());
        }

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let section = parser.enter(&name, "Account this command operates on");
            let mut command =
                section.expect_str("command", &name, "Chat word that triggers this command");
            if let Some(first) = command.split_whitespace().next() {
                if first != command {
                    let truncated = first.to_string();
                    section.set_value(
                        "command",
                        truncated.as_str(),
                        "command words cannot contain spaces",
                    );
                    command = truncated;
                }
            } else {
                // Blank or all-whitespace command word.
                section.set_value("command", name.as_str(), "command word was blank");
                command = name.clone();
            }

            let schema: Arc<dyn AccountSchema> = Arc::from(schemas.build(&section));
            debug!(name = %name, command = %command, kind = %schema.kind(), "registered command");
            entries.push(CommandEntry {
                name,
                command,
                schema,
            });
        }

        info!(commands = entries.len(), "commands section parsed");
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_config::Document;
    use bursar_schema::SchemaKind;

    async fn parse(yaml: &str) -> (CommandsConfig, ConfigParser) {
        let parser = ConfigParser::root(Document::from_yaml(yaml).unwrap());
        let config = CommandsConfig::parse(parser.clone(), Arc::new(ServiceRegistry::new()))
            .await
            .unwrap();
        (config, parser)
    }

    #[tokio::test]
    async fn test_blank_section_seeds_balance_command() {
        let (config, parser) = parse("{}").await;

        assert_eq!(config.len(), 1);
        let entry = config.entry_for(CommandsConfig::DEFAULT_COMMAND).unwrap();
        assert_eq!(entry.name(), "balance");
        assert_eq!(entry.schema().kind(), SchemaKind::Basic);
        // The seeded command reads as a full section in the written file.
        assert!(parser.full_config().contains_key("balance"));
    }

    #[tokio::test]
    async fn test_command_defaults_to_section_name() {
        let (config, parser) = parse("pay:\n  type: currency\n").await;

        let entry = config.entry_for("pay").unwrap();
        assert_eq!(entry.schema().kind(), SchemaKind::Currency);
        assert!(parser.is_repaired());
    }

    #[tokio::test]
    async fn test_command_with_spaces_is_truncated() {
        let (config, parser) = parse("money:\n  command: \"buy money\"\n").await;

        let entry = config.entry_for("buy").unwrap();
        assert_eq!(entry.name(), "money");
        assert!(config.entry_for("buy money").is_none());
        assert!(parser.is_repaired());
        let section = parser.full_config()["money"].as_map().unwrap().clone();
        assert_eq!(section["command"].as_str(), Some("buy"));
    }

    #[tokio::test]
    async fn test_blank_command_falls_back_to_section_name() {
        let (config, _parser) = parse("pay:\n  command: \"  \"\n").await;
        assert!(config.entry_for("pay").is_some());
    }

    #[tokio::test]
    async fn test_entries_preserve_document_order() {
        let (config, _parser) = parse("pay:\n  type: currency\nbalance:\n  type: basic\n").await;
        let names: Vec<&str> = config.entries().map(CommandEntry::name).collect();
        assert_eq!(names, ["pay", "balance"]);
    }
}

//! Command-line configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XBIND_MAPPING` | mapping.json | Mapping file |
//! | `XBIND_DOCUMENT` | (none) | XML document; an empty document when unset |
//! | `XBIND_TYPE` | (required) | Adapted type to bind |
//! | `XBIND_BACKEND` | dom | Node backend (`dom` or `sxd`) |
//! | `XBIND_LOG_LEVEL` | warn | Log level |
//! | `XBIND_NO_WRITE_THROUGH` | false | Disable list write-through |

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use xbind_adapter::AdapterConfig;
use xbind_node::NodeBackend;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// xbind command-line configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "xbind")]
#[command(about = "Read and write XML documents through typed property mappings")]
pub struct CliConfig {
    /// JSON mapping file declaring the adapted types.
    #[arg(long, env = "XBIND_MAPPING", default_value = "mapping.json")]
    pub mapping: PathBuf,

    /// XML document to bind. An empty document is used when omitted.
    #[arg(long, env = "XBIND_DOCUMENT")]
    pub document: Option<PathBuf>,

    /// Adapted type, as named in the mapping file.
    #[arg(long = "type", env = "XBIND_TYPE")]
    pub type_name: String,

    /// Node backend (dom, sxd). XPath mappings need sxd.
    #[arg(long, env = "XBIND_BACKEND", default_value = "dom")]
    pub backend: NodeBackend,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "XBIND_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Do not write lists back after structural changes.
    #[arg(long, env = "XBIND_NO_WRITE_THROUGH")]
    pub no_write_through: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// What to do with the bound object.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the value of one property.
    Get {
        /// Property name.
        property: String,
    },
    /// Assign a property and print or save the updated document.
    Set {
        /// Property name.
        property: String,
        /// New value. Lists take comma-separated items; an empty value clears.
        value: String,
        /// Write the document here instead of standard output.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print every mapped property as `name = value`.
    Dump,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            mapping: PathBuf::from("mapping.json"),
            document: None,
            type_name: String::new(),
            backend: NodeBackend::Dom,
            log_level: "warn".to_string(),
            no_write_through: false,
            command: Command::Dump,
        }
    }
}

impl CliConfig {
    /// Adapter settings derived from the command line.
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            backend: self.backend,
            write_through_collections: !self.no_write_through,
            ..AdapterConfig::default()
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.type_name.trim().is_empty() {
            errors.push("Type name cannot be empty".to_string());
        }

        if !self.mapping.is_file() {
            errors.push(format!(
                "Mapping file '{}' does not exist",
                self.mapping.display()
            ));
        }

        if let Some(document) = &self.document {
            if !document.is_file() {
                errors.push(format!(
                    "Document '{}' does not exist",
                    document.display()
                ));
            }
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        if let Command::Get { property } | Command::Set { property, .. } = &self.command {
            if property.trim().is_empty() {
                errors.push("Property name cannot be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_command() {
        let config = CliConfig::try_parse_from([
            "xbind",
            "--mapping",
            "m.json",
            "--type",
            "Order",
            "--backend",
            "sxd",
            "set",
            "Customer",
            "Ann",
            "--output",
            "out.xml",
        ])
        .unwrap();
        assert_eq!(config.type_name, "Order");
        assert_eq!(config.backend, NodeBackend::Sxd);
        assert_eq!(
            config.command,
            Command::Set {
                property: "Customer".to_string(),
                value: "Ann".to_string(),
                output: Some(PathBuf::from("out.xml")),
            }
        );
        assert!(config.adapter_config().write_through_collections);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = CliConfig::try_parse_from([
            "xbind", "--type", "Order", "--backend", "libxml", "dump",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = CliConfig {
            mapping: PathBuf::from("/nonexistent/mapping.json"),
            log_level: "loud".to_string(),
            command: Command::Get {
                property: " ".to_string(),
            },
            ..CliConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}

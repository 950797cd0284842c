//! Backend capabilities and backend selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Capabilities that a node backend may support.
///
/// Used for runtime capability checks before an accessor relies on a
/// navigation technology the active backend lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCapability {
    /// Child element and attribute selection.
    Navigation,
    /// Creating, updating, and removing nodes.
    Mutation,
    /// XPath selection and evaluation.
    XPath,
}

impl fmt::Display for NodeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeCapability::Navigation => write!(f, "navigation"),
            NodeCapability::Mutation => write!(f, "mutation"),
            NodeCapability::XPath => write!(f, "xpath"),
        }
    }
}

/// Identifies a node backend.
///
/// Selected by configuration whenever markup has to be parsed or an empty
/// document has to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeBackend {
    /// Arena document parsed with quick-xml. No XPath support.
    #[default]
    Dom,
    /// sxd-document tree with sxd-xpath evaluation.
    Sxd,
}

impl NodeBackend {
    /// Capabilities provided by nodes of this backend.
    pub fn capabilities(&self) -> &'static [NodeCapability] {
        match self {
            NodeBackend::Dom => &[NodeCapability::Navigation, NodeCapability::Mutation],
            NodeBackend::Sxd => &[
                NodeCapability::Navigation,
                NodeCapability::Mutation,
                NodeCapability::XPath,
            ],
        }
    }

    /// Returns true if this backend provides the capability.
    pub fn supports(&self, capability: NodeCapability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for NodeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeBackend::Dom => write!(f, "dom"),
            NodeBackend::Sxd => write!(f, "sxd"),
        }
    }
}

impl FromStr for NodeBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dom" => Ok(NodeBackend::Dom),
            "sxd" => Ok(NodeBackend::Sxd),
            other => Err(format!("unknown node backend '{}' (expected dom or sxd)", other)),
        }
    }
}

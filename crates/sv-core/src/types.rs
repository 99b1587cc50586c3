//! Core type definitions for Sieve
//!
//! Request context handed in by the proxy layer and the decision vocabulary
//! handed back.

use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Resource Types
// =============================================================================

/// Kind of resource a request is fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    Document,
    Script,
    Image,
    Xhr,
    #[default]
    Other,
}

impl ResourceType {
    /// Parse from a lowercase type name. Unknown names map to `Other`.
    pub fn from_name(s: &str) -> Self {
        match s {
            "document" | "main_frame" => Self::Document,
            "script" => Self::Script,
            "image" => Self::Image,
            "xhr" | "xmlhttprequest" => Self::Xhr,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Script => "script",
            Self::Image => "image",
            Self::Xhr => "xhr",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// Context for a request being decided.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request hostname
    pub domain: String,
    /// Full request URL
    pub url: String,
    pub resource_type: ResourceType,
    /// Request headers, keys unique
    pub headers: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(domain: impl Into<String>, url: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            domain: domain.into(),
            url: url.into(),
            resource_type,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// =============================================================================
// Filter Decision
// =============================================================================

/// Outcome of deciding a request.
///
/// `Redirect` and `Modify` are reserved for rule kinds that are not compiled
/// yet; the current matcher only produces `Block` and `Allow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Block,
    Allow,
    /// Redirect the request to the given location
    Redirect(String),
    /// Replace the response body
    Modify(Vec<u8>),
}

impl FilterDecision {
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block)
    }
}

impl fmt::Display for FilterDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => f.write_str("block"),
            Self::Allow => f.write_str("allow"),
            Self::Redirect(location) => write!(f, "redirect -> {location}"),
            Self::Modify(body) => write!(f, "modify ({} bytes)", body.len()),
        }
    }
}

/// Snapshot of the decision counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecisionStats {
    pub blocked: u64,
    pub allowed: u64,
}

impl DecisionStats {
    pub fn total(&self) -> u64 {
        self.blocked + self.allowed
    }
}

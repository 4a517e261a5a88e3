//! Request classification for catalog paths
//!
//! A catalog path is matched against an ordered list of rules. Each rule
//! that matches yields the entity kind and the operation the route stands
//! for. Rules are start-anchored only, so a path may match several of them
//! (`/catalog/book/create` matches both the create rule and the detail
//! rule); all matches are reported in registration order.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Action a catalog route represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(Operation::Read),
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            _ => Err(format!("Invalid operation: {}", s)),
        }
    }
}

/// Catalog entity kinds reachable under `/catalog`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Author,
    Book,
    BookInstance,
    Genre,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Author,
        EntityKind::Book,
        EntityKind::BookInstance,
        EntityKind::Genre,
    ];

    /// Path segment naming this entity
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Author => "author",
            EntityKind::Book => "book",
            EntityKind::BookInstance => "bookinstance",
            EntityKind::Genre => "genre",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "author" => Ok(EntityKind::Author),
            "book" => Ok(EntityKind::Book),
            "bookinstance" => Ok(EntityKind::BookInstance),
            "genre" => Ok(EntityKind::Genre),
            _ => Err(format!("Invalid catalog entity: {}", s)),
        }
    }
}

/// Result of classifying a catalog request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub entity: EntityKind,
    pub operation: Operation,
}

/// How a rule turns its captures into an operation
#[derive(Debug, Clone, Copy)]
enum OperationSource {
    /// Operation named by the capture group at this index
    Capture(usize),
    /// Fixed operation regardless of the path tail
    Fixed(Operation),
}

/// One classification rule: a path pattern and where its operation comes from
#[derive(Debug)]
pub struct CatalogRule {
    name: &'static str,
    pattern: Regex,
    operation: OperationSource,
}

impl CatalogRule {
    fn new(name: &'static str, pattern: &str, operation: OperationSource) -> Self {
        Self {
            name,
            // Patterns are compile-time literals
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("rule {}: {}", name, e)),
            operation,
        }
    }

    /// Classify `path` with this rule.
    ///
    /// Returns `None` when the path does not match. A match whose entity or
    /// operation cannot be parsed yields `Some(Err(_))`; the gate denies
    /// such a path.
    pub fn apply(&self, path: &str) -> Option<Result<Classification, String>> {
        let caps = self.pattern.captures(path)?;
        Some(self.extract(&caps))
    }

    fn extract(&self, caps: &Captures<'_>) -> Result<Classification, String> {
        let entity = caps
            .get(1)
            .ok_or_else(|| format!("rule {}: missing entity", self.name))?
            .as_str()
            .parse::<EntityKind>()?;

        let operation = match self.operation {
            OperationSource::Fixed(op) => op,
            OperationSource::Capture(idx) => caps
                .get(idx)
                .ok_or_else(|| format!("rule {}: missing operation", self.name))?
                .as_str()
                .parse::<Operation>()?,
        };

        Ok(Classification { entity, operation })
    }
}

const ENTITY: &str = "(author|book|bookinstance|genre)";

/// Rules in registration order: update/delete, then create, then detail.
static RULES: Lazy<Vec<CatalogRule>> = Lazy::new(|| {
    vec![
        CatalogRule::new(
            "update-delete",
            &format!(r"^/catalog/{}/([a-zA-Z0-9]+)/((?i:delete|update))", ENTITY),
            OperationSource::Capture(3),
        ),
        CatalogRule::new(
            "create",
            &format!(r"^/catalog/{}/(create)", ENTITY),
            OperationSource::Capture(2),
        ),
        CatalogRule::new(
            "detail",
            &format!(r"^/catalog/{}/([a-zA-Z0-9]+)", ENTITY),
            OperationSource::Fixed(Operation::Read),
        ),
    ]
});

/// The registered rules, in evaluation order
pub fn rules() -> &'static [CatalogRule] {
    &RULES
}

/// Every rule match for `path`, in registration order
pub fn classify_all(path: &str) -> Vec<Result<Classification, String>> {
    rules().iter().filter_map(|rule| rule.apply(path)).collect()
}

/// Primary classification of `path`: the first rule that matches
pub fn classify(path: &str) -> Option<Classification> {
    rules()
        .iter()
        .find_map(|rule| rule.apply(path))
        .and_then(Result::ok)
}

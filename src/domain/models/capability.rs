//! Capability tags and the agent-type catalog used to match tasks to agents.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single capability an agent offers or a task requires.
///
/// Modeled as a newtype over `String` rather than a closed enum: the
/// catalog of agent types is configuration, not compiled-in, so new
/// capability tags must be introducible without a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(pub String);

impl Capability {
    /// Builds a capability tag from any string-like value.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A named agent type: a fixed set of capabilities plus spawn limits.
///
/// The catalog is seeded by the Queen at swarm initialization (§4.7) and
/// consulted by the Scheduler to decide which type a task should be routed
/// to (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTypeDef {
    /// Unique name, e.g. `"researcher"`, `"coder"`, `"reviewer"`.
    pub name: String,
    /// Capabilities this agent type offers.
    pub capabilities: HashSet<Capability>,
    /// Maximum simultaneously live instances of this type per swarm.
    pub max_instances: usize,
    /// Keywords used to score this type against a task description or
    /// objective text (Scheduler tie-break, Queen demand scan, §4.5/§4.7).
    pub keywords: Vec<String>,
}

impl AgentTypeDef {
    /// Declares a new agent type with no keyword table.
    pub fn new(
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
        max_instances: usize,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities: capabilities.into_iter().collect(),
            max_instances,
            keywords: Vec::new(),
        }
    }

    /// Builder: attaches a keyword table.
    #[must_use]
    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this type's capabilities are a superset of `required`.
    #[must_use]
    pub fn satisfies(&self, required: &HashSet<Capability>) -> bool {
        required.is_subset(&self.capabilities)
    }

    /// Number of this type's keywords that occur in `text`, case-insensitive.
    #[must_use]
    pub fn keyword_score(&self, text: &str) -> usize {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|kw| text.contains(kw.to_lowercase().as_str()))
            .count()
    }
}

/// The set of agent types available to a swarm, keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentTypeCatalog {
    types: Vec<AgentTypeDef>,
}

impl AgentTypeCatalog {
    /// Builds an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// The catalog the Queen seeds by default for a general-purpose swarm
    /// (§4.4.1, §4.7.1): researcher, coder, analyst, tester, architect,
    /// reviewer, optimizer, documenter, coordinator, specialist.
    #[must_use]
    pub fn default_general_purpose() -> Self {
        let mut catalog = Self::new();
        catalog.register(
            AgentTypeDef::new(
                "researcher",
                [Capability::new("research"), Capability::new("analysis")],
                4,
            )
            .with_keywords(["research", "investigate", "analyze", "study", "explore"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "coder",
                [Capability::new("code"), Capability::new("test")],
                6,
            )
            .with_keywords(["code", "implement", "build", "develop", "fix", "refactor"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "analyst",
                [Capability::new("analysis"), Capability::new("research")],
                3,
            )
            .with_keywords(["analyze", "assess", "evaluate", "measure", "report"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "tester",
                [Capability::new("test"), Capability::new("review")],
                4,
            )
            .with_keywords(["test", "qa", "validate", "regression", "coverage"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "architect",
                [Capability::new("planning"), Capability::new("code")],
                2,
            )
            .with_keywords(["design", "architecture", "structure", "schema"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "reviewer",
                [Capability::new("review"), Capability::new("analysis")],
                3,
            )
            .with_keywords(["review", "audit", "verify", "check"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "optimizer",
                [Capability::new("code"), Capability::new("analysis")],
                2,
            )
            .with_keywords(["optimize", "performance", "profile", "speed up"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "documenter",
                [Capability::new("documentation"), Capability::new("review")],
                2,
            )
            .with_keywords(["document", "write docs", "readme", "explain"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "coordinator",
                [Capability::new("planning"), Capability::new("review")],
                1,
            )
            .with_keywords(["plan", "coordinate", "organize", "orchestrate"]),
        );
        catalog.register(
            AgentTypeDef::new(
                "specialist",
                [Capability::new("research"), Capability::new("code")],
                2,
            )
            .with_keywords(["specialist", "domain-specific", "expert"]),
        );
        catalog
    }

    /// Adds or replaces a type definition.
    pub fn register(&mut self, def: AgentTypeDef) {
        self.types.retain(|t| t.name != def.name);
        self.types.push(def);
    }

    /// Finds the first registered type whose capabilities satisfy `required`.
    ///
    /// Types are tried in registration order, so a seeding order that lists
    /// more specialized types first will prefer them.
    #[must_use]
    pub fn find_satisfying(&self, required: &HashSet<Capability>) -> Option<&AgentTypeDef> {
        self.types.iter().find(|t| t.satisfies(required))
    }

    /// Looks up a type definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AgentTypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Iterates over all registered types.
    pub fn iter(&self) -> impl Iterator<Item = &AgentTypeDef> {
        self.types.iter()
    }
}

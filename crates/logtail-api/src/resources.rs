/// A resource kind known to the API, with its explicit plural path segment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceKind {
    pub singular: String,
    pub plural: String,
    pub aliases: Vec<String>,
}

impl ResourceKind {
    pub fn new(singular: &str, plural: &str) -> Self {
        Self {
            singular: singular.to_lowercase(),
            plural: plural.to_lowercase(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_lowercase()).collect();
        self
    }

    fn matches(&self, name: &str) -> bool {
        self.singular == name || self.plural == name || self.aliases.iter().any(|a| a == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource type '{given}'. Valid types: {valid}")]
pub struct UnknownKind {
    pub given: String,
    pub valid: String,
}

/// Registry of resource kinds, passed explicitly to whatever needs plural names
#[derive(Clone, Debug)]
pub struct ResourceRegistry {
    kinds: Vec<ResourceKind>,
}

impl ResourceRegistry {
    /// An empty registry; every kind falls back to [`pluralize`]
    pub fn empty() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Registry with the kinds the log API serves
    pub fn builtin() -> Self {
        Self {
            kinds: vec![
                ResourceKind::new("policy", "policies"),
                ResourceKind::new("model", "models"),
                ResourceKind::new("function", "functions").with_aliases(&["fn", "mcp", "mcps"]),
                ResourceKind::new("agent", "agents").with_aliases(&["ag"]),
                ResourceKind::new("integrationconnection", "integrationconnections"),
                ResourceKind::new("sandbox", "sandboxes").with_aliases(&["sbx"]),
                ResourceKind::new("job", "jobs").with_aliases(&["j", "jb"]),
                ResourceKind::new("volume", "volumes"),
                ResourceKind::new("volumetemplate", "volumetemplates")
                    .with_aliases(&["volume-template", "vt"]),
                ResourceKind::new("image", "images"),
            ],
        }
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kinds.retain(|k| k.singular != kind.singular);
        self.kinds.push(kind);
        self
    }

    /// Plural API path segment for a kind (case-insensitive)
    pub fn plural_for(&self, kind: &str) -> String {
        let kind = kind.to_lowercase();
        self.kinds
            .iter()
            .find(|k| k.singular == kind)
            .map(|k| k.plural.clone())
            .unwrap_or_else(|| pluralize(&kind))
    }

    /// Resolve a kind name, plural, or alias to its canonical singular form
    pub fn canonical_kind(&self, name: &str) -> Result<String, UnknownKind> {
        let lower = name.trim().to_lowercase();
        self.kinds
            .iter()
            .find(|k| k.matches(&lower))
            .map(|k| k.singular.clone())
            .ok_or_else(|| UnknownKind {
                given: name.to_string(),
                valid: self.describe_kinds(),
            })
    }

    fn describe_kinds(&self) -> String {
        self.kinds
            .iter()
            .map(|k| {
                let mut names = vec![k.singular.as_str()];
                names.extend(k.aliases.iter().map(String::as_str));
                names.join("/")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Basic English plural of a singular noun; the input's casing is kept
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();

    if ends_with_any(&lower, &["s", "x", "z", "ch", "sh"]) {
        format!("{}es", word)
    } else if lower.ends_with('y') && !ends_with_any(&lower, &["ay", "ey", "iy", "oy", "uy"]) {
        let stem = word.strip_suffix(['y', 'Y']).unwrap_or(word);
        format!("{}ies", stem)
    } else {
        format!("{}s", word)
    }
}

fn ends_with_any(word: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| word.ends_with(s))
}

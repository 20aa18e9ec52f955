//! `tagger` module: entity tag lookup

/// How many tags the caller wants for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCardinality {
    Low,
    Orchestrator,
    High,
}

impl TagCardinality {
    /// Decode a raw cardinality, unknown values fall back to `Low`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => TagCardinality::Orchestrator,
            2 => TagCardinality::High,
            _ => TagCardinality::Low,
        }
    }
}

/// Resolves tags for an entity identifier (e.g. `container_id://abc`)
#[cfg_attr(test, mockall::automock)]
pub trait Tagger: Send + Sync {
    fn tags(&self, entity_id: &str, cardinality: TagCardinality) -> Vec<String>;
}

/// Tagger that knows no entities
#[derive(Debug, Default)]
pub struct NoopTagger;

impl Tagger for NoopTagger {
    fn tags(&self, _entity_id: &str, _cardinality: TagCardinality) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_from_raw() {
        assert_eq!(TagCardinality::from_raw(0), TagCardinality::Low);
        assert_eq!(TagCardinality::from_raw(1), TagCardinality::Orchestrator);
        assert_eq!(TagCardinality::from_raw(2), TagCardinality::High);
        assert_eq!(TagCardinality::from_raw(9), TagCardinality::Low);
    }

    #[test]
    fn test_noop_tagger() {
        assert!(NoopTagger.tags("container_id://abc", TagCardinality::High).is_empty());
    }
}

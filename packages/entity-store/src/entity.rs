//! Entities, selection options, and per-request context.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored entity: a JSON object with a string `uid` field.
pub type Entity = Map<String, Value>;

/// The field every entity is keyed by.
pub const UID_FIELD: &str = "uid";

/// Get the uid of an entity, if it has one.
pub fn entity_uid(entity: &Entity) -> Option<&str> {
    entity.get(UID_FIELD).and_then(Value::as_str)
}

/// A conjunction of `field == value` clauses.
///
/// An empty predicate matches every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    clauses: Vec<(String, Value)>,
}

impl Predicate {
    /// A predicate matching everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// A single equality clause.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Add another equality clause.
    ///
    /// A clause on a field that is already constrained replaces the earlier
    /// value, so adding the same clause twice leaves the predicate unchanged.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.clauses.iter_mut().find(|(f, _)| *f == field) {
            Some(clause) => clause.1 = value,
            None => self.clauses.push((field, value)),
        }
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Check whether an entity satisfies every clause.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| entity.get(field) == Some(value))
    }
}

/// Options for `select`.
///
/// `limit` of `None` leaves the choice to the pipeline; a terminal backend
/// that still sees `None` returns every match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    pub predicate: Predicate,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Explicit per-request context handed to every storage operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// The user on whose behalf the operation runs, if any.
    pub actor_uid: Option<String>,
}

impl RequestContext {
    /// Context for internal lookups that act on nobody's behalf.
    pub fn system() -> Self {
        Self { actor_uid: None }
    }

    pub fn for_actor(uid: impl Into<String>) -> Self {
        Self {
            actor_uid: Some(uid.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn empty_predicate_matches_everything() {
        let e = entity(json!({"uid": "a", "name": "x"}));
        assert!(Predicate::all().matches(&e));
        assert!(Predicate::all().is_empty());
    }

    #[test]
    fn predicate_requires_every_clause() {
        let e = entity(json!({"uid": "a", "owner": "alice", "kind": "file"}));
        assert!(Predicate::eq("owner", "alice").matches(&e));
        assert!(Predicate::eq("owner", "alice").and("kind", "file").matches(&e));
        assert!(!Predicate::eq("owner", "alice").and("kind", "dir").matches(&e));
        assert!(!Predicate::eq("missing", "x").matches(&e));
    }

    #[test]
    fn and_on_same_field_replaces_value() {
        let p = Predicate::eq("owner", "alice").and("owner", "bob");
        assert_eq!(p.clauses().len(), 1);
        assert_eq!(p.clauses()[0].1, json!("bob"));
    }

    #[test]
    fn predicate_compares_json_types() {
        let e = entity(json!({"uid": "a", "size": 3}));
        assert!(Predicate::eq("size", 3).matches(&e));
        assert!(!Predicate::eq("size", "3").matches(&e));
    }

    #[test]
    fn entity_uid_reads_string_field() {
        assert_eq!(entity_uid(&entity(json!({"uid": "abc"}))), Some("abc"));
        assert_eq!(entity_uid(&entity(json!({"uid": 7}))), None);
        assert_eq!(entity_uid(&entity(json!({}))), None);
    }

    #[test]
    fn select_options_builders() {
        let o = SelectOptions::new()
            .with_predicate(Predicate::eq("a", 1))
            .with_limit(5)
            .with_offset(2);
        assert_eq!(o.limit, Some(5));
        assert_eq!(o.offset, 2);
        assert_eq!(o.predicate.clauses().len(), 1);
    }

    #[test]
    fn request_context_constructors() {
        assert_eq!(RequestContext::system().actor_uid, None);
        assert_eq!(
            RequestContext::for_actor("u1").actor_uid.as_deref(),
            Some("u1")
        );
    }
}

//! Query model and fluent builder
//!
//! A [`Query`] is built once through the fluent methods and then treated as
//! immutable by the executor. The `filter`/`or_filter` pair builds the legacy
//! flat shape (a list of OR'd groups, each an implicit AND of matches) which
//! [`Query::condition`] translates into the generalized condition tree.

use super::condition::{Condition, Field, Operator};
use crate::graph::types::Direction;
use serde::{Deserialize, Serialize};

/// Query method tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// Filter and materialize matching entities
    Read,
    /// Gate candidacy like Read, but never attach data to the parent's result
    Reduce,
    /// Filter only; the target selector for Link/Unlink
    Find,
    /// Apply `set` assignments to matching entities
    Update,
    /// Delete matching entities (cascading their relations)
    Delete,
    /// Create relations from matching sources to resolved targets
    Link,
    /// Delete relations between matching sources and resolved targets
    Unlink,
}

impl Method {
    /// Whether execution may mutate the stores
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Method::Update | Method::Delete | Method::Link | Method::Unlink
        )
    }
}

/// Sort direction for the outermost result list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort comparison mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    /// Parse field values as integers; unparseable values sort last
    Numeric,
    /// Case-insensitive primary ordering, literal comparison as tie-break
    Alphabetic,
}

/// Post-processing sort specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: Field,
    pub direction: SortDirection,
    pub mode: SortMode,
}

/// A nested query attached in the child or parent direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuery {
    pub query: Query,
    pub direction: Direction,
    /// Required sub-queries with zero matches reject the parent candidate
    pub required: bool,
}

/// Traversal enrichment marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traversal {
    pub direction: Direction,
    pub depth: u32,
}

/// An immutable-once-built query specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub method: Method,
    /// Target type names, OR'd
    pub pool: Vec<String>,
    /// OR'd groups of AND'd match conditions
    pub groups: Vec<Vec<Condition>>,
    pub sub_queries: Vec<SubQuery>,
    pub traversal: Option<Traversal>,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
    /// Field assignments applied by Update
    pub assignments: Vec<(Field, String)>,
}

impl Query {
    fn with_method(method: Method, pool: &[&str]) -> Self {
        Query {
            method,
            pool: pool.iter().map(|s| s.to_string()).collect(),
            groups: Vec::new(),
            sub_queries: Vec::new(),
            traversal: None,
            sort: None,
            limit: None,
            assignments: Vec::new(),
        }
    }

    pub fn read(pool: &[&str]) -> Self {
        Self::with_method(Method::Read, pool)
    }

    pub fn reduce(pool: &[&str]) -> Self {
        Self::with_method(Method::Reduce, pool)
    }

    pub fn find(pool: &[&str]) -> Self {
        Self::with_method(Method::Find, pool)
    }

    pub fn update(pool: &[&str]) -> Self {
        Self::with_method(Method::Update, pool)
    }

    pub fn delete(pool: &[&str]) -> Self {
        Self::with_method(Method::Delete, pool)
    }

    pub fn link(pool: &[&str]) -> Self {
        Self::with_method(Method::Link, pool)
    }

    pub fn unlink(pool: &[&str]) -> Self {
        Self::with_method(Method::Unlink, pool)
    }

    fn push_match(mut self, condition: Condition, new_group: bool) -> Self {
        if new_group || self.groups.is_empty() {
            self.groups.push(Vec::new());
        }
        // push_match is only called with a non-empty groups list
        if let Some(group) = self.groups.last_mut() {
            group.push(condition);
        }
        self
    }

    /// Append a match to the active AND group
    pub fn filter(self, field: impl Into<Field>, op: Operator, value: impl Into<String>) -> Self {
        self.push_match(Condition::matches(field, op, value), false)
    }

    /// Append a negated match to the active AND group
    pub fn filter_not(
        self,
        field: impl Into<Field>,
        op: Operator,
        value: impl Into<String>,
    ) -> Self {
        self.push_match(Condition::matches(field, op, value).negate(), false)
    }

    /// Start a new OR group with this match
    pub fn or_filter(
        self,
        field: impl Into<Field>,
        op: Operator,
        value: impl Into<String>,
    ) -> Self {
        self.push_match(Condition::matches(field, op, value), true)
    }

    /// Start a new OR group with this negated match
    pub fn or_filter_not(
        self,
        field: impl Into<Field>,
        op: Operator,
        value: impl Into<String>,
    ) -> Self {
        self.push_match(Condition::matches(field, op, value).negate(), true)
    }

    fn attach(mut self, query: Query, direction: Direction, required: bool) -> Self {
        self.sub_queries.push(SubQuery {
            query,
            direction,
            required,
        });
        self
    }

    /// Attach a required sub-query in the child direction
    pub fn to(self, query: Query) -> Self {
        self.attach(query, Direction::Child, true)
    }

    /// Attach a required sub-query in the parent direction
    pub fn from(self, query: Query) -> Self {
        self.attach(query, Direction::Parent, true)
    }

    /// Attach an optional sub-query in the child direction
    pub fn can_to(self, query: Query) -> Self {
        self.attach(query, Direction::Child, false)
    }

    /// Attach an optional sub-query in the parent direction
    pub fn can_from(self, query: Query) -> Self {
        self.attach(query, Direction::Parent, false)
    }

    /// Enrich matched nodes with up to `depth` hops of outgoing relations
    pub fn traverse_out(mut self, depth: u32) -> Self {
        self.traversal = Some(Traversal {
            direction: Direction::Child,
            depth,
        });
        self
    }

    /// Enrich matched nodes with up to `depth` hops of incoming relations
    pub fn traverse_in(mut self, depth: u32) -> Self {
        self.traversal = Some(Traversal {
            direction: Direction::Parent,
            depth,
        });
        self
    }

    /// Sort the outermost result list
    pub fn order(
        mut self,
        field: impl Into<Field>,
        direction: SortDirection,
        mode: SortMode,
    ) -> Self {
        self.sort = Some(SortSpec {
            field: field.into(),
            direction,
            mode,
        });
        self
    }

    /// Truncate the outermost result list
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Accumulate a field assignment for Update
    pub fn set(mut self, field: impl Into<Field>, value: impl Into<String>) -> Self {
        self.assignments.push((field.into(), value.into()));
        self
    }

    /// The condition tree equivalent of the accumulated filter groups
    ///
    /// `None` means unconditional: every entity of the pool matches.
    pub fn condition(&self) -> Option<Condition> {
        if self.groups.is_empty() {
            return None;
        }
        let ors = self
            .groups
            .iter()
            .map(|group| Condition::all(group.clone()))
            .collect();
        Some(Condition::any(ors))
    }
}

//! Record-visibility scopes and the predicate builder that applies them.
//!
//! Each role assignment contributes one [`ScopeGrant`]. The grants held by
//! a principal inside a tenant are folded into a single [`Scope`], which a
//! business module turns into a [`ScopePredicate`] for its own record
//! layout via [`ScopeFields`].
//!
//! # Semantics
//!
//! | Scope | Result |
//! |-------|--------|
//! | `Company` | input unchanged |
//! | restricted, at least one usable field | OR of `field IN ids` clauses |
//! | restricted, nothing usable | empty (fail closed) |

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single visibility grant carried by one role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeGrant {
    Company,
    Branch(String),
    Department(String),
    /// The holder's own employee record.
    SelfRecord(String),
}

/// Id sets accumulated from branch, department and self grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedScope {
    pub branch_ids: BTreeSet<String>,
    pub department_ids: BTreeSet<String>,
    pub self_ids: BTreeSet<String>,
}

impl RestrictedScope {
    pub fn is_empty(&self) -> bool {
        self.branch_ids.is_empty() && self.department_ids.is_empty() && self.self_ids.is_empty()
    }
}

/// The aggregated scope of a principal inside one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Company-wide visibility. Dominates every narrower grant.
    Company,
    Restricted(RestrictedScope),
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Restricted(RestrictedScope::default())
    }
}

impl Scope {
    /// A scope that sees nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Fold grants into a scope. The first company grant short-circuits.
    pub fn from_grants<I>(grants: I) -> Self
    where
        I: IntoIterator<Item = ScopeGrant>,
    {
        let mut restricted = RestrictedScope::default();
        for grant in grants {
            match grant {
                ScopeGrant::Company => return Scope::Company,
                ScopeGrant::Branch(id) => {
                    restricted.branch_ids.insert(id);
                }
                ScopeGrant::Department(id) => {
                    restricted.department_ids.insert(id);
                }
                ScopeGrant::SelfRecord(id) => {
                    restricted.self_ids.insert(id);
                }
            }
        }
        Scope::Restricted(restricted)
    }

    pub fn is_company(&self) -> bool {
        matches!(self, Scope::Company)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Scope::Company => false,
            Scope::Restricted(r) => r.is_empty(),
        }
    }
}

/// Names of the record fields a caller's collection exposes for scoping.
/// A field left as `None` is never matched against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFields {
    pub branch: Option<String>,
    pub department: Option<String>,
    pub self_id: Option<String>,
}

impl ScopeFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(mut self, field: impl Into<String>) -> Self {
        self.branch = Some(field.into());
        self
    }

    pub fn department(mut self, field: impl Into<String>) -> Self {
        self.department = Some(field.into());
        self
    }

    pub fn self_id(mut self, field: impl Into<String>) -> Self {
        self.self_id = Some(field.into());
        self
    }
}

/// Access to the scoping fields of a record.
pub trait ScopedRecord {
    /// The value of `field` rendered as a tenant-local id, if present.
    fn scope_value(&self, field: &str) -> Option<Cow<'_, str>>;
}

impl ScopedRecord for serde_json::Value {
    fn scope_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.get(field)? {
            serde_json::Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            serde_json::Value::Number(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }
}

impl<T: ScopedRecord + ?Sized> ScopedRecord for &T {
    fn scope_value(&self, field: &str) -> Option<Cow<'_, str>> {
        (**self).scope_value(field)
    }
}

/// `field IN ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldClause {
    pub field: String,
    pub ids: BTreeSet<String>,
}

impl FieldClause {
    fn matches<R: ScopedRecord + ?Sized>(&self, record: &R) -> bool {
        record
            .scope_value(&self.field)
            .is_some_and(|v| self.ids.contains(&*v))
    }
}

/// A compiled visibility filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePredicate {
    Unrestricted,
    /// OR of the clauses.
    AnyOf(Vec<FieldClause>),
    DenyAll,
}

impl ScopePredicate {
    pub fn build(scope: &Scope, fields: &ScopeFields) -> Self {
        let restricted = match scope {
            Scope::Company => return ScopePredicate::Unrestricted,
            Scope::Restricted(r) => r,
        };

        let candidates = [
            (&fields.branch, &restricted.branch_ids),
            (&fields.department, &restricted.department_ids),
            (&fields.self_id, &restricted.self_ids),
        ];

        let clauses: Vec<FieldClause> = candidates
            .into_iter()
            .filter_map(|(field, ids)| match field {
                Some(field) if !ids.is_empty() => Some(FieldClause {
                    field: field.clone(),
                    ids: ids.clone(),
                }),
                _ => None,
            })
            .collect();

        if clauses.is_empty() {
            ScopePredicate::DenyAll
        } else {
            ScopePredicate::AnyOf(clauses)
        }
    }

    pub fn matches<R: ScopedRecord + ?Sized>(&self, record: &R) -> bool {
        match self {
            ScopePredicate::Unrestricted => true,
            ScopePredicate::AnyOf(clauses) => clauses.iter().any(|c| c.matches(record)),
            ScopePredicate::DenyAll => false,
        }
    }

    /// Render as a SurrealQL condition for a per-tenant query.
    ///
    /// Returns the condition text and the parameters it references,
    /// named `scope_0`, `scope_1`, ... Field names are emitted verbatim
    /// and must be trusted column names, never user input.
    pub fn to_surql(&self) -> (String, Vec<(String, Vec<String>)>) {
        match self {
            ScopePredicate::Unrestricted => ("true".into(), Vec::new()),
            ScopePredicate::DenyAll => ("false".into(), Vec::new()),
            ScopePredicate::AnyOf(clauses) => {
                let mut parts = Vec::with_capacity(clauses.len());
                let mut params = Vec::with_capacity(clauses.len());
                for (i, clause) in clauses.iter().enumerate() {
                    let name = format!("scope_{i}");
                    parts.push(format!("{} IN ${name}", clause.field));
                    params.push((name, clause.ids.iter().cloned().collect()));
                }
                (format!("({})", parts.join(" OR ")), params)
            }
        }
    }
}

/// Narrow `records` to those visible under `scope`.
pub fn apply_scope<R, I>(scope: &Scope, records: I, fields: &ScopeFields) -> Vec<R>
where
    R: ScopedRecord,
    I: IntoIterator<Item = R>,
{
    let predicate = ScopePredicate::build(scope, fields);
    match predicate {
        ScopePredicate::Unrestricted => records.into_iter().collect(),
        ScopePredicate::DenyAll => Vec::new(),
        ScopePredicate::AnyOf(_) => records
            .into_iter()
            .filter(|r| predicate.matches(r))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn employees() -> Vec<serde_json::Value> {
        vec![
            json!({"id": "e1", "branch_id": "B1", "department_id": "D1"}),
            json!({"id": "e2", "branch_id": "B2", "department_id": "D1"}),
            json!({"id": "e3", "branch_id": "B2", "department_id": "D2"}),
            json!({"id": 4, "branch_id": "B3"}),
        ]
    }

    #[test]
    fn company_grant_dominates() {
        let scope = Scope::from_grants([
            ScopeGrant::Branch("B1".into()),
            ScopeGrant::Company,
            ScopeGrant::Department("D1".into()),
        ]);
        assert!(scope.is_company());

        let out = apply_scope(&scope, employees(), &ScopeFields::new());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn branch_scope_keeps_matching_branch_only() {
        let scope = Scope::from_grants([ScopeGrant::Branch("B1".into())]);
        let out = apply_scope(&scope, employees(), &ScopeFields::new().branch("branch_id"));
        assert_eq!(out, vec![json!({"id": "e1", "branch_id": "B1", "department_id": "D1"})]);
    }

    #[test]
    fn clauses_are_ored() {
        let scope = Scope::from_grants([
            ScopeGrant::Branch("B1".into()),
            ScopeGrant::Department("D2".into()),
        ]);
        let fields = ScopeFields::new()
            .branch("branch_id")
            .department("department_id");
        let ids: Vec<_> = apply_scope(&scope, employees(), &fields)
            .into_iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("e1"), json!("e3")]);
    }

    #[test]
    fn empty_scope_fails_closed() {
        let out = apply_scope(&Scope::none(), employees(), &ScopeFields::new().branch("branch_id"));
        assert!(out.is_empty());
    }

    #[test]
    fn unmatched_fields_fail_closed() {
        // Department grant, but the collection only exposes a branch field.
        let scope = Scope::from_grants([ScopeGrant::Department("D1".into())]);
        let predicate = ScopePredicate::build(&scope, &ScopeFields::new().branch("branch_id"));
        assert_eq!(predicate, ScopePredicate::DenyAll);
        assert!(apply_scope(&scope, employees(), &ScopeFields::new().branch("branch_id")).is_empty());
    }

    #[test]
    fn self_scope_matches_numeric_ids() {
        let scope = Scope::from_grants([ScopeGrant::SelfRecord("4".into())]);
        let out = apply_scope(&scope, employees(), &ScopeFields::new().self_id("id"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["branch_id"], "B3");
    }

    #[test]
    fn surql_rendering() {
        let scope = Scope::from_grants([
            ScopeGrant::Branch("B1".into()),
            ScopeGrant::SelfRecord("e9".into()),
        ]);
        let fields = ScopeFields::new().branch("branch_id").self_id("employee_id");
        let (cond, params) = ScopePredicate::build(&scope, &fields).to_surql();
        assert_eq!(cond, "(branch_id IN $scope_0 OR employee_id IN $scope_1)");
        assert_eq!(params[0], ("scope_0".to_string(), vec!["B1".to_string()]));
        assert_eq!(params[1], ("scope_1".to_string(), vec!["e9".to_string()]));

        let (cond, params) = ScopePredicate::build(&Scope::none(), &fields).to_surql();
        assert_eq!(cond, "false");
        assert!(params.is_empty());
    }
}

//! SurrealDB implementation of [`AssignmentRepository`].
//!
//! The record id is [`CreateAssignment::natural_key`], so an identical
//! grant written twice (or by two racing writers) maps to one row.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantgate_core::error::GateResult;
use tenantgate_core::models::assignment::{Assignment, CreateAssignment, ScopeType};
use tenantgate_core::repository::AssignmentRepository;
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('role_assignment', $id) WHERE tenant_id = $tenant_id";

#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    record_id: String,
    tenant_id: String,
    role_id: String,
    principal_id: Option<String>,
    tenant_local_id: Option<String>,
    scope_type: String,
    scope_target_id: Option<String>,
    assigned_by: String,
    assigned_at: DateTime<Utc>,
}

fn parse_scope_type(raw: &str) -> Result<ScopeType, DbError> {
    match raw {
        "Company" => Ok(ScopeType::Company),
        "Branch" => Ok(ScopeType::Branch),
        "Department" => Ok(ScopeType::Department),
        "SelfOnly" => Ok(ScopeType::SelfOnly),
        other => Err(DbError::Decode {
            entity: "role_assignment",
            message: format!("unknown scope type {other:?}"),
        }),
    }
}

impl AssignmentRow {
    fn try_into_assignment(self) -> Result<Assignment, DbError> {
        Ok(Assignment {
            id: parse_uuid("role_assignment", &self.record_id)?,
            tenant_id: parse_uuid("role_assignment", &self.tenant_id)?,
            role_id: parse_uuid("role_assignment", &self.role_id)?,
            principal_id: parse_opt_uuid("role_assignment", self.principal_id.as_deref())?,
            tenant_local_id: self.tenant_local_id,
            scope_type: parse_scope_type(&self.scope_type)?,
            scope_target_id: self.scope_target_id,
            assigned_by: parse_uuid("role_assignment", &self.assigned_by)?,
            assigned_at: self.assigned_at,
        })
    }
}

/// SurrealDB implementation of the Assignment repository.
#[derive(Clone)]
pub struct SurrealAssignmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAssignmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, tenant_id: &str, id: &str) -> Result<Option<Assignment>, DbError> {
        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id.to_owned()))
            .bind(("tenant_id", tenant_id.to_owned()))
            .await?;
        let rows: Vec<AssignmentRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(AssignmentRow::try_into_assignment)
            .transpose()
    }
}

impl<C: Connection> AssignmentRepository for SurrealAssignmentRepository<C> {
    async fn assign(&self, input: CreateAssignment) -> GateResult<Assignment> {
        input.validate()?;

        let id = input.natural_key().to_string();
        let tenant_id = input.tenant_id.to_string();

        if let Some(existing) = self.fetch(&tenant_id, &id).await? {
            return Ok(existing);
        }

        let target = input
            .scope_target_id
            .filter(|t| !t.trim().is_empty());

        let result = self
            .db
            .query(
                "CREATE type::record('role_assignment', $id) SET \
                 tenant_id = $tenant_id, role_id = $role_id, \
                 principal_id = $principal_id, tenant_local_id = $tenant_local_id, \
                 scope_type = $scope_type, scope_target_id = $scope_target_id, \
                 assigned_by = $assigned_by",
            )
            .bind(("id", id.clone()))
            .bind(("tenant_id", tenant_id.clone()))
            .bind(("role_id", input.role_id.to_string()))
            .bind(("principal_id", input.principal_id.map(|p| p.to_string())))
            .bind(("tenant_local_id", input.tenant_local_id))
            .bind(("scope_type", input.scope_type.as_str().to_owned()))
            .bind(("scope_target_id", target))
            .bind(("assigned_by", input.assigned_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let check = result.check();

        // Either we wrote it or a concurrent writer did; both yield the row.
        match self.fetch(&tenant_id, &id).await? {
            Some(assignment) => Ok(assignment),
            None => match check {
                Err(e) => Err(DbError::Query(e.to_string()).into()),
                Ok(_) => Err(DbError::not_found("role_assignment", &id).into()),
            },
        }
    }

    async fn revoke(&self, tenant_id: Uuid, id: Uuid) -> GateResult<()> {
        let tenant_id_str = tenant_id.to_string();
        let id_str = id.to_string();
        if self.fetch(&tenant_id_str, &id_str).await?.is_none() {
            return Err(DbError::not_found("role_assignment", &id_str).into());
        }

        self.db
            .query("DELETE type::record('role_assignment', $id) WHERE tenant_id = $tenant_id")
            .bind(("id", id_str))
            .bind(("tenant_id", tenant_id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> GateResult<Assignment> {
        let id_str = id.to_string();
        Ok(self
            .fetch(&tenant_id.to_string(), &id_str)
            .await?
            .ok_or_else(|| DbError::not_found("role_assignment", &id_str))?)
    }

    async fn find_by_principal_or_local_id(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
        tenant_local_id: Option<&str>,
    ) -> GateResult<Vec<Assignment>> {
        // Two statements: rows held by the principal, rows targeting the
        // local employee record (possibly written before the account existed).
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role_assignment \
                 WHERE tenant_id = $tenant_id AND principal_id = $principal_id \
                 ORDER BY assigned_at ASC; \
                 SELECT meta::id(id) AS record_id, * FROM role_assignment \
                 WHERE tenant_id = $tenant_id AND $local_id != NONE \
                 AND tenant_local_id = $local_id \
                 ORDER BY assigned_at ASC;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("principal_id", principal_id.to_string()))
            .bind(("local_id", tenant_local_id.map(str::to_owned)))
            .await
            .map_err(DbError::from)?;

        let by_principal: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let by_local: Vec<AssignmentRow> = result.take(1).map_err(DbError::from)?;

        let mut seen = HashSet::new();
        let mut assignments = Vec::new();
        for row in by_principal.into_iter().chain(by_local) {
            if seen.insert(row.record_id.clone()) {
                assignments.push(row.try_into_assignment()?);
            }
        }

        Ok(assignments)
    }
}

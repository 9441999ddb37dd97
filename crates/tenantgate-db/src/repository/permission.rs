//! SurrealDB implementation of [`PermissionRepository`].
//!
//! Record ids are derived from the permission code, so two seeders racing
//! on the same code collide on the record id and exactly one CREATE lands.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantgate_core::error::GateResult;
use tenantgate_core::models::permission::{CreatePermission, Permission};
use tenantgate_core::repository::PermissionRepository;
use uuid::Uuid;

use super::{parse_uuid, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
pub(crate) struct PermissionRow {
    record_id: String,
    code: String,
    module: String,
    resource: String,
    action: String,
    scope: String,
    description: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRow {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        Ok(Permission {
            id: parse_uuid("permission", &self.record_id)?,
            code: self.code,
            module: self.module,
            resource: self.resource,
            action: self.action,
            scope: self.scope,
            description: self.description,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct CodeRow {
    pub(crate) code: String,
}

pub(crate) fn rows_into_permissions(rows: Vec<PermissionRow>) -> Result<Vec<Permission>, DbError> {
    rows.into_iter()
        .map(PermissionRow::try_into_permission)
        .collect()
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn exists(&self, code: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query("SELECT code FROM permission WHERE code = $code")
            .bind(("code", code.to_owned()))
            .await?;
        let rows: Vec<CodeRow> = result.take(0)?;
        Ok(!rows.is_empty())
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create_if_absent(&self, input: CreatePermission) -> GateResult<bool> {
        if self.exists(&input.code).await? {
            return Ok(false);
        }

        let id = Permission::id_for_code(&input.code).to_string();
        let code = input.code.clone();
        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 code = $code, module = $module, resource = $resource, \
                 action = $action, scope = $scope, description = $description",
            )
            .bind(("id", id))
            .bind(("code", input.code))
            .bind(("module", input.module))
            .bind(("resource", input.resource))
            .bind(("action", input.action))
            .bind(("scope", input.scope))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        match result.check() {
            Ok(_) => Ok(true),
            // Lost the race to another seeder: the row is there, just not ours.
            Err(_) if self.exists(&code).await? => Ok(false),
            Err(e) => Err(DbError::Query(e.to_string()).into()),
        }
    }

    async fn get_by_code(&self, code: &str) -> GateResult<Permission> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM permission WHERE code = $code")
            .bind(("code", code.to_owned()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission", code))?;
        Ok(row.try_into_permission()?)
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> GateResult<Vec<Permission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE meta::id(id) IN $ids ORDER BY code ASC",
            )
            .bind(("ids", uuid_strings(ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_permissions(rows)?)
    }

    async fn set_active(&self, code: &str, active: bool) -> GateResult<Permission> {
        let result = self
            .db
            .query(
                "UPDATE permission SET active = $active, updated_at = time::now() \
                 WHERE code = $code; \
                 SELECT meta::id(id) AS record_id, * FROM permission WHERE code = $code;",
            )
            .bind(("code", code.to_owned()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PermissionRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission", code))?;
        Ok(row.try_into_permission()?)
    }

    async fn list_all(&self) -> GateResult<Vec<Permission>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM permission ORDER BY code ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_permissions(rows)?)
    }

    async fn active_codes(&self) -> GateResult<Vec<String>> {
        let mut result = self
            .db
            .query("SELECT code FROM permission WHERE active = true ORDER BY code ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CodeRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| r.code).collect())
    }
}

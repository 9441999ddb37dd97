//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantgate_core::error::{GateError, GateResult};
use tenantgate_core::models::permission::Permission;
use tenantgate_core::models::role::{CreateRole, Role, UpdateRole};
use tenantgate_core::repository::{PaginatedResult, Pagination, RoleRepository};
use uuid::Uuid;

use super::permission::{CodeRow, PermissionRow, rows_into_permissions};
use super::{CountRow, parse_uuid, uuid_strings};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('role', $id) WHERE tenant_id = $tenant_id";

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    active: bool,
    is_system_template: bool,
    allow_high_risk_combination: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid("role", &self.record_id)?,
            tenant_id: parse_uuid("role", &self.tenant_id)?,
            name: self.name,
            description: self.description,
            active: self.active,
            is_system_template: self.is_system_template,
            allow_high_risk_combination: self.allow_high_risk_combination,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

fn single(rows: Vec<RoleRow>, id: &str) -> Result<Role, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found("role", id))?
        .try_into_role()
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn grant_exists(&self, role_id: &str, permission_id: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM grants \
                 WHERE role_id = $role_id AND permission_id = $permission_id",
            )
            .bind(("role_id", role_id.to_owned()))
            .bind(("permission_id", permission_id.to_owned()))
            .await?;
        let rows: Vec<IdRow> = result.take(0)?;
        Ok(!rows.is_empty())
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> GateResult<Role> {
        let id = Uuid::new_v4().to_string();
        let tenant_id = input.tenant_id.to_string();
        let name = input.name.clone();
        let query = format!(
            "CREATE type::record('role', $id) SET \
             tenant_id = $tenant_id, name = $name, description = $description, \
             is_system_template = $is_system_template, \
             allow_high_risk_combination = $allow_high_risk_combination; \
             {SELECT_ONE};"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id.clone()))
            .bind(("tenant_id", tenant_id.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("is_system_template", input.is_system_template))
            .bind((
                "allow_high_risk_combination",
                input.allow_high_risk_combination,
            ))
            .await
            .map_err(DbError::from)?;

        let mut result = match result.check() {
            Ok(result) => result,
            Err(e) => {
                let mut lookup = self
                    .db
                    .query(
                        "SELECT count() AS total FROM role \
                         WHERE tenant_id = $tenant_id AND name = $name GROUP ALL",
                    )
                    .bind(("tenant_id", tenant_id))
                    .bind(("name", name))
                    .await
                    .map_err(DbError::from)?;
                let taken: Vec<CountRow> = lookup.take(0).map_err(DbError::from)?;
                if taken.first().is_some_and(|r| r.total > 0) {
                    return Err(GateError::AlreadyExists {
                        entity: "role".into(),
                    });
                }
                return Err(DbError::Query(e.to_string()).into());
            }
        };

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, &id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> GateResult<Role> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, &id_str)?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateRole) -> GateResult<Role> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        if input.allow_high_risk_combination.is_some() {
            sets.push("allow_high_risk_combination = $allow_high_risk_combination");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {} WHERE tenant_id = $tenant_id; \
             {SELECT_ONE};",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }
        if let Some(allow) = input.allow_high_risk_combination {
            builder = builder.bind(("allow_high_risk_combination", allow));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, &id_str)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> GateResult<()> {
        // Confirms the role belongs to this tenant before anything is removed.
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query(
                "DELETE grants WHERE role_id = $id AND tenant_id = $tenant_id; \
                 DELETE role_assignment WHERE role_id = $id AND tenant_id = $tenant_id; \
                 DELETE type::record('role', $id) WHERE tenant_id = $tenant_id;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> GateResult<PaginatedResult<Role>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM role WHERE tenant_id = $tenant_id GROUP ALL")
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn active_role_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> GateResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM role \
                 WHERE tenant_id = $tenant_id AND active = true \
                 AND meta::id(id) IN $ids",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("ids", uuid_strings(ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| parse_uuid("role", &r.record_id))
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn grant_permission(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> GateResult<()> {
        let role_id_str = role_id.to_string();
        let perm_id_str = permission_id.to_string();

        if self.grant_exists(&role_id_str, &perm_id_str).await? {
            return Ok(());
        }

        // RELATE needs literal record ids; both are formatted UUIDs.
        let query = format!(
            "RELATE role:`{role_id_str}` -> grants -> permission:`{perm_id_str}` \
             SET tenant_id = $tenant_id, role_id = $role_id, \
             permission_id = $permission_id;"
        );
        let result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id_str.clone()))
            .bind(("permission_id", perm_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        match result.check() {
            Ok(_) => Ok(()),
            Err(_) if self.grant_exists(&role_id_str, &perm_id_str).await? => Ok(()),
            Err(e) => Err(DbError::Query(e.to_string()).into()),
        }
    }

    async fn revoke_permission(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> GateResult<()> {
        self.db
            .query(
                "DELETE grants WHERE tenant_id = $tenant_id \
                 AND role_id = $role_id AND permission_id = $permission_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("permission_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_role_permissions(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> GateResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE meta::id(id) IN (\
                     SELECT VALUE permission_id FROM grants \
                     WHERE tenant_id = $tenant_id AND role_id = $role_id\
                 ) ORDER BY code ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_permissions(rows)?)
    }

    async fn active_codes_for_roles(
        &self,
        tenant_id: Uuid,
        role_ids: &[Uuid],
    ) -> GateResult<Vec<String>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut result = self
            .db
            .query(
                "SELECT code FROM permission \
                 WHERE active = true AND meta::id(id) IN (\
                     SELECT VALUE permission_id FROM grants \
                     WHERE tenant_id = $tenant_id AND role_id IN $role_ids\
                 ) ORDER BY code ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_ids", uuid_strings(role_ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CodeRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| r.code).collect())
    }
}

//! SurrealDB implementation of [`OverrideRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantgate_core::error::GateResult;
use tenantgate_core::models::permission_override::{
    OverrideEffect, PermissionOverride, SetOverride,
};
use tenantgate_core::repository::OverrideRepository;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OverrideRow {
    record_id: String,
    tenant_id: String,
    principal_id: String,
    permission_id: String,
    effect: String,
    reason: String,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OverrideRow {
    fn try_into_override(self) -> Result<PermissionOverride, DbError> {
        let effect = match self.effect.as_str() {
            "Allow" => OverrideEffect::Allow,
            "Deny" => OverrideEffect::Deny,
            other => {
                return Err(DbError::Decode {
                    entity: "permission_override",
                    message: format!("unknown effect {other:?}"),
                });
            }
        };
        Ok(PermissionOverride {
            id: parse_uuid("permission_override", &self.record_id)?,
            tenant_id: parse_uuid("permission_override", &self.tenant_id)?,
            principal_id: parse_uuid("permission_override", &self.principal_id)?,
            permission_id: parse_uuid("permission_override", &self.permission_id)?,
            effect,
            reason: self.reason,
            created_by: parse_uuid("permission_override", &self.created_by)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Override repository.
#[derive(Clone)]
pub struct SurrealOverrideRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOverrideRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OverrideRepository for SurrealOverrideRepository<C> {
    async fn set(&self, input: SetOverride) -> GateResult<PermissionOverride> {
        let id = PermissionOverride::id_for(input.tenant_id, input.principal_id, input.permission_id)
            .to_string();

        // UPSERT on the triple-derived id: replacing an override keeps its
        // original created_at and bumps updated_at.
        let result = self
            .db
            .query(
                "UPSERT type::record('permission_override', $id) SET \
                 tenant_id = $tenant_id, principal_id = $principal_id, \
                 permission_id = $permission_id, effect = $effect, \
                 reason = $reason, created_by = $created_by, \
                 updated_at = time::now(); \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('permission_override', $id);",
            )
            .bind(("id", id.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("principal_id", input.principal_id.to_string()))
            .bind(("permission_id", input.permission_id.to_string()))
            .bind(("effect", input.effect.as_str().to_owned()))
            .bind(("reason", input.reason))
            .bind(("created_by", input.created_by.to_string()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<OverrideRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission_override", &id))?;
        Ok(row.try_into_override()?)
    }

    async fn remove(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
        permission_id: Uuid,
    ) -> GateResult<()> {
        let id = PermissionOverride::id_for(tenant_id, principal_id, permission_id);
        self.db
            .query("DELETE type::record('permission_override', $id) WHERE tenant_id = $tenant_id")
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_for_principal(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
    ) -> GateResult<Vec<PermissionOverride>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission_override \
                 WHERE tenant_id = $tenant_id AND principal_id = $principal_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("principal_id", principal_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OverrideRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(OverrideRow::try_into_override)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}

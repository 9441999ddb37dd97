//! SurrealDB implementation of [`PrincipalRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantgate_core::error::GateResult;
use tenantgate_core::models::principal::{CreatePrincipal, Principal, UpdatePrincipal};
use tenantgate_core::repository::PrincipalRepository;
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('principal', $id)";

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PrincipalRow {
    record_id: String,
    email: String,
    platform_admin: bool,
    superuser: bool,
    owns_tenant: Option<String>,
    is_delegate_capable: bool,
    last_active_tenant_id: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrincipalRow {
    fn try_into_principal(self) -> Result<Principal, DbError> {
        Ok(Principal {
            id: parse_uuid("principal", &self.record_id)?,
            email: self.email,
            platform_admin: self.platform_admin,
            superuser: self.superuser,
            owns_tenant: parse_opt_uuid("principal", self.owns_tenant.as_deref())?,
            is_delegate_capable: self.is_delegate_capable,
            last_active_tenant_id: parse_opt_uuid(
                "principal",
                self.last_active_tenant_id.as_deref(),
            )?,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Principal repository.
#[derive(Clone)]
pub struct SurrealPrincipalRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPrincipalRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

fn single(rows: Vec<PrincipalRow>, id: &str) -> Result<Principal, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found("principal", id))?
        .try_into_principal()
}

impl<C: Connection> PrincipalRepository for SurrealPrincipalRepository<C> {
    async fn create(&self, input: CreatePrincipal) -> GateResult<Principal> {
        let id = Uuid::new_v4().to_string();
        let query = format!(
            "CREATE type::record('principal', $id) SET \
             email = $email, platform_admin = $platform_admin, \
             superuser = $superuser, owns_tenant = $owns_tenant, \
             is_delegate_capable = $is_delegate_capable; \
             {SELECT_ONE};"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id.clone()))
            .bind(("email", input.email))
            .bind(("platform_admin", input.platform_admin))
            .bind(("superuser", input.superuser))
            .bind(("owns_tenant", input.owns_tenant.map(|t| t.to_string())))
            .bind(("is_delegate_capable", input.is_delegate_capable))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PrincipalRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, &id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> GateResult<Principal> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, &id_str)?)
    }

    async fn update(&self, id: Uuid, input: UpdatePrincipal) -> GateResult<Principal> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.is_delegate_capable.is_some() {
            sets.push("is_delegate_capable = $is_delegate_capable");
        }
        if input.owns_tenant.is_some() {
            sets.push("owns_tenant = $owns_tenant");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('principal', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(capable) = input.is_delegate_capable {
            builder = builder.bind(("is_delegate_capable", capable));
        }
        if let Some(owns) = input.owns_tenant {
            builder = builder.bind(("owns_tenant", owns.map(|t| t.to_string())));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PrincipalRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, &id_str)?)
    }

    async fn set_last_active_tenant(&self, id: Uuid, tenant_id: Uuid) -> GateResult<Principal> {
        let id_str = id.to_string();
        let query = format!(
            "UPDATE type::record('principal', $id) SET \
             last_active_tenant_id = $tenant_id, updated_at = time::now(); \
             {SELECT_ONE};"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PrincipalRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, &id_str)?)
    }
}

//! SurrealDB implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantgate_core::error::{GateError, GateResult};
use tenantgate_core::models::tenant::{CreateTenant, Tenant};
use tenantgate_core::repository::{PaginatedResult, Pagination, TenantRepository};
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('tenant', $id)";

#[derive(Debug, SurrealValue)]
struct TenantRow {
    record_id: String,
    name: String,
    store_locator: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id: parse_uuid("tenant", &self.record_id)?,
            name: self.name,
            store_locator: self.store_locator,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn single(rows: Vec<TenantRow>, id: &str) -> Result<Tenant, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found("tenant", id))?
        .try_into_tenant()
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> GateResult<Tenant> {
        let id = Uuid::new_v4().to_string();
        let query = format!("CREATE type::record('tenant', $id) SET name = $name; {SELECT_ONE};");

        let result = self
            .db
            .query(query)
            .bind(("id", id.clone()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, &id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> GateResult<Tenant> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, &id_str)?)
    }

    async fn set_store_locator(&self, id: Uuid, locator: &str) -> GateResult<Tenant> {
        let id_str = id.to_string();

        // The WHERE guard makes the write a no-op when another locator is
        // already recorded; the follow-up SELECT tells the two cases apart.
        let query = format!(
            "UPDATE type::record('tenant', $id) SET \
             store_locator = $locator, updated_at = time::now() \
             WHERE store_locator IS NONE; \
             {SELECT_ONE};"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("locator", locator.to_owned()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        let tenant = single(rows, &id_str)?;

        match tenant.store_locator.as_deref() {
            Some(existing) if existing == locator => Ok(tenant),
            _ => Err(GateError::Validation {
                message: format!("tenant {id} already has a different store locator"),
            }),
        }
    }

    async fn set_active(&self, id: Uuid, active: bool) -> GateResult<Tenant> {
        let id_str = id.to_string();
        let query = format!(
            "UPDATE type::record('tenant', $id) SET \
             active = $active, updated_at = time::now(); \
             {SELECT_ONE};"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, &id_str)?)
    }

    async fn list(&self, pagination: Pagination) -> GateResult<PaginatedResult<Tenant>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM tenant GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(TenantRow::try_into_tenant)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

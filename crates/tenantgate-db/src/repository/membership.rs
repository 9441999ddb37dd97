//! SurrealDB implementation of [`MembershipRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantgate_core::error::{GateError, GateResult};
use tenantgate_core::models::membership::{CreateMembership, Membership, MembershipStatus};
use tenantgate_core::repository::MembershipRepository;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

const SELECT_PAIR: &str = "SELECT meta::id(id) AS record_id, * FROM membership \
     WHERE principal_id = $principal_id AND tenant_id = $tenant_id";

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    record_id: String,
    principal_id: String,
    tenant_id: String,
    status: String,
    tenant_local_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Result<MembershipStatus, DbError> {
    match raw {
        "Invited" => Ok(MembershipStatus::Invited),
        "Active" => Ok(MembershipStatus::Active),
        "Terminated" => Ok(MembershipStatus::Terminated),
        other => Err(DbError::Decode {
            entity: "membership",
            message: format!("unknown status {other:?}"),
        }),
    }
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        Ok(Membership {
            id: parse_uuid("membership", &self.record_id)?,
            principal_id: parse_uuid("membership", &self.principal_id)?,
            tenant_id: parse_uuid("membership", &self.tenant_id)?,
            status: parse_status(&self.status)?,
            tenant_local_id: self.tenant_local_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn require(&self, principal_id: Uuid, tenant_id: Uuid) -> GateResult<Membership> {
        self.find(principal_id, tenant_id).await?.ok_or_else(|| {
            DbError::not_found("membership", format!("{principal_id}@{tenant_id}")).into()
        })
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn create(&self, input: CreateMembership) -> GateResult<Membership> {
        if self.find(input.principal_id, input.tenant_id).await?.is_some() {
            return Err(GateError::AlreadyExists {
                entity: "membership".into(),
            });
        }

        let id = Uuid::new_v4().to_string();
        let result = self
            .db
            .query(
                "CREATE type::record('membership', $id) SET \
                 principal_id = $principal_id, tenant_id = $tenant_id, \
                 status = $status, tenant_local_id = $tenant_local_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('membership', $id);",
            )
            .bind(("id", id.clone()))
            .bind(("principal_id", input.principal_id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("status", input.status.as_str().to_owned()))
            .bind(("tenant_local_id", input.tenant_local_id))
            .await
            .map_err(DbError::from)?;

        // A concurrent creator wins the unique index; report it as a duplicate.
        let mut result = match result.check() {
            Ok(result) => result,
            Err(e) => {
                if self.find(input.principal_id, input.tenant_id).await?.is_some() {
                    return Err(GateError::AlreadyExists {
                        entity: "membership".into(),
                    });
                }
                return Err(DbError::Query(e.to_string()).into());
            }
        };

        let rows: Vec<MembershipRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("membership", &id))?;
        Ok(row.try_into_membership()?)
    }

    async fn find(&self, principal_id: Uuid, tenant_id: Uuid) -> GateResult<Option<Membership>> {
        let mut result = self
            .db
            .query(SELECT_PAIR)
            .bind(("principal_id", principal_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(MembershipRow::try_into_membership)
            .transpose()?)
    }

    async fn find_active(
        &self,
        principal_id: Uuid,
        tenant_id: Uuid,
    ) -> GateResult<Option<Membership>> {
        Ok(self
            .find(principal_id, tenant_id)
            .await?
            .filter(Membership::is_active))
    }

    async fn transition(
        &self,
        principal_id: Uuid,
        tenant_id: Uuid,
        status: MembershipStatus,
    ) -> GateResult<Membership> {
        let current = self.require(principal_id, tenant_id).await?;
        if !current.status.can_transition_to(status) {
            return Err(GateError::InvalidStatusTransition {
                entity: "membership".into(),
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        // Guarding on the observed status keeps a racing transition from
        // being overwritten.
        let query = format!(
            "UPDATE membership SET status = $status, updated_at = time::now() \
             WHERE principal_id = $principal_id AND tenant_id = $tenant_id \
             AND status = $from; \
             {SELECT_PAIR};"
        );
        let result = self
            .db
            .query(query)
            .bind(("principal_id", principal_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", status.as_str().to_owned()))
            .bind(("from", current.status.as_str().to_owned()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MembershipRow> = result.take(1).map_err(DbError::from)?;
        let updated = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("membership", format!("{principal_id}@{tenant_id}")))?
            .try_into_membership()?;

        if updated.status != status {
            return Err(GateError::InvalidStatusTransition {
                entity: "membership".into(),
                from: updated.status.to_string(),
                to: status.to_string(),
            });
        }
        Ok(updated)
    }

    async fn link_local_id(
        &self,
        principal_id: Uuid,
        tenant_id: Uuid,
        tenant_local_id: &str,
    ) -> GateResult<Membership> {
        let query = format!(
            "UPDATE membership SET tenant_local_id = $local_id, updated_at = time::now() \
             WHERE principal_id = $principal_id AND tenant_id = $tenant_id \
             AND tenant_local_id IS NONE; \
             {SELECT_PAIR};"
        );
        let result = self
            .db
            .query(query)
            .bind(("principal_id", principal_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("local_id", tenant_local_id.to_owned()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MembershipRow> = result.take(1).map_err(DbError::from)?;
        let membership = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("membership", format!("{principal_id}@{tenant_id}")))?
            .try_into_membership()?;

        match membership.tenant_local_id.as_deref() {
            Some(linked) if linked == tenant_local_id => Ok(membership),
            _ => Err(GateError::Validation {
                message: "membership is already linked to a different local record".into(),
            }),
        }
    }

    async fn list_for_principal(&self, principal_id: Uuid) -> GateResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM membership \
                 WHERE principal_id = $principal_id \
                 ORDER BY created_at ASC",
            )
            .bind(("principal_id", principal_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(MembershipRow::try_into_membership)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}

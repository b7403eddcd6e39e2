use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{QueryBuilder, Row, SqliteConnection, Transaction};
use uuid::Uuid;

use leadflow_core::assignment::{CandidateOrder, CandidateQuery, StateFilter};
use leadflow_core::domain::grant::ShareLeadGrant;
use leadflow_core::domain::group::{Campaign, CampaignId, Group, GroupId, ShiftAffinity};
use leadflow_core::domain::lead::{Lead, LeadDocument, LeadId, LeadState, Shift};
use leadflow_core::domain::lead_log::{LeadLog, LeadLogId};
use leadflow_core::domain::queue::{next_position, LeadQueueEntry, LeadQueueEntryId};
use leadflow_core::domain::schedule::ScheduledCall;
use leadflow_core::domain::worker::{Worker, WorkerId, WorkerLink};
use leadflow_core::errors::{ApplicationError, DomainError};
use leadflow_core::ports::{LeadStore, LeadUnitOfWork};

use super::{LeadSeeder, RepositoryError};
use crate::DbPool;

const LEAD_SELECT: &str = "SELECT
        l.id,
        l.external_id,
        l.full_name,
        l.phone,
        l.email,
        l.state,
        l.shift,
        l.campaign_id,
        l.created_at,
        l.updated_at,
        w.id AS holder_id
     FROM lead l
     LEFT JOIN worker w ON w.current_lead_id = l.id";

const WORKER_SELECT: &str = "SELECT
        id,
        name,
        group_id,
        parent_group_id,
        is_manager,
        priorities_json,
        current_lead_id
     FROM worker";

const QUEUE_SELECT: &str = "SELECT id, worker_id, lead_id, position, created_at FROM lead_queue";

/// SQLite adapter of the storage port. Every unit of work is one sqlx
/// transaction whose first statement is a write, so the unit owns the
/// database write lock before it reads anything.
#[derive(Clone)]
pub struct SqlLeadStore {
    pool: DbPool,
}

impl SqlLeadStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl LeadStore for SqlLeadStore {
    async fn begin(&self) -> Result<Box<dyn LeadUnitOfWork>, ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        // Matches no row; it only reserves the write lock for this transaction.
        sqlx::query("UPDATE worker SET lock_version = lock_version WHERE id = ''")
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        Ok(Box::new(SqlLeadUnit { tx }))
    }

    async fn find_worker(&self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_worker(&mut conn, id).await?)
    }

    async fn find_lead(&self, id: &LeadId) -> Result<Option<Lead>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_lead(&mut conn, id).await?)
    }

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let row = sqlx::query("SELECT id, name, shift FROM worker_group WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&mut *conn)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => Ok(Some(group_with_campaigns(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn groups_for_worker(&self, id: &WorkerId) -> Result<Vec<Group>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_groups_for_worker(&mut conn, id).await?)
    }

    async fn worker_links(&self) -> Result<Vec<WorkerLink>, ApplicationError> {
        let rows = sqlx::query("SELECT id, group_id, parent_group_id FROM worker ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        rows.into_iter()
            .map(|row| {
                Ok(WorkerLink {
                    worker_id: WorkerId(row.try_get("id")?),
                    group_id: GroupId(row.try_get("group_id")?),
                    parent_group_id: row.try_get::<Option<String>, _>("parent_group_id")?.map(GroupId),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|error| RepositoryError::from(error).into())
    }

    async fn list_queue(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<LeadQueueEntry>, ApplicationError> {
        let rows = sqlx::query(&format!("{QUEUE_SELECT} WHERE worker_id = ? ORDER BY position ASC"))
            .bind(&worker_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(queue_entry_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn has_queue_entry(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<bool, ApplicationError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM lead_queue WHERE worker_id = ? AND lead_id = ?)",
        )
        .bind(&worker_id.0)
        .bind(&lead_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(exists == 1)
    }

    async fn has_scheduled_call(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<bool, ApplicationError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM scheduled_call WHERE worker_id = ? AND lead_id = ?)",
        )
        .bind(&worker_id.0)
        .bind(&lead_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(exists == 1)
    }

    async fn has_share_grant(
        &self,
        grantor: &WorkerId,
        grantee: &WorkerId,
    ) -> Result<bool, ApplicationError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM share_lead_grant WHERE grantor_id = ? AND grantee_id = ?)",
        )
        .bind(&grantor.0)
        .bind(&grantee.0)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(exists == 1)
    }

    async fn logs_for_lead(&self, lead_id: &LeadId) -> Result<Vec<LeadLog>, ApplicationError> {
        let rows = sqlx::query(
            "SELECT id, worker_id, lead_id, outcome, observations, created_at
             FROM lead_log
             WHERE lead_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(&lead_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(log_from_row).collect::<Result<Vec<_>, _>>()?)
    }
}

pub struct SqlLeadUnit {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl LeadUnitOfWork for SqlLeadUnit {
    async fn lock_worker(&mut self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError> {
        let touched = sqlx::query("UPDATE worker SET lock_version = lock_version + 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?;
        if touched.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(fetch_worker(&mut self.tx, id).await?)
    }

    async fn find_worker(&mut self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError> {
        Ok(fetch_worker(&mut self.tx, id).await?)
    }

    async fn find_lead(&mut self, id: &LeadId) -> Result<Option<Lead>, ApplicationError> {
        Ok(fetch_lead(&mut self.tx, id).await?)
    }

    async fn groups_for_worker(&mut self, id: &WorkerId) -> Result<Vec<Group>, ApplicationError> {
        Ok(fetch_groups_for_worker(&mut self.tx, id).await?)
    }

    async fn first_pool_candidate(
        &mut self,
        query: &CandidateQuery,
    ) -> Result<Option<Lead>, ApplicationError> {
        if query.campaigns.is_empty() {
            return Ok(None);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(LEAD_SELECT);
        builder.push(" WHERE w.id IS NULL AND l.campaign_id IN (");
        let mut campaigns = builder.separated(", ");
        for campaign in &query.campaigns {
            campaigns.push_bind(campaign.0.clone());
        }
        campaigns.push_unseparated(")");

        match query.states {
            StateFilter::Open => {
                builder.push(" AND (l.state IS NULL OR l.state = ");
                builder.push_bind(LeadState::NoContesta.as_str());
                builder.push(")");
            }
            StateFilter::NotResponding => {
                builder.push(" AND l.state = ");
                builder.push_bind(LeadState::NoContesta.as_str());
            }
        }

        match query.shift {
            Some(shift) => {
                builder.push(" AND l.shift = ");
                builder.push_bind(shift.as_str());
            }
            None => {
                builder.push(" AND l.shift IS NULL");
            }
        }

        if query.require_attachments {
            builder.push(" AND EXISTS (SELECT 1 FROM lead_document d WHERE d.lead_id = l.id)");
        }

        builder.push(match query.order {
            CandidateOrder::OldestFirst => " ORDER BY l.updated_at ASC, l.id ASC",
            CandidateOrder::RecentFirst => " ORDER BY l.updated_at DESC, l.id ASC",
            CandidateOrder::Any => " ORDER BY l.id ASC",
        });
        builder.push(" LIMIT 1");

        let row = builder
            .build()
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?;

        Ok(row.map(lead_from_row).transpose()?)
    }

    async fn set_current_lead(
        &mut self,
        worker_id: &WorkerId,
        lead_id: Option<&LeadId>,
    ) -> Result<(), ApplicationError> {
        let updated = match lead_id {
            Some(lead_id) => sqlx::query(
                "UPDATE worker SET current_lead_id = ? WHERE id = ? AND current_lead_id IS NULL",
            )
            .bind(&lead_id.0)
            .bind(&worker_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?,
            None => sqlx::query("UPDATE worker SET current_lead_id = NULL WHERE id = ?")
                .bind(&worker_id.0)
                .execute(&mut *self.tx)
                .await
                .map_err(RepositoryError::from)?,
        };

        if updated.rows_affected() == 0 {
            let known = sqlx::query("SELECT 1 FROM worker WHERE id = ?")
                .bind(&worker_id.0)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(RepositoryError::from)?
                .is_some();
            if !known {
                return Err(DomainError::WorkerNotFound(worker_id.clone()).into());
            }
            return Err(DomainError::InvariantViolation(format!(
                "worker {worker_id} cannot take a lead while holding another"
            ))
            .into());
        }
        Ok(())
    }

    async fn queue_head(
        &mut self,
        worker_id: &WorkerId,
    ) -> Result<Option<LeadQueueEntry>, ApplicationError> {
        let row = sqlx::query(&format!(
            "{QUEUE_SELECT} WHERE worker_id = ? ORDER BY position ASC LIMIT 1"
        ))
        .bind(&worker_id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(queue_entry_from_row).transpose()?)
    }

    async fn push_queue_entry(
        &mut self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
        created_at: DateTime<Utc>,
    ) -> Result<LeadQueueEntry, ApplicationError> {
        let positions =
            sqlx::query_scalar::<_, i64>("SELECT position FROM lead_queue WHERE worker_id = ?")
                .bind(&worker_id.0)
                .fetch_all(&mut *self.tx)
                .await
                .map_err(RepositoryError::from)?
                .into_iter()
                .map(|position| parse_u32("position", position))
                .collect::<Result<Vec<_>, _>>()?;

        let entry = LeadQueueEntry {
            id: LeadQueueEntryId(Uuid::new_v4().to_string()),
            worker_id: worker_id.clone(),
            lead_id: lead_id.clone(),
            position: next_position(positions),
            created_at,
        };
        insert_queue_entry(&mut self.tx, &entry).await?;
        Ok(entry)
    }

    async fn remove_queue_entry(
        &mut self,
        entry: &LeadQueueEntry,
    ) -> Result<(), ApplicationError> {
        sqlx::query("DELETE FROM lead_queue WHERE id = ?")
            .bind(&entry.id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?;

        sqlx::query(
            "UPDATE lead_queue SET position = position - 1 WHERE worker_id = ? AND position > ?",
        )
        .bind(&entry.worker_id.0)
        .bind(i64::from(entry.position))
        .execute(&mut *self.tx)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn count_logs(&mut self, lead_id: &LeadId) -> Result<u32, ApplicationError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lead_log WHERE lead_id = ?")
            .bind(&lead_id.0)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?;

        Ok(parse_u32("count", count)?)
    }

    async fn append_log(&mut self, log: &LeadLog) -> Result<(), ApplicationError> {
        Ok(insert_log(&mut self.tx, log).await?)
    }

    async fn update_disposition(
        &mut self,
        lead_id: &LeadId,
        state: Option<LeadState>,
        shift: Option<Shift>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let state = state.map(|state| state.as_str());
        let updated = match shift {
            Some(shift) => {
                sqlx::query("UPDATE lead SET state = ?, shift = ?, updated_at = ? WHERE id = ?")
                    .bind(state)
                    .bind(shift.as_str())
                    .bind(format_timestamp(updated_at))
                    .bind(&lead_id.0)
                    .execute(&mut *self.tx)
                    .await
            }
            None => sqlx::query("UPDATE lead SET state = ?, updated_at = ? WHERE id = ?")
                .bind(state)
                .bind(format_timestamp(updated_at))
                .bind(&lead_id.0)
                .execute(&mut *self.tx)
                .await,
        }
        .map_err(RepositoryError::from)?;

        if updated.rows_affected() == 0 {
            return Err(DomainError::LeadNotFound(lead_id.clone()).into());
        }
        Ok(())
    }

    async fn insert_scheduled_call(
        &mut self,
        call: &ScheduledCall,
    ) -> Result<(), ApplicationError> {
        Ok(insert_scheduled_call(&mut self.tx, call).await?)
    }

    async fn find_lead_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<Lead>, ApplicationError> {
        let row = sqlx::query(&format!("{LEAD_SELECT} WHERE l.external_id = ?"))
            .bind(external_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?;

        Ok(row.map(lead_from_row).transpose()?)
    }

    async fn phone_in_use(&mut self, phone: &str) -> Result<bool, ApplicationError> {
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM lead WHERE phone = ?)")
                .bind(phone)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(RepositoryError::from)?;

        Ok(exists == 1)
    }

    async fn insert_lead(&mut self, lead: &Lead) -> Result<(), ApplicationError> {
        Ok(insert_lead(&mut self.tx, lead).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), ApplicationError> {
        self.tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

#[async_trait]
impl LeadSeeder for SqlLeadStore {
    async fn seed_campaign(&self, campaign: &Campaign) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO campaign (id, name) VALUES (?, ?)")
            .bind(&campaign.id.0)
            .bind(&campaign.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn seed_group(&self, group: &Group) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO worker_group (id, name, shift) VALUES (?, ?, ?)")
            .bind(&group.id.0)
            .bind(&group.name)
            .bind(group.shift.as_str())
            .execute(&mut *tx)
            .await?;
        for campaign in &group.campaigns {
            sqlx::query("INSERT INTO group_campaign (group_id, campaign_id) VALUES (?, ?)")
                .bind(&group.id.0)
                .bind(&campaign.0)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn seed_lead(&self, lead: &Lead) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_lead(&mut conn, lead).await
    }

    async fn seed_worker(
        &self,
        worker: &Worker,
        memberships: &[GroupId],
    ) -> Result<(), RepositoryError> {
        let priorities = serde_json::to_string(&worker.priorities)
            .map_err(|error| RepositoryError::Decode(format!("priorities: {error}")))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO worker (
                id,
                name,
                group_id,
                parent_group_id,
                is_manager,
                priorities_json,
                current_lead_id
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&worker.id.0)
        .bind(&worker.name)
        .bind(&worker.group_id.0)
        .bind(worker.parent_group_id.as_ref().map(|group| group.0.as_str()))
        .bind(worker.is_manager)
        .bind(priorities)
        .bind(worker.current_lead.as_ref().map(|lead| lead.0.as_str()))
        .execute(&mut *tx)
        .await?;

        for group_id in memberships {
            sqlx::query("INSERT INTO group_member (group_id, worker_id) VALUES (?, ?)")
                .bind(&group_id.0)
                .bind(&worker.id.0)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn seed_document(&self, document: &LeadDocument) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lead_document (id, lead_id, file_name, uploaded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&document.id.0)
        .bind(&document.lead_id.0)
        .bind(&document.file_name)
        .bind(format_timestamp(document.uploaded_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn seed_log(&self, log: &LeadLog) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_log(&mut conn, log).await
    }

    async fn seed_queue_entry(&self, entry: &LeadQueueEntry) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_queue_entry(&mut conn, entry).await
    }

    async fn seed_scheduled_call(&self, call: &ScheduledCall) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_scheduled_call(&mut conn, call).await
    }

    async fn seed_share_grant(&self, grant: &ShareLeadGrant) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO share_lead_grant (grantor_id, grantee_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(&grant.grantor.0)
        .bind(&grant.grantee.0)
        .bind(format_timestamp(grant.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn fetch_worker(
    conn: &mut SqliteConnection,
    id: &WorkerId,
) -> Result<Option<Worker>, RepositoryError> {
    let row = sqlx::query(&format!("{WORKER_SELECT} WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(worker_from_row).transpose()
}

async fn fetch_lead(
    conn: &mut SqliteConnection,
    id: &LeadId,
) -> Result<Option<Lead>, RepositoryError> {
    let row = sqlx::query(&format!("{LEAD_SELECT} WHERE l.id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(lead_from_row).transpose()
}

async fn fetch_groups_for_worker(
    conn: &mut SqliteConnection,
    id: &WorkerId,
) -> Result<Vec<Group>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT g.id, g.name, g.shift
         FROM worker_group g
         JOIN group_member m ON m.group_id = g.id
         WHERE m.worker_id = ?
         ORDER BY g.id ASC",
    )
    .bind(&id.0)
    .fetch_all(&mut *conn)
    .await?;

    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        groups.push(group_with_campaigns(conn, row).await?);
    }
    Ok(groups)
}

async fn group_with_campaigns(
    conn: &mut SqliteConnection,
    row: SqliteRow,
) -> Result<Group, RepositoryError> {
    let id = GroupId(row.try_get("id")?);
    let shift_raw = row.try_get::<String, _>("shift")?;
    let shift = ShiftAffinity::parse(&shift_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown group shift `{shift_raw}`")))?;

    let campaigns = sqlx::query_scalar::<_, String>(
        "SELECT campaign_id FROM group_campaign WHERE group_id = ? ORDER BY campaign_id ASC",
    )
    .bind(&id.0)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(CampaignId)
    .collect();

    Ok(Group { id, name: row.try_get("name")?, shift, campaigns })
}

async fn insert_lead(conn: &mut SqliteConnection, lead: &Lead) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO lead (
            id,
            external_id,
            full_name,
            phone,
            email,
            state,
            shift,
            campaign_id,
            created_at,
            updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&lead.id.0)
    .bind(&lead.external_id)
    .bind(&lead.full_name)
    .bind(lead.phone.as_deref())
    .bind(lead.email.as_deref())
    .bind(lead.state.map(|state| state.as_str()))
    .bind(lead.shift.map(|shift| shift.as_str()))
    .bind(lead.campaign_id.as_ref().map(|campaign| campaign.0.as_str()))
    .bind(format_timestamp(lead.created_at))
    .bind(format_timestamp(lead.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_log(conn: &mut SqliteConnection, log: &LeadLog) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO lead_log (id, worker_id, lead_id, outcome, observations, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&log.id.0)
    .bind(&log.worker_id.0)
    .bind(&log.lead_id.0)
    .bind(&log.outcome)
    .bind(&log.observations)
    .bind(format_timestamp(log.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_queue_entry(
    conn: &mut SqliteConnection,
    entry: &LeadQueueEntry,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO lead_queue (id, worker_id, lead_id, position, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&entry.id.0)
    .bind(&entry.worker_id.0)
    .bind(&entry.lead_id.0)
    .bind(i64::from(entry.position))
    .bind(format_timestamp(entry.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_scheduled_call(
    conn: &mut SqliteConnection,
    call: &ScheduledCall,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO scheduled_call (id, worker_id, lead_id, subject, starts_at, notes, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&call.id.0)
    .bind(&call.worker_id.0)
    .bind(&call.lead_id.0)
    .bind(&call.subject)
    .bind(format_timestamp(call.starts_at))
    .bind(call.notes.as_deref())
    .bind(format_timestamp(call.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn lead_from_row(row: SqliteRow) -> Result<Lead, RepositoryError> {
    let state = row
        .try_get::<Option<String>, _>("state")?
        .map(|raw| {
            LeadState::parse(&raw)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown lead state `{raw}`")))
        })
        .transpose()?;
    let shift = row
        .try_get::<Option<String>, _>("shift")?
        .map(|raw| {
            Shift::parse(&raw)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown lead shift `{raw}`")))
        })
        .transpose()?;

    Ok(Lead {
        id: LeadId(row.try_get("id")?),
        external_id: row.try_get("external_id")?,
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        state,
        shift,
        campaign_id: row.try_get::<Option<String>, _>("campaign_id")?.map(CampaignId),
        holder: row.try_get::<Option<String>, _>("holder_id")?.map(WorkerId),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn worker_from_row(row: SqliteRow) -> Result<Worker, RepositoryError> {
    let priorities_raw = row.try_get::<String, _>("priorities_json")?;
    let priorities = serde_json::from_str::<Vec<String>>(&priorities_raw).map_err(|error| {
        RepositoryError::Decode(format!("invalid priorities_json `{priorities_raw}`: {error}"))
    })?;

    Ok(Worker {
        id: WorkerId(row.try_get("id")?),
        name: row.try_get("name")?,
        group_id: GroupId(row.try_get("group_id")?),
        parent_group_id: row.try_get::<Option<String>, _>("parent_group_id")?.map(GroupId),
        is_manager: row.try_get("is_manager")?,
        priorities,
        current_lead: row.try_get::<Option<String>, _>("current_lead_id")?.map(LeadId),
    })
}

fn queue_entry_from_row(row: SqliteRow) -> Result<LeadQueueEntry, RepositoryError> {
    Ok(LeadQueueEntry {
        id: LeadQueueEntryId(row.try_get("id")?),
        worker_id: WorkerId(row.try_get("worker_id")?),
        lead_id: LeadId(row.try_get("lead_id")?),
        position: parse_u32("position", row.try_get("position")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn log_from_row(row: SqliteRow) -> Result<LeadLog, RepositoryError> {
    Ok(LeadLog {
        id: LeadLogId(row.try_get("id")?),
        worker_id: WorkerId(row.try_get("worker_id")?),
        lead_id: LeadId(row.try_get("lead_id")?),
        outcome: row.try_get("outcome")?,
        observations: row.try_get("observations")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

/// Fixed-width UTC form so that text ordering matches time ordering.
fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

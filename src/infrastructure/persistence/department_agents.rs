use crate::domain::entities::{ClaimedAgent, DepartmentAgent, RotationPool};
use crate::domain::errors::DomainResult;
use crate::domain::ports::membership_repository::MembershipRepository;
use crate::infrastructure::persistence::{placeholders, Database};
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

const MEMBERSHIP_COLUMNS: &str = "da.id, da.department_id, da.agent_id, da.username,
     da.fairness_count, da.bot_fairness_count, da.sort_order, da.created_at, da.updated_at";

fn membership_from_row(row: &AnyRow) -> DomainResult<DepartmentAgent> {
    Ok(DepartmentAgent {
        id: row.try_get("id")?,
        department_id: row.try_get("department_id")?,
        agent_id: row.try_get("agent_id")?,
        username: row.try_get("username")?,
        fairness_count: row.try_get("fairness_count")?,
        bot_fairness_count: row.try_get("bot_fairness_count")?,
        order: row.try_get("sort_order")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Joins restricting `da` to members of a live department who can currently
/// take a conversation from `pool`. Binds one parameter: the capability.
fn eligible_member_joins(pool: RotationPool) -> String {
    let availability = if pool.requires_livechat_availability() {
        " AND a.livechat_status = 'available'"
    } else {
        ""
    };
    format!(
        "JOIN departments d ON d.id = da.department_id AND d.archived = 0
         JOIN agents a ON a.id = da.agent_id AND a.status <> 'offline'{}
         JOIN agent_capabilities c ON c.agent_id = a.id AND c.capability = ?",
        availability
    )
}

#[async_trait]
impl MembershipRepository for Database {
    async fn upsert_membership(&self, membership: &DepartmentAgent) -> DomainResult<DepartmentAgent> {
        let row = sqlx::query(
            "INSERT INTO department_agents
                (id, department_id, agent_id, username, fairness_count, bot_fairness_count,
                 sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(department_id, agent_id) DO UPDATE SET
                username = excluded.username,
                sort_order = excluded.sort_order,
                updated_at = excluded.updated_at
             RETURNING id, department_id, agent_id, username, fairness_count,
                bot_fairness_count, sort_order, created_at, updated_at",
        )
        .bind(&membership.id)
        .bind(&membership.department_id)
        .bind(&membership.agent_id)
        .bind(&membership.username)
        .bind(membership.fairness_count)
        .bind(membership.bot_fairness_count)
        .bind(membership.order)
        .bind(&membership.created_at)
        .bind(&membership.updated_at)
        .fetch_one(&self.pool)
        .await?;

        let stored = membership_from_row(&row)?;
        tracing::info!(
            "Agent {} ({}) serves department {} with order {}",
            stored.agent_id,
            stored.username,
            stored.department_id,
            stored.order
        );
        Ok(stored)
    }

    async fn remove_membership(&self, department_id: &str, agent_id: &str) -> DomainResult<bool> {
        let result =
            sqlx::query("DELETE FROM department_agents WHERE department_id = ? AND agent_id = ?")
                .bind(department_id)
                .bind(agent_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_agent_memberships(&self, agent_id: &str) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM department_agents WHERE agent_id = ?")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_by_department(&self, department_id: &str) -> DomainResult<Vec<DepartmentAgent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM department_agents da
             WHERE da.department_id = ?
             ORDER BY da.sort_order ASC, da.username ASC",
            MEMBERSHIP_COLUMNS
        ))
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(membership_from_row).collect()
    }

    async fn list_by_agent(&self, agent_id: &str) -> DomainResult<Vec<DepartmentAgent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM department_agents da
             WHERE da.agent_id = ?
             ORDER BY da.department_id ASC",
            MEMBERSHIP_COLUMNS
        ))
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(membership_from_row).collect()
    }

    async fn list_active_memberships(&self) -> DomainResult<Vec<DepartmentAgent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM department_agents da
             JOIN departments d ON d.id = da.department_id AND d.archived = 0
             ORDER BY da.agent_id ASC, da.department_id ASC",
            MEMBERSHIP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(membership_from_row).collect()
    }

    async fn list_eligible_for_department(
        &self,
        department_id: &str,
        pool: RotationPool,
    ) -> DomainResult<Vec<DepartmentAgent>> {
        let rows = sqlx::query(&format!(
            "SELECT {columns} FROM department_agents da
             {joins}
             WHERE da.department_id = ?
             ORDER BY da.{counter} ASC, da.sort_order ASC, da.username ASC",
            columns = MEMBERSHIP_COLUMNS,
            joins = eligible_member_joins(pool),
            counter = pool.membership_counter_column(),
        ))
        .bind(pool.capability().to_string())
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(membership_from_row).collect()
    }

    async fn claim_next_for_department(
        &self,
        department_id: &str,
        pool: RotationPool,
        candidate_agent_ids: &[String],
    ) -> DomainResult<Option<ClaimedAgent>> {
        if candidate_agent_ids.is_empty() {
            return Ok(None);
        }

        let counter = pool.membership_counter_column();
        // Ranking subquery and increment run as one statement: two concurrent
        // claims never return the same row at the same count.
        let sql = format!(
            "UPDATE department_agents SET {counter} = {counter} + 1, updated_at = ?
             WHERE id = (
                SELECT da.id FROM department_agents da
                {joins}
                WHERE da.department_id = ?
                  AND da.agent_id IN ({ids})
                ORDER BY da.{counter} ASC, da.sort_order ASC, da.username ASC
                LIMIT 1
             )
             RETURNING agent_id, username, {counter} AS count",
            counter = counter,
            joins = eligible_member_joins(pool),
            ids = placeholders(candidate_agent_ids.len()),
        );

        let now = chrono::Utc::now().to_rfc3339();
        let mut query = sqlx::query(&sql)
            .bind(now)
            .bind(pool.capability().to_string())
            .bind(department_id);
        for agent_id in candidate_agent_ids {
            query = query.bind(agent_id);
        }

        let row = query.fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(ClaimedAgent {
                agent_id: row.try_get("agent_id")?,
                username: row.try_get("username")?,
                count: row.try_get("count")?,
            })),
            None => Ok(None),
        }
    }

    async fn list_queue(&self, usernames: &[String]) -> DomainResult<Vec<DepartmentAgent>> {
        let filter = if usernames.is_empty() {
            String::new()
        } else {
            format!("WHERE da.username IN ({})", placeholders(usernames.len()))
        };

        let sql = format!(
            "SELECT {} FROM department_agents da
             JOIN departments d ON d.id = da.department_id AND d.archived = 0
             {}
             ORDER BY da.department_id ASC, da.fairness_count ASC, da.sort_order ASC, da.username ASC",
            MEMBERSHIP_COLUMNS, filter
        );

        let mut query = sqlx::query(&sql);
        for username in usernames {
            query = query.bind(username);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(membership_from_row).collect()
    }

    async fn rename_agent(&self, agent_id: &str, username: &str) -> DomainResult<u64> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE department_agents SET username = ?, updated_at = ? WHERE agent_id = ?",
        )
        .bind(username)
        .bind(&now)
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn reset_counts(&self, department_id: &str) -> DomainResult<u64> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE department_agents
             SET fairness_count = 0, bot_fairness_count = 0, updated_at = ?
             WHERE department_id = ?",
        )
        .bind(&now)
        .bind(department_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "Fairness counters reset for department {} ({} memberships)",
            department_id,
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }
}

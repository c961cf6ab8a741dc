use crate::domain::entities::{
    Agent, AgentAvailabilityUpdate, AgentStatusSummary, Capability, ClaimedAgent, PresenceStatus, RotationPool,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::agent_repository::AgentRepository;
use crate::infrastructure::persistence::{placeholders, Database};
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

const AGENT_COLUMNS: &str = "a.id, a.username, a.status, a.livechat_status, a.open_business_hours,
     a.routing_count, a.bot_routing_count, a.created_at, a.updated_at,
     (SELECT GROUP_CONCAT(c.capability) FROM agent_capabilities c WHERE c.agent_id = a.id) AS capabilities";

fn agent_from_row(row: &AnyRow) -> DomainResult<Agent> {
    let status: String = row.try_get("status")?;
    let livechat_status: String = row.try_get("livechat_status")?;
    let open_business_hours: String = row.try_get("open_business_hours")?;
    let capabilities: Option<String> = row.try_get("capabilities").ok().flatten();

    let mut capabilities = capabilities
        .unwrap_or_default()
        .split(',')
        .filter(|c| !c.is_empty())
        .map(|c| c.parse::<Capability>().map_err(DomainError::Internal))
        .collect::<DomainResult<Vec<_>>>()?;
    capabilities.sort_by_key(|c| c.to_string());

    Ok(Agent {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        status: status.parse().map_err(DomainError::Internal)?,
        livechat_status: livechat_status.parse().map_err(DomainError::Internal)?,
        open_business_hours: serde_json::from_str(&open_business_hours).map_err(|e| {
            DomainError::Internal(format!("Failed to deserialize open business hours: {}", e))
        })?,
        capabilities,
        routing_count: row.try_get("routing_count")?,
        bot_routing_count: row.try_get("bot_routing_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Extra WHERE clause restricting `a` to agents eligible for `pool`
fn eligibility_clause(pool: RotationPool) -> &'static str {
    if pool.requires_livechat_availability() {
        "a.status <> 'offline' AND a.livechat_status = 'available'"
    } else {
        "a.status <> 'offline'"
    }
}

#[async_trait]
impl AgentRepository for Database {
    async fn upsert_agent(&self, agent: &Agent) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO agents (id, username, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                status = excluded.status,
                updated_at = excluded.updated_at",
        )
        .bind(&agent.id)
        .bind(&agent.username)
        .bind(agent.status.to_string())
        .bind(&agent.created_at)
        .bind(&agent.updated_at)
        .execute(&mut *tx)
        .await?;

        // The directory is authoritative for capabilities
        sqlx::query("DELETE FROM agent_capabilities WHERE agent_id = ?")
            .bind(&agent.id)
            .execute(&mut *tx)
            .await?;

        for capability in &agent.capabilities {
            sqlx::query(
                "INSERT OR IGNORE INTO agent_capabilities (agent_id, capability, created_at)
                 VALUES (?, ?, ?)",
            )
            .bind(&agent.id)
            .bind(capability.to_string())
            .bind(&agent.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Agent upserted: id={}, username={}", agent.id, agent.username);
        Ok(())
    }

    async fn get_agent(&self, agent_id: &str) -> DomainResult<Option<Agent>> {
        let row = sqlx::query(&format!("SELECT {} FROM agents a WHERE a.id = ?", AGENT_COLUMNS))
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn list_agents(&self) -> DomainResult<Vec<Agent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM agents a ORDER BY a.username",
            AGENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn set_presence(&self, agent_id: &str, status: PresenceStatus) -> DomainResult<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE agents SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(&now)
            .bind(agent_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn rename_agent(&self, agent_id: &str, username: &str) -> DomainResult<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE agents SET username = ?, updated_at = ? WHERE id = ?")
            .bind(username)
            .bind(&now)
            .bind(agent_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn grant_capability(&self, agent_id: &str, capability: Capability) -> DomainResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT OR IGNORE INTO agent_capabilities (agent_id, capability, created_at)
             VALUES (?, ?, ?)",
        )
        .bind(agent_id)
        .bind(capability.to_string())
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_capability(&self, agent_id: &str, capability: Capability) -> DomainResult<bool> {
        let result =
            sqlx::query("DELETE FROM agent_capabilities WHERE agent_id = ? AND capability = ?")
                .bind(agent_id)
                .bind(capability.to_string())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_livechat_agents(&self) -> DomainResult<Vec<Agent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM agents a
             WHERE EXISTS (
                SELECT 1 FROM agent_capabilities c
                WHERE c.agent_id = a.id AND c.capability = ?
             )
             ORDER BY a.username",
            AGENT_COLUMNS
        ))
        .bind(Capability::LivechatAgent.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn count_agents_status(
        &self,
        department_id: Option<&str>,
    ) -> DomainResult<AgentStatusSummary> {
        let department_filter = if department_id.is_some() {
            "WHERE EXISTS (
                SELECT 1 FROM department_agents d
                WHERE d.agent_id = a.id AND d.department_id = ?
             )"
        } else {
            ""
        };

        let sql = format!(
            "SELECT
                COALESCE(SUM(CASE WHEN a.livechat_status = 'available' AND a.status = 'online'
                    THEN 1 ELSE 0 END), 0) AS available,
                COALESCE(SUM(CASE WHEN a.livechat_status = 'available' AND a.status = 'away'
                    THEN 1 ELSE 0 END), 0) AS away,
                COALESCE(SUM(CASE WHEN a.livechat_status = 'available' AND a.status = 'busy'
                    THEN 1 ELSE 0 END), 0) AS busy,
                COALESCE(SUM(CASE WHEN a.livechat_status = 'not-available' OR a.status = 'offline'
                    THEN 1 ELSE 0 END), 0) AS offline
             FROM agents a
             JOIN agent_capabilities c ON c.agent_id = a.id AND c.capability = ?
             {department_filter}",
            department_filter = department_filter,
        );

        let mut query = sqlx::query(&sql).bind(Capability::LivechatAgent.to_string());
        if let Some(department_id) = department_id {
            query = query.bind(department_id);
        }
        let row = query.fetch_one(&self.pool).await?;

        Ok(AgentStatusSummary {
            available: row.try_get("available")?,
            away: row.try_get("away")?,
            busy: row.try_get("busy")?,
            offline: row.try_get("offline")?,
        })
    }

    async fn list_eligible_agents(&self, pool: RotationPool) -> DomainResult<Vec<Agent>> {
        let counter = pool.agent_counter_column();
        let rows = sqlx::query(&format!(
            "SELECT {columns} FROM agents a
             JOIN agent_capabilities ec ON ec.agent_id = a.id AND ec.capability = ?
             WHERE {eligible}
             ORDER BY a.{counter} ASC, a.username ASC",
            columns = AGENT_COLUMNS,
            eligible = eligibility_clause(pool),
            counter = counter,
        ))
        .bind(pool.capability().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn claim_next_agent(
        &self,
        pool: RotationPool,
        candidate_ids: &[String],
    ) -> DomainResult<Option<ClaimedAgent>> {
        if candidate_ids.is_empty() {
            return Ok(None);
        }

        let counter = pool.agent_counter_column();
        // Selection and increment in one statement; eligibility is re-checked
        // inside the subquery so a candidate that went away is skipped.
        let sql = format!(
            "UPDATE agents SET {counter} = {counter} + 1, updated_at = ?
             WHERE id = (
                SELECT a.id FROM agents a
                JOIN agent_capabilities c ON c.agent_id = a.id AND c.capability = ?
                WHERE {eligible}
                  AND a.id IN ({ids})
                ORDER BY a.{counter} ASC, a.username ASC
                LIMIT 1
             )
             RETURNING id, username, {counter} AS count",
            counter = counter,
            eligible = eligibility_clause(pool),
            ids = placeholders(candidate_ids.len()),
        );

        let now = chrono::Utc::now().to_rfc3339();
        let mut query = sqlx::query(&sql)
            .bind(now)
            .bind(pool.capability().to_string());
        for id in candidate_ids {
            query = query.bind(id);
        }

        let row = query.fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(ClaimedAgent {
                agent_id: row.try_get("id")?,
                username: row.try_get("username")?,
                count: row.try_get("count")?,
            })),
            None => Ok(None),
        }
    }

    async fn update_availability(&self, updates: &[AgentAvailabilityUpdate]) -> DomainResult<u64> {
        if updates.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut changed = 0;

        for update in updates {
            let open_business_hours = serde_json::to_string(&update.open_business_hours)
                .map_err(|e| {
                    DomainError::Internal(format!("Failed to serialize open business hours: {}", e))
                })?;
            let status = update.livechat_status.to_string();

            // Guarded so an unchanged agent is never rewritten
            let result = sqlx::query(
                "UPDATE agents
                 SET livechat_status = ?, open_business_hours = ?, updated_at = ?
                 WHERE id = ? AND (livechat_status <> ? OR open_business_hours <> ?)",
            )
            .bind(&status)
            .bind(&open_business_hours)
            .bind(&now)
            .bind(&update.agent_id)
            .bind(&status)
            .bind(&open_business_hours)
            .execute(&mut *tx)
            .await?;

            changed += result.rows_affected();
        }

        tx.commit().await?;
        Ok(changed)
    }
}

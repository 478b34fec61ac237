use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use supportflow_core::domain::history::HistoricalTicket;

use super::{HistoricalTicketRepository, RepositoryError};
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlHistoricalTicketRepository {
    pool: DbPool,
}

impl SqlHistoricalTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_u32(row: &SqliteRow, column: &str) -> Result<u32, RepositoryError> {
    let value: i64 = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    u32::try_from(value).map_err(|_| RepositoryError::Decode(format!("{column} out of range: {value}")))
}

fn row_to_ticket(row: &SqliteRow) -> Result<HistoricalTicket, RepositoryError> {
    let ticket_id: String =
        row.try_get("ticket_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let issue_type: String =
        row.try_get("issue_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let assigned_team: String =
        row.try_get("assigned_team").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String = row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let priority: String =
        row.try_get("priority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_type: String =
        row.try_get("customer_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let resolution_details: String =
        row.try_get("resolution_details").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_date_str: String =
        row.try_get("created_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let satisfaction = decode_u32(row, "customer_satisfaction")?;

    let created_date = NaiveDate::parse_from_str(&created_date_str, DATE_FORMAT)
        .map_err(|e| RepositoryError::Decode(format!("ticket `{ticket_id}` created_date: {e}")))?;

    Ok(HistoricalTicket {
        first_response_time_minutes: decode_u32(row, "first_response_time_minutes")?,
        resolution_time_hours: decode_u32(row, "resolution_time_hours")?,
        customer_satisfaction: u8::try_from(satisfaction)
            .map_err(|_| RepositoryError::Decode(format!("satisfaction out of range: {satisfaction}")))?,
        ticket_id,
        issue_type,
        assigned_team,
        status,
        priority,
        customer_type,
        resolution_details,
        created_date,
    })
}

#[async_trait::async_trait]
impl HistoricalTicketRepository for SqlHistoricalTicketRepository {
    async fn save_all(&self, tickets: &[HistoricalTicket]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for ticket in tickets {
            sqlx::query(
                "INSERT INTO historical_tickets (ticket_id, issue_type, assigned_team, status, priority,
                                                 customer_type, first_response_time_minutes,
                                                 resolution_time_hours, resolution_details,
                                                 customer_satisfaction, created_date)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(ticket_id) DO UPDATE SET
                     issue_type = excluded.issue_type,
                     assigned_team = excluded.assigned_team,
                     status = excluded.status,
                     priority = excluded.priority,
                     customer_type = excluded.customer_type,
                     first_response_time_minutes = excluded.first_response_time_minutes,
                     resolution_time_hours = excluded.resolution_time_hours,
                     resolution_details = excluded.resolution_details,
                     customer_satisfaction = excluded.customer_satisfaction,
                     created_date = excluded.created_date",
            )
            .bind(&ticket.ticket_id)
            .bind(&ticket.issue_type)
            .bind(&ticket.assigned_team)
            .bind(&ticket.status)
            .bind(&ticket.priority)
            .bind(&ticket.customer_type)
            .bind(i64::from(ticket.first_response_time_minutes))
            .bind(i64::from(ticket.resolution_time_hours))
            .bind(&ticket.resolution_details)
            .bind(i64::from(ticket.customer_satisfaction))
            .bind(ticket.created_date.format(DATE_FORMAT).to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_issue_type(
        &self,
        issue_type: &str,
        limit: u32,
    ) -> Result<Vec<HistoricalTicket>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT ticket_id, issue_type, assigned_team, status, priority, customer_type,
                    first_response_time_minutes, resolution_time_hours, resolution_details,
                    customer_satisfaction, created_date
             FROM historical_tickets
             WHERE issue_type = ? COLLATE NOCASE
             ORDER BY created_date DESC, ticket_id ASC
             LIMIT ?",
        )
        .bind(issue_type)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_ticket).collect::<Result<Vec<_>, _>>()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM historical_tickets").fetch_one(&self.pool).await?;
        u64::try_from(count).map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::session::{ConversationSession, ConversationTurn};

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn load_active(
        &self,
        customer_id: &CustomerId,
        now: DateTime<Utc>,
    ) -> Result<Option<ConversationSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                customer_id,
                turn_sequence,
                history_json,
                expires_at,
                active_collaborator
             FROM conversation_session
             WHERE customer_id = ?",
        )
        .bind(&customer_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let session = match row.map(session_from_row).transpose()? {
            Some(session) => session,
            None => return Ok(None),
        };

        // Expired rows read as absent; no sweeper deletes them.
        if session.is_expired(now) {
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn last_turn_sequence(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<u64>, RepositoryError> {
        let row = sqlx::query(
            "SELECT turn_sequence FROM conversation_session WHERE customer_id = ?",
        )
        .bind(&customer_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get::<i64, _>("turn_sequence") as u64))
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), RepositoryError> {
        let history_json = serde_json::to_string(&session.history)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO conversation_session (
                customer_id,
                turn_sequence,
                history_json,
                expires_at,
                active_collaborator
             ) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(customer_id) DO UPDATE SET
                turn_sequence = excluded.turn_sequence,
                history_json = excluded.history_json,
                expires_at = excluded.expires_at,
                active_collaborator = excluded.active_collaborator",
        )
        .bind(&session.customer_id.0)
        .bind(session.turn_sequence as i64)
        .bind(history_json)
        .bind(session.expires_at.to_rfc3339())
        .bind(session.active_collaborator.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn session_from_row(row: SqliteRow) -> Result<ConversationSession, RepositoryError> {
    let history: Vec<ConversationTurn> =
        serde_json::from_str(&row.get::<String, _>("history_json"))
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    let expires_at = parse_timestamp(&row.get::<String, _>("expires_at"))?;

    Ok(ConversationSession {
        customer_id: CustomerId(row.get::<String, _>("customer_id")),
        turn_sequence: row.get::<i64, _>("turn_sequence") as u64,
        history,
        expires_at,
        active_collaborator: row.get::<Option<String>, _>("active_collaborator"),
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{value}`: {error}")))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use wattson_core::domain::customer::CustomerId;
    use wattson_core::domain::session::{ConversationSession, ConversationTurn};

    use crate::repositories::{SessionRepository, SqlSessionRepository};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlSessionRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlSessionRepository::new(pool)
    }

    fn session_with_turn(customer: &str) -> ConversationSession {
        let now = Utc::now();
        let mut session = ConversationSession::start(CustomerId(customer.to_string()), now, 1800);
        session.append(ConversationTurn::user("what is my forecast?", now));
        session.append(ConversationTurn::agent("forecast", "about 540 kWh", now));
        session.touch(now, 1800);
        session
    }

    #[tokio::test]
    async fn save_and_load_round_trips_history() {
        let repo = repository().await;
        let session = session_with_turn("C1");

        repo.save(&session).await.expect("save");
        let loaded = repo
            .load_active(&session.customer_id, Utc::now())
            .await
            .expect("load")
            .expect("session should be live");

        assert_eq!(loaded.history, session.history);
        assert_eq!(loaded.turn_sequence, 1);
        assert_eq!(loaded.active_collaborator, None);
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent() {
        let repo = repository().await;
        let session = session_with_turn("C1");
        repo.save(&session).await.expect("save");

        let after_expiry = Utc::now() + Duration::seconds(1801);
        let loaded = repo.load_active(&session.customer_id, after_expiry).await.expect("load");

        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn last_turn_sequence_survives_expiry() {
        let repo = repository().await;
        let session = session_with_turn("C1");
        repo.save(&session).await.expect("save");

        let after_expiry = Utc::now() + Duration::seconds(1801);
        assert_eq!(repo.load_active(&session.customer_id, after_expiry).await.expect("load"), None);
        assert_eq!(
            repo.last_turn_sequence(&session.customer_id).await.expect("sequence"),
            Some(1)
        );
    }

    #[tokio::test]
    async fn save_is_last_write_wins() {
        let repo = repository().await;
        let first = session_with_turn("C1");
        let mut second = session_with_turn("C1");
        second.append(ConversationTurn::user("and my solar ticket?", Utc::now()));
        second.touch(Utc::now(), 1800);

        repo.save(&first).await.expect("save first");
        repo.save(&second).await.expect("save second");

        let loaded = repo
            .load_active(&first.customer_id, Utc::now())
            .await
            .expect("load")
            .expect("session should be live");
        assert_eq!(loaded.turn_sequence, second.turn_sequence);
        assert_eq!(loaded.history.len(), 3);
    }
}

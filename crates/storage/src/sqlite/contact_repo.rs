use pylearn_core::model::{ContactMessage, MessageId, NewContactMessage};

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u32, id_i64, map_message_row, message_id_from_i64};
use crate::repository::{ContactRepository, StorageError};

#[async_trait::async_trait]
impl ContactRepository for SqliteRepository {
    async fn insert_message(
        &self,
        message: NewContactMessage,
    ) -> Result<ContactMessage, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO contact_messages (name, email, subject, message, sent_at, is_read)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            ",
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.subject)
        .bind(&message.message)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(message.assign_id(message_id_from_i64(res.last_insert_rowid())?))
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, email, subject, message, sent_at, is_read
            FROM contact_messages
            ORDER BY is_read ASC, sent_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_message_row).collect()
    }

    async fn unread_count(&self) -> Result<u32, StorageError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE is_read = 0")
                .fetch_one(&self.pool)
                .await
                .map_err(conn)?;
        i64_to_u32("unread_count", count)
    }

    async fn toggle_read(&self, id: MessageId) -> Result<bool, StorageError> {
        let is_read: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE contact_messages
            SET is_read = 1 - is_read
            WHERE id = ?1
            RETURNING is_read
            ",
        )
        .bind(id_i64("message_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        is_read.map(|v| v == 1).ok_or(StorageError::NotFound)
    }

    async fn delete_message(&self, id: MessageId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM contact_messages WHERE id = ?1")
            .bind(id_i64("message_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

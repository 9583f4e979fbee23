use pylearn_core::model::{NewUser, User, UserId};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, conn, id_i64, map_user_row, user_id_from_i64, write_err};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (name, email, password_hash, is_admin)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(user.name())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(bool_to_i64(user.is_admin()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(user.assign_id(user_id_from_i64(res.last_insert_rowid())?))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, password_hash, is_admin
            FROM users WHERE id = ?1
            ",
        )
        .bind(id_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, password_hash, is_admin
            FROM users WHERE email = ?1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE users
            SET name = ?2, email = ?3, password_hash = ?4, is_admin = ?5
            WHERE id = ?1
            ",
        )
        .bind(id_i64("user_id", user.id().value())?)
        .bind(user.name())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(bool_to_i64(user.is_admin()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, email, password_hash, is_admin
            FROM users
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_user_row).collect()
    }
}

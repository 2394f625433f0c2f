//! User records for registration and login.

use super::Database;
use crate::error::{AuthError, Result, TaskError};
use crate::types::User;
use rusqlite::{OptionalExtension, ffi, params};
use tracing::info;

/// A second row for an existing username hits the primary key.
fn is_duplicate_username(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

impl Database {
    /// Store a new user. Usernames are unique.
    pub fn insert_user(&self, user: &User) -> std::result::Result<(), AuthError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, fullname, email, password, salt)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &user.username,
                    &user.fullname,
                    &user.email,
                    &user.password_hash,
                    &user.salt,
                ],
            )
            .map_err(|err| {
                if is_duplicate_username(&err) {
                    AuthError::UserExists(user.username.clone())
                } else {
                    AuthError::Store(TaskError::from(err))
                }
            })
        })?;

        info!(username = %user.username, "Registered user");
        Ok(())
    }

    /// Look up a user by name.
    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT username, fullname, email, password, salt
                     FROM users WHERE username = ?1",
                    params![username],
                    |row| {
                        Ok(User {
                            username: row.get(0)?,
                            fullname: row.get(1)?,
                            email: row.get(2)?,
                            password_hash: row.get(3)?,
                            salt: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
    }
}

use std::sync::Arc;

use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::database::Database;
use crate::errors::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Registered,
    LoggedIn,
    WrongPassword,
}

impl AuthOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            AuthOutcome::Registered => "Registration successful!",
            AuthOutcome::LoggedIn => "Login successful!",
            AuthOutcome::WrongPassword => "Wrong password. Please try again.",
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, AuthOutcome::WrongPassword)
    }
}

/// Lowercase hex SHA-256 of the UTF-8 password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Unknown logins are registered on the spot; known ones must match the stored hash.
    pub fn authenticate_or_register(&self, login: &str, password: &str) -> StoreResult<AuthOutcome> {
        let password_hash = hash_password(password);

        let mut conn = self.db.connection()?;
        let tx = conn.transaction()?;

        let stored: Option<String> = tx
            .query_row("SELECT password FROM users WHERE login = ?1", [login], |row| row.get(0))
            .optional()?;

        let outcome = match stored {
            None => {
                tx.execute(
                    "INSERT INTO users (login, password) VALUES (?1, ?2)",
                    params![login, password_hash],
                )?;
                AuthOutcome::Registered
            }
            Some(stored) if stored == password_hash => AuthOutcome::LoggedIn,
            Some(_) => AuthOutcome::WrongPassword,
        };
        tx.commit()?;

        match outcome {
            AuthOutcome::Registered => info!("Registered new user {}", login),
            AuthOutcome::LoggedIn => info!("User {} logged in", login),
            AuthOutcome::WrongPassword => warn!("Wrong password for user {}", login),
        }

        Ok(outcome)
    }
}

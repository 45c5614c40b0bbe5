//! SurrealDB implementation of [`AccountRepository`].
//!
//! Passwords are hashed with Argon2id (memory: 19 MiB, iterations: 2,
//! parallelism: 1) and a random salt per hash. Accounts created by the
//! identity bridge never see their initial password; it only exists so
//! the account could later opt into a native login.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::account::{Account, CreateAccount, UpdateAccount};
use huddle_core::repository::{AccountRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, acl_from_value, acl_to_value, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AccountRowWithId {
    record_id: String,
    username: String,
    email: String,
    display_name: String,
    password_hash: String,
    login_key: Option<String>,
    login_expires_at: Option<DateTime<Utc>>,
    acl: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRowWithId {
    fn try_into_account(self) -> Result<Account, DbError> {
        Ok(Account {
            id: parse_uuid("account", &self.record_id)?,
            username: self.username,
            email: self.email,
            display_name: self.display_name,
            password_hash: self.password_hash,
            login_key: self.login_key,
            login_expires_at: self.login_expires_at,
            acl: acl_from_value(self.acl)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn hash_password(password: &str) -> Result<String, DbError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::decode("account", format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::decode("account", format!("password hash: {e}")))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the Account repository.
#[derive(Clone)]
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_one(&self, id: &str) -> Result<Option<Account>, DbError> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('account', $id)")
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<AccountRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|r| r.try_into_account())
            .transpose()
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn create(&self, input: CreateAccount) -> HuddleResult<Account> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let password_hash = hash_password(&input.password)?;

        self.db
            .query(
                "CREATE type::record('account', $id) SET \
                 username = $username, email = $email, \
                 display_name = $display_name, \
                 password_hash = $password_hash",
            )
            .bind(("id", id_str.clone()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("display_name", input.display_name))
            .bind(("password_hash", password_hash))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("account", e))?;

        Ok(self
            .select_one(&id_str)
            .await?
            .ok_or_else(|| DbError::not_found("account", &id_str))?)
    }

    async fn get_by_id(&self, id: Uuid) -> HuddleResult<Account> {
        let id_str = id.to_string();
        Ok(self
            .select_one(&id_str)
            .await?
            .ok_or_else(|| DbError::not_found("account", &id_str))?)
    }

    async fn find_by_email(&self, email: &str) -> HuddleResult<Option<Account>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM account \
                 WHERE email = $email LIMIT 1",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.try_into_account())
            .transpose()?)
    }

    async fn update(&self, id: Uuid, input: UpdateAccount) -> HuddleResult<Account> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.acl.is_some() {
            sets.push("acl = $acl");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('account', $id) SET {}",
            sets.join(", ")
        );
        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(ref acl) = input.acl {
            builder = builder.bind(("acl", acl_to_value(acl)?));
        }

        builder
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("account", e))?;

        Ok(self
            .select_one(&id_str)
            .await?
            .ok_or_else(|| DbError::not_found("account", &id_str))?)
    }

    async fn set_login_key(
        &self,
        id: Uuid,
        login_key: &str,
        expires_at: DateTime<Utc>,
    ) -> HuddleResult<()> {
        let id_str = id.to_string();

        self.db
            .query(
                "UPDATE type::record('account', $id) SET \
                 login_key = $login_key, login_expires_at = $expires_at, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("login_key", login_key.to_string()))
            .bind(("expires_at", expires_at))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("account", e))?;

        match self.select_one(&id_str).await? {
            Some(_) => Ok(()),
            None => Err(DbError::not_found("account", &id_str).into()),
        }
    }

    async fn list(&self, pagination: Pagination) -> HuddleResult<PaginatedResult<Account>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM account GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM account \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_account())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

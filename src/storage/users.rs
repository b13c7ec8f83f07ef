//! User store
//!
//! Account CRUD plus the subscription counters the admin dashboard reads.

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use uuid::Uuid;

use super::database::Database;
use crate::types::{Result, ResultExt, Role, ScribeError, SubscriptionPlan, User};

/// Subscription values the dashboard counts as paying.
///
/// The write path only ever produces "Free"/"Premium"; the extra variants
/// match legacy rows that predate that constraint. Kept deliberately distinct
/// from `SubscriptionPlan` until product decides which list is authoritative.
pub const PREMIUM_VARIANTS: &[&str] = &["Premium", "Pro", "premium", "pro", "yearly", "monthly"];

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| ScribeError::Storage(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| ScribeError::Storage(format!("Invalid UUID '{}': {}", value, e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn build_user(
    (id, name, email, password_hash, role, subscription, created_at, updated_at): (
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
    ),
) -> Result<User> {
    Ok(User {
        id: parse_uuid(&id)?,
        name,
        email,
        password_hash,
        role: role
            .parse::<Role>()
            .map_err(ScribeError::Storage)?,
        subscription,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, subscription, created_at, updated_at";

impl Database {
    /// Insert a new account. Email uniqueness violations surface as Conflict.
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let email = email.trim().to_lowercase();

        let inserted = self.conn()?.execute(
            &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                id.to_string(),
                name.trim(),
                email,
                password_hash,
                role.to_string(),
                SubscriptionPlan::Free.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        );

        match inserted {
            Ok(_) => self
                .find_user_by_id(id)?
                .ok_or_else(|| ScribeError::Storage("User vanished after insert".to_string())),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(ScribeError::Conflict("User already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .with_context("Failed to prepare user lookup")?;

        let mut rows = stmt.query_map(params![id.to_string()], user_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(build_user(row?)?)),
            None => Ok(None),
        }
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))
            .with_context("Failed to prepare user lookup")?;

        let normalized = email.trim().to_lowercase();
        let mut rows = stmt.query_map(params![normalized], user_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(build_user(row?)?)),
            None => Ok(None),
        }
    }

    /// All accounts, most recently created first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
            ))
            .with_context("Failed to prepare user listing")?;

        let rows: Vec<_> = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(build_user).collect()
    }

    /// Update an account's subscription. Only the constrained plan enum is
    /// accepted here; legacy variant values cannot be written back.
    pub fn update_subscription(&self, id: Uuid, plan: SubscriptionPlan) -> Result<Option<User>> {
        let changed = self.conn()?.execute(
            "UPDATE users SET subscription = ?1, updated_at = ?2 WHERE id = ?3",
            params![plan.to_string(), Utc::now().to_rfc3339(), id.to_string()],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        self.find_user_by_id(id)
    }

    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .with_context("Failed to count users")
    }

    /// Paying users per the dashboard's loose matching (see PREMIUM_VARIANTS).
    pub fn count_premium_variants(&self) -> Result<i64> {
        let placeholders = PREMIUM_VARIANTS
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        let conn = self.conn()?;
        let params_vec: Vec<&dyn rusqlite::ToSql> = PREMIUM_VARIANTS
            .iter()
            .map(|v| v as &dyn rusqlite::ToSql)
            .collect();

        conn.query_row(
            &format!("SELECT COUNT(*) FROM users WHERE subscription IN ({placeholders})"),
            params_vec.as_slice(),
            |row| row.get(0),
        )
        .with_context("Failed to count premium users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_create_and_find_user() {
        let db = test_db();
        let user = db
            .create_user("Ada", "Ada@Example.com ", "$2b$10$hash", Role::User)
            .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.subscription, "Free");

        let found = db.find_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let db = test_db();
        db.create_user("Ada", "ada@example.com", "h1", Role::User)
            .unwrap();
        let err = db
            .create_user("Other", "ada@example.com", "h2", Role::User)
            .unwrap_err();
        assert!(matches!(err, ScribeError::Conflict(_)));
    }

    #[test]
    fn test_list_users_newest_first() {
        let db = test_db();
        db.create_user("First", "first@example.com", "h", Role::User)
            .unwrap();
        db.create_user("Second", "second@example.com", "h", Role::Admin)
            .unwrap();

        let users = db.list_users().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].created_at >= users[1].created_at);
    }

    #[test]
    fn test_update_subscription() {
        let db = test_db();
        let user = db
            .create_user("Ada", "ada@example.com", "h", Role::User)
            .unwrap();

        let updated = db
            .update_subscription(user.id, SubscriptionPlan::Premium)
            .unwrap()
            .unwrap();
        assert_eq!(updated.subscription, "Premium");

        let missing = db
            .update_subscription(Uuid::new_v4(), SubscriptionPlan::Premium)
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_premium_variant_counting_vs_constrained_writes() {
        let db = test_db();
        let a = db
            .create_user("A", "a@example.com", "h", Role::User)
            .unwrap();
        db.create_user("B", "b@example.com", "h", Role::User)
            .unwrap();
        db.update_subscription(a.id, SubscriptionPlan::Premium)
            .unwrap();

        // Legacy rows can carry variants the write path no longer accepts
        db.conn()
            .unwrap()
            .execute(
                "UPDATE users SET subscription = 'yearly' WHERE email = 'b@example.com'",
                [],
            )
            .unwrap();

        assert_eq!(db.count_premium_variants().unwrap(), 2);
        assert_eq!(db.count_users().unwrap(), 2);
    }
}

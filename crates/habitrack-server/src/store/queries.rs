//! Single-purpose queries over the users/habits tables.

use habitrack_core::error::{HabitError, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl User {
    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get("id")?,
            name: r.get("name")?,
            email: r.get("email")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub last_mark: Option<String>,
    pub streak: i64,
}

impl Habit {
    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get("id")?,
            name: r.get("name")?,
            owner_id: r.get("owner_id")?,
            last_mark: r.get("last_mark")?,
            streak: r.get("streak")?,
        })
    }
}

fn internal(e: rusqlite::Error) -> HabitError {
    HabitError::Internal(format!("sqlite: {e}"))
}

fn is_constraint(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation)
}

fn user_not_found(id: i64) -> HabitError {
    HabitError::NotFound(format!("User with id {id} not found"))
}

fn habit_not_found(id: i64) -> HabitError {
    HabitError::NotFound(format!("Habit with id {id} not found"))
}

const HABIT_COLUMNS: &str = "id, name, owner_id, last_mark, streak";

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare("SELECT id, name, email FROM users ORDER BY id")
        .map_err(internal)?;
    let rows = stmt.query_map([], User::from_row).map_err(internal)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(internal)
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User> {
    conn.query_row(
        "SELECT id, name, email FROM users WHERE id = ?1",
        params![id],
        User::from_row,
    )
    .optional()
    .map_err(internal)?
    .ok_or_else(|| user_not_found(id))
}

pub fn create_user(conn: &Connection, name: &str, email: &str) -> Result<User> {
    conn.query_row(
        "INSERT INTO users (name, email) VALUES (?1, ?2) RETURNING id, name, email",
        params![name, email],
        User::from_row,
    )
    .map_err(|e| {
        if is_constraint(&e) {
            HabitError::Conflict("email is already taken by another user".into())
        } else {
            internal(e)
        }
    })
}

pub fn get_habit(conn: &Connection, id: i64) -> Result<Habit> {
    conn.query_row(
        &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
        params![id],
        Habit::from_row,
    )
    .optional()
    .map_err(internal)?
    .ok_or_else(|| habit_not_found(id))
}

/// Insert a habit stamped with the current local time (whole seconds), streak 0.
pub fn create_habit(conn: &Connection, name: &str, owner_id: i64) -> Result<Habit> {
    get_user(conn, owner_id)?;
    conn.query_row(
        &format!(
            "INSERT INTO habits (name, owner_id, last_mark, streak)
             VALUES (?1, ?2, datetime('now', 'localtime'), 0)
             RETURNING {HABIT_COLUMNS}"
        ),
        params![name, owner_id],
        Habit::from_row,
    )
    .map_err(internal)
}

/// Bump the streak and restamp `last_mark`.
pub fn mark_habit(conn: &Connection, id: i64) -> Result<Habit> {
    conn.query_row(
        &format!(
            "UPDATE habits
             SET streak = streak + 1, last_mark = datetime('now', 'localtime')
             WHERE id = ?1
             RETURNING {HABIT_COLUMNS}"
        ),
        params![id],
        Habit::from_row,
    )
    .optional()
    .map_err(internal)?
    .ok_or_else(|| habit_not_found(id))
}

/// Rename a habit, returning the previous name alongside the updated row.
pub fn rename_habit(conn: &Connection, id: i64, new_name: &str) -> Result<(String, Habit)> {
    let old = get_habit(conn, id)?;
    let habit = conn
        .query_row(
            &format!("UPDATE habits SET name = ?1 WHERE id = ?2 RETURNING {HABIT_COLUMNS}"),
            params![new_name, id],
            Habit::from_row,
        )
        .optional()
        .map_err(internal)?
        .ok_or_else(|| habit_not_found(id))?;
    Ok((old.name, habit))
}

pub fn delete_habit(conn: &Connection, id: i64) -> Result<Habit> {
    conn.query_row(
        &format!("DELETE FROM habits WHERE id = ?1 RETURNING {HABIT_COLUMNS}"),
        params![id],
        Habit::from_row,
    )
    .optional()
    .map_err(internal)?
    .ok_or_else(|| habit_not_found(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let c = Connection::open_in_memory().unwrap();
        c.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        c.execute_batch(crate::store::SCHEMA).unwrap();
        c
    }

    #[test]
    fn user_lifecycle() {
        let c = conn();
        let u = create_user(&c, "Ada", "ada@example.com").unwrap();
        assert_eq!(get_user(&c, u.id).unwrap(), u);
        assert_eq!(list_users(&c).unwrap(), vec![u]);

        let err = create_user(&c, "Ada2", "ada@example.com").unwrap_err();
        assert!(matches!(err, HabitError::Conflict(_)));
        assert!(matches!(get_user(&c, 999).unwrap_err(), HabitError::NotFound(_)));
    }

    #[test]
    fn habit_lifecycle() {
        let c = conn();
        let u = create_user(&c, "Ada", "ada@example.com").unwrap();
        let h = create_habit(&c, "read", u.id).unwrap();
        assert_eq!(h.streak, 0);
        assert!(h.last_mark.as_deref().is_some_and(|t| t.len() == 19));

        let h = mark_habit(&c, h.id).unwrap();
        assert_eq!(h.streak, 1);

        let (old, h) = rename_habit(&c, h.id, "read more").unwrap();
        assert_eq!(old, "read");
        assert_eq!(h.name, "read more");

        let gone = delete_habit(&c, h.id).unwrap();
        assert_eq!(gone.id, h.id);
        assert!(matches!(get_habit(&c, h.id).unwrap_err(), HabitError::NotFound(_)));
        assert!(matches!(mark_habit(&c, h.id).unwrap_err(), HabitError::NotFound(_)));
    }

    #[test]
    fn habit_needs_existing_owner() {
        let c = conn();
        assert!(matches!(create_habit(&c, "read", 42).unwrap_err(), HabitError::NotFound(_)));
    }
}

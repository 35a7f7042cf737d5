use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::StoreError;
use crate::models::{CompletionRecord, NewUser, User};

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", s, e)))
}

// ─── Users ───────────────────────────────────────────────────────────────────

const USER_COLUMNS: &str =
    "id, name, email, sap_id, practice_handle, password_hash, created_at";

type UserRow = (i64, String, String, Option<String>, Option<String>, Option<String>, String);

fn read_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_user(row: UserRow) -> Result<User, StoreError> {
    let (id, name, email, sap_id, practice_handle, password_hash, created_at) = row;
    Ok(User {
        id,
        name,
        email,
        sap_id,
        practice_handle,
        password_hash,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// Which unique column a failed insert or update collided with.
fn duplicate_field(err: &rusqlite::Error) -> Option<&'static str> {
    if !StoreError::is_unique_violation(err) {
        return None;
    }
    let msg = match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.as_str(),
        _ => "",
    };
    Some(if msg.contains("users.sap_id") {
        "SAP ID"
    } else if msg.contains("users.practice_handle") {
        "practice handle"
    } else {
        "email"
    })
}

fn map_write_error(err: rusqlite::Error) -> StoreError {
    match duplicate_field(&err) {
        Some(field) => StoreError::Duplicate(field),
        None => err.into(),
    }
}

pub struct UserRepo;

impl UserRepo {
    pub fn create(conn: &Connection, user: &NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        conn.execute(
            "INSERT INTO users (name, email, sap_id, practice_handle, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.name,
                user.email,
                user.sap_id,
                user.practice_handle,
                user.password_hash,
                now.to_rfc3339(),
            ],
        )
        .map_err(map_write_error)?;
        let id = conn.last_insert_rowid();
        Self::find_by_id(conn, id)?.ok_or(StoreError::UserNotFound(id))
    }

    fn find_one(conn: &Connection, column: &str, value: &dyn rusqlite::ToSql) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
        let row = conn.query_row(&sql, [value], read_user_row).optional()?;
        row.map(into_user).transpose()
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>, StoreError> {
        Self::find_one(conn, "id", &id)
    }

    pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>, StoreError> {
        Self::find_one(conn, "email", &email)
    }

    pub fn find_by_sap_id(conn: &Connection, sap_id: &str) -> Result<Option<User>, StoreError> {
        Self::find_one(conn, "sap_id", &sap_id)
    }

    pub fn handle_taken(conn: &Connection, handle: &str, except: Option<i64>) -> Result<bool, StoreError> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE practice_handle = ?1 AND id IS NOT ?2",
            params![handle, except],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn sap_taken(conn: &Connection, sap_id: &str, except: Option<i64>) -> Result<bool, StoreError> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE sap_id = ?1 AND id IS NOT ?2",
            params![sap_id, except],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn update_profile(
        conn: &Connection,
        id: i64,
        sap_id: &str,
        practice_handle: &str,
    ) -> Result<User, StoreError> {
        let changed = conn
            .execute(
                "UPDATE users SET sap_id = ?1, practice_handle = ?2 WHERE id = ?3",
                params![sap_id, practice_handle, id],
            )
            .map_err(map_write_error)?;
        if changed == 0 {
            return Err(StoreError::UserNotFound(id));
        }
        Self::find_by_id(conn, id)?.ok_or(StoreError::UserNotFound(id))
    }

    /// Used for identities vouched for by the SSO proxy.
    pub fn find_or_create_by_email(
        conn: &Connection,
        email: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        if let Some(user) = Self::find_by_email(conn, email)? {
            return Ok(user);
        }
        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            sap_id: None,
            practice_handle: None,
            password_hash: None,
        };
        match Self::create(conn, &new_user, now) {
            // lost a race with another first login for the same address
            Err(StoreError::Duplicate("email")) => {
                Self::find_by_email(conn, email)?.ok_or(StoreError::Conflict)
            }
            other => other,
        }
    }

    pub fn count(conn: &Connection) -> Result<i64, StoreError> {
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?)
    }
}

// ─── Progress ────────────────────────────────────────────────────────────────

pub struct ProgressRepo;

impl ProgressRepo {
    /// All completion records for a user, ascending by day.
    fn ensure_user(conn: &Connection, user_id: i64) -> Result<(), StoreError> {
        let exists: Option<i64> = conn
            .query_row("SELECT id FROM users WHERE id = ?1", params![user_id], |r| r.get(0))
            .optional()?;
        exists.map(|_| ()).ok_or(StoreError::UserNotFound(user_id))
    }

    /// Records for an existing user, ordered by day. An unknown user is
    /// `UserNotFound`, never an empty list.
    pub fn get_completed(conn: &Connection, user_id: i64) -> Result<Vec<CompletionRecord>, StoreError> {
        Self::ensure_user(conn, user_id)?;
        let mut stmt = conn.prepare(
            "SELECT day, completed_at FROM completions WHERE user_id = ?1 ORDER BY day ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (day, completed_at) = row?;
            records.push(CompletionRecord {
                day,
                completed_at: parse_timestamp(&completed_at)?,
            });
        }
        Ok(records)
    }

    /// Remove the record for `day` if present, otherwise insert one stamped
    /// `now`. The check and the write share one IMMEDIATE transaction, so
    /// concurrent toggles on the same pair serialize.
    pub fn toggle_day(
        conn: &mut Connection,
        user_id: i64,
        day: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        assert!(day >= 1, "challenge days start at 1");

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Self::ensure_user(&tx, user_id)?;

        let removed = tx.execute(
            "DELETE FROM completions WHERE user_id = ?1 AND day = ?2",
            params![user_id, day],
        )?;
        if removed == 0 {
            tx.execute(
                "INSERT INTO completions (user_id, day, completed_at) VALUES (?1, ?2, ?3)",
                params![user_id, day, now.to_rfc3339()],
            )
            .map_err(|e| {
                if StoreError::is_unique_violation(&e) {
                    StoreError::Conflict
                } else {
                    e.into()
                }
            })?;
        }

        let records = Self::get_completed(&tx, user_id)?;
        tx.commit()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::TimeZone;
    use std::sync::{Arc, Barrier};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    fn student(email: &str, sap: &str, handle: &str) -> NewUser {
        NewUser {
            name: "Test Student".to_string(),
            email: email.to_string(),
            sap_id: Some(sap.to_string()),
            practice_handle: Some(handle.to_string()),
            password_hash: None,
        }
    }

    fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn days(records: &[CompletionRecord]) -> Vec<u32> {
        records.iter().map(|r| r.day).collect()
    }

    #[test]
    fn create_and_lookup_users() {
        let (_dir, db) = temp_db();
        let conn = db.connect().unwrap();
        let user = UserRepo::create(&conn, &student("a@upes.ac.in", "50000001", "alice"), now()).unwrap();

        assert_eq!(UserRepo::find_by_email(&conn, "a@upes.ac.in").unwrap().unwrap().id, user.id);
        assert_eq!(UserRepo::find_by_sap_id(&conn, "50000001").unwrap().unwrap().id, user.id);
        assert!(UserRepo::find_by_sap_id(&conn, "59999999").unwrap().is_none());
        assert_eq!(user.created_at, now());
        assert!(UserRepo::handle_taken(&conn, "alice", None).unwrap());
        assert!(!UserRepo::handle_taken(&conn, "alice", Some(user.id)).unwrap());
    }

    #[test]
    fn duplicate_fields_are_named() {
        let (_dir, db) = temp_db();
        let conn = db.connect().unwrap();
        UserRepo::create(&conn, &student("a@upes.ac.in", "50000001", "alice"), now()).unwrap();

        let err = UserRepo::create(&conn, &student("a@upes.ac.in", "50000002", "bob"), now()).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
        let err = UserRepo::create(&conn, &student("b@upes.ac.in", "50000001", "bob"), now()).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("SAP ID")));
        let err = UserRepo::create(&conn, &student("b@upes.ac.in", "50000002", "alice"), now()).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("practice handle")));
    }

    #[test]
    fn sso_users_are_created_once_then_completed() {
        let (_dir, db) = temp_db();
        let conn = db.connect().unwrap();
        let first = UserRepo::find_or_create_by_email(&conn, "c@upes.ac.in", "Cara", now()).unwrap();
        let again = UserRepo::find_or_create_by_email(&conn, "c@upes.ac.in", "Cara", now()).unwrap();
        assert_eq!(first.id, again.id);
        assert!(!first.profile_complete());

        let updated = UserRepo::update_profile(&conn, first.id, "50000003", "cara").unwrap();
        assert!(updated.profile_complete());
        assert_eq!(UserRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let (_dir, db) = temp_db();
        let user = db
            .with_conn(|c| UserRepo::create(c, &student("a@upes.ac.in", "50000001", "alice"), now()))
            .unwrap();

        db.toggle_day(user.id, 3, now()).unwrap();
        let before = db.completions(user.id).unwrap();

        let added = db.toggle_day(user.id, 7, now()).unwrap();
        assert_eq!(days(&added), vec![3, 7]);
        let removed = db.toggle_day(user.id, 7, now()).unwrap();
        assert_eq!(removed, before);
    }

    #[test]
    fn toggle_touches_only_its_own_pair() {
        let (_dir, db) = temp_db();
        let (a, b) = db
            .with_conn(|c| {
                let a = UserRepo::create(c, &student("a@upes.ac.in", "50000001", "alice"), now())?;
                let b = UserRepo::create(c, &student("b@upes.ac.in", "50000002", "bob"), now())?;
                Ok((a, b))
            })
            .unwrap();

        db.toggle_day(a.id, 1, now()).unwrap();
        db.toggle_day(a.id, 2, now()).unwrap();
        db.toggle_day(b.id, 2, now()).unwrap();
        let after = db.toggle_day(a.id, 2, now()).unwrap();

        assert_eq!(days(&after), vec![1]);
        assert_eq!(days(&db.completions(b.id).unwrap()), vec![2]);
    }

    #[test]
    fn toggle_for_missing_user_fails_without_writing() {
        let (_dir, db) = temp_db();
        let err = db.toggle_day(999, 1, now()).unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound(999)));
        let count: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM completions", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn completions_for_missing_user_is_not_found() {
        let (_dir, db) = temp_db();
        assert!(matches!(db.completions(999), Err(StoreError::UserNotFound(999))));
    }

    #[test]
    #[should_panic]
    fn day_zero_is_rejected() {
        let (_dir, db) = temp_db();
        let _ = db.with_conn(|c| ProgressRepo::toggle_day(c, 1, 0, now()));
    }

    fn hammer(toggles: usize) -> Vec<CompletionRecord> {
        let (_dir, db) = temp_db();
        let user = db
            .with_conn(|c| UserRepo::create(c, &student("a@upes.ac.in", "50000001", "alice"), now()))
            .unwrap();

        let barrier = Arc::new(Barrier::new(toggles));
        let handles: Vec<_> = (0..toggles)
            .map(|_| {
                let db = db.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    db.toggle_day(user.id, 9, now()).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        db.completions(user.id).unwrap()
    }

    #[test]
    fn concurrent_toggles_resolve_by_parity() {
        assert!(hammer(50).is_empty());
        let odd = hammer(51);
        assert_eq!(days(&odd), vec![9]);
    }
}

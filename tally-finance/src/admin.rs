//! Account management and platform-wide views for admins.

use chrono::Utc;
use tally_core::{AdminStats, Role, UploadLogEntry, User};

use crate::error::{FinanceError, Result};
use crate::store::Store;

/// Default number of upload logs returned by [`upload_logs`]
pub const DEFAULT_LOG_LIMIT: usize = 50;

pub fn get_user(store: &Store, user_id: &str) -> Result<Option<User>> {
    store.read(|t| t.users.iter().find(|u| u.id == user_id).cloned())
}

/// Provision an account row for an identity-service user id
pub fn add_user(store: &Store, user_id: &str, email: &str, role: Role) -> Result<User> {
    let user = User {
        id: user_id.to_string(),
        email: email.to_string(),
        role,
        created_at: Utc::now(),
    };
    store.write(|t| {
        if t.users.iter().any(|u| u.id == user_id || u.email.eq_ignore_ascii_case(email)) {
            return Err(FinanceError::UserExists(email.to_string()));
        }
        t.users.push(user.clone());
        Ok(())
    })?;
    tracing::info!(user_id, email, ?role, "user added");
    Ok(user)
}

/// All users, newest first
pub fn list_users(store: &Store) -> Result<Vec<User>> {
    let mut users = store.read(|t| t.users.clone())?;
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(users)
}

pub fn stats(store: &Store) -> Result<AdminStats> {
    store.read(|t| {
        let total_transactions = t.transactions.len();
        let total_spending: f64 = t.transactions.iter().map(|x| x.amount).sum();
        AdminStats {
            total_users: t.users.len(),
            total_transactions,
            average_spending: if total_transactions > 0 {
                total_spending / total_transactions as f64
            } else {
                0.0
            },
        }
    })
}

/// Most recent upload logs joined with the uploader's email
pub fn upload_logs(store: &Store, limit: usize) -> Result<Vec<UploadLogEntry>> {
    store.read(|t| {
        let mut logs = t.upload_logs.clone();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs.into_iter()
            .take(limit)
            .map(|log| {
                let user_email = t
                    .users
                    .iter()
                    .find(|u| u.id == log.user_id)
                    .map(|u| u.email.clone());
                UploadLogEntry { log, user_email }
            })
            .collect()
    })
}

/// Remove a user together with everything they own
pub fn delete_user(store: &Store, user_id: &str) -> Result<()> {
    store.write(|t| {
        let before = t.users.len();
        t.users.retain(|u| u.id != user_id);
        if t.users.len() == before {
            return Err(FinanceError::NotFound("User"));
        }
        t.transactions.retain(|x| x.user_id != user_id);
        t.insights.retain(|x| x.user_id != user_id);
        t.upload_logs.retain(|x| x.user_id != user_id);
        t.summaries.retain(|x| x.user_id != user_id);
        Ok(())
    })?;
    tracing::info!(user_id, "user deleted");
    Ok(())
}

/// Parse a role name as sent by admins (`user` or `admin`)
pub fn parse_role(raw: &str) -> Result<Role> {
    Role::parse(raw).ok_or(FinanceError::InvalidRole)
}

pub fn update_role(store: &Store, user_id: &str, role: Role) -> Result<User> {
    let user = store.write(|t| {
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(FinanceError::NotFound("User"))?;
        user.role = role;
        Ok(user.clone())
    })?;
    tracing::info!(user_id, ?role, "role updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ingest_upload;

    fn seeded() -> Store {
        let store = Store::in_memory();
        add_user(&store, "u-1", "ann@example.com", Role::User).unwrap();
        add_user(&store, "u-2", "bo@example.com", Role::Admin).unwrap();
        ingest_upload(&store, "u-1", "a.csv", b"date,description,amount\n2026-02-03,Pizza,20\n2026-02-04,Bus,10\n").unwrap();
        store
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let store = seeded();
        let err = add_user(&store, "u-3", "ANN@example.com", Role::User).unwrap_err();
        assert!(matches!(err, FinanceError::UserExists(_)));
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("admin").unwrap(), Role::Admin);
        assert_eq!(parse_role("user").unwrap(), Role::User);
        let err = parse_role("superuser").unwrap_err();
        assert!(matches!(err, FinanceError::InvalidRole));
        assert_eq!(err.to_string(), "Invalid role");
    }

    #[test]
    fn test_stats() {
        let s = stats(&seeded()).unwrap();
        assert_eq!(s.total_users, 2);
        assert_eq!(s.total_transactions, 2);
        assert_eq!(s.average_spending, 15.0);

        let empty = stats(&Store::in_memory()).unwrap();
        assert_eq!(empty.average_spending, 0.0);
    }

    #[test]
    fn test_upload_logs_join_email() {
        let store = seeded();
        let logs = upload_logs(&store, DEFAULT_LOG_LIMIT).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user_email.as_deref(), Some("ann@example.com"));
        assert_eq!(logs[0].log.filename, "a.csv");
    }

    #[test]
    fn test_delete_user_cascades() {
        let store = seeded();
        delete_user(&store, "u-1").unwrap();
        assert!(get_user(&store, "u-1").unwrap().is_none());
        assert_eq!(store.read(|t| t.transactions.len()).unwrap(), 0);
        assert_eq!(store.read(|t| t.upload_logs.len()).unwrap(), 0);
        assert!(matches!(delete_user(&store, "u-1"), Err(FinanceError::NotFound(_))));
    }

    #[test]
    fn test_update_role() {
        let store = seeded();
        let u = update_role(&store, "u-1", Role::Admin).unwrap();
        assert_eq!(u.role, Role::Admin);
        assert!(matches!(update_role(&store, "nope", Role::User), Err(FinanceError::NotFound(_))));
    }
}

use access_control::{Role, UserId, UserRecord, UserStatus};
use sqlx::FromRow;

/// Row of the `users` table as stored; validated into a [`UserRecord`].
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub role: String,
    pub status: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: UserId(row.id),
            role: Role::parse(&row.role),
            status: UserStatus::parse(&row.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_validation() {
        let record = UserRecord::from(UserRow {
            id: 4,
            role: "vice_president".to_string(),
            status: "active".to_string(),
        });

        assert_eq!(record.id, UserId(4));
        assert_eq!(record.role, Role::Student);
        assert_eq!(record.status, UserStatus::Active);
    }
}

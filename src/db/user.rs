use sqlx::sqlite::SqlitePool;

/// Read access to stored credentials, plus user creation for bootstrapping.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    /// Parse a stored role. The column is constrained to known values;
    /// anything else degrades to the least privileged role.
    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored credential: username, bcrypt hash and role.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: UserRole::from_str(&row.role),
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user with an already hashed password. Returns the user ID.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?)")
                .bind(username)
                .bind(password_hash)
                .bind(role.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Look up the credential for a username.
    pub async fn get_credential(&self, username: &str) -> Result<Option<Credential>, sqlx::Error> {
        let row: Option<CredentialRow> = sqlx::query_as(
            "SELECT id, username, password_hash, role FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Credential::from))
    }

    /// Current role of a user, or `None` if the user no longer exists.
    pub async fn get_role(&self, username: &str) -> Result<Option<UserRole>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(role,)| UserRole::from_str(&role)))
    }

    /// Set the role for a user.
    pub async fn set_role(&self, username: &str, role: UserRole) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE username = ?")
            .bind(role.as_str())
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user by username.
    pub async fn delete(&self, username: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

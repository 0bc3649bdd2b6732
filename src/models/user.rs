use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i32,
    pub email: String,
    pub password_hash: String,
    pub password_plain: Option<String>, // For testing only
    pub first_name: String,
    pub surname: String,
    pub role: String, // user | organizer | admin
    pub birthday: Option<NaiveDate>,
    pub registered_at: NaiveDateTime,
    pub is_active: bool,
    pub last_logged_in: NaiveDateTime,
}

impl User {
    // Найти пользователя по email
    pub async fn find_by_email(
        email: &str,
        db: &crate::database::Database,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&db.pool)
            .await
    }

    // Проверить пароль: для тестовых пользователей хранится plain,
    // для остальных сверяем bcrypt-хеш
    pub fn verify_password(&self, password: &str) -> bool {
        if let Some(ref plain) = self.password_plain {
            return plain == password;
        }
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    pub fn is_organizer(&self) -> bool {
        self.role == "organizer"
    }
}

use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewUser, User};

/// Inserts the buyer, or refreshes their contact details when the email is already known.
pub async fn upsert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    trace!("📇️ Upserting user {}", user.email);
    sqlx::query_as(
        r#"
            INSERT INTO users (name, email, contact_number, address_line1, address_line2, city, country, pincode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE SET
                name = excluded.name,
                contact_number = excluded.contact_number,
                address_line1 = excluded.address_line1,
                address_line2 = excluded.address_line2,
                city = excluded.city,
                country = excluded.country,
                pincode = excluded.pincode,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(user.name)
    .bind(user.email)
    .bind(user.contact_number)
    .bind(user.address_line1)
    .bind(user.address_line2)
    .bind(user.city)
    .bind(user.country)
    .bind(user.pincode)
    .fetch_one(conn)
    .await
}

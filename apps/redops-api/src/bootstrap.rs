//! First-boot seeding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use rand::Rng;
use redops_common::PrefixedId;

use crate::auth::password;
use crate::db::store::DocumentStore;
use crate::error::ApiError;
use crate::models::user::{User, UserRole};
use crate::repositories::users;

pub const INITIAL_ADMIN_USERNAME: &str = "admin";
pub const INITIAL_ADMIN_EMAIL: &str = "admin@redops.local";

/// Random 16-character password (12 random bytes, base64url).
fn generate_password() -> String {
    let mut buf = [0u8; 12];
    rand::thread_rng().fill(&mut buf[..]);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Create the initial admin account if there are no users yet. It is the
/// only way an admin comes to exist; admins then promote others.
///
/// Returns the generated password when an account was created. The password
/// is logged once; there is no other way to recover it.
pub async fn ensure_initial_admin(store: &dyn DocumentStore) -> Result<Option<String>, ApiError> {
    if users::count(store).await? > 0 {
        return Ok(None);
    }

    let generated = generate_password();
    let now = Utc::now();
    let user = User {
        id: User::generate(),
        username: INITIAL_ADMIN_USERNAME.to_string(),
        email: INITIAL_ADMIN_EMAIL.to_string(),
        password_hash: password::hash_password(&generated)?,
        role: UserRole::Admin,
        created_at: now,
        updated_at: now,
    };
    users::create(store, &user).await?;

    tracing::warn!(
        email = INITIAL_ADMIN_EMAIL,
        password = %generated,
        "created initial admin account; change this password"
    );

    Ok(Some(generated))
}

//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordering_core::{Email, UserId, UserRole};

/// A registered account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, unique across accounts.
    pub email: Email,
    /// Buyer or shop.
    pub role: UserRole,
    /// Personal and company details.
    #[serde(flatten)]
    pub profile: Profile,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Optional personal and company details supplied at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Company the user represents.
    pub company: String,
    /// Position within the company.
    pub position: String,
}

//! Addresses and contacts.
//!
//! Inserts that are subject to a per-user limit run inside a transaction that
//! first locks the owning `users` row, so concurrent requests for the same
//! user count and insert one at a time.

use sqlx::{PgConnection, PgPool};

use ordering_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressInput, Contact, ContactInput};

const ADDRESS_COLUMNS: &str = "id, user_id, city, street, house, structure, building, apartment";
const CONTACT_COLUMNS: &str = "id, user_id, phone, address_id";

/// Repository for reading and editing a user's addresses and contact.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All addresses of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_addresses(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One address, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_address(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Replace the fields of an address owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn update_address(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            r"
            UPDATE addresses
            SET city = $3, street = $4, house = $5, structure = $6, building = $7, apartment = $8
            WHERE id = $1 AND user_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .bind(&input.city)
        .bind(&input.street)
        .bind(&input.house)
        .bind(input.structure.as_deref())
        .bind(input.building.as_deref())
        .bind(input.apartment.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an address owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn delete_address(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// The user's contact, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_contact(&self, user_id: UserId) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE user_id = $1 ORDER BY id LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Delete the user's contact.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no contact.
    pub async fn delete_contact(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM contacts WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Transactional steps
// =============================================================================

/// Lock the user's row until the surrounding transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist.
pub async fn lock_user(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(|_| ())
        .ok_or(RepositoryError::NotFound)
}

/// Number of addresses the user has.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_addresses(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<usize, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    to_count(count)
}

/// Number of contacts the user has.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_contacts(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<usize, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    to_count(count)
}

fn to_count(count: i64) -> Result<usize, RepositoryError> {
    usize::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative row count {count}")))
}

/// Insert an address for the user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_address(
    conn: &mut PgConnection,
    user_id: UserId,
    input: &AddressInput,
) -> Result<Address, RepositoryError> {
    let row = sqlx::query_as::<_, Address>(&format!(
        r"
        INSERT INTO addresses (user_id, city, street, house, structure, building, apartment)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {ADDRESS_COLUMNS}
        "
    ))
    .bind(user_id)
    .bind(&input.city)
    .bind(&input.street)
    .bind(&input.house)
    .bind(input.structure.as_deref())
    .bind(input.building.as_deref())
    .bind(input.apartment.as_deref())
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Whether `address_id` exists and belongs to `user_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn address_owned_by(
    conn: &mut PgConnection,
    user_id: UserId,
    address_id: AddressId,
) -> Result<bool, RepositoryError> {
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM addresses WHERE id = $1 AND user_id = $2)",
    )
    .bind(address_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(owned)
}

/// Insert the user's contact.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_contact(
    conn: &mut PgConnection,
    user_id: UserId,
    input: &ContactInput,
) -> Result<Contact, RepositoryError> {
    let row = sqlx::query_as::<_, Contact>(&format!(
        "INSERT INTO contacts (user_id, phone, address_id) VALUES ($1, $2, $3) RETURNING {CONTACT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&input.phone)
    .bind(input.address_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Replace phone and address of the user's contact.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user has no contact.
pub async fn update_contact(
    conn: &mut PgConnection,
    user_id: UserId,
    input: &ContactInput,
) -> Result<Contact, RepositoryError> {
    sqlx::query_as::<_, Contact>(&format!(
        "UPDATE contacts SET phone = $2, address_id = $3 WHERE user_id = $1 RETURNING {CONTACT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&input.phone)
    .bind(input.address_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

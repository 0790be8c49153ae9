//! Delivery addresses and the buyer contact.
//!
//! Quota checks count rows while holding a lock on the user's row, so two
//! concurrent requests cannot both squeeze in under the limit.

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use ordering_core::quota::{MAX_ADDRESSES_PER_USER, MAX_CONTACTS_PER_USER, ensure_capacity};
use ordering_core::{AddressId, DomainError};

use crate::db::RepositoryError;
use crate::db::contacts::{self as steps, ContactRepository};
use crate::error::{AppError, Result};
use crate::models::{Address, AddressInput, Contact, ContactDetail, ContactInput, CurrentUser};

/// Address and contact service.
pub struct ContactService<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactService<'a> {
    /// Create a new contact service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> ContactRepository<'a> {
        ContactRepository::new(self.pool)
    }

    /// Save a new address for the caller.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for bad fields and `QuotaExceeded` once the caller
    /// has five addresses.
    #[instrument(skip(self, user, input), fields(user_id = %user.id))]
    pub async fn add_address(&self, user: &CurrentUser, input: AddressInput) -> Result<Address> {
        let input = input.normalized()?;

        let mut tx = self.pool.begin().await?;
        steps::lock_user(&mut tx, user.id).await?;
        let existing = steps::count_addresses(&mut tx, user.id).await?;
        ensure_capacity("address", existing, MAX_ADDRESSES_PER_USER)?;
        let address = steps::insert_address(&mut tx, user.id, &input).await?;
        tx.commit().await?;

        info!(address_id = %address.id, "Address added");
        Ok(address)
    }

    /// The caller's addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_addresses(&self, user: &CurrentUser) -> Result<Vec<Address>> {
        Ok(self.repo().list_addresses(user.id).await?)
    }

    /// Replace the fields of one of the caller's addresses.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for bad fields and `NotFound` if the caller has no
    /// such address.
    pub async fn update_address(
        &self,
        user: &CurrentUser,
        id: AddressId,
        input: AddressInput,
    ) -> Result<Address> {
        let input = input.normalized()?;
        self.repo()
            .update_address(user.id, id, &input)
            .await
            .map_err(|e| not_found_as(e, || format!("address {id}")))
    }

    /// Delete one of the caller's addresses.
    ///
    /// A contact pointing at the address keeps existing without one.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the caller has no such address.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete_address(&self, user: &CurrentUser, id: AddressId) -> Result<()> {
        self.repo()
            .delete_address(user.id, id)
            .await
            .map_err(|e| not_found_as(e, || format!("address {id}")))?;
        info!(address_id = %id, "Address deleted");
        Ok(())
    }

    /// Create the caller's contact.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a bad phone number, `QuotaExceeded` if the
    /// caller already has a contact and `NotFound` if the address is not one
    /// of the caller's.
    #[instrument(skip(self, user, input), fields(user_id = %user.id))]
    pub async fn set_contact(&self, user: &CurrentUser, input: ContactInput) -> Result<Contact> {
        let input = input.normalized()?;

        let mut tx = self.pool.begin().await?;
        steps::lock_user(&mut tx, user.id).await?;
        let existing = steps::count_contacts(&mut tx, user.id).await?;
        ensure_capacity("contact", existing, MAX_CONTACTS_PER_USER)?;
        check_address(&mut tx, user, &input).await?;
        let contact = steps::insert_contact(&mut tx, user.id, &input).await?;
        tx.commit().await?;

        info!(contact_id = %contact.id, "Contact created");
        Ok(contact)
    }

    /// The caller's contact with its address.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the caller has no contact.
    pub async fn get_contact(&self, user: &CurrentUser) -> Result<ContactDetail> {
        let repo = self.repo();
        let contact = repo
            .get_contact(user.id)
            .await?
            .ok_or_else(|| DomainError::not_found("contact"))?;
        let address = match contact.address_id {
            Some(address_id) => repo.get_address(user.id, address_id).await?,
            None => None,
        };
        Ok(ContactDetail { contact, address })
    }

    /// Replace the phone and address of the caller's contact.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a bad phone number and `NotFound` if the
    /// caller has no contact or the address is not one of the caller's.
    #[instrument(skip(self, user, input), fields(user_id = %user.id))]
    pub async fn update_contact(&self, user: &CurrentUser, input: ContactInput) -> Result<Contact> {
        let input = input.normalized()?;

        let mut tx = self.pool.begin().await?;
        check_address(&mut tx, user, &input).await?;
        let contact = steps::update_contact(&mut tx, user.id, &input)
            .await
            .map_err(|e| not_found_as(e, || "contact".to_string()))?;
        tx.commit().await?;

        info!(contact_id = %contact.id, "Contact updated");
        Ok(contact)
    }

    /// Delete the caller's contact. Placed orders keep their data.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the caller has no contact.
    pub async fn delete_contact(&self, user: &CurrentUser) -> Result<()> {
        self.repo()
            .delete_contact(user.id)
            .await
            .map_err(|e| not_found_as(e, || "contact".to_string()))
    }
}

async fn check_address(
    conn: &mut PgConnection,
    user: &CurrentUser,
    input: &ContactInput,
) -> Result<()> {
    if let Some(address_id) = input.address_id
        && !steps::address_owned_by(conn, user.id, address_id).await?
    {
        return Err(DomainError::not_found(format!("address {address_id}")).into());
    }
    Ok(())
}

fn not_found_as(err: RepositoryError, what: impl FnOnce() -> String) -> AppError {
    match err {
        RepositoryError::NotFound => DomainError::not_found(what()).into(),
        other => other.into(),
    }
}

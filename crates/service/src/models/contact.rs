//! Addresses and contacts.

use serde::{Deserialize, Serialize};

use ordering_core::{AddressId, ContactId, DomainError, UserId};

/// Longest accepted address component.
const MAX_FIELD_LENGTH: usize = 100;

/// Longest accepted phone number.
const MAX_PHONE_LENGTH: usize = 20;

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Address {
    /// Unique address ID.
    pub id: AddressId,
    /// Owning user.
    pub user_id: UserId,
    /// City.
    pub city: String,
    /// Street.
    pub street: String,
    /// House number.
    pub house: String,
    /// Structure (korpus), if any.
    pub structure: Option<String>,
    /// Building, if any.
    pub building: Option<String>,
    /// Apartment, if any.
    pub apartment: Option<String>,
}

/// Fields for creating or replacing an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressInput {
    pub city: String,
    pub street: String,
    pub house: String,
    #[serde(default)]
    pub structure: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub apartment: Option<String>,
}

impl AddressInput {
    /// Trim every field and check required ones.
    ///
    /// Blank optional fields become `None`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for blank required fields or
    /// fields longer than 100 characters.
    pub fn normalized(self) -> Result<Self, DomainError> {
        let required = |name: &str, value: String| -> Result<String, DomainError> {
            let value = value.trim().to_owned();
            if value.is_empty() {
                return Err(DomainError::validation(format!("{name} is required")));
            }
            check_length(name, &value)?;
            Ok(value)
        };
        let optional = |name: &str, value: Option<String>| -> Result<Option<String>, DomainError> {
            match value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) {
                Some(v) => {
                    check_length(name, &v)?;
                    Ok(Some(v))
                }
                None => Ok(None),
            }
        };

        Ok(Self {
            city: required("city", self.city)?,
            street: required("street", self.street)?,
            house: required("house", self.house)?,
            structure: optional("structure", self.structure)?,
            building: optional("building", self.building)?,
            apartment: optional("apartment", self.apartment)?,
        })
    }
}

fn check_length(name: &str, value: &str) -> Result<(), DomainError> {
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(DomainError::validation(format!(
            "{name} must be at most {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// The buyer contact attached to placed orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Contact {
    /// Unique contact ID.
    pub id: ContactId,
    /// Owning user.
    pub user_id: UserId,
    /// Phone number.
    pub phone: String,
    /// Delivery address, if chosen.
    pub address_id: Option<AddressId>,
}

/// A contact together with its address.
#[derive(Debug, Clone, Serialize)]
pub struct ContactDetail {
    #[serde(flatten)]
    pub contact: Contact,
    pub address: Option<Address>,
}

/// Fields for creating or replacing the contact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactInput {
    pub phone: String,
    #[serde(default)]
    pub address_id: Option<AddressId>,
}

impl ContactInput {
    /// Trim and check the phone number.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the phone has 5 to 20
    /// characters made of digits, spaces, `+`, `-`, `(` and `)`.
    pub fn normalized(self) -> Result<Self, DomainError> {
        let phone = self.phone.trim().to_owned();
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if digits < 5 || phone.len() > MAX_PHONE_LENGTH {
            return Err(DomainError::validation(
                "phone must contain 5 to 20 characters",
            ));
        }
        if !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
        {
            return Err(DomainError::validation("phone contains invalid characters"));
        }
        Ok(Self {
            phone,
            address_id: self.address_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn moscow() -> AddressInput {
        AddressInput {
            city: " Moscow ".to_string(),
            street: "Tverskaya".to_string(),
            house: "7".to_string(),
            structure: Some("  ".to_string()),
            building: None,
            apartment: Some("12".to_string()),
        }
    }

    #[test]
    fn test_address_is_trimmed_and_blank_optionals_dropped() {
        let address = moscow().normalized().unwrap();
        assert_eq!(address.city, "Moscow");
        assert_eq!(address.structure, None);
        assert_eq!(address.apartment.as_deref(), Some("12"));
    }

    #[test]
    fn test_address_requires_city_street_house() {
        let mut input = moscow();
        input.house = "   ".to_string();
        assert!(matches!(
            input.normalized(),
            Err(DomainError::Validation(msg)) if msg == "house is required"
        ));
    }

    #[test]
    fn test_address_field_length_limit() {
        let mut input = moscow();
        input.street = "x".repeat(MAX_FIELD_LENGTH + 1);
        assert!(input.normalized().is_err());
    }

    #[test]
    fn test_phone_validation() {
        let ok = ContactInput {
            phone: " +7 (900) 123-45-67 ".to_string(),
            address_id: None,
        };
        assert_eq!(ok.normalized().unwrap().phone, "+7 (900) 123-45-67");

        for bad in ["", "123", "call me maybe", "+7 900 123 45 67 89 00 11"] {
            let input = ContactInput {
                phone: bad.to_string(),
                address_id: None,
            };
            assert!(input.normalized().is_err(), "{bad:?} should be rejected");
        }
    }
}

//! Address Entity

use chrono::{DateTime, Utc};
use kernel::id::{AddressId, UserId};

use crate::domain::event::{
    AddressCreated, AddressDeleted, AddressSetAsDefault, AddressUpdated, UsersEvent,
};
use crate::domain::value_object::{postal_code::PostalCode, state_code::StateCode};
use crate::error::{UsersError, UsersResult, Validator};

/// Active addresses a user may keep
pub const MAX_ADDRESSES_PER_USER: usize = 10;

pub const DEFAULT_COUNTRY: &str = "BR";

/// Raw address input, validated by `Address::create` and `Address::update`
#[derive(Debug, Clone, Default)]
pub struct AddressDraft {
    pub label: Option<String>,
    pub recipient_name: Option<String>,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: Option<String>,
    pub ibge_code: Option<String>,
}

/// Validated address fields
#[derive(Debug, Clone)]
struct AddressFields {
    label: Option<String>,
    recipient_name: Option<String>,
    street: String,
    number: Option<String>,
    complement: Option<String>,
    neighborhood: Option<String>,
    city: String,
    state: StateCode,
    postal_code: PostalCode,
    country: String,
    ibge_code: Option<String>,
}

impl AddressDraft {
    fn validate(&self) -> UsersResult<AddressFields> {
        let mut v = Validator::new();
        let label = v.optional("label", "Label", self.label.as_deref(), 50);
        let recipient_name = v.optional(
            "recipientName",
            "Recipient name",
            self.recipient_name.as_deref(),
            150,
        );
        let street = v.required("street", "Street", &self.street, 255);
        let number = v.optional("number", "Number", self.number.as_deref(), 20);
        let complement = v.optional("complement", "Complement", self.complement.as_deref(), 100);
        let neighborhood =
            v.optional("neighborhood", "Neighborhood", self.neighborhood.as_deref(), 100);
        let city = v.required("city", "City", &self.city, 100);
        let state = v.check("state", StateCode::new(&self.state));
        let postal_code = v.check("postalCode", PostalCode::new(&self.postal_code));

        let country = match self.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            None => DEFAULT_COUNTRY.to_string(),
            Some(c) if c.len() == 2 && c.chars().all(|ch| ch.is_ascii_alphabetic()) => {
                c.to_ascii_uppercase()
            }
            Some(_) => {
                v.add("country", "Country must be a 2-letter ISO code");
                String::new()
            }
        };

        let ibge_code = v.optional("ibgeCode", "IBGE code", self.ibge_code.as_deref(), 7);
        if let Some(code) = &ibge_code
            && !code.chars().all(|c| c.is_ascii_digit())
        {
            v.add("ibgeCode", "IBGE code must contain only digits");
        }

        v.finish()?;
        let (Some(state), Some(postal_code)) = (state, postal_code) else {
            return Err(UsersError::invalid("address", "Invalid address"));
        };

        Ok(AddressFields {
            label,
            recipient_name,
            street,
            number,
            complement,
            neighborhood,
            city,
            state,
            postal_code,
            country,
            ibge_code,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub label: Option<String>,
    pub recipient_name: Option<String>,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: StateCode,
    pub postal_code: PostalCode,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ibge_code: Option<String>,
    pub is_default: bool,
    pub is_billing_address: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub(crate) events: Vec<UsersEvent>,
}

impl Address {
    pub fn create(
        user_id: UserId,
        draft: &AddressDraft,
        is_default: bool,
        now: DateTime<Utc>,
    ) -> UsersResult<Self> {
        let fields = draft.validate()?;
        let mut address = Self {
            id: AddressId::new(),
            user_id,
            label: fields.label,
            recipient_name: fields.recipient_name,
            street: fields.street,
            number: fields.number,
            complement: fields.complement,
            neighborhood: fields.neighborhood,
            city: fields.city,
            state: fields.state,
            postal_code: fields.postal_code,
            country: fields.country,
            latitude: None,
            longitude: None,
            ibge_code: fields.ibge_code,
            is_default,
            is_billing_address: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            events: Vec::new(),
        };
        address.events.push(UsersEvent::AddressCreated(AddressCreated {
            address_id: address.id,
            user_id,
            is_default,
        }));
        Ok(address)
    }

    pub fn update(&mut self, draft: &AddressDraft) -> UsersResult<()> {
        let fields = draft.validate()?;
        self.label = fields.label;
        self.recipient_name = fields.recipient_name;
        self.street = fields.street;
        self.number = fields.number;
        self.complement = fields.complement;
        self.neighborhood = fields.neighborhood;
        self.city = fields.city;
        self.state = fields.state;
        self.postal_code = fields.postal_code;
        self.country = fields.country;
        self.ibge_code = fields.ibge_code;
        self.events.push(UsersEvent::AddressUpdated(AddressUpdated {
            address_id: self.id,
            user_id: self.user_id,
        }));
        Ok(())
    }

    pub fn set_coordinates(&mut self, latitude: f64, longitude: f64) -> UsersResult<()> {
        let mut v = Validator::new();
        if !(-90.0..=90.0).contains(&latitude) {
            v.add("latitude", "Latitude must be between -90 and 90");
        }
        if !(-180.0..=180.0).contains(&longitude) {
            v.add("longitude", "Longitude must be between -180 and 180");
        }
        v.finish()?;
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        Ok(())
    }

    pub fn set_as_default(&mut self) {
        if self.is_default {
            return;
        }
        self.is_default = true;
        self.events.push(UsersEvent::AddressSetAsDefault(AddressSetAsDefault {
            address_id: self.id,
            user_id: self.user_id,
        }));
    }

    pub fn remove_default(&mut self) {
        self.is_default = false;
    }

    pub fn set_as_billing(&mut self, is_billing: bool) {
        self.is_billing_address = is_billing;
    }

    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        if self.deleted_at.is_some() {
            return;
        }
        self.deleted_at = Some(now);
        self.is_default = false;
        self.events.push(UsersEvent::AddressDeleted(AddressDeleted {
            address_id: self.id,
            user_id: self.user_id,
        }));
    }

    pub fn belongs_to(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// "Street, Number - Complement, Neighborhood, City - State, Postal"
    pub fn formatted(&self) -> String {
        let mut line = self.street.clone();
        if let Some(number) = &self.number {
            line.push_str(", ");
            line.push_str(number);
        }
        if let Some(complement) = &self.complement {
            line.push_str(" - ");
            line.push_str(complement);
        }
        if let Some(neighborhood) = &self.neighborhood {
            line.push_str(", ");
            line.push_str(neighborhood);
        }
        format!(
            "{}, {} - {}, {}",
            line,
            self.city,
            self.state.as_str(),
            self.postal_code.as_str()
        )
    }

    pub(crate) fn take_events(&mut self) -> Vec<UsersEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AddressDraft {
        AddressDraft {
            label: Some("Casa".into()),
            street: "Av. Paulista".into(),
            number: Some("1000".into()),
            complement: Some("Apto 12".into()),
            neighborhood: Some("Bela Vista".into()),
            city: "São Paulo".into(),
            state: "sp".into(),
            postal_code: "01310100".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_normalizes_fields() {
        let mut address = Address::create(UserId::new(), &draft(), true, Utc::now()).unwrap();
        assert_eq!(address.state.as_str(), "SP");
        assert_eq!(address.postal_code.as_str(), "01310-100");
        assert_eq!(address.country, "BR");
        assert!(address.is_default);
        assert!(matches!(
            &address.take_events()[..],
            [UsersEvent::AddressCreated(e)] if e.is_default
        ));
    }

    #[test]
    fn test_create_reports_every_invalid_field() {
        let bad = AddressDraft {
            street: String::new(),
            city: String::new(),
            state: "São Paulo".into(),
            postal_code: "123".into(),
            country: Some("Brasil".into()),
            ..Default::default()
        };
        let Err(UsersError::Validation(errors)) = Address::create(UserId::new(), &bad, false, Utc::now())
        else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_ref()).collect();
        assert_eq!(fields, vec!["street", "city", "state", "postalCode", "country"]);
    }

    #[test]
    fn test_formatted() {
        let address = Address::create(UserId::new(), &draft(), false, Utc::now()).unwrap();
        assert_eq!(
            address.formatted(),
            "Av. Paulista, 1000 - Apto 12, Bela Vista, São Paulo - SP, 01310-100"
        );
    }

    #[test]
    fn test_soft_delete_clears_default() {
        let mut address = Address::create(UserId::new(), &draft(), true, Utc::now()).unwrap();
        address.take_events();
        address.soft_delete(Utc::now());
        assert!(!address.is_default);
        assert!(address.deleted_at.is_some());
        assert!(matches!(&address.take_events()[..], [UsersEvent::AddressDeleted(_)]));
    }

    #[test]
    fn test_set_default_only_raises_once() {
        let mut address = Address::create(UserId::new(), &draft(), false, Utc::now()).unwrap();
        address.take_events();
        address.set_as_default();
        address.set_as_default();
        assert_eq!(address.take_events().len(), 1);
    }

    #[test]
    fn test_coordinates_are_range_checked() {
        let mut address = Address::create(UserId::new(), &draft(), false, Utc::now()).unwrap();
        assert!(address.set_coordinates(91.0, 0.0).is_err());
        address.set_coordinates(-23.56, -46.65).unwrap();
        assert_eq!(address.latitude, Some(-23.56));
    }
}

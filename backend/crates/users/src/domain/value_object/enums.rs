//! Small enums persisted as `SMALLINT`
//!
//! Each has `id()`/`from_id()` for storage; JSON uses the variant name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i16)]
pub enum Gender {
    #[default]
    NotInformed = 0,
    Male = 1,
    Female = 2,
    Other = 3,
    PreferNotToSay = 4,
}

impl Gender {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        use Gender::*;
        match id {
            0 => Some(NotInformed),
            1 => Some(Male),
            2 => Some(Female),
            3 => Some(Other),
            4 => Some(PreferNotToSay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i16)]
pub enum LoginProvider {
    #[default]
    Local = 0,
    Google = 1,
    Facebook = 2,
    Apple = 3,
    Microsoft = 4,
    GitHub = 5,
}

impl LoginProvider {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        use LoginProvider::*;
        match id {
            0 => Some(Local),
            1 => Some(Google),
            2 => Some(Facebook),
            3 => Some(Apple),
            4 => Some(Microsoft),
            5 => Some(GitHub),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i16)]
pub enum NotificationType {
    #[default]
    Info = 0,
    OrderUpdate = 1,
    Promotion = 2,
    PriceDrop = 3,
    BackInStock = 4,
    ProductReview = 5,
    SecurityAlert = 6,
    AccountUpdate = 7,
    Newsletter = 8,
    AbandonedCart = 9,
}

impl NotificationType {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        use NotificationType::*;
        match id {
            0 => Some(Info),
            1 => Some(OrderUpdate),
            2 => Some(Promotion),
            3 => Some(PriceDrop),
            4 => Some(BackInStock),
            5 => Some(ProductReview),
            6 => Some(SecurityAlert),
            7 => Some(AccountUpdate),
            8 => Some(Newsletter),
            9 => Some(AbandonedCart),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i16)]
pub enum ReferenceType {
    #[default]
    None = 0,
    Order = 1,
    Product = 2,
    Category = 3,
    Promotion = 4,
    Coupon = 5,
    Cart = 6,
    Review = 7,
    Account = 8,
}

impl ReferenceType {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        use ReferenceType::*;
        match id {
            0 => Some(None),
            1 => Some(Order),
            2 => Some(Product),
            3 => Some(Category),
            4 => Some(Promotion),
            5 => Some(Coupon),
            6 => Some(Cart),
            7 => Some(Review),
            8 => Some(Account),
            _ => Option::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for g in [
            Gender::NotInformed,
            Gender::Male,
            Gender::Female,
            Gender::Other,
            Gender::PreferNotToSay,
        ] {
            assert_eq!(Gender::from_id(g.id()), Some(g));
        }
        assert_eq!(LoginProvider::from_id(5), Some(LoginProvider::GitHub));
        assert_eq!(NotificationType::from_id(6), Some(NotificationType::SecurityAlert));
        assert_eq!(ReferenceType::from_id(0), Some(ReferenceType::None));
    }

    #[test]
    fn test_unknown_ids() {
        assert_eq!(Gender::from_id(9), None);
        assert_eq!(LoginProvider::from_id(-1), None);
        assert_eq!(NotificationType::from_id(10), None);
        assert_eq!(ReferenceType::from_id(42), None);
    }

    #[test]
    fn test_json_uses_variant_names() {
        assert_eq!(
            serde_json::to_value(NotificationType::BackInStock).unwrap(),
            "BackInStock"
        );
        assert_eq!(
            serde_json::from_value::<Gender>(serde_json::json!("Female")).unwrap(),
            Gender::Female
        );
    }
}

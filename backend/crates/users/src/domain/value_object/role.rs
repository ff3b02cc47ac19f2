use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::permission::{admin, cart, catalog, coupons, orders, payments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[default]
    Customer,
    Seller,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Customer, Role::Seller];

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Customer => "Customer",
            Role::Seller => "Seller",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(code.trim()))
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => &[admin::FULL_ACCESS],
            Role::Seller => &[
                catalog::VIEW_PRODUCTS,
                catalog::CREATE_PRODUCT,
                catalog::UPDATE_PRODUCT,
                catalog::DELETE_PRODUCT,
                catalog::VIEW_CATEGORIES,
                catalog::MANAGE_CATEGORIES,
                catalog::MANAGE_STOCK,
                catalog::VIEW_STOCK,
                catalog::MANAGE_REVIEWS,
                orders::VIEW_OWN,
                orders::VIEW_ALL,
                orders::UPDATE_STATUS,
                coupons::VIEW,
            ],
            Role::Customer => &[
                catalog::VIEW_PRODUCTS,
                catalog::VIEW_CATEGORIES,
                orders::VIEW_OWN,
                orders::CREATE,
                orders::CANCEL,
                cart::VIEW_OWN,
                cart::MANAGE,
                coupons::APPLY,
                payments::VIEW,
            ],
        }
    }

    /// Union of the roles' permissions, sorted and deduplicated
    pub fn permissions_for(roles: &[Role]) -> Vec<String> {
        let mut permissions: Vec<String> = roles
            .iter()
            .flat_map(|r| r.permissions().iter().map(|p| p.to_string()))
            .collect();
        permissions.sort_unstable();
        permissions.dedup();
        permissions
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("Unknown role: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::permission::grants;

    #[test]
    fn test_role_codes() {
        assert_eq!(Role::from_code("admin"), Some(Role::Admin));
        assert_eq!(Role::from_code("Seller"), Some(Role::Seller));
        assert_eq!(Role::from_code("guest"), None);
        assert_eq!(Role::Customer.to_string(), "Customer");
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
    }

    #[test]
    fn test_admin_has_everything() {
        let permissions = Role::permissions_for(&[Role::Admin]);
        assert!(grants(&permissions, "users:manage_roles"));
        assert!(grants(&permissions, "payments:refund"));
    }

    #[test]
    fn test_customer_permissions() {
        let permissions = Role::permissions_for(&[Role::Customer]);
        assert!(grants(&permissions, orders::CREATE));
        assert!(grants(&permissions, cart::MANAGE));
        assert!(!grants(&permissions, orders::VIEW_ALL));
        assert!(!grants(&permissions, "users:delete"));
    }

    #[test]
    fn test_seller_permissions() {
        let permissions = Role::permissions_for(&[Role::Seller]);
        assert!(grants(&permissions, catalog::MANAGE_STOCK));
        assert!(grants(&permissions, orders::UPDATE_STATUS));
        assert!(grants(&permissions, coupons::VIEW));
        assert!(!grants(&permissions, coupons::CREATE));
    }

    #[test]
    fn test_union_is_deduplicated() {
        let permissions = Role::permissions_for(&[Role::Customer, Role::Seller]);
        let count = permissions.iter().filter(|p| *p == orders::VIEW_OWN).count();
        assert_eq!(count, 1);
    }
}

//! Permission names
//!
//! Carried in the access token (`permissions` claim) and checked by the
//! HTTP layer. Only the users module acts on them; the other modules' names
//! are defined here so roles can grant them.

/// Claim type used when permissions are exported as individual claims
pub const CLAIM_TYPE: &str = "permission";

pub mod users {
    pub const VIEW: &str = "users:view";
    pub const CREATE: &str = "users:create";
    pub const UPDATE: &str = "users:update";
    pub const DELETE: &str = "users:delete";
    pub const MANAGE_ROLES: &str = "users:manage_roles";
}

pub mod catalog {
    pub const VIEW_PRODUCTS: &str = "catalog:view_products";
    pub const CREATE_PRODUCT: &str = "catalog:create_product";
    pub const UPDATE_PRODUCT: &str = "catalog:update_product";
    pub const DELETE_PRODUCT: &str = "catalog:delete_product";
    pub const VIEW_CATEGORIES: &str = "catalog:view_categories";
    pub const MANAGE_CATEGORIES: &str = "catalog:manage_categories";
    pub const MANAGE_STOCK: &str = "catalog:manage_stock";
    pub const VIEW_STOCK: &str = "catalog:view_stock";
    pub const MANAGE_REVIEWS: &str = "catalog:manage_reviews";
}

pub mod orders {
    pub const VIEW_OWN: &str = "orders:view_own";
    pub const VIEW_ALL: &str = "orders:view_all";
    pub const CREATE: &str = "orders:create";
    pub const UPDATE_STATUS: &str = "orders:update_status";
    pub const CANCEL: &str = "orders:cancel";
    pub const REFUND: &str = "orders:refund";
}

pub mod payments {
    pub const VIEW: &str = "payments:view";
    pub const PROCESS: &str = "payments:process";
    pub const REFUND: &str = "payments:refund";
    pub const VIEW_TRANSACTIONS: &str = "payments:view_transactions";
}

pub mod coupons {
    pub const VIEW: &str = "coupons:view";
    pub const CREATE: &str = "coupons:create";
    pub const UPDATE: &str = "coupons:update";
    pub const DELETE: &str = "coupons:delete";
    pub const APPLY: &str = "coupons:apply";
}

pub mod cart {
    pub const VIEW_OWN: &str = "cart:view_own";
    pub const VIEW_ALL: &str = "cart:view_all";
    pub const MANAGE: &str = "cart:manage";
}

pub mod admin {
    pub const DASHBOARD: &str = "admin:dashboard";
    pub const REPORTS: &str = "admin:reports";
    pub const SETTINGS: &str = "admin:settings";
    pub const AUDIT_LOGS: &str = "admin:audit_logs";
    /// Grants every other permission
    pub const FULL_ACCESS: &str = "admin:full_access";
}

pub const ALL: &[&str] = &[
    users::VIEW,
    users::CREATE,
    users::UPDATE,
    users::DELETE,
    users::MANAGE_ROLES,
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
    orders::CREATE,
    orders::UPDATE_STATUS,
    orders::CANCEL,
    orders::REFUND,
    payments::VIEW,
    payments::PROCESS,
    payments::REFUND,
    payments::VIEW_TRANSACTIONS,
    coupons::VIEW,
    coupons::CREATE,
    coupons::UPDATE,
    coupons::DELETE,
    coupons::APPLY,
    cart::VIEW_OWN,
    cart::VIEW_ALL,
    cart::MANAGE,
    admin::DASHBOARD,
    admin::REPORTS,
    admin::SETTINGS,
    admin::AUDIT_LOGS,
    admin::FULL_ACCESS,
];

/// Permission check honouring `admin:full_access`
pub fn grants<S: AsRef<str>>(held: &[S], required: &str) -> bool {
    held.iter()
        .any(|p| p.as_ref() == admin::FULL_ACCESS || p.as_ref() == required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_access_grants_everything() {
        let held = vec![admin::FULL_ACCESS.to_string()];
        for permission in ALL {
            assert!(grants(&held, permission));
        }
    }

    #[test]
    fn test_exact_match_required() {
        let held = ["orders:view_own"];
        assert!(grants(&held, orders::VIEW_OWN));
        assert!(!grants(&held, orders::VIEW_ALL));
        assert!(!grants::<&str>(&[], orders::VIEW_OWN));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = ALL.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }
}

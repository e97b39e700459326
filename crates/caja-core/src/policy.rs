//! # Authorization Policy
//!
//! Every role and ownership rule lives here. Handlers and the sale workflow
//! ask these functions instead of comparing roles inline.
//!
//! ```text
//! ┌──────────────────────────────┬────────────┬─────────────────────────┐
//! │ Operation                    │   ADMIN    │        CAJERO           │
//! ├──────────────────────────────┼────────────┼─────────────────────────┤
//! │ create sale                  │     ✗      │           ✓             │
//! │ view / cancel sale           │    any     │   own sales only        │
//! │ manage catalog               │     ✓      │           ✗             │
//! │ admin reports                │     ✓      │           ✗             │
//! │ view / edit user             │    any     │   self only             │
//! │ change a role                │     ✓      │           ✗             │
//! │ deactivate / delete user     │ not self   │           ✗             │
//! └──────────────────────────────┴────────────┴─────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Role, Sale};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    pub role: Role,
}

impl Requester {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Requester {
            user_id: user_id.into(),
            role,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[inline]
    pub fn is_self(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

// =============================================================================
// Sales
// =============================================================================

pub fn can_create_sale(requester: &Requester) -> bool {
    requester.role == Role::Cashier
}

pub fn can_view_sale(requester: &Requester, sale: &Sale) -> bool {
    requester.is_admin() || requester.is_self(&sale.cashier_id)
}

pub fn can_cancel_sale(requester: &Requester, sale: &Sale) -> bool {
    requester.is_admin() || requester.is_self(&sale.cashier_id)
}

/// Restricts a cashier filter to what the requester may see.
///
/// Admins keep whatever they asked for; cashiers are always pinned to
/// their own id.
pub fn scope_cashier(requester: &Requester, requested: Option<String>) -> Option<String> {
    if requester.is_admin() {
        requested
    } else {
        Some(requester.user_id.clone())
    }
}

// =============================================================================
// Catalog, reports, accounts
// =============================================================================

pub fn can_manage_catalog(requester: &Requester) -> bool {
    requester.is_admin()
}

pub fn can_view_reports(requester: &Requester) -> bool {
    requester.is_admin()
}

pub fn can_manage_users(requester: &Requester) -> bool {
    requester.is_admin()
}

pub fn can_view_user(requester: &Requester, user_id: &str) -> bool {
    requester.is_admin() || requester.is_self(user_id)
}

pub fn can_edit_user(requester: &Requester, user_id: &str) -> bool {
    requester.is_admin() || requester.is_self(user_id)
}

pub fn can_change_role(requester: &Requester) -> bool {
    requester.is_admin()
}

/// Admins may deactivate or delete accounts, but never their own.
pub fn can_deactivate_user(requester: &Requester, user_id: &str) -> bool {
    requester.is_admin() && !requester.is_self(user_id)
}

pub fn can_change_password(requester: &Requester, user_id: &str) -> bool {
    requester.is_self(user_id)
}

/// Turns a policy decision into a `Forbidden` error.
///
/// ```rust
/// use caja_core::policy::{can_manage_catalog, require, Requester};
/// use caja_core::Role;
///
/// let cashier = Requester::new("u-1", Role::Cashier);
/// assert!(require(can_manage_catalog(&cashier), "catalog changes need ADMIN").is_err());
/// ```
pub fn require(allowed: bool, reason: &str) -> CoreResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(CoreError::forbidden(reason))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, SaleStatus};
    use chrono::Utc;

    fn sale_owned_by(cashier_id: &str) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s-1".to_string(),
            invoice_number: "FAC-20260101-001".to_string(),
            sold_at: now,
            total_cents: 100,
            payment_method: PaymentMethod::Cash,
            status: SaleStatus::Completed,
            cashier_id: cashier_id.to_string(),
            notes: None,
            cancel_reason: None,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sale_visibility() {
        let admin = Requester::new("admin", Role::Admin);
        let owner = Requester::new("c-1", Role::Cashier);
        let other = Requester::new("c-2", Role::Cashier);
        let sale = sale_owned_by("c-1");

        assert!(can_view_sale(&admin, &sale));
        assert!(can_view_sale(&owner, &sale));
        assert!(!can_view_sale(&other, &sale));

        assert!(can_cancel_sale(&admin, &sale));
        assert!(can_cancel_sale(&owner, &sale));
        assert!(!can_cancel_sale(&other, &sale));
    }

    #[test]
    fn test_only_cashiers_ring_up_sales() {
        assert!(can_create_sale(&Requester::new("c-1", Role::Cashier)));
        assert!(!can_create_sale(&Requester::new("a-1", Role::Admin)));
    }

    #[test]
    fn test_scope_cashier() {
        let admin = Requester::new("admin", Role::Admin);
        let cashier = Requester::new("c-1", Role::Cashier);

        assert_eq!(scope_cashier(&admin, None), None);
        assert_eq!(
            scope_cashier(&admin, Some("c-9".to_string())),
            Some("c-9".to_string())
        );
        assert_eq!(
            scope_cashier(&cashier, Some("c-9".to_string())),
            Some("c-1".to_string())
        );
        assert_eq!(scope_cashier(&cashier, None), Some("c-1".to_string()));
    }

    #[test]
    fn test_account_rules() {
        let admin = Requester::new("admin", Role::Admin);
        let cashier = Requester::new("c-1", Role::Cashier);

        assert!(can_edit_user(&cashier, "c-1"));
        assert!(!can_edit_user(&cashier, "c-2"));
        assert!(!can_change_role(&cashier));
        assert!(can_deactivate_user(&admin, "c-1"));
        assert!(!can_deactivate_user(&admin, "admin"));
        assert!(can_change_password(&cashier, "c-1"));
        assert!(!can_change_password(&admin, "c-1"));
    }

    #[test]
    fn test_require() {
        assert!(require(true, "x").is_ok());
        assert!(matches!(require(false, "x"), Err(CoreError::Forbidden(_))));
    }
}

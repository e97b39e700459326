//! # Domain Types
//!
//! Core domain types used throughout Caja POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  sale_id (FK)   │       │
//! │  │  code (unique)  │   │  invoice_number │   │  product_id     │       │
//! │  │  price_cents    │   │  total_cents    │   │  quantity       │       │
//! │  │  stock >= 0     │   │  status         │   │  unit_price     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │   SaleStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  username       │   │  Pending        │   │  Cash           │       │
//! │  │  role           │   │  Completed      │   │  Card           │       │
//! │  │  is_active      │   │  Canceled       │   │  Transfer       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity has a UUID `id` for relations plus a human-facing business
//! key (product code, invoice number, username).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{
    validate_email, validate_password, validate_price_cents, validate_product_code,
    validate_product_name, validate_stock, validate_username, ValidationResult,
};

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code printed on shelves and scanned at the register.
    pub code: String,

    pub name: String,

    pub description: Option<String>,

    /// Price in cents.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    pub category: Option<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an active product with a fresh id.
    pub fn new(code: &str, name: &str, price_cents: i64, stock: i64) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.to_string(),
            description: None,
            price_cents,
            stock,
            category: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from current stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.is_active && quantity <= self.stock
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_product_code(&self.code)?;
        validate_product_name(&self.name)?;
        validate_price_cents(self.price_cents)?;
        validate_stock(self.stock)
    }
}

/// Partial update of a product. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductChanges {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(code) = &self.code {
            validate_product_code(code)?;
        }
        if let Some(name) = &self.name {
            validate_product_name(name)?;
        }
        if let Some(price) = self.price_cents {
            validate_price_cents(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    /// Applies the changes onto an existing product.
    pub fn apply(self, product: &mut Product) {
        if let Some(code) = self.code {
            product.code = code.trim().to_string();
        }
        if let Some(name) = self.name {
            product.name = name.trim().to_string();
        }
        if self.description.is_some() {
            product.description = self.description;
        }
        if let Some(price) = self.price_cents {
            product.price_cents = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if self.category.is_some() {
            product.category = self.category;
        }
        if let Some(active) = self.is_active {
            product.is_active = active;
        }
    }
}

// =============================================================================
// Role
// =============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum Role {
    /// Full visibility and management across all entities.
    #[serde(rename = "ADMIN")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ADMIN"))]
    Admin,
    /// Rings up sales; sees and cancels only their own.
    #[serde(rename = "CAJERO", alias = "CASHIER")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CAJERO"))]
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Cashier => "CAJERO",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Cashier
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "CAJERO" | "CASHIER" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["ADMIN".to_string(), "CAJERO".to_string()],
            }),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// An account able to sign in. The password hash lives only in the
/// database layer and never travels with this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "Option<String>")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// The cashier block embedded in sale responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Input for creating an account.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl NewUser {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// Partial update of an account. Passwords change through their own
/// operation, never through this type.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }

    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username.trim().to_string();
        }
        if let Some(email) = self.email {
            user.email = email.trim().to_lowercase();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
    }
}

/// Login input.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "username".to_string(),
            });
        }
        if self.password.is_empty() {
            return Err(ValidationError::Required {
                field: "password".to_string(),
            });
        }
        Ok(())
    }
}

/// Self-service password change. The current password must match.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_password(&self.new_password)
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// Sales are created `Completed` and may move to `Canceled` once. `Pending`
/// is kept for filtering compatibility and is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    #[serde(alias = "PENDIENTE")]
    Pending,
    #[serde(alias = "COMPLETADA")]
    Completed,
    #[serde(alias = "CANCELADA")]
    Canceled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "PENDING",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Canceled => "CANCELED",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[serde(alias = "EFECTIVO")]
    Cash,
    #[serde(alias = "TARJETA")]
    Card,
    #[serde(alias = "TRANSFERENCIA")]
    Transfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Transfer => "TRANSFER",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Sale header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    /// Always equals the sum of the line subtotals.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub cashier_id: String,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    #[ts(as = "Option<String>")]
    pub canceled_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.status == SaleStatus::Canceled
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A line in a sale.
/// Product code, name and price are frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Zero-based order of the line within its sale.
    pub position: i64,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// unit_price_cents × quantity
    pub subtotal_cents: i64,
}

impl SaleLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Sale Detail
// =============================================================================

/// Header, lines and cashier summary: what a client receives for one sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
    pub cashier: Option<UserSummary>,
}

impl SaleDetail {
    /// Sum of line subtotals.
    pub fn lines_total(&self) -> Money {
        self.lines.iter().map(SaleLine::subtotal).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

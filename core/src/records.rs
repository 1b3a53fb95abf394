use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BenchError, Result};

pub const USER_NAME_MAX: usize = 50;
pub const USER_ADDRESS_MAX: usize = 100;
pub const PRODUCT_NAME_MAX: usize = 80;
const CPF_DIGITS: usize = 11;
const RG_DIGITS: usize = 8;

/// The record kinds both stores hold.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Users,
    Products,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Users, EntityKind::Products];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::Products => "products",
        }
    }

    /// Key prefix used for the per-record documents (`user:{id}`).
    pub fn document_prefix(&self) -> &'static str {
        match self {
            EntityKind::Users => "user",
            EntityKind::Products => "product",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = BenchError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "users" | "user" => Ok(EntityKind::Users),
            "products" | "product" | "inventory" => Ok(EntityKind::Products),
            other => Err(BenchError::UnknownEntityKind(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Credit,
    Debit,
    Pix,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] =
        [PaymentMethod::Credit, PaymentMethod::Debit, PaymentMethod::Pix];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Credit => "credit",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Pix => "pix",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = BenchError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "credit" => Ok(PaymentMethod::Credit),
            "debit" => Ok(PaymentMethod::Debit),
            "pix" => Ok(PaymentMethod::Pix),
            other => Err(BenchError::invalid(
                "payment_method",
                format!("unsupported method {other:?}"),
            )),
        }
    }
}

/// A customer record. Fields are checked once, in [`User::new`]; a `User`
/// that exists is always storable in both backends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Key shared by both stores. `None` until the first store assigns it.
    pub id: Option<u64>,
    name: String,
    cpf: String,
    rg: String,
    address: String,
    payment_method: PaymentMethod,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        cpf: impl Into<String>,
        rg: impl Into<String>,
        address: impl Into<String>,
        payment_method: PaymentMethod,
    ) -> Result<Self> {
        let name = name.into();
        let cpf = cpf.into();
        let rg = rg.into();
        let address = address.into();

        check_text("name", &name, USER_NAME_MAX)?;
        check_text("address", &address, USER_ADDRESS_MAX)?;
        check_digits("cpf", &cpf, CPF_DIGITS)?;
        check_digits("rg", &rg, RG_DIGITS)?;

        Ok(User {
            id: None,
            name,
            cpf,
            rg,
            address,
            payment_method,
        })
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpf(&self) -> &str {
        &self.cpf
    }

    pub fn rg(&self) -> &str {
        &self.rg
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }
}

/// An inventory item. Stock is unsigned; decrements that would take it
/// below zero are skipped by the stores.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: Option<u64>,
    name: String,
    price_cents: u32,
    stock: u32,
}

impl Product {
    pub fn new(name: impl Into<String>, price_cents: u32, stock: u32) -> Result<Self> {
        let name = name.into();
        check_text("name", &name, PRODUCT_NAME_MAX)?;
        if price_cents == 0 {
            return Err(BenchError::invalid("price_cents", "must be positive"));
        }

        Ok(Product {
            id: None,
            name,
            price_cents,
            stock,
        })
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price_cents(&self) -> u32 {
        self.price_cents
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }
}

/// One conditional decrement: `stock -= delta` where `stock >= delta`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub key: u64,
    pub delta: u32,
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BenchError::invalid(field, "must not be empty"));
    }
    let len = value.chars().count();
    if len > max {
        return Err(BenchError::invalid(
            field,
            format!("{len} characters exceeds the limit of {max}"),
        ));
    }
    Ok(())
}

fn check_digits(field: &'static str, value: &str, expected: usize) -> Result<()> {
    if value.len() != expected || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BenchError::invalid(
            field,
            format!("expected exactly {expected} digits, got {value:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_user() -> Result<User> {
        User::new(
            "Maria Souza",
            "52998224725",
            "12345678",
            "Rua das Flores, 10, Centro - Recife/PE",
            PaymentMethod::Pix,
        )
    }

    #[test]
    fn user_accepts_well_formed_fields() {
        let user = valid_user().unwrap();
        assert_eq!(user.id, None);
        assert_eq!(user.cpf(), "52998224725");
        assert_eq!(user.with_id(7).id, Some(7));
    }

    #[test]
    fn user_rejects_bad_document_numbers() {
        let err = User::new("A", "123.456.789-09", "12345678", "x", PaymentMethod::Debit);
        assert!(matches!(
            err,
            Err(BenchError::InvalidRecord { field: "cpf", .. })
        ));

        let err = User::new("A", "52998224725", "1234", "x", PaymentMethod::Debit);
        assert!(matches!(
            err,
            Err(BenchError::InvalidRecord { field: "rg", .. })
        ));
    }

    #[test]
    fn user_enforces_length_limits() {
        let long_name = "a".repeat(USER_NAME_MAX + 1);
        let err = User::new(long_name, "52998224725", "12345678", "x", PaymentMethod::Credit);
        assert!(matches!(
            err,
            Err(BenchError::InvalidRecord { field: "name", .. })
        ));

        let exact = "é".repeat(USER_NAME_MAX);
        assert!(User::new(exact, "52998224725", "12345678", "x", PaymentMethod::Credit).is_ok());
    }

    #[test]
    fn product_requires_positive_price() {
        assert!(Product::new("Lamp", 0, 3).is_err());
        let product = Product::new("Lamp", 1999, 3).unwrap();
        assert_eq!(product.stock(), 3);
    }

    #[test]
    fn entity_kind_parses_path_segments() {
        assert_eq!("users".parse::<EntityKind>().unwrap(), EntityKind::Users);
        assert_eq!(" Products ".parse::<EntityKind>().unwrap(), EntityKind::Products);
        assert!(matches!(
            "orders".parse::<EntityKind>(),
            Err(BenchError::UnknownEntityKind(_))
        ));
    }

    #[test]
    fn payment_method_round_trips_through_str() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
    }
}

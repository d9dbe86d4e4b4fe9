use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::{Deserialize, Serialize, Serializer};

use super::errors::FormError;

/// Unit of measure offered for a product line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "un")]
    Unit,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "cx")]
    Box,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::Unit, Unit::Kilogram, Unit::Meter, Unit::Box];

    pub fn code(self) -> &'static str {
        match self {
            Unit::Unit => "un",
            Unit::Kilogram => "kg",
            Unit::Meter => "m",
            Unit::Box => "cx",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Unit {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|u| u.code() == s)
            .ok_or_else(|| FormError::InvalidValue(format!("unknown unit '{s}'")))
    }
}

/// Opaque handle for a product row. Handles are never reused within a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowHandle(pub u64);

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partial initial values for a new row.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub description: Option<String>,
    pub unit: Option<Unit>,
    pub quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
}

/// A row as the user is editing it. `None` means the input is blank.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    handle: RowHandle,
    description: String,
    unit: Option<Unit>,
    quantity: Option<BigDecimal>,
    unit_price: Option<BigDecimal>,
    total: BigDecimal,
}

impl ProductRow {
    fn blank(handle: RowHandle) -> Self {
        Self {
            handle,
            description: String::new(),
            unit: None,
            quantity: None,
            unit_price: None,
            total: line_total(None, None),
        }
    }

    pub fn handle(&self) -> RowHandle {
        self.handle
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    pub fn quantity(&self) -> Option<&BigDecimal> {
        self.quantity.as_ref()
    }

    pub fn unit_price(&self) -> Option<&BigDecimal> {
        self.unit_price.as_ref()
    }

    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    pub fn is_complete(&self) -> bool {
        !self.description.trim().is_empty()
            && self.unit.is_some()
            && self.quantity.is_some()
            && self.unit_price.is_some()
    }

    fn recompute(&mut self) {
        self.total = line_total(self.quantity.as_ref(), self.unit_price.as_ref());
        log::debug!("product row {} total recomputed to {}", self.handle, self.total);
    }

    fn entry(&self) -> Option<ProductEntry> {
        if !self.is_complete() {
            return None;
        }
        Some(ProductEntry {
            description: self.description.trim().to_string(),
            unit: self.unit?,
            quantity: self.quantity.clone()?,
            unit_price: self.unit_price.clone()?,
            total: self.total.clone(),
        })
    }
}

/// A completed product line as it appears in the emitted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEntry {
    pub description: String,
    pub unit: Unit,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    #[serde(serialize_with = "serialize_money")]
    pub total: BigDecimal,
}

/// Largest accepted quantity or unit price, in digits before the point.
pub const MAX_INTEGER_DIGITS: i64 = 12;
/// Finest accepted quantity or unit price, in digits after the point.
pub const MAX_FRACTION_DIGITS: i64 = 6;

/// `round(quantity * unit_price, 2)`, blank inputs counting as zero.
pub fn line_total(quantity: Option<&BigDecimal>, unit_price: Option<&BigDecimal>) -> BigDecimal {
    match (quantity, unit_price) {
        (Some(q), Some(p)) => (q * p).with_scale_round(2, RoundingMode::HalfUp),
        _ => BigDecimal::zero().with_scale(2),
    }
}

/// Renders an amount with exactly two decimals. `BigDecimal` prints zero as
/// `0` whatever its scale, so zero is spelled out.
pub fn format_money(value: &BigDecimal) -> String {
    let rounded = value.with_scale_round(2, RoundingMode::HalfUp);
    if rounded.is_zero() {
        return "0.00".to_string();
    }
    rounded.to_string()
}

fn serialize_money<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_money(value))
}

fn checked_amount(field: &str, value: Option<BigDecimal>) -> Result<Option<BigDecimal>, FormError> {
    let Some(v) = value else {
        return Ok(None);
    };
    if v < BigDecimal::zero() {
        return Err(FormError::InvalidValue(format!(
            "{field} must not be negative (got {v})"
        )));
    }
    // Exponent notation counts too: `1e3000000` has one digit but is huge.
    let normalized = v.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    let integer_digits = normalized.digits() as i64 - scale;
    if scale > MAX_FRACTION_DIGITS || integer_digits > MAX_INTEGER_DIGITS {
        return Err(FormError::InvalidValue(format!(
            "{field} is out of range (at most {MAX_INTEGER_DIGITS} digits before \
             and {MAX_FRACTION_DIGITS} after the decimal point)"
        )));
    }
    Ok(Some(v))
}

/// Ordered, mutable list of product rows.
///
/// Keeping at least one row present is the caller's job; this list will
/// happily become empty and then refuses to validate.
#[derive(Debug, Clone, Default)]
pub struct ProductList {
    rows: Vec<ProductRow>,
    next_handle: u64,
}

impl ProductList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, initial: ProductDraft) -> Result<RowHandle, FormError> {
        let quantity = checked_amount("quantity", initial.quantity)?;
        let unit_price = checked_amount("unitPrice", initial.unit_price)?;

        self.next_handle += 1;
        let handle = RowHandle(self.next_handle);
        let mut row = ProductRow::blank(handle);
        row.description = initial.description.unwrap_or_default();
        row.unit = initial.unit;
        row.quantity = quantity;
        row.unit_price = unit_price;
        row.recompute();
        self.rows.push(row);
        Ok(handle)
    }

    pub fn add_blank_row(&mut self) -> RowHandle {
        self.next_handle += 1;
        let handle = RowHandle(self.next_handle);
        self.rows.push(ProductRow::blank(handle));
        handle
    }

    pub fn remove_row(&mut self, handle: RowHandle) -> Result<(), FormError> {
        let idx = self.position(handle)?;
        self.rows.remove(idx);
        Ok(())
    }

    pub fn set_description(&mut self, handle: RowHandle, description: impl Into<String>) -> Result<(), FormError> {
        self.row_mut(handle)?.description = description.into();
        Ok(())
    }

    pub fn set_unit(&mut self, handle: RowHandle, unit: Option<Unit>) -> Result<(), FormError> {
        self.row_mut(handle)?.unit = unit;
        Ok(())
    }

    pub fn set_quantity(&mut self, handle: RowHandle, value: Option<BigDecimal>) -> Result<(), FormError> {
        let value = checked_amount("quantity", value)?;
        let row = self.row_mut(handle)?;
        row.quantity = value;
        row.recompute();
        Ok(())
    }

    pub fn set_unit_price(&mut self, handle: RowHandle, value: Option<BigDecimal>) -> Result<(), FormError> {
        let value = checked_amount("unitPrice", value)?;
        let row = self.row_mut(handle)?;
        row.unit_price = value;
        row.recompute();
        Ok(())
    }

    pub fn get(&self, handle: RowHandle) -> Option<&ProductRow> {
        self.rows.iter().find(|r| r.handle == handle)
    }

    pub fn rows(&self) -> &[ProductRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fails on the first problem: an empty list, then the first incomplete row.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.rows.is_empty() {
            return Err(FormError::NoProducts);
        }
        match self.rows.iter().position(|r| !r.is_complete()) {
            Some(idx) => Err(FormError::IncompleteProduct(idx)),
            None => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn snapshot(&self) -> Result<Vec<ProductEntry>, FormError> {
        self.validate()?;
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| row.entry().ok_or(FormError::IncompleteProduct(idx)))
            .collect()
    }

    fn position(&self, handle: RowHandle) -> Result<usize, FormError> {
        self.rows
            .iter()
            .position(|r| r.handle == handle)
            .ok_or_else(|| FormError::NotFound(format!("Product row {handle}")))
    }

    fn row_mut(&mut self, handle: RowHandle) -> Result<&mut ProductRow, FormError> {
        let idx = self.position(handle)?;
        Ok(&mut self.rows[idx])
    }
}

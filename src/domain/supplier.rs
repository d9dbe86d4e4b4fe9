use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::attachment::Attachment;
use super::product::ProductEntry;

/// Raw identity, address and contact values as currently entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SupplierFields {
    pub legal_name: String,
    pub trade_name: String,
    pub tax_id: String,
    pub state_registration: String,
    pub municipal_registration: String,
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub contact_name: String,
    pub phone: String,
    pub email: String,
}

impl SupplierFields {
    /// First required field that is blank after trimming, in check order.
    pub fn first_missing(&self) -> Option<RequiredField> {
        RequiredField::ALL
            .into_iter()
            .find(|f| f.value(self).trim().is_empty())
    }

    pub fn apply_address(&mut self, fragment: &AddressFragment) {
        self.street = fragment.street.clone();
        self.district = fragment.district.clone();
        self.city = fragment.city.clone();
        self.state = fragment.state.clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    LegalName,
    TaxId,
    TradeName,
    PostalCode,
    Street,
    ContactName,
    Phone,
    Email,
}

impl RequiredField {
    pub const ALL: [RequiredField; 8] = [
        RequiredField::LegalName,
        RequiredField::TaxId,
        RequiredField::TradeName,
        RequiredField::PostalCode,
        RequiredField::Street,
        RequiredField::ContactName,
        RequiredField::Phone,
        RequiredField::Email,
    ];

    /// Wire name of the field, matching the `SupplierFields` JSON keys.
    pub fn name(self) -> &'static str {
        match self {
            RequiredField::LegalName => "legalName",
            RequiredField::TaxId => "taxId",
            RequiredField::TradeName => "tradeName",
            RequiredField::PostalCode => "postalCode",
            RequiredField::Street => "street",
            RequiredField::ContactName => "contactName",
            RequiredField::Phone => "phone",
            RequiredField::Email => "email",
        }
    }

    pub fn value(self, fields: &SupplierFields) -> &str {
        match self {
            RequiredField::LegalName => &fields.legal_name,
            RequiredField::TaxId => &fields.tax_id,
            RequiredField::TradeName => &fields.trade_name,
            RequiredField::PostalCode => &fields.postal_code,
            RequiredField::Street => &fields.street,
            RequiredField::ContactName => &fields.contact_name,
            RequiredField::Phone => &fields.phone,
            RequiredField::Email => &fields.email,
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An eight-digit postal code with formatting characters stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalCode(String);

impl PostalCode {
    pub const DIGITS: usize = 8;

    /// Returns `None` unless exactly eight digits remain after stripping.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        (digits.len() == Self::DIGITS).then_some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address parts resolved from a postal code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFragment {
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
}

// ── Emitted document ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub district: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactRecord {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRecord {
    pub legal_name: String,
    pub trade_name: String,
    pub tax_id: String,
    pub state_registration: String,
    pub municipal_registration: String,
    pub address: AddressRecord,
    pub contact: ContactRecord,
}

impl From<&SupplierFields> for SupplierRecord {
    fn from(f: &SupplierFields) -> Self {
        Self {
            legal_name: f.legal_name.clone(),
            trade_name: f.trade_name.clone(),
            tax_id: f.tax_id.clone(),
            state_registration: f.state_registration.clone(),
            municipal_registration: f.municipal_registration.clone(),
            address: AddressRecord {
                postal_code: f.postal_code.clone(),
                street: f.street.clone(),
                number: f.number.clone(),
                complement: f.complement.clone(),
                district: f.district.clone(),
                city: f.city.clone(),
                state: f.state.clone(),
            },
            contact: ContactRecord {
                name: f.contact_name.clone(),
                phone: f.phone.clone(),
                email: f.email.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub created_at: DateTime<Utc>,
}

/// Immutable snapshot produced by a successful save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierDocument {
    supplier: SupplierRecord,
    products: Vec<ProductEntry>,
    attachments: Vec<Attachment>,
    meta: DocumentMeta,
}

impl SupplierDocument {
    pub(crate) fn new(
        supplier: SupplierRecord,
        products: Vec<ProductEntry>,
        attachments: Vec<Attachment>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            supplier,
            products,
            attachments,
            meta: DocumentMeta { created_at },
        }
    }

    pub fn supplier(&self) -> &SupplierRecord {
        &self.supplier
    }

    pub fn products(&self) -> &[ProductEntry] {
        &self.products
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.meta.created_at
    }
}

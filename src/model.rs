use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One editable row of the invoice. Price and quantity are kept as plain
/// f64s; form text is coerced through `parse_number_or_zero` before it
/// lands here, so both are always finite.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LineItem {
    pub name: String,
    pub hsn_code: String,
    pub unit_price: f64,
    pub quantity: f64,
}

impl Default for LineItem {
    fn default() -> Self {
        LineItem {
            name: String::new(),
            hsn_code: String::new(),
            unit_price: 0.0,
            quantity: 1.0,
        }
    }
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        self.unit_price * self.quantity
    }
}

/// Which field of a line item an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Name,
    HsnCode,
    UnitPrice,
    Quantity,
}

/// The invoice ledger: header fields plus the ordered item rows. Totals are
/// derived on every call, never cached.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ledger {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub items: Vec<LineItem>,
    pub tax_rate_percent: f64,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger {
            invoice_number: "123".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            items: vec![LineItem::default()],
            tax_rate_percent: 9.0,
        }
    }
}

impl Ledger {
    /// Appends a fresh default row (empty name/code, price 0, quantity 1).
    pub fn add_item(&mut self) {
        self.items.push(LineItem::default());
    }

    /// Removes the row at `index`. Out-of-range indices are a silent no-op.
    pub fn remove_item(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    /// Applies a single field edit to the row at `index`. Text fields are
    /// stored verbatim; numeric fields are coerced, never rejected.
    /// Out-of-range indices are a silent no-op.
    pub fn update_item(&mut self, index: usize, field: ItemField, raw: &str) {
        let Some(item) = self.items.get_mut(index) else {
            return;
        };
        match field {
            ItemField::Name => item.name = raw.to_string(),
            ItemField::HsnCode => item.hsn_code = raw.to_string(),
            ItemField::UnitPrice => item.unit_price = parse_number_or_zero(raw),
            ItemField::Quantity => item.quantity = parse_number_or_zero(raw),
        }
    }

    pub fn set_tax_rate(&mut self, raw: &str) {
        self.tax_rate_percent = parse_number_or_zero(raw);
    }

    /// Sum of price × quantity over all rows; 0 for an empty ledger.
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|item| item.amount()).sum()
    }

    /// One tax component. The invoice shows this twice, once as SGST and
    /// once as CGST, each at the configured rate.
    pub fn tax_amount(&self) -> f64 {
        self.subtotal() * self.tax_rate_percent / 100.0
    }

    /// Grand total. The rate is applied twice on purpose: the single
    /// configured percentage is split into two equal state/central
    /// components, and both are added to the subtotal.
    pub fn total(&self) -> f64 {
        self.subtotal() + 2.0 * self.tax_amount()
    }
}

/// Uniform coercion for numeric form fields: empty, unparsable or
/// non-finite text all become 0. There is no validation-error state.
pub fn parse_number_or_zero(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

// ==========================================
// Company profile (sender.toml)
// ==========================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BankDetails {
    pub name: String,
    pub account_no: String,
    pub ifsc: String,
    pub holder: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SenderConfig {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub gstin: String,
    pub state: String,
    pub bank: BankDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BillToConfig {
    pub name: String,
    pub address: String,
    pub gstin: String,
    pub state: String,
    pub place_of_supply: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompanyProfile {
    pub sender: SenderConfig,
    pub bill_to: BillToConfig,
}

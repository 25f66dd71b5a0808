use serde::Serialize;
use slug::slugify;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tera::{Context, Tera};
use thiserror::Error;

use crate::model::{BillToConfig, Ledger, SenderConfig};

// Embed template at compile time to ensure availability
const DEFAULT_TEMPLATE: &str = include_str!("../templates/invoice.tera");

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("'typst' is not installed or not on PATH")]
    TypstMissing,
    #[error("typst compilation failed for {0}")]
    Compile(PathBuf),
}

/// Everything the template sees. Monetary values arrive pre-formatted to
/// two decimals; arithmetic stays in the ledger.
#[derive(Serialize)]
struct InvoiceContext {
    invoice_no: String,
    date: String,
    sender: SenderConfig,
    bill_to: BillToConfig,
    items: Vec<ItemRow>,
    tax_rate: String,
    subtotal: String,
    tax_line: String,
    total: String,
    signature_file: Option<String>,
}

#[derive(Serialize)]
struct ItemRow {
    name: String,
    hsn_code: String,
    quantity: String,
    unit_price: String,
    amount: String,
}

fn fmt_money(v: f64) -> String {
    format!("{:.2}", v)
}

// Quantities are usually whole numbers; only show decimals when present.
fn fmt_quantity(q: f64) -> String {
    if q.fract() == 0.0 {
        format!("{}", q as i64)
    } else {
        format!("{}", q)
    }
}

fn fmt_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        format!("{}", rate as i64)
    } else {
        format!("{}", rate)
    }
}

fn build_context(
    ledger: &Ledger,
    sender: &SenderConfig,
    bill_to: &BillToConfig,
    signature_file: Option<String>,
) -> InvoiceContext {
    let items = ledger
        .items
        .iter()
        .map(|item| ItemRow {
            name: item.name.clone(),
            hsn_code: item.hsn_code.clone(),
            quantity: fmt_quantity(item.quantity),
            unit_price: fmt_money(item.unit_price),
            amount: fmt_money(item.amount()),
        })
        .collect();

    InvoiceContext {
        invoice_no: ledger.invoice_number.clone(),
        date: ledger.date.format("%Y-%m-%d").to_string(),
        sender: sender.clone(),
        bill_to: bill_to.clone(),
        items,
        tax_rate: fmt_rate(ledger.tax_rate_percent),
        subtotal: fmt_money(ledger.subtotal()),
        tax_line: fmt_money(ledger.tax_amount()),
        total: fmt_money(ledger.total()),
        signature_file,
    }
}

/// File stem for the exported artifacts, carrying the invoice number.
fn file_stem(invoice_no: &str) -> String {
    let slug = slugify(invoice_no);
    if slug.is_empty() {
        "Invoice".to_string()
    } else {
        format!("Invoice_{}", slug)
    }
}

/// Renders the current ledger + committed signature into a Typst source and
/// compiles it to `<root>/output/Invoice_<no>.pdf`. The caller treats this
/// as fire-and-forget; the returned path is only logged.
pub fn export_invoice(
    root: &Path,
    sender: &SenderConfig,
    bill_to: &BillToConfig,
    ledger: &Ledger,
    signature_png: Option<&[u8]>,
) -> Result<PathBuf, ExportError> {
    if Command::new("typst").arg("--version").output().is_err() {
        return Err(ExportError::TypstMissing);
    }

    // Seed the on-disk template on first use so it stays user-editable.
    let template_dir = root.join("templates");
    fs::create_dir_all(&template_dir)?;
    let template_path = template_dir.join("invoice.tera");
    if !template_path.exists() {
        fs::write(&template_path, DEFAULT_TEMPLATE)?;
    }

    let glob = template_dir.join("*.tera");
    let tera = Tera::new(&glob.to_string_lossy())?;

    let output_dir = root.join("output");
    fs::create_dir_all(&output_dir)?;

    let stem = file_stem(&ledger.invoice_number);
    let typ_path = output_dir.join(format!("{}.typ", stem));
    let pdf_path = output_dir.join(format!("{}.pdf", stem));

    let signature_file = match signature_png {
        Some(png) => {
            let name = format!("{}_signature.png", stem);
            fs::write(output_dir.join(&name), png)?;
            Some(name)
        }
        None => None,
    };

    let context_data = build_context(ledger, sender, bill_to, signature_file);
    let context = Context::from_serialize(&context_data)?;
    let rendered = tera.render("invoice.tera", &context)?;
    fs::write(&typ_path, rendered)?;

    let status = Command::new("typst")
        .arg("compile")
        .arg(&typ_path)
        .arg(&pdf_path)
        .status()?;
    if !status.success() {
        return Err(ExportError::Compile(typ_path));
    }

    Ok(pdf_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BankDetails, LineItem};

    fn sample_sender() -> SenderConfig {
        SenderConfig {
            name: "N.M Engineering Works".into(),
            address: "Madanpura, Mumbai -08".into(),
            phone: "9123475693".into(),
            email: "works@example.com".into(),
            gstin: "27CBCPA2390G1Z0".into(),
            state: "27-Maharashtra".into(),
            bank: BankDetails {
                name: "Axis Bank, Dadar West".into(),
                account_no: "920020069841012".into(),
                ifsc: "UTIB0001902".into(),
                holder: "N.M Engineering Works".into(),
            },
        }
    }

    fn sample_bill_to() -> BillToConfig {
        BillToConfig {
            name: "Mazagon Dock Ship Builders LTD".into(),
            address: "Dockyard Road, Mazgaon".into(),
            gstin: "27AAACM8029J1ZA".into(),
            state: "27-Maharashtra".into(),
            place_of_supply: "27-Maharashtra".into(),
        }
    }

    fn sample_ledger() -> Ledger {
        Ledger {
            items: vec![LineItem {
                name: "Bolt".into(),
                hsn_code: "7318".into(),
                unit_price: 10.0,
                quantity: 5.0,
            }],
            tax_rate_percent: 9.0,
            ..Ledger::default()
        }
    }

    fn render(signature: Option<String>) -> String {
        let ctx = build_context(&sample_ledger(), &sample_sender(), &sample_bill_to(), signature);
        let mut tera = Tera::default();
        tera.add_raw_template("invoice.tera", DEFAULT_TEMPLATE)
            .expect("embedded template parses");
        tera.render("invoice.tera", &Context::from_serialize(&ctx).unwrap())
            .expect("embedded template renders")
    }

    #[test]
    fn rendered_invoice_carries_both_tax_lines() {
        let out = render(None);
        assert!(out.contains("SGST (9%)"));
        assert!(out.contains("CGST (9%)"));
        // one component each, doubled into the total
        assert_eq!(out.matches("4.50").count(), 2);
        assert!(out.contains("50.00"));
        assert!(out.contains("59.00"));
    }

    #[test]
    fn rendered_invoice_lists_item_rows() {
        let out = render(None);
        assert!(out.contains("Bolt"));
        assert!(out.contains("7318"));
        assert!(out.contains("10.00"));
    }

    #[test]
    fn signature_image_only_when_committed() {
        let with = render(Some("Invoice_123_signature.png".into()));
        assert!(with.contains("Invoice_123_signature.png"));
        let without = render(None);
        assert!(!without.contains("_signature.png"));
    }

    #[test]
    fn file_stem_embeds_the_invoice_number() {
        assert_eq!(file_stem("123"), "Invoice_123");
        assert_eq!(file_stem("INV 2025/07"), "Invoice_inv-2025-07");
        assert_eq!(file_stem(""), "Invoice");
    }

    #[test]
    fn quantities_drop_trailing_decimals() {
        assert_eq!(fmt_quantity(5.0), "5");
        assert_eq!(fmt_quantity(2.5), "2.5");
        assert_eq!(fmt_rate(9.0), "9");
        assert_eq!(fmt_rate(8.875), "8.875");
    }
}

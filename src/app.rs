use eframe::egui;
use std::path::PathBuf;
use std::thread;

use crate::export;
use crate::model::{CompanyProfile, ItemField, Ledger};
use crate::signature::{PAD_HEIGHT, PAD_WIDTH, SignaturePad};

/// Raw text buffers backing one item row of the form. Every edit is pushed
/// through `Ledger::update_item`, so the coercion policy lives in one place
/// and the ledger never sees un-coerced text.
struct ItemDraft {
    name: String,
    hsn_code: String,
    unit_price: String,
    quantity: String,
}

impl ItemDraft {
    fn from_item(item: &crate::model::LineItem) -> Self {
        ItemDraft {
            name: item.name.clone(),
            hsn_code: item.hsn_code.clone(),
            unit_price: format!("{}", item.unit_price),
            quantity: format!("{}", item.quantity),
        }
    }
}

pub struct InvoicePadApp {
    root: PathBuf,
    profile: CompanyProfile,
    ledger: Ledger,
    drafts: Vec<ItemDraft>,
    tax_rate_buf: String,
    date_buf: String,
    pad: SignaturePad,
    pad_texture: Option<egui::TextureHandle>,
    pad_dirty: bool,
    committed_texture: Option<egui::TextureHandle>,
}

impl InvoicePadApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, root: PathBuf, profile: CompanyProfile) -> Self {
        let ledger = Ledger::default();
        let drafts = ledger.items.iter().map(ItemDraft::from_item).collect();
        let tax_rate_buf = format!("{}", ledger.tax_rate_percent);
        let date_buf = ledger.date.format("%Y-%m-%d").to_string();
        InvoicePadApp {
            root,
            profile,
            ledger,
            drafts,
            tax_rate_buf,
            date_buf,
            pad: SignaturePad::default(),
            pad_texture: None,
            pad_dirty: false,
            committed_texture: None,
        }
    }

    // ==========================================
    // Form
    // ==========================================

    fn ui_header_fields(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Invoice No.:");
            ui.add(egui::TextEdit::singleline(&mut self.ledger.invoice_number).desired_width(80.0));
            ui.label("Date:");
            let resp =
                ui.add(egui::TextEdit::singleline(&mut self.date_buf).desired_width(100.0));
            if resp.changed() {
                // a half-typed date keeps the last valid one; no error state
                if let Ok(date) = chrono::NaiveDate::parse_from_str(&self.date_buf, "%Y-%m-%d") {
                    self.ledger.date = date;
                }
            }
            ui.label("GST Rate (%):");
            let resp =
                ui.add(egui::TextEdit::singleline(&mut self.tax_rate_buf).desired_width(60.0));
            if resp.changed() {
                self.ledger.set_tax_rate(&self.tax_rate_buf);
            }
        });
    }

    fn ui_item_grid(&mut self, ui: &mut egui::Ui) {
        let mut remove: Option<usize> = None;
        egui::Grid::new("item-rows")
            .num_columns(5)
            .spacing([8.0, 4.0])
            .striped(true)
            .show(ui, |ui| {
                ui.strong("Item Name");
                ui.strong("HSN/SAC");
                ui.strong("Price");
                ui.strong("Quantity");
                ui.strong("Actions");
                ui.end_row();

                for index in 0..self.drafts.len() {
                    if ui
                        .add(
                            egui::TextEdit::singleline(&mut self.drafts[index].name)
                                .desired_width(180.0),
                        )
                        .changed()
                    {
                        let raw = self.drafts[index].name.clone();
                        self.ledger.update_item(index, ItemField::Name, &raw);
                    }
                    if ui
                        .add(
                            egui::TextEdit::singleline(&mut self.drafts[index].hsn_code)
                                .desired_width(80.0),
                        )
                        .changed()
                    {
                        let raw = self.drafts[index].hsn_code.clone();
                        self.ledger.update_item(index, ItemField::HsnCode, &raw);
                    }
                    if ui
                        .add(
                            egui::TextEdit::singleline(&mut self.drafts[index].unit_price)
                                .desired_width(70.0),
                        )
                        .changed()
                    {
                        let raw = self.drafts[index].unit_price.clone();
                        self.ledger.update_item(index, ItemField::UnitPrice, &raw);
                    }
                    if ui
                        .add(
                            egui::TextEdit::singleline(&mut self.drafts[index].quantity)
                                .desired_width(50.0),
                        )
                        .changed()
                    {
                        let raw = self.drafts[index].quantity.clone();
                        self.ledger.update_item(index, ItemField::Quantity, &raw);
                    }
                    if ui.button("Remove").clicked() {
                        remove = Some(index);
                    }
                    ui.end_row();
                }
            });

        if let Some(index) = remove {
            self.ledger.remove_item(index);
            if index < self.drafts.len() {
                self.drafts.remove(index);
            }
        }

        if ui.button("Add Item").clicked() {
            self.ledger.add_item();
            if let Some(item) = self.ledger.items.last() {
                self.drafts.push(ItemDraft::from_item(item));
            }
        }
    }

    // ==========================================
    // Signature pad
    // ==========================================

    fn ui_signature(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.strong("Draw Your Signature");

        let size = egui::vec2(PAD_WIDTH as f32, PAD_HEIGHT as f32);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::drag());
        let rect = response.rect;

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = pos - rect.min;
                self.pad.begin_stroke(p.x, p.y);
                self.pad_dirty = true;
            }
        } else if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = pos - rect.min;
                self.pad.extend_stroke(p.x, p.y);
                self.pad_dirty = true;
            }
        }
        if response.drag_stopped() {
            self.pad.end_stroke();
        }

        painter.rect_filled(rect, egui::CornerRadius::ZERO, egui::Color32::WHITE);
        let texture_id = self.pad_texture_id(ctx);
        painter.image(
            texture_id,
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
        painter.rect_stroke(
            rect,
            egui::CornerRadius::ZERO,
            egui::Stroke::new(1.0, egui::Color32::BLACK),
            egui::StrokeKind::Inside,
        );

        ui.horizontal(|ui| {
            if ui.button("Save Signature").clicked() {
                self.pad.save();
                self.committed_texture = self
                    .pad
                    .committed_image()
                    .and_then(|png| load_png_texture(ctx, png));
            }
            if ui.button("Clear").clicked() {
                self.pad.clear();
                self.pad_dirty = true;
                self.committed_texture = None;
            }
        });
    }

    fn pad_texture_id(&mut self, ctx: &egui::Context) -> egui::TextureId {
        if self.pad_dirty || self.pad_texture.is_none() {
            let image = egui::ColorImage::from_rgba_unmultiplied(
                [PAD_WIDTH as usize, PAD_HEIGHT as usize],
                self.pad.rgba_bytes(),
            );
            match &mut self.pad_texture {
                Some(tex) => tex.set(image, egui::TextureOptions::NEAREST),
                None => {
                    self.pad_texture =
                        Some(ctx.load_texture("signature-pad", image, egui::TextureOptions::NEAREST))
                }
            }
            self.pad_dirty = false;
        }
        match &self.pad_texture {
            Some(tex) => tex.id(),
            None => egui::TextureId::default(),
        }
    }

    // ==========================================
    // Preview
    // ==========================================

    fn ui_preview(&self, ui: &mut egui::Ui) {
        let sender = &self.profile.sender;
        let bill_to = &self.profile.bill_to;

        ui.vertical_centered(|ui| {
            ui.heading(&sender.name);
            ui.label(&sender.address);
            ui.label(format!("Phone: {} | Email: {}", sender.phone, sender.email));
            ui.label(format!("GSTIN: {} | State: {}", sender.gstin, sender.state));
        });
        ui.separator();

        ui.strong("COTATION");
        ui.label(format!("To {}", bill_to.name));
        ui.label(&bill_to.address);
        ui.label(format!(
            "GSTIN Number: {} | State: {}",
            bill_to.gstin, bill_to.state
        ));
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            ui.label(format!("Invoice No.: {}", self.ledger.invoice_number));
            ui.label(format!("Date: {}", self.ledger.date.format("%Y-%m-%d")));
            ui.label(format!("Place of Supply: {}", bill_to.place_of_supply));
        });
        ui.add_space(4.0);

        egui::Grid::new("preview-items")
            .num_columns(5)
            .spacing([16.0, 4.0])
            .striped(true)
            .show(ui, |ui| {
                ui.strong("Item Name");
                ui.strong("HSN/SAC");
                ui.strong("Quantity");
                ui.strong("Price/Unit");
                ui.strong("Amount");
                ui.end_row();
                for item in &self.ledger.items {
                    ui.label(&item.name);
                    ui.label(&item.hsn_code);
                    ui.label(format!("{}", item.quantity));
                    ui.label(format!("₹{:.2}", item.unit_price));
                    ui.label(format!("₹{:.2}", item.amount()));
                    ui.end_row();
                }
            });
        ui.add_space(6.0);

        ui.horizontal_top(|ui| {
            ui.vertical(|ui| {
                ui.strong("Bank Details");
                ui.label(format!("Bank Name: {}", sender.bank.name));
                ui.label(format!("Bank Account No: {}", sender.bank.account_no));
                ui.label(format!("IFSC Code: {}", sender.bank.ifsc));
                ui.label(format!("Account Holder Name: {}", sender.bank.holder));
            });
            ui.add_space(32.0);
            ui.vertical(|ui| {
                let rate = self.ledger.tax_rate_percent;
                ui.label(format!("Subtotal: ₹{:.2}", self.ledger.subtotal()));
                ui.label(format!("SGST ({}%): ₹{:.2}", rate, self.ledger.tax_amount()));
                ui.label(format!("CGST ({}%): ₹{:.2}", rate, self.ledger.tax_amount()));
                ui.strong(format!("Total: ₹{:.2}", self.ledger.total()));
                ui.add_space(6.0);
                if let Some(tex) = &self.committed_texture {
                    ui.image((tex.id(), tex.size_vec2() * 0.5));
                }
                ui.label("Authorized Signature");
            });
        });
    }

    // ==========================================
    // Export (fire-and-forget)
    // ==========================================

    fn spawn_export(&self) {
        let root = self.root.clone();
        let sender = self.profile.sender.clone();
        let bill_to = self.profile.bill_to.clone();
        let ledger = self.ledger.clone();
        let signature = self.pad.committed_image().map(|png| png.to_vec());
        thread::spawn(move || {
            match export::export_invoice(&root, &sender, &bill_to, &ledger, signature.as_deref()) {
                Ok(path) => log::info!("invoice written to {}", path.display()),
                Err(err) => log::error!("export failed: {}", err),
            }
        });
    }
}

impl eframe::App for InvoicePadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Invoice Pad");
                ui.add_space(6.0);

                self.ui_header_fields(ui);
                ui.add_space(6.0);
                self.ui_item_grid(ui);
                ui.add_space(10.0);

                self.ui_signature(ui, ctx);
                ui.add_space(10.0);
                ui.separator();

                self.ui_preview(ui);
                ui.add_space(10.0);

                if ui.button("Download Invoice").clicked() {
                    self.spawn_export();
                }
            });
        });
    }
}

fn load_png_texture(ctx: &egui::Context, png: &[u8]) -> Option<egui::TextureHandle> {
    let decoded = image::load_from_memory(png).ok()?.to_rgba8();
    let (w, h) = decoded.dimensions();
    let image =
        egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], decoded.as_raw());
    Some(ctx.load_texture("signature-committed", image, egui::TextureOptions::LINEAR))
}

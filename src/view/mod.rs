//! Projection of the session into renderable rows, and reconciliation of
//! input events back into it.
//!
//! The session is the single source of truth. Both presentation variants
//! (full table and compact layout) render the same [`RowView`], so mirrored
//! inputs cannot diverge: an edit lands in the model, the shared row text is
//! updated once, and every mirror reads it from there. All events funnel
//! through [`TableView::apply`] — there is no per-render listener wiring to
//! duplicate.

use crate::core::{NotaError, TaxId};
use crate::format::{
    format_currency, format_quantity, is_valid_cnpj14, mask_cnpj, parse_locale_number,
    to_input_text,
};
use crate::session::{BulkScope, EditSession, SelectionState};

/// Hint shown under the editable CNPJ field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnpjHint {
    pub valid: bool,
    pub message: &'static str,
}

impl CnpjHint {
    fn for_digits(digits: &str) -> Self {
        if is_valid_cnpj14(digits) {
            CnpjHint {
                valid: true,
                message: "CNPJ válido (14 dígitos).",
            }
        } else {
            CnpjHint {
                valid: false,
                message: "Digite 14 dígitos.",
            }
        }
    }
}

/// Header metadata as displayed.
#[derive(Debug, Clone)]
pub struct HeaderView {
    /// Access key digits (editable field value).
    pub key_digits: String,
    pub issuer_name: String,
    pub recipient_name: String,
    /// Issue date reordered to `DD/MM/YYYY`.
    pub issue_date_text: String,
    /// Masked CNPJ input value; present only for CNPJ-tagged recipients
    /// (the only kind the editor exposes for editing).
    pub cnpj_masked: Option<String>,
    pub cnpj_hint: Option<CnpjHint>,
}

/// One table row as displayed. `cost_input` and `unit_input` are the shared
/// texts every layout variant renders — the mirror invariant by construction.
#[derive(Debug, Clone)]
pub struct RowView {
    pub index: usize,
    pub code: String,
    pub description: String,
    /// Commercial unit input text (uppercase).
    pub unit_input: String,
    pub quantity_text: String,
    /// Declared unit price, 2-decimal currency.
    pub declared_unit_price_text: String,
    /// Declared line total, 2-decimal currency.
    pub declared_total_text: String,
    /// Unit cost input text — verbatim while typing, canonical 2-decimal
    /// comma form after blur or rebuild.
    pub cost_input: String,
    /// Derived line cost total, 2-decimal currency.
    pub line_total_text: String,
    /// Whether the cost differs from the declared price (row highlight).
    pub changed: bool,
    pub selected: bool,
}

/// User input events reconciled into the session.
#[derive(Debug, Clone)]
pub enum EditEvent {
    /// Keystroke in a cost input; `text` is propagated verbatim to mirrors.
    CostInput { index: usize, text: String },
    /// Focus left a cost input — canonicalize its displayed text.
    CostBlur { index: usize },
    /// Keystroke in a unit input; normalized case is written back into the
    /// edited input itself.
    UnitInput { index: usize, text: String },
    RowToggled { index: usize, selected: bool },
    MasterToggled { selected: bool },
    /// Apply one unit to the scope in bulk.
    BulkUnit { unit: String, scope: BulkScope },
    /// Keystroke in the access-key field (digits only retained).
    KeyInput { text: String },
    /// Keystroke in the recipient CNPJ field.
    CnpjInput { text: String },
}

/// The projected view. Rebuilt wholesale from the session on load and bulk
/// changes; patched in place for single-row edits.
#[derive(Debug, Clone)]
pub struct TableView {
    pub header: Option<HeaderView>,
    pub rows: Vec<RowView>,
    /// Σ quantity × unit cost, currency-formatted.
    pub running_total_text: String,
    pub selection: SelectionState,
}

impl Default for TableView {
    fn default() -> Self {
        Self::new()
    }
}

impl TableView {
    pub fn new() -> Self {
        TableView {
            header: None,
            rows: Vec::new(),
            running_total_text: format_currency(rust_decimal::Decimal::ZERO, 2),
            selection: SelectionState::None,
        }
    }

    /// Project the whole session: header, rows, totals, selection.
    pub fn rebuild(&mut self, session: &EditSession) {
        self.header = session.header().map(|header| {
            let cnpj = match &header.recipient_tax_id {
                Some(TaxId::Cnpj(digits)) => Some(digits.clone()),
                _ => None,
            };
            HeaderView {
                key_digits: header.invoice_key.clone(),
                issuer_name: header.issuer_name.clone(),
                recipient_name: header.recipient_name.clone(),
                issue_date_text: header.issue_date_display(),
                cnpj_masked: cnpj.as_deref().map(mask_cnpj),
                cnpj_hint: cnpj.as_deref().map(CnpjHint::for_digits),
            }
        });

        self.rows = session
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| RowView {
                index,
                code: item.code.clone(),
                description: item.description.clone(),
                unit_input: item.unit.clone(),
                quantity_text: format_quantity(item.quantity),
                declared_unit_price_text: format_currency(item.declared_unit_price, 2),
                declared_total_text: format_currency(item.declared_total, 2),
                cost_input: to_input_text(item.unit_cost, 2),
                line_total_text: format_currency(item.line_cost_total(), 2),
                changed: item.is_changed(),
                selected: session.is_selected(index),
            })
            .collect();

        self.running_total_text = format_currency(session.running_total(), 2);
        self.selection = session.selection_state();
    }

    /// Reconcile one input event into the session and refresh the affected
    /// projections.
    pub fn apply(&mut self, session: &mut EditSession, event: EditEvent) -> Result<(), NotaError> {
        match event {
            EditEvent::CostInput { index, text } => {
                let cost = parse_locale_number(&text);
                session.set_unit_cost(index, cost)?;
                let item = session
                    .item(index)
                    .ok_or_else(|| NotaError::edit(format!("item index {index} out of range")))?;
                let row = self
                    .rows
                    .get_mut(index)
                    .ok_or_else(|| NotaError::edit(format!("row index {index} out of range")))?;
                row.cost_input = text;
                row.line_total_text = format_currency(item.line_cost_total(), 2);
                row.changed = item.is_changed();
                self.running_total_text = format_currency(session.running_total(), 2);
            }
            EditEvent::CostBlur { index } => {
                let item = session
                    .item(index)
                    .ok_or_else(|| NotaError::edit(format!("item index {index} out of range")))?;
                let row = self
                    .rows
                    .get_mut(index)
                    .ok_or_else(|| NotaError::edit(format!("row index {index} out of range")))?;
                row.cost_input = to_input_text(item.unit_cost, 2);
            }
            EditEvent::UnitInput { index, text } => {
                session.set_unit(index, &text)?;
                let normalized = session
                    .item(index)
                    .map(|item| item.unit.clone())
                    .unwrap_or_default();
                let row = self
                    .rows
                    .get_mut(index)
                    .ok_or_else(|| NotaError::edit(format!("row index {index} out of range")))?;
                row.unit_input = normalized;
            }
            EditEvent::RowToggled { index, selected } => {
                session.toggle_row(index, selected);
                if let Some(row) = self.rows.get_mut(index) {
                    row.selected = selected;
                }
                self.selection = session.selection_state();
            }
            EditEvent::MasterToggled { selected } => {
                session.select_all(selected);
                for row in &mut self.rows {
                    row.selected = selected;
                }
                self.selection = session.selection_state();
            }
            EditEvent::BulkUnit { unit, scope } => {
                session.bulk_apply_unit(&unit, scope)?;
                self.rebuild(session);
            }
            EditEvent::KeyInput { text } => {
                session.set_invoice_key(&text)?;
                if let (Some(view), Some(header)) = (&mut self.header, session.header()) {
                    view.key_digits = header.invoice_key.clone();
                }
            }
            EditEvent::CnpjInput { text } => {
                session.set_recipient_cnpj(&text)?;
                if let Some(view) = &mut self.header {
                    let digits = match session.header().and_then(|h| h.recipient_tax_id.as_ref()) {
                        Some(TaxId::Cnpj(d)) => Some(d.clone()),
                        _ => None,
                    };
                    view.cnpj_masked = digits.as_deref().map(mask_cnpj);
                    view.cnpj_hint = digits.as_deref().map(CnpjHint::for_digits);
                }
            }
        }
        Ok(())
    }
}

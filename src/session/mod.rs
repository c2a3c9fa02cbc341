//! The edit session — the single owner of all mutable editor state.
//!
//! Lifecycle: `Empty → Loaded` on a successful parse (wholesale replace,
//! never a merge), `Loaded → Loaded` on edits, `Loaded → Empty` on reset or
//! — policy permitting — after export. A failed load leaves the prior state
//! completely unchanged. Single-writer access is enforced by `&mut self`;
//! there are no ambient globals.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::core::{HeaderInfo, LineItem, MAX_KEY_LEN, NotaError, TaxId, normalize_unit};
use crate::export::{self, ExportFile, ResetPolicy};
use crate::format::digits_only;
use crate::parse::{self, ParsedInvoice};
use crate::xml::XmlDocument;

/// Which rows a bulk edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkScope {
    /// The currently selected rows.
    Selected,
    /// Every row.
    All,
}

/// Aggregate state of the row-selection master control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// No row selected (or no rows at all).
    None,
    /// Some but not all rows selected — indeterminate master.
    Partial,
    /// Every row selected.
    All,
}

/// Warning shown before an altered copy is generated.
pub const EXPORT_WARNING: &str = "Isto gera uma CÓPIA do XML da NF-e com alterações \
(custos/unid. e CNPJ do destinatário, se informado). NÃO é fiscalmente válido. Continuar?";

#[derive(Debug, Clone)]
struct LoadedState {
    document: XmlDocument,
    raw_text: String,
    header: HeaderInfo,
    items: Vec<LineItem>,
    selected: BTreeSet<usize>,
}

/// The one live editing session.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: Option<LoadedState>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from raw bytes (encoding sniffed from the prolog).
    /// On success any previous session is discarded unconditionally; on
    /// failure it is left untouched.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), NotaError> {
        self.adopt(parse::parse_invoice_bytes(bytes)?);
        Ok(())
    }

    /// Load a document from already-decoded text.
    pub fn load_str(&mut self, text: &str) -> Result<(), NotaError> {
        self.adopt(parse::parse_invoice(text)?);
        Ok(())
    }

    fn adopt(&mut self, parsed: ParsedInvoice) {
        self.state = Some(LoadedState {
            document: parsed.document,
            raw_text: parsed.raw_text,
            header: parsed.header,
            items: parsed.items,
            selected: BTreeSet::new(),
        });
    }

    /// Unconditionally return to the empty state.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Whether a document is loaded. The UI shell keys its import lock on
    /// this.
    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn header(&self) -> Option<&HeaderInfo> {
        self.state.as_ref().map(|s| &s.header)
    }

    pub fn items(&self) -> &[LineItem] {
        self.state.as_ref().map(|s| s.items.as_slice()).unwrap_or(&[])
    }

    pub fn item(&self, index: usize) -> Option<&LineItem> {
        self.items().get(index)
    }

    /// The parsed document (read-only; export deep-copies it).
    pub fn document(&self) -> Option<&XmlDocument> {
        self.state.as_ref().map(|s| &s.document)
    }

    /// The decoded source text as loaded.
    pub fn raw_text(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.raw_text.as_str())
    }

    // ── Edits ───────────────────────────────────────────────────────────

    fn item_mut(&mut self, index: usize) -> Result<&mut LineItem, NotaError> {
        self.state
            .as_mut()
            .and_then(|s| s.items.get_mut(index))
            .ok_or_else(|| NotaError::edit(format!("item index {index} out of range")))
    }

    /// Set the editable unit cost of a row.
    pub fn set_unit_cost(&mut self, index: usize, cost: Decimal) -> Result<(), NotaError> {
        self.item_mut(index)?.unit_cost = cost;
        Ok(())
    }

    /// Set the commercial unit of a row (trimmed, uppercased, clamped).
    pub fn set_unit(&mut self, index: usize, unit: &str) -> Result<(), NotaError> {
        self.item_mut(index)?.unit = normalize_unit(unit);
        Ok(())
    }

    /// Apply one unit to every row in the scope. Returns how many rows were
    /// updated; an empty unit or an empty scope is a rejected edit.
    pub fn bulk_apply_unit(&mut self, unit: &str, scope: BulkScope) -> Result<usize, NotaError> {
        let unit = normalize_unit(unit);
        if unit.is_empty() {
            return Err(NotaError::edit("informe a nova unidade"));
        }
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| NotaError::edit("nenhum item no escopo"))?;
        let indices: Vec<usize> = match scope {
            BulkScope::All => (0..state.items.len()).collect(),
            BulkScope::Selected => state.selected.iter().copied().collect(),
        };
        if indices.is_empty() {
            return Err(NotaError::edit("nenhum item no escopo"));
        }
        let mut updated = 0;
        for i in indices {
            if let Some(item) = state.items.get_mut(i) {
                item.unit = unit.clone();
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Replace the access key with the digit-only form of the input,
    /// truncated to 44 digits.
    pub fn set_invoice_key(&mut self, raw: &str) -> Result<(), NotaError> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| NotaError::edit("no document loaded"))?;
        state.header.invoice_key = digits_only(raw).chars().take(MAX_KEY_LEN).collect();
        Ok(())
    }

    /// Update the recipient CNPJ digits. A no-op unless the document tagged
    /// the recipient with a CNPJ — a CPF is never rewritten into a CNPJ.
    pub fn set_recipient_cnpj(&mut self, raw: &str) -> Result<(), NotaError> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| NotaError::edit("no document loaded"))?;
        if let Some(TaxId::Cnpj(digits)) = &mut state.header.recipient_tax_id {
            *digits = digits_only(raw).chars().take(14).collect();
        }
        Ok(())
    }

    // ── Selection (UI-only, no export effect) ───────────────────────────

    pub fn toggle_row(&mut self, index: usize, selected: bool) {
        if let Some(state) = &mut self.state {
            if index < state.items.len() {
                if selected {
                    state.selected.insert(index);
                } else {
                    state.selected.remove(&index);
                }
            }
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        if let Some(state) = &mut self.state {
            state.selected = if selected {
                (0..state.items.len()).collect()
            } else {
                BTreeSet::new()
            };
        }
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.selected.contains(&index))
    }

    pub fn selected_rows(&self) -> Vec<usize> {
        self.state
            .as_ref()
            .map(|s| s.selected.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tri-state master checkbox value, recomputed from the set.
    pub fn selection_state(&self) -> SelectionState {
        let Some(state) = &self.state else {
            return SelectionState::None;
        };
        match (state.selected.len(), state.items.len()) {
            (0, _) | (_, 0) => SelectionState::None,
            (sel, all) if sel == all => SelectionState::All,
            _ => SelectionState::Partial,
        }
    }

    // ── Derived totals ──────────────────────────────────────────────────

    /// Σ quantity × unit cost over every row.
    pub fn running_total(&self) -> Decimal {
        self.items().iter().map(LineItem::line_cost_total).sum()
    }

    /// How many rows the user has moved away from the declared price.
    pub fn changed_count(&self) -> usize {
        self.items().iter().filter(|i| i.is_changed()).count()
    }

    // ── Export ──────────────────────────────────────────────────────────

    /// Generate the altered copy, gated by an explicit confirmation step.
    ///
    /// `confirm` receives [`EXPORT_WARNING`]; returning `false` aborts with
    /// `Ok(None)` and no state change. On success the session is reset when
    /// `policy` says so.
    pub fn trigger_export(
        &mut self,
        confirm: impl FnOnce(&str) -> bool,
        policy: ResetPolicy,
    ) -> Result<Option<ExportFile>, NotaError> {
        if !self.is_loaded() {
            return Err(NotaError::Export("no document loaded".into()));
        }
        if !confirm(EXPORT_WARNING) {
            return Ok(None);
        }
        let file = export::export_altered(self)?;
        if policy == ResetPolicy::ResetAfterExport {
            self.reset();
        }
        Ok(Some(file))
    }

    /// Generate the altered copy without the confirmation gate.
    pub fn export(&self) -> Result<ExportFile, NotaError> {
        export::export_altered(self)
    }
}

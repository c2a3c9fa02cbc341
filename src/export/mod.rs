//! Altered-copy generation.
//!
//! Export deep-copies the parsed document and overwrites exactly the fields
//! the user was allowed to touch: per matched line the product's `uCom`,
//! `vUnCom`, and recomputed `vProd`, plus the recipient `CNPJ` when one is
//! tagged and passes the 14-digit check. Every node without a matching item
//! number is reproduced byte-for-byte.

use std::collections::HashMap;

use crate::core::{LineItem, NotaError, TaxId};
use crate::format::{is_valid_cnpj14, to_xml_number};
use crate::session::EditSession;

/// Unit written when a matched item has an empty commercial unit.
const DEFAULT_UNIT: &str = "UN";

/// Suffix marking the output as an altered, unsigned copy.
const ALTERED_SUFFIX: &str = "_ALTERADA_sem_assinatura.xml";

/// Filename stem used when the document has no access key.
const FALLBACK_STEM: &str = "NFe_custos";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// What happens to the session after a successful export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Clear the session once the file is produced (the original tool's
    /// behavior).
    ResetAfterExport,
    /// Keep the session loaded for further edits.
    KeepSession,
}

/// A generated export: serialized XML plus its download envelope.
#[derive(Debug, Clone)]
pub struct ExportFile {
    /// `NFe_<key>_ALTERADA_sem_assinatura.xml`, or the `NFe_custos_...`
    /// fallback when the key is empty.
    pub filename: String,
    pub mime: &'static str,
    /// The serialized document.
    pub xml: String,
}

impl ExportFile {
    /// UTF-8 byte buffer of the document.
    pub fn into_bytes(self) -> Vec<u8> {
        self.xml.into_bytes()
    }
}

/// Produce the altered copy of the loaded document.
///
/// Fails with [`NotaError::Export`] when no document is loaded. Line items
/// are correlated by raw string equality on the item number (`"01"` never
/// matches `"1"`); unmatched nodes are left untouched.
pub fn export_altered(session: &EditSession) -> Result<ExportFile, NotaError> {
    let document = session
        .document()
        .ok_or_else(|| NotaError::Export("no document loaded".into()))?;
    let header = session
        .header()
        .ok_or_else(|| NotaError::Export("no document loaded".into()))?;

    // Items without an item number have no resolvable counterpart and are
    // skipped; duplicate numbers resolve to the last occurrence.
    let by_number: HashMap<&str, &LineItem> = session
        .items()
        .iter()
        .filter(|it| !it.item_number.is_empty())
        .map(|it| (it.item_number.as_str(), it))
        .collect();

    let mut copy = document.clone();
    copy.for_each_element_mut("det", |det| {
        let number = det.attribute("nItem").unwrap_or_default();
        let Some(item) = by_number.get(number.as_str()) else {
            return;
        };
        let Some(prod) = det.first_child_mut("prod") else {
            return;
        };
        let unit = if item.unit.is_empty() {
            DEFAULT_UNIT
        } else {
            item.unit.as_str()
        };
        prod.set_child_text("uCom", unit);
        prod.set_child_text("vUnCom", &to_xml_number(item.unit_cost, 2));
        prod.set_child_text("vProd", &to_xml_number(item.line_cost_total(), 2));
    });

    if let Some(TaxId::Cnpj(digits)) = &header.recipient_tax_id {
        if is_valid_cnpj14(digits) {
            if let Some(dest) = copy.first_element_mut("dest") {
                dest.remove_child("CPF");
                dest.set_child_text("CNPJ", digits);
            }
        }
    }

    let mut xml = copy.to_xml();
    let had_declaration = session
        .raw_text()
        .is_some_and(|t| t.starts_with("<?xml"));
    if !had_declaration {
        xml.insert_str(0, XML_DECLARATION);
    }

    Ok(ExportFile {
        filename: export_filename(&header.invoice_key),
        mime: "application/xml",
        xml,
    })
}

fn export_filename(key: &str) -> String {
    if key.is_empty() {
        format!("{FALLBACK_STEM}{ALTERED_SUFFIX}")
    } else {
        format!("NFe_{key}{ALTERED_SUFFIX}")
    }
}

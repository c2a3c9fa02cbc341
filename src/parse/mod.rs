//! Document loading: encoding detection and NF-e field extraction.
//!
//! Extraction is deliberately forgiving — a missing block or field degrades
//! to an empty/zero value (logged, never an error). Only malformed XML
//! aborts a load.

use encoding_rs::{Encoding, UTF_8};
use rust_decimal::Decimal;

use crate::core::{HeaderInfo, LineItem, MAX_KEY_LEN, NotaError, TaxId, normalize_unit};
use crate::format::{digits_only, parse_locale_number};
use crate::xml::{Element, XmlDocument};

/// Encoding labels the loader honors; anything else falls back to UTF-8.
const SUPPORTED_ENCODINGS: &[&str] = &["utf-8", "utf8", "iso-8859-1", "windows-1252"];

/// How many leading bytes are scanned for an `encoding="..."` declaration.
const PROLOG_SCAN_LEN: usize = 200;

/// A successfully loaded invoice: the full document tree plus the extracted
/// editable model. Assembled wholesale — callers adopt it atomically.
#[derive(Debug, Clone)]
pub struct ParsedInvoice {
    /// The parsed document, kept read-only until export deep-copies it.
    pub document: XmlDocument,
    /// The decoded source text (prolog/declaration preservation).
    pub raw_text: String,
    pub header: HeaderInfo,
    pub items: Vec<LineItem>,
}

/// Decode a raw byte buffer, sniffing the encoding from the XML prolog.
///
/// Returns the decoded text and the encoding label actually used. Decoding
/// never fails: unmappable bytes become replacement characters, and
/// unsupported or absent declarations silently use UTF-8.
pub fn decode_document(bytes: &[u8]) -> (String, &'static str) {
    let encoding = match sniff_prolog_encoding(bytes) {
        Some(label) => {
            if SUPPORTED_ENCODINGS.contains(&label.as_str()) {
                Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8)
            } else {
                tracing::warn!(declared = %label, "unsupported encoding, falling back to UTF-8");
                UTF_8
            }
        }
        None => UTF_8,
    };
    let (text, _, _) = encoding.decode(bytes);
    (text.into_owned(), encoding.name())
}

/// Extract the `encoding="..."` label from an ASCII scan of the first
/// [`PROLOG_SCAN_LEN`] bytes, lowercased.
fn sniff_prolog_encoding(bytes: &[u8]) -> Option<String> {
    let prolog: String = bytes
        .iter()
        .take(PROLOG_SCAN_LEN)
        .map(|&b| if b.is_ascii() { b as char } else { '\u{fffd}' })
        .collect();
    let lower = prolog.to_ascii_lowercase();
    let at = lower.find("encoding")?;
    let rest = &prolog[at + "encoding".len()..];
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    let label = &inner[..end];
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some(label.to_ascii_lowercase())
}

/// Decode and parse a raw buffer in one step.
pub fn parse_invoice_bytes(bytes: &[u8]) -> Result<ParsedInvoice, NotaError> {
    let (text, _) = decode_document(bytes);
    parse_invoice(&text)
}

/// Parse an NF-e document and extract header metadata plus the ordered line
/// items. Malformed XML is a [`NotaError::Parse`]; missing blocks and
/// fields degrade to empty/zero values.
pub fn parse_invoice(text: &str) -> Result<ParsedInvoice, NotaError> {
    let document = XmlDocument::parse(text)?;

    let header = extract_header(&document);
    let items = extract_items(&document);

    Ok(ParsedInvoice {
        document,
        raw_text: text.to_string(),
        header,
        items,
    })
}

fn extract_header(document: &XmlDocument) -> HeaderInfo {
    // Access key: infNFe@Id minus the "NFe" prefix, else chNFe text.
    let key = document
        .first_element("infNFe")
        .and_then(|inf| inf.attribute("Id"))
        .map(|id| strip_nfe_prefix(&id).to_string())
        .filter(|k| !k.is_empty())
        .or_else(|| document.first_element("chNFe").map(|el| el.text_content().trim().to_string()))
        .unwrap_or_default();
    let invoice_key: String = digits_only(&key).chars().take(MAX_KEY_LEN).collect();

    let emit = document.first_element("emit");
    let dest = document.first_element("dest");
    let ide = document.first_element("ide");
    if emit.is_none() || dest.is_none() || ide.is_none() {
        tracing::debug!(
            emit = emit.is_some(),
            dest = dest.is_some(),
            ide = ide.is_some(),
            "header block missing, defaulting fields"
        );
    }

    let issuer_name = emit.and_then(|el| el.child_text("xNome")).unwrap_or_default();
    let recipient_name = dest.and_then(|el| el.child_text("xNome")).unwrap_or_default();
    let issue_date_raw = ide
        .and_then(|el| el.child_text("dhEmi").filter(|t| !t.is_empty()))
        .or_else(|| ide.and_then(|el| el.child_text("dEmi")))
        .unwrap_or_default();

    // CNPJ wins over CPF; first non-empty value decides the kind.
    let recipient_tax_id = dest.and_then(|el| {
        let cnpj = el.child_text("CNPJ").unwrap_or_default();
        let cpf = el.child_text("CPF").unwrap_or_default();
        if !cnpj.is_empty() {
            Some(TaxId::Cnpj(digits_only(&cnpj)))
        } else if !cpf.is_empty() {
            Some(TaxId::Cpf(digits_only(&cpf)))
        } else {
            None
        }
    });

    HeaderInfo {
        invoice_key,
        issuer_name,
        recipient_name,
        issue_date_raw,
        recipient_tax_id,
    }
}

fn extract_items(document: &XmlDocument) -> Vec<LineItem> {
    document
        .elements("det")
        .into_iter()
        .map(extract_item)
        .collect()
}

fn extract_item(det: &Element) -> LineItem {
    let item_number = det.attribute("nItem").unwrap_or_default();
    let prod = det.first_child("prod");
    if prod.is_none() {
        tracing::debug!(item = %item_number, "det without prod block, defaulting fields");
    }

    let text = |tag: &str| -> String {
        prod.and_then(|p| p.child_text(tag)).unwrap_or_default()
    };
    let number = |tag: &str| -> Decimal { parse_locale_number(&text(tag)) };

    let declared_unit_price = number("vUnCom");
    LineItem {
        item_number,
        code: text("cProd"),
        description: text("xProd"),
        unit: normalize_unit(&text("uCom")),
        quantity: number("qCom"),
        declared_unit_price,
        declared_total: number("vProd"),
        unit_cost: declared_unit_price,
    }
}

fn strip_nfe_prefix(id: &str) -> &str {
    if id.len() >= 3 && id[..3].eq_ignore_ascii_case("nfe") {
        &id[3..]
    } else {
        id
    }
}

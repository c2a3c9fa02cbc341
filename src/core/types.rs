use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::format;

/// Maximum length of the NF-e access key (chave de acesso), digits only.
pub const MAX_KEY_LEN: usize = 44;

/// Maximum length of a commercial unit (uCom) after normalization.
pub const MAX_UNIT_LEN: usize = 6;

/// Two costs closer than this are considered equal when deciding whether a
/// row was changed by the user.
pub const COST_EPSILON: Decimal = dec!(0.000000001);

/// Recipient taxpayer identifier, tagged by kind.
///
/// The stored value is always the digit-only canonical form; display masking
/// is derived, never stored. At most one kind is active by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxId {
    /// CNPJ — legal entity, 14 digits.
    Cnpj(String),
    /// CPF — individual, 11 digits.
    Cpf(String),
}

impl TaxId {
    /// The digit-only identifier value.
    pub fn digits(&self) -> &str {
        match self {
            TaxId::Cnpj(d) | TaxId::Cpf(d) => d,
        }
    }

    pub fn is_cnpj(&self) -> bool {
        matches!(self, TaxId::Cnpj(_))
    }
}

/// Invoice header metadata extracted from the NF-e.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderInfo {
    /// Access key (chave de acesso), digit-only, at most 44 digits.
    pub invoice_key: String,
    /// Issuer name (emit/xNome); empty when absent.
    pub issuer_name: String,
    /// Recipient name (dest/xNome); empty when absent.
    pub recipient_name: String,
    /// Issuance timestamp exactly as found in the document (dhEmi or dEmi).
    pub issue_date_raw: String,
    /// Recipient tax id, when the document carries one.
    pub recipient_tax_id: Option<TaxId>,
}

impl HeaderInfo {
    /// Typed issue date, parsed from the leading `YYYY-MM-DD` of the raw
    /// timestamp. `None` when the document carried no parseable date.
    pub fn issue_date(&self) -> Option<NaiveDate> {
        let prefix: String = self.issue_date_raw.chars().take(10).collect();
        NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()
    }

    /// Issue date reordered to `DD/MM/YYYY`; falls back to the raw text when
    /// the date component cannot be split.
    pub fn issue_date_display(&self) -> String {
        format::format_date_local(&self.issue_date_raw)
    }
}

/// One editable invoice line.
///
/// `declared_unit_price` and `declared_total` are the values the issuer put
/// in the document and never change; `unit_cost` starts equal to the declared
/// unit price and is the only monetary field the user edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Item number (nItem attribute). Raw string — may be empty or
    /// non-numeric; used verbatim to correlate back to the source node.
    pub item_number: String,
    /// Product code (cProd).
    pub code: String,
    /// Product description (xProd).
    pub description: String,
    /// Commercial unit (uCom), uppercase, at most [`MAX_UNIT_LEN`] chars.
    pub unit: String,
    /// Commercial quantity (qCom).
    pub quantity: Decimal,
    /// Unit price as declared in the source document (vUnCom). Immutable.
    pub declared_unit_price: Decimal,
    /// Line total as declared in the source document (vProd). Immutable.
    pub declared_total: Decimal,
    /// User-editable unit cost. Initialized to `declared_unit_price`.
    pub unit_cost: Decimal,
}

impl LineItem {
    /// Derived line cost: quantity × unit cost. Recomputed on every read,
    /// never stored.
    pub fn line_cost_total(&self) -> Decimal {
        self.quantity * self.unit_cost
    }

    /// Whether the user moved the cost away from the declared unit price.
    pub fn is_changed(&self) -> bool {
        (self.unit_cost - self.declared_unit_price).abs() > COST_EPSILON
    }
}

/// Normalize a commercial unit: trim, uppercase, clamp to [`MAX_UNIT_LEN`].
pub fn normalize_unit(raw: &str) -> String {
    raw.trim().to_uppercase().chars().take(MAX_UNIT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_is_derived() {
        let mut item = LineItem {
            item_number: "1".into(),
            code: "001".into(),
            description: "Parafuso".into(),
            unit: "UN".into(),
            quantity: dec!(10),
            declared_unit_price: dec!(2.50),
            declared_total: dec!(25.00),
            unit_cost: dec!(2.50),
        };
        assert_eq!(item.line_cost_total(), dec!(25.00));
        assert!(!item.is_changed());

        item.unit_cost = dec!(3);
        assert_eq!(item.line_cost_total(), dec!(30));
        assert!(item.is_changed());
    }

    #[test]
    fn changed_flag_uses_epsilon() {
        let item = LineItem {
            item_number: String::new(),
            code: String::new(),
            description: String::new(),
            unit: "UN".into(),
            quantity: dec!(1),
            declared_unit_price: dec!(5),
            declared_total: dec!(5),
            unit_cost: dec!(5.0000000000001),
        };
        // Within 1e-9 of the declared price — not a user-visible change.
        assert!(!item.is_changed());
    }

    #[test]
    fn unit_normalization() {
        assert_eq!(normalize_unit("  un "), "UN");
        assert_eq!(normalize_unit("caixas12"), "CAIXAS");
        assert_eq!(normalize_unit(""), "");
    }

    #[test]
    fn issue_date_parses_leading_component() {
        let header = HeaderInfo {
            issue_date_raw: "2024-06-15T10:30:00-03:00".into(),
            ..Default::default()
        };
        assert_eq!(
            header.issue_date(),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
        assert_eq!(header.issue_date_display(), "15/06/2024");
    }
}

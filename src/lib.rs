//! # nfedit
//!
//! Core engine of an NF-e cost editor: load a Brazilian electronic invoice
//! (NF-e) XML, edit unit costs and commercial units in a flat table model,
//! and export an altered, unsigned copy where everything the user did not
//! touch is preserved byte-for-byte.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//! The UI shell (file picking, table widgets, notifications) is a
//! collaborator: it feeds raw bytes and input events in, and renders the
//! projected [`view::TableView`] back out.
//!
//! ## Quick Start
//!
//! ```rust
//! use nfedit::session::EditSession;
//! use nfedit::view::{EditEvent, TableView};
//! use nfedit::export::ResetPolicy;
//!
//! let xml = r#"<NFe><infNFe Id="NFe12345678901234">
//!   <emit><xNome>Fornecedor LTDA</xNome></emit>
//!   <dest><xNome>Mercado A</xNome><CNPJ>12345678000195</CNPJ></dest>
//!   <ide><dhEmi>2024-06-15T10:30:00-03:00</dhEmi></ide>
//!   <det nItem="1"><prod>
//!     <cProd>001</cProd><xProd>Parafuso</xProd><uCom>UN</uCom>
//!     <qCom>10.0000</qCom><vUnCom>2.50</vUnCom><vProd>25.00</vProd>
//!   </prod></det>
//! </infNFe></NFe>"#;
//!
//! let mut session = EditSession::new();
//! session.load_str(xml).unwrap();
//!
//! let mut view = TableView::new();
//! view.rebuild(&session);
//! assert_eq!(view.rows[0].cost_input, "2,50");
//!
//! view.apply(&mut session, EditEvent::CostInput { index: 0, text: "3,10".into() })
//!     .unwrap();
//! assert_eq!(view.running_total_text, "R$ 31,00");
//!
//! let file = session
//!     .trigger_export(|_warning| true, ResetPolicy::ResetAfterExport)
//!     .unwrap()
//!     .expect("confirmed");
//! assert!(file.xml.contains("<vUnCom>3.10</vUnCom>"));
//! assert!(!session.is_loaded());
//! ```

pub mod core;
pub mod export;
pub mod format;
pub mod parse;
pub mod session;
pub mod view;
pub mod xml;

// Re-export the model types at crate root for convenience
pub use crate::core::*;

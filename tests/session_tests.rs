use nfedit::core::NotaError;
use nfedit::session::{BulkScope, EditSession, SelectionState};
use rust_decimal_macros::dec;

fn invoice(items: &[(&str, &str, &str, &str)]) -> String {
    let mut dets = String::new();
    for (n, code, qty, price) in items {
        dets.push_str(&format!(
            "<det nItem=\"{n}\"><prod><cProd>{code}</cProd><xProd>Produto {code}</xProd>\
             <uCom>UN</uCom><qCom>{qty}</qCom><vUnCom>{price}</vUnCom>\
             <vProd>0</vProd></prod></det>"
        ));
    }
    format!(
        "<NFe><infNFe Id=\"NFe12345678901234567890123456789012345678901234\">\
         <ide><dhEmi>2024-06-15T10:30:00-03:00</dhEmi></ide>\
         <emit><xNome>Fornecedor</xNome></emit>\
         <dest><xNome>Cliente</xNome><CNPJ>98765432000110</CNPJ></dest>\
         {dets}</infNFe></NFe>"
    )
}

fn loaded(items: &[(&str, &str, &str, &str)]) -> EditSession {
    let mut session = EditSession::new();
    session.load_str(&invoice(items)).unwrap();
    session
}

#[test]
fn starts_empty() {
    let session = EditSession::new();
    assert!(!session.is_loaded());
    assert!(session.items().is_empty());
    assert!(session.header().is_none());
    assert_eq!(session.running_total(), dec!(0));
}

#[test]
fn load_populates_atomically() {
    let session = loaded(&[("1", "A", "2", "10.00"), ("2", "B", "3", "5.00")]);
    assert!(session.is_loaded());
    assert_eq!(session.items().len(), 2);
    assert_eq!(session.running_total(), dec!(35));
}

#[test]
fn reload_replaces_previous_session() {
    let mut session = loaded(&[("1", "A", "2", "10.00")]);
    session.set_unit_cost(0, dec!(99)).unwrap();

    session.load_str(&invoice(&[("1", "C", "1", "7.00")])).unwrap();
    assert_eq!(session.items().len(), 1);
    assert_eq!(session.item(0).unwrap().code, "C");
    // No merge: the edited cost from the old session is gone.
    assert_eq!(session.item(0).unwrap().unit_cost, dec!(7));
}

#[test]
fn failed_load_leaves_session_untouched() {
    let mut session = loaded(&[("1", "A", "2", "10.00")]);
    session.set_unit_cost(0, dec!(12.34)).unwrap();
    session.toggle_row(0, true);

    let err = session.load_str("<NFe><det></NFe>").unwrap_err();
    assert!(matches!(err, NotaError::Parse(_)));

    assert!(session.is_loaded());
    assert_eq!(session.items().len(), 1);
    assert_eq!(session.item(0).unwrap().unit_cost, dec!(12.34));
    assert_eq!(session.selected_rows(), vec![0]);
}

#[test]
fn reset_clears_everything() {
    let mut session = loaded(&[("1", "A", "2", "10.00")]);
    session.toggle_row(0, true);
    session.reset();
    assert!(!session.is_loaded());
    assert!(session.selected_rows().is_empty());
    assert_eq!(session.selection_state(), SelectionState::None);
}

#[test]
fn cost_edit_recomputes_derived_values() {
    let mut session = loaded(&[("1", "A", "2", "10.00"), ("2", "B", "4", "1.00")]);
    session.set_unit_cost(0, dec!(8.50)).unwrap();

    let item = session.item(0).unwrap();
    assert_eq!(item.line_cost_total(), dec!(17));
    assert!(item.is_changed());
    assert!(!session.item(1).unwrap().is_changed());
    assert_eq!(session.running_total(), dec!(21));
    assert_eq!(session.changed_count(), 1);
}

#[test]
fn cost_edit_out_of_range_is_rejected() {
    let mut session = loaded(&[("1", "A", "2", "10.00")]);
    assert!(matches!(
        session.set_unit_cost(5, dec!(1)),
        Err(NotaError::Edit(_))
    ));
}

#[test]
fn unit_edit_normalizes() {
    let mut session = loaded(&[("1", "A", "2", "10.00")]);
    session.set_unit(0, " caixa12x ").unwrap();
    assert_eq!(session.item(0).unwrap().unit, "CAIXA1");
}

#[test]
fn bulk_unit_all_and_selected() {
    let mut session = loaded(&[
        ("1", "A", "1", "1.00"),
        ("2", "B", "1", "1.00"),
        ("3", "C", "1", "1.00"),
    ]);

    assert_eq!(session.bulk_apply_unit("cx", BulkScope::All).unwrap(), 3);
    assert!(session.items().iter().all(|i| i.unit == "CX"));

    session.toggle_row(1, true);
    assert_eq!(session.bulk_apply_unit("fd", BulkScope::Selected).unwrap(), 1);
    assert_eq!(session.item(0).unwrap().unit, "CX");
    assert_eq!(session.item(1).unwrap().unit, "FD");
}

#[test]
fn bulk_unit_rejects_empty_input_and_scope() {
    let mut session = loaded(&[("1", "A", "1", "1.00")]);
    assert!(matches!(
        session.bulk_apply_unit("  ", BulkScope::All),
        Err(NotaError::Edit(_))
    ));
    // Nothing selected.
    assert!(matches!(
        session.bulk_apply_unit("CX", BulkScope::Selected),
        Err(NotaError::Edit(_))
    ));
}

#[test]
fn selection_master_tri_state() {
    let mut session = loaded(&[("1", "A", "1", "1.00"), ("2", "B", "1", "1.00")]);
    assert_eq!(session.selection_state(), SelectionState::None);

    session.toggle_row(0, true);
    assert_eq!(session.selection_state(), SelectionState::Partial);

    session.toggle_row(1, true);
    assert_eq!(session.selection_state(), SelectionState::All);

    session.toggle_row(0, false);
    assert_eq!(session.selection_state(), SelectionState::Partial);

    session.select_all(false);
    assert_eq!(session.selection_state(), SelectionState::None);

    session.select_all(true);
    assert_eq!(session.selection_state(), SelectionState::All);
    assert_eq!(session.selected_rows(), vec![0, 1]);
}

#[test]
fn selection_ignores_out_of_range_rows() {
    let mut session = loaded(&[("1", "A", "1", "1.00")]);
    session.toggle_row(9, true);
    assert!(session.selected_rows().is_empty());
}

#[test]
fn invoice_key_edit_keeps_digits_only() {
    let mut session = loaded(&[("1", "A", "1", "1.00")]);
    session.set_invoice_key("35-2007 1420.0166abc").unwrap();
    assert_eq!(session.header().unwrap().invoice_key, "35200714200166");

    // Truncated at 44 digits.
    let long = "9".repeat(60);
    session.set_invoice_key(&long).unwrap();
    assert_eq!(session.header().unwrap().invoice_key.len(), 44);
}

#[test]
fn recipient_cnpj_edit_only_applies_to_cnpj_tag() {
    let mut session = loaded(&[("1", "A", "1", "1.00")]);
    session.set_recipient_cnpj("11.222.333/0001-44").unwrap();
    assert_eq!(
        session.header().unwrap().recipient_tax_id.as_ref().unwrap().digits(),
        "11222333000144"
    );

    // A CPF-tagged recipient is never rewritten into a CNPJ.
    let mut cpf_session = EditSession::new();
    cpf_session
        .load_str("<NFe><dest><CPF>12345678909</CPF></dest></NFe>")
        .unwrap();
    cpf_session.set_recipient_cnpj("11222333000144").unwrap();
    assert_eq!(
        cpf_session.header().unwrap().recipient_tax_id.as_ref().unwrap().digits(),
        "12345678909"
    );
}

#[test]
fn empty_invoice_yields_empty_valid_table() {
    let mut session = EditSession::new();
    session.load_str("<NFe><infNFe><ide/></infNFe></NFe>").unwrap();
    assert!(session.is_loaded());
    assert!(session.items().is_empty());
    assert_eq!(session.running_total(), dec!(0));
}

//! Integration tests running the same cursor scenarios against both backends.

use std::rc::Rc;

use xbind_node::{
    CompiledXPath, NodeBackend, NodeCapability, NodeError, Selector, XmlDocument, XmlNode,
    first_value,
};

const BACKENDS: [NodeBackend; 2] = [NodeBackend::Dom, NodeBackend::Sxd];

const ORDER: &str = r#"<?xml version="1.0"?>
<Order id="42">
  <Customer>
    <Name>Ann</Name>
  </Customer>
  <Line>1</Line>
  <Line>2</Line>
</Order>"#;

fn order(backend: NodeBackend) -> (XmlDocument, Rc<dyn XmlNode>) {
    let doc = XmlDocument::parse(ORDER, backend).unwrap();
    let element = doc.document_element().unwrap();
    (doc, element)
}

fn reparse(doc: &XmlDocument) -> Rc<dyn XmlNode> {
    let xml = doc.to_xml_string().unwrap();
    XmlDocument::parse(&xml, doc.backend())
        .unwrap()
        .document_element()
        .unwrap()
}

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn test_nested_navigation() {
    for backend in BACKENDS {
        let (_doc, order) = order(backend);
        let mut customer = order.select(&Selector::element("Customer")).unwrap();
        assert!(customer.move_next());
        let customer = customer.save();
        assert_eq!(
            first_value(customer.as_ref(), &Selector::element("Name")).unwrap(),
            Some("Ann".to_string()),
            "backend {}",
            backend
        );
        assert_eq!(
            first_value(order.as_ref(), &Selector::attribute("id")).unwrap(),
            Some("42".to_string())
        );
    }
}

#[test]
fn test_aliases_match_on_read() {
    for backend in BACKENDS {
        let (_doc, order) = order(backend);
        let selector = Selector::element("Item").with_alias("Line");
        let mut cursor = order.select(&selector).unwrap();
        let mut seen = Vec::new();
        while cursor.move_next() {
            seen.push(cursor.current().unwrap().value().unwrap().unwrap());
        }
        assert_eq!(seen, vec!["1", "2"], "backend {}", backend);
    }
}

// ============================================================================
// Mutation
// ============================================================================

#[test]
fn test_mutations_survive_serialization() {
    for backend in BACKENDS {
        let (doc, order) = order(backend);

        let mut lines = order.select(&Selector::element("Line")).unwrap();
        assert!(lines.move_next());
        lines.current().unwrap().set_value("10").unwrap();
        lines.remove_all_next().unwrap();

        let mut total = order.select(&Selector::element("Total")).unwrap();
        total.create().unwrap().set_value("10").unwrap();

        let reread = reparse(&doc);
        let mut lines = reread.select(&Selector::element("Line")).unwrap();
        assert!(lines.move_next());
        assert_eq!(lines.current().unwrap().value().unwrap().as_deref(), Some("10"));
        assert!(!lines.move_next(), "backend {}", backend);
        assert_eq!(
            first_value(reread.as_ref(), &Selector::element("Total")).unwrap(),
            Some("10".to_string())
        );
    }
}

#[test]
fn test_pending_chain_realizes_top_down() {
    for backend in BACKENDS {
        let doc = XmlDocument::new(backend);
        let root = doc.root();

        let order = root.select(&Selector::element("Order")).unwrap().save();
        let shipping = order.select(&Selector::element("Shipping")).unwrap().save();
        let city = shipping.select(&Selector::attribute("city")).unwrap().save();
        assert!(!order.exists());
        assert_eq!(city.value().unwrap(), None);

        city.set_value("Oslo").unwrap();

        assert!(order.exists());
        assert!(shipping.exists());
        let reread = reparse(&doc);
        assert_eq!(reread.name().as_deref(), Some("Order"));
        let mut shipping = reread.select(&Selector::element("Shipping")).unwrap();
        assert!(shipping.move_next(), "backend {}", backend);
        let shipping = shipping.save();
        assert_eq!(
            first_value(shipping.as_ref(), &Selector::attribute("city")).unwrap(),
            Some("Oslo".to_string())
        );
    }
}

#[test]
fn test_pending_node_binds_to_existing_match() {
    for backend in BACKENDS {
        let (_doc, order) = order(backend);
        let pending = order.select(&Selector::element("Note")).unwrap().save();

        let mut cursor = order.select(&Selector::element("Note")).unwrap();
        cursor.create().unwrap().set_value("first").unwrap();

        pending.set_value("second").unwrap();
        let mut notes = order.select(&Selector::element("Note")).unwrap();
        assert!(notes.move_next());
        assert_eq!(notes.current().unwrap().value().unwrap().as_deref(), Some("second"));
        assert!(!notes.move_next(), "backend {}", backend);
    }
}

#[test]
fn test_saved_handle_keeps_its_element_after_sibling_removal() {
    for backend in BACKENDS {
        let doc = XmlDocument::parse(
            r#"<Orders><Note>x</Note><Order id="2"/><Order id="3"/></Orders>"#,
            backend,
        )
        .unwrap();
        let orders = doc.document_element().unwrap();

        let mut cursor = orders.select(&Selector::element("Order")).unwrap();
        assert!(cursor.move_next());
        let second = cursor.save();
        let mut cursor = orders.select(&Selector::element("Note")).unwrap();
        assert!(cursor.move_next());
        let note = cursor.save();

        let mut notes = orders.select(&Selector::element("Note")).unwrap();
        assert!(notes.move_next());
        notes.remove().unwrap();

        assert_eq!(
            first_value(second.as_ref(), &Selector::attribute("id")).unwrap(),
            Some("2".to_string()),
            "backend {}",
            backend
        );
        let mut customer = second.select(&Selector::element("Customer")).unwrap();
        customer.create().unwrap().set_value("Zed").unwrap();

        let reread = reparse(&doc);
        let mut orders = reread.select(&Selector::element("Order")).unwrap();
        assert!(orders.move_next());
        let first = orders.save();
        assert_eq!(
            first_value(first.as_ref(), &Selector::element("Customer")).unwrap(),
            Some("Zed".to_string()),
            "backend {}",
            backend
        );
        assert!(orders.move_next());
        let last = orders.save();
        assert_eq!(
            first_value(last.as_ref(), &Selector::element("Customer")).unwrap(),
            None
        );

        assert!(!note.exists(), "backend {}", backend);
        assert!(matches!(note.set_value("y"), Err(NodeError::Detached)));
    }
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_unrelated_markup_is_preserved() {
    let xml = "<?xml version=\"1.0\"?>\n<!-- c -->\n<?page 1?>\n<Order><Customer>A<!--x-->B</Customer><Note>keep</Note></Order>";
    for backend in BACKENDS {
        let doc = XmlDocument::parse(xml, backend).unwrap();
        let order = doc.document_element().unwrap();
        assert_eq!(
            first_value(order.as_ref(), &Selector::element("Customer")).unwrap(),
            Some("AB".to_string())
        );

        let mut customer = order.select(&Selector::element("Customer")).unwrap();
        assert!(customer.move_next());
        customer.current().unwrap().set_value("Q").unwrap();

        let written = doc.to_xml_string().unwrap();
        assert!(written.contains("<!-- c -->"), "backend {}: {}", backend, written);
        assert!(written.contains("<?page 1?>"), "backend {}: {}", backend, written);
        assert!(
            written.contains("<Customer>Q</Customer><Note>keep</Note>"),
            "backend {}: {}",
            backend,
            written
        );
    }
}

#[test]
fn test_whitespace_inside_elements_is_preserved() {
    for backend in BACKENDS {
        let (doc, _order) = order(backend);
        let written = doc.to_xml_string().unwrap();
        assert!(
            written.contains("<Customer>\n    <Name>Ann</Name>\n  </Customer>"),
            "backend {}: {}",
            backend,
            written
        );
    }
}

// ============================================================================
// XPath
// ============================================================================

#[test]
fn test_xpath_capability_by_backend() {
    let path = CompiledXPath::compile("Customer/Name").unwrap();

    let (_doc, dom) = order(NodeBackend::Dom);
    assert!(!dom.supports(NodeCapability::XPath));
    assert!(matches!(
        dom.evaluate_xpath(&path),
        Err(NodeError::NotSupported { .. })
    ));

    let (_doc, sxd) = order(NodeBackend::Sxd);
    assert!(sxd.supports(NodeCapability::XPath));
    let value = sxd.evaluate_xpath(&path).unwrap();
    assert_eq!(value.first_value().unwrap().as_deref(), Some("Ann"));
}

#[test]
fn test_xpath_function_on_sxd() {
    let (_doc, order) = order(NodeBackend::Sxd);
    let path = CompiledXPath::compile("sum(Line)").unwrap();
    let value = order.evaluate_xpath(&path).unwrap();
    assert_eq!(value.first_value().unwrap().as_deref(), Some("3"));
}

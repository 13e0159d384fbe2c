use uiloc_core_types::{
    code_to_name, AttributeValue, ElementAttributes, ElementSnapshot, ElementType, Predicate,
    Rect, TYPE_NAME_PREFIX,
};

#[test]
fn registered_names_round_trip() {
    for element_type in ElementType::all() {
        let name = element_type.name();
        assert!(name.starts_with(TYPE_NAME_PREFIX));
        assert_eq!(ElementType::from_name(name), element_type);
        assert_eq!(code_to_name(element_type.code()), name);
        assert_eq!(ElementType::lookup(element_type.short_name()), Ok(element_type));
    }
}

#[test]
fn unregistered_names_fall_back_to_any() {
    for name in ["", "Gizmo", "XCUIElementTypeGizmo", "button"] {
        assert_eq!(ElementType::from_name(name), ElementType::ANY);
        assert!(ElementType::lookup(name).is_err());
    }
}

fn form() -> ElementSnapshot {
    let mut snapshot = ElementSnapshot::new(
        ElementAttributes::new(ElementType::APPLICATION)
            .with_frame(Rect::new(0.0, 0.0, 375.0, 812.0)),
    );
    let mut field = ElementAttributes::new(ElementType::TEXT_FIELD)
        .with_identifier("email")
        .with_frame(Rect::new(16.0, 100.0, 343.0, 40.0));
    field.placeholder_value = Some("you@example.com".into());
    snapshot.push_child(0, field);
    snapshot.push_child(
        0,
        ElementAttributes::new(ElementType::SWITCH)
            .with_identifier("remember")
            .with_value("1")
            .with_frame(Rect::new(300.0, 160.0, 50.0, 30.0)),
    );
    snapshot.push_child(
        0,
        ElementAttributes::new(ElementType::BUTTON)
            .with_label("Submit")
            .with_frame(Rect::new(16.0, 900.0, 343.0, 44.0)),
    );
    snapshot
}

fn matching(snapshot: &ElementSnapshot, expression: &str) -> Vec<usize> {
    let predicate = Predicate::parse(expression).unwrap();
    snapshot
        .document_order()
        .into_iter()
        .filter(|id| predicate.evaluate(&snapshot.element(*id).unwrap()))
        .collect()
}

#[test]
fn predicates_see_derived_attributes() {
    let snapshot = form();
    assert_eq!(matching(&snapshot, "value == 'you@example.com'"), vec![1]);
    assert_eq!(matching(&snapshot, "type == 'Switch' AND value == TRUE"), vec![2]);
    assert_eq!(matching(&snapshot, "name BEGINSWITH[c] 'SUB'"), vec![3]);
    assert_eq!(matching(&snapshot, "visible == FALSE"), vec![3]);
    assert_eq!(
        matching(&snapshot, "identifier IN {'email', 'remember'} AND NOT rect.y > 150"),
        vec![1]
    );
}

#[test]
fn page_source_skips_offscreen_elements() {
    let page = form().to_page_source().unwrap();
    assert_eq!(page.count(), 3);
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["type"], "Application");
    assert_eq!(json["children"][1]["value"], "1");
}

#[test]
fn attribute_values_deserialize_untagged() {
    let attributes: ElementAttributes =
        serde_yaml::from_str("type: Switch\nvalue: 1\nidentifier: flag").unwrap();
    assert_eq!(attributes.element_type, ElementType::SWITCH);
    assert_eq!(attributes.value, Some(AttributeValue::Number(1.0)));
    assert_eq!(
        attributes.derived_value(),
        Some(AttributeValue::Bool(true))
    );
}

//! End-to-end edit request tests: source in, source out

use std::collections::BTreeMap;
use tessera_editor::*;

fn request(oid: &str, actions: Vec<StructureAction>) -> EditRequest {
    EditRequest {
        oid: oid.to_string(),
        structure_changes: actions,
        ..Default::default()
    }
}

fn apply(source: &str, requests: &[EditRequest]) -> SourceEdit {
    transform_source(source, "/app/page.tsx", requests).unwrap()
}

#[test]
fn test_insert_img_at_index() {
    let source = "const a = <div data-oid=\"root\"><span/><p/></div>;";
    let edit = apply(
        source,
        &[request(
            "root",
            vec![StructureAction::Insert(InsertAction {
                target_position: Some(TargetPosition::Index { index: 1 }),
                element: ActionElement::new("img"),
                code_fragment: None,
            })],
        )],
    );

    assert!(edit.report.warnings.is_empty());
    assert!(edit.generated.contains("<span/><img data-oid=\""));
    assert_eq!(
        strip_source(&edit.generated).unwrap(),
        "const a = <div><span/><img/><p/></div>;"
    );
}

#[test]
fn test_insert_synthesized_tree() {
    let source = "export default function Page() {\n  return (\n    <main data-oid=\"m\">\n      <h1>Title</h1>\n    </main>\n  );\n}\n";
    let mut attributes = BTreeMap::new();
    attributes.insert("className".to_string(), "grid gap-2".to_string());
    let mut child = ActionElement::new("p");
    child.text_content = Some("Body".to_string());
    let element = ActionElement {
        tag_name: "section".to_string(),
        attributes,
        children: vec![child],
        ..Default::default()
    };

    let edit = apply(
        source,
        &[request(
            "m",
            vec![StructureAction::Insert(InsertAction {
                target_position: Some(TargetPosition::Append),
                element,
                code_fragment: None,
            })],
        )],
    );

    assert_eq!(
        strip_source(&edit.generated).unwrap(),
        "export default function Page() {\n  return (\n    <main>\n      <h1>Title</h1>\n      <section className=\"grid gap-2\"><p>Body</p></section>\n    </main>\n  );\n}\n"
    );
}

#[test]
fn test_insert_code_fragment() {
    let source = "const a = <ul data-oid=\"u\"><li>1</li></ul>;";
    let edit = apply(
        source,
        &[request(
            "u",
            vec![StructureAction::Insert(InsertAction {
                target_position: Some(TargetPosition::Prepend),
                element: ActionElement::default(),
                code_fragment: Some("<li className={active}>{label} <b>new</b></li>".to_string()),
            })],
        )],
    );

    let stripped = strip_source(&edit.generated).unwrap();
    assert_eq!(
        stripped,
        "const a = <ul><li className={active}>{label} <b>new</b></li><li>1</li></ul>;"
    );
    // The list plus both inserted elements
    let module = tessera_parser::parse(&edit.generated).unwrap();
    assert_eq!(collect_oids(&module).len(), 3);
}

#[test]
fn test_insert_code_fragment_copy_gets_fresh_identity() {
    let source = "const a = <ul data-oid=\"u\"><li data-oid=\"keep\">1</li></ul>;";
    let edit = apply(
        source,
        &[request(
            "u",
            vec![StructureAction::Insert(InsertAction {
                target_position: Some(TargetPosition::Append),
                element: ActionElement::default(),
                code_fragment: Some("<li data-oid=\"keep\">copy</li>".to_string()),
            })],
        )],
    );

    assert!(edit.generated.contains("<li data-oid=\"keep\">1</li>"));
    assert_eq!(edit.generated.matches("\"keep\"").count(), 1);
    let module = tessera_parser::parse(&edit.generated).unwrap();
    assert_eq!(collect_oids(&module).len(), 3);
}

#[test]
fn test_invalid_code_fragment_warns() {
    let source = "const a = <ul data-oid=\"u\"></ul>;";
    let edit = apply(
        source,
        &[request(
            "u",
            vec![StructureAction::Insert(InsertAction {
                target_position: Some(TargetPosition::Append),
                element: ActionElement::default(),
                code_fragment: Some("<li>".to_string()),
            })],
        )],
    );

    assert_eq!(edit.generated, source);
    assert!(matches!(
        edit.report.warnings.as_slice(),
        [TransformWarning::InvalidCodeFragment { .. }]
    ));
}

#[test]
fn test_missing_position_degrades_to_append() {
    let source = "const a = <div data-oid=\"d\"><span/></div>;";
    let edit = apply(
        source,
        &[request(
            "d",
            vec![StructureAction::Insert(InsertAction {
                target_position: None,
                element: ActionElement::new("hr"),
                code_fragment: None,
            })],
        )],
    );

    assert_eq!(
        strip_source(&edit.generated).unwrap(),
        "const a = <div><span/><hr/></div>;"
    );
    assert!(matches!(
        edit.report.warnings.as_slice(),
        [TransformWarning::InvalidPosition { .. }]
    ));
}

#[test]
fn test_class_edit_scenarios() {
    let source = "const a = <div data-oid=\"d\" className=\"a b\" />;";
    let class_edit = |override_classes| EditRequest {
        oid: "d".to_string(),
        attributes: Some(AttributeEdits {
            class_name: Some("c".to_string()),
        }),
        override_classes,
        ..Default::default()
    };

    assert!(apply(source, &[class_edit(false)]).generated.contains("className=\"a b c\""));
    assert!(apply(source, &[class_edit(true)]).generated.contains("className=\"c\""));
}

#[test]
fn test_move_first_to_last() {
    let source = "const a = <ul data-oid=\"u\"><li>A</li><li>B</li><li>C</li></ul>;";
    let edit = apply(
        source,
        &[request(
            "u",
            vec![StructureAction::Move(MoveAction {
                original_index: 0,
                target_index: 2,
            })],
        )],
    );
    assert_eq!(
        edit.generated,
        "const a = <ul data-oid=\"u\"><li>B</li><li>C</li><li>A</li></ul>;"
    );
}

#[test]
fn test_move_keeps_line_layout() {
    let source = "const a = (\n  <ul data-oid=\"u\">\n    <li>A</li>\n    <li>B</li>\n    <li>C</li>\n  </ul>\n);\n";
    let edit = apply(
        source,
        &[request(
            "u",
            vec![StructureAction::Move(MoveAction {
                original_index: 2,
                target_index: 0,
            })],
        )],
    );
    assert_eq!(
        edit.generated,
        "const a = (\n  <ul data-oid=\"u\">\n    <li>C</li>\n    <li>A</li>\n    <li>B</li>\n  </ul>\n);\n"
    );
}

#[test]
fn test_remove_and_invalid_remove() {
    let source = "const a = (\n  <ul data-oid=\"u\">\n    <li>A</li>\n    <li>B</li>\n  </ul>\n);\n";
    let edit = apply(
        source,
        &[request(
            "u",
            vec![
                StructureAction::Remove(RemoveAction {
                    target_position: Some(TargetPosition::Index { index: 0 }),
                }),
                StructureAction::Remove(RemoveAction {
                    target_position: Some(TargetPosition::Index { index: 7 }),
                }),
            ],
        )],
    );

    assert_eq!(
        edit.generated,
        "const a = (\n  <ul data-oid=\"u\">\n    <li>B</li>\n  </ul>\n);\n"
    );
    assert!(matches!(
        edit.report.warnings.as_slice(),
        [TransformWarning::InvalidIndex { index: 7, .. }]
    ));
}

#[test]
fn test_group_then_ungroup_restores_children() {
    let source = "const a = (\n  <ul data-oid=\"u\">\n    <li data-oid=\"a\">A</li>\n    <li data-oid=\"b\">B</li>\n    <li data-oid=\"c\">C</li>\n  </ul>\n);\n";
    let targets = vec![
        GroupTarget {
            index: 0,
            uuid: "g-a".to_string(),
        },
        GroupTarget {
            index: 1,
            uuid: "g-b".to_string(),
        },
    ];

    let grouped = apply(
        source,
        &[request(
            "u",
            vec![StructureAction::Group(GroupAction {
                targets: targets.clone(),
                container: ActionElement::new("div"),
                target_position: Some(TargetPosition::Index { index: 0 }),
            })],
        )],
    );
    assert!(grouped.generated.contains("<div data-oid=\""));
    assert!(grouped.generated.contains("<li data-oid=\"g-a\""));
    assert!(grouped.generated.contains("<li data-oid=\"g-b\""));

    let ungrouped = apply(
        &grouped.generated,
        &[request(
            "u",
            vec![StructureAction::Ungroup(UngroupAction {
                container_position: TargetPosition::Index { index: 0 },
                targets,
            })],
        )],
    );

    assert_eq!(
        strip_source(&ungrouped.generated).unwrap(),
        strip_source(source).unwrap()
    );
}

#[test]
fn test_image_actions() {
    let source = "const a = <div data-oid=\"d\" className=\"p-4\" />;";
    let edit = apply(
        source,
        &[request(
            "d",
            vec![StructureAction::InsertImage(ImageAction {
                url: "/images/hero.png".to_string(),
            })],
        )],
    );
    assert!(edit
        .generated
        .contains("className=\"p-4 bg-[url(/images/hero.png)]\""));

    let removed = apply(&edit.generated, &[request("d", vec![StructureAction::RemoveImage])]);
    assert_eq!(removed.generated, source);
}

#[test]
fn test_requests_across_components() {
    let source = r#"function Header() {
  return <header data-oid="h" className="flex">Logo</header>;
}

export const Footer = () => <footer data-oid="f">Links</footer>;
"#;
    let requests = vec![
        EditRequest {
            oid: "f".to_string(),
            text_content: Some("Contact".to_string()),
            ..Default::default()
        },
        EditRequest {
            oid: "h".to_string(),
            attributes: Some(AttributeEdits {
                class_name: Some("gap-4".to_string()),
            }),
            ..Default::default()
        },
    ];
    let edit = apply(source, &requests);

    assert_eq!(
        edit.generated,
        r#"function Header() {
  return <header data-oid="h" className="flex gap-4">Logo</header>;
}

export const Footer = () => <footer data-oid="f">Contact</footer>;
"#
    );
    assert_eq!(edit.report.applied, vec!["h".to_string(), "f".to_string()]);
}

//! Exhaustive checks over small inputs: identity round trips and the index
//! arithmetic of structural actions on mixed text/element children

use std::ops::ControlFlow;

use tessera_common::{walk_element, Visitor};
use tessera_editor::*;
use tessera_parser::ast::{Element, JsxChild};

const SAMPLES: &[&str] = &[
    "const a = <div />;",
    "const a = <div className=\"x\" >text</div>;",
    "export function Card({ title }) {\n  return (\n    <article\n      className=\"card\"\n      {...rest}\n    >\n      <h2>{title}</h2>\n      {open && <p>body</p>}\n      <>\n        <img src={`/a.png`} alt='' />\n      </>\n    </article>\n  );\n}\n",
    "const List = ({ items }) => <ul>{items.map((i) => <li key={i}>{i}</li>)}</ul>;",
    "class Page extends React.Component {\n  render() {\n    return <Layout title={<b>t</b>}><Fragment><main /></Fragment></Layout>;\n  }\n}\n",
];

#[test]
fn test_strip_after_inject_restores_source() {
    for source in SAMPLES {
        let injected = inject_source(source, "/a.tsx").unwrap().unwrap();
        assert_ne!(&injected, source);
        assert_eq!(&strip_source(&injected).unwrap(), source, "round trip of {}", source);
    }
}

#[test]
fn test_inject_is_idempotent() {
    for source in SAMPLES {
        let injected = inject_source(source, "/a.tsx").unwrap().unwrap();
        assert_eq!(inject_source(&injected, "/a.tsx").unwrap(), None);

        let module = tessera_parser::parse(&injected).unwrap();
        let oids = collect_oids(&module);
        assert_eq!(oids.len(), injected.matches("data-oid=").count(), "unique ids in {}", injected);
    }
}

/// Identities of the element children of the element carrying `oid`
fn child_oids(source: &str, oid: &str) -> Vec<String> {
    struct Finder<'a> {
        oid: &'a str,
        found: Option<Vec<String>>,
    }

    impl Visitor for Finder<'_> {
        fn visit_element(&mut self, element: &Element) -> ControlFlow<()> {
            if element_oid(element) == Some(self.oid) {
                self.found = Some(
                    element
                        .children
                        .iter()
                        .filter_map(JsxChild::as_element)
                        .map(|child| element_oid(child).unwrap_or("?").to_string())
                        .collect(),
                );
                return ControlFlow::Break(());
            }
            walk_element(self, element)
        }
    }

    let module = tessera_parser::parse(source).unwrap();
    let mut finder = Finder { oid, found: None };
    let _ = finder.visit_module(&module);
    finder.found.unwrap()
}

/// A list whose elements are separated by a mix of inline text, line
/// breaks and expression children
fn mixed_list(n: usize) -> String {
    let mut source = String::from("const a = (\n  <ul data-oid=\"list\">");
    for i in 0..n {
        match i % 3 {
            0 => source.push_str("\n    "),
            1 => source.push_str(" text "),
            _ => source.push_str("{gap}"),
        }
        source.push_str(&format!("<li data-oid=\"c{}\">{}</li>", i, i));
    }
    source.push_str("\n  </ul>\n);\n");
    source
}

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("c{}", i)).collect()
}

fn run(source: &str, actions: Vec<StructureAction>) -> SourceEdit {
    let request = EditRequest {
        oid: "list".to_string(),
        structure_changes: actions,
        ..Default::default()
    };
    transform_source(source, "/list.tsx", &[request]).unwrap()
}

#[test]
fn test_move_lands_at_target_index() {
    for n in 1..=5 {
        let source = mixed_list(n);
        for from in 0..n {
            for to in 0..n {
                let edit = run(
                    &source,
                    vec![StructureAction::Move(MoveAction {
                        original_index: from,
                        target_index: to,
                    })],
                );

                let mut expected = ids(n);
                let moved = expected.remove(from);
                expected.insert(to, moved);

                assert_eq!(
                    child_oids(&edit.generated, "list"),
                    expected,
                    "move {} -> {} in {}",
                    from,
                    to,
                    source
                );
                assert!(edit.report.warnings.is_empty());
            }
        }
    }
}

#[test]
fn test_move_sequences_keep_identities() {
    let source = mixed_list(4);
    let mut current = source.clone();
    let mut expected = ids(4);
    let moves = [(0, 3), (2, 0), (1, 2), (3, 1), (0, 0)];

    for (from, to) in moves {
        current = run(
            &current,
            vec![StructureAction::Move(MoveAction {
                original_index: from,
                target_index: to,
            })],
        )
        .generated;
        let moved = expected.remove(from);
        expected.insert(to, moved);
        assert_eq!(child_oids(&current, "list"), expected);
    }
}

#[test]
fn test_move_out_of_range_is_skipped() {
    let source = mixed_list(3);
    let edit = run(
        &source,
        vec![StructureAction::Move(MoveAction {
            original_index: 3,
            target_index: 0,
        })],
    );
    assert_eq!(edit.generated, source);
    assert_eq!(edit.report.warnings.len(), 1);
}

#[test]
fn test_insert_index_is_clamped() {
    for n in 0..=3 {
        let source = mixed_list(n);
        for index in 0..(n + 3) {
            let mut element = ActionElement::new("li");
            element.oid = Some("new".to_string());
            let edit = run(
                &source,
                vec![StructureAction::Insert(InsertAction {
                    target_position: Some(TargetPosition::Index { index: index as i64 }),
                    element,
                    code_fragment: None,
                })],
            );

            let mut expected = ids(n);
            expected.insert(index.min(n), "new".to_string());
            assert_eq!(child_oids(&edit.generated, "list"), expected, "insert at {}", index);
        }
    }
}

#[test]
fn test_remove_each_index() {
    for n in 1..=4 {
        let source = mixed_list(n);
        for index in 0..n {
            let edit = run(
                &source,
                vec![StructureAction::Remove(RemoveAction {
                    target_position: Some(TargetPosition::Index { index: index as i64 }),
                })],
            );
            let mut expected = ids(n);
            expected.remove(index);
            assert_eq!(child_oids(&edit.generated, "list"), expected);
        }
    }
}

#[test]
fn test_group_then_ungroup_restores_order() {
    let n = 4;
    let source = mixed_list(n);

    // Every non-empty subset of the children
    for mask in 1u32..(1 << n) {
        let targets: Vec<GroupTarget> = (0..n)
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| GroupTarget {
                index: i,
                uuid: format!("u{}", i),
            })
            .collect();
        let first = targets[0].index as i64;

        let grouped = run(
            &source,
            vec![StructureAction::Group(GroupAction {
                targets: targets.clone(),
                container: ActionElement::new("div"),
                target_position: Some(TargetPosition::Index { index: first }),
            })],
        );
        assert_eq!(child_oids(&grouped.generated, "list").len(), n - targets.len() + 1);

        let ungrouped = run(
            &grouped.generated,
            vec![StructureAction::Ungroup(UngroupAction {
                container_position: TargetPosition::Index { index: first },
                targets: targets.clone(),
            })],
        );

        let expected: Vec<String> = (0..n)
            .map(|i| {
                if mask & (1 << i) != 0 {
                    format!("u{}", i)
                } else {
                    format!("c{}", i)
                }
            })
            .collect();
        assert_eq!(child_oids(&ungrouped.generated, "list"), expected, "mask {:b}", mask);
    }
}

//! Property tests for parsing and serialization.

use proptest::prelude::*;
use vaultmeta::{InsertLocation, Note, VaultContext, VaultIndex};
use vaultmeta::{apply, Operation, PendingOperation, Scope};

const LOCATIONS: [InsertLocation; 3] = [
    InsertLocation::Top,
    InsertLocation::AfterTitle,
    InsertLocation::Bottom,
];

fn line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("---".to_string()),
        Just("title: Note".to_string()),
        Just("tags: [a, b]".to_string()),
        Just("list:".to_string()),
        Just("  - item".to_string()),
        Just("# Heading".to_string()),
        Just("key:: value".to_string()),
        Just("- [ ] task [due:: soon] #todo".to_string()),
        Just("(inline:: paren) and #tag/child".to_string()),
        Just("`#not-a-tag` text".to_string()),
        Just("```".to_string()),
        Just("".to_string()),
        "[a-z #:\\[\\]()]{0,20}",
    ]
}

fn document(fences: bool) -> impl Strategy<Value = String> {
    (prop::collection::vec(line(), 0..12), any::<bool>()).prop_map(move |(lines, trailing)| {
        let lines: Vec<String> = lines
            .into_iter()
            .filter(|l| fences || !l.starts_with("```"))
            .collect();
        let mut text = lines.join("\n");
        if trailing && !text.is_empty() {
            text.push('\n');
        }
        text
    })
}

fn index_of(text: &str) -> VaultIndex {
    let context = VaultContext {
        root: "/vault".into(),
        exclude_paths: Vec::new(),
        insert_location: InsertLocation::Bottom,
    };
    VaultIndex::from_notes(context, vec![Note::parse("note.md", text)])
}

proptest! {
    #[test]
    fn unmodified_note_serializes_to_its_original(text in document(true)) {
        let note = Note::parse("note.md", text.as_str());
        for location in LOCATIONS {
            prop_assert_eq!(note.serialize(location), text.clone());
        }
    }

    #[test]
    fn added_tag_reads_back(text in document(false)) {
        let mut index = index_of(&text);
        let add = Operation::AddTag { tag: "added".into() };
        apply(&mut index, PendingOperation::new(add, Scope::all())).unwrap();

        let note = &index.notes()[0];
        let written = note.serialize(InsertLocation::Bottom);
        let reparsed = Note::parse("note.md", written.as_str());
        prop_assert!(reparsed.has_tag("added"));
        prop_assert_eq!(reparsed.serialize(InsertLocation::Bottom), written);
    }

    #[test]
    fn rename_tag_keeps_other_text(text in document(true)) {
        let mut index = index_of(&text);
        let before = index.notes()[0].tags();
        let rename = Operation::RenameTag { old: "todo".into(), new: "next".into() };
        apply(&mut index, PendingOperation::new(rename, Scope::all())).unwrap();

        let written = index.notes()[0].serialize(InsertLocation::Bottom);
        if !before.iter().any(|t| t == "todo") {
            prop_assert_eq!(written, text);
        } else {
            prop_assert_eq!(written.replace("#next", "#todo"), text);
        }
    }
}

#[test]
fn scenario_rename_key_across_areas() {
    let mut index = index_of("---\nauthor: ann\n---\nwriter:: bob\n[author:: cat]\n");
    let rename = Operation::RenameKey { old: "author".into(), new: "writer".into() };
    let report = apply(&mut index, PendingOperation::new(rename, Scope::all())).unwrap();
    assert_eq!(report.count(), 1);
    assert_eq!(
        index.notes()[0].serialize(InsertLocation::Bottom),
        "---\nwriter: ann\n---\nwriter:: bob\n[writer:: cat]\n"
    );
}

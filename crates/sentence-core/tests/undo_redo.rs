use manos_sentence_core::{
    Document, Editor, Key, Node, Op, PluginRegistry, Selection, Transaction,
};

fn editor_at(children: Vec<Node>, caret: usize) -> Editor {
    Editor::new(
        Document::new(children),
        Selection::collapsed(caret),
        PluginRegistry::sentence(),
    )
}

#[test]
fn undo_redo_restores_a_sentence_split() {
    let mut editor = editor_at(vec![Node::sentences(["ab", "cd"])], 3);
    let doc_before = editor.doc().clone();

    editor.run_command("sentence.split", None).unwrap();
    let doc_after = editor.doc().clone();
    assert_eq!(editor.selection(), &Selection::collapsed(5));

    assert!(editor.undo());
    assert_eq!(editor.doc(), &doc_before);
    assert_eq!(editor.selection(), &Selection::collapsed(3));

    assert!(editor.redo());
    assert_eq!(editor.doc(), &doc_after);
    assert_eq!(editor.selection(), &Selection::collapsed(5));
    assert!(!editor.can_redo());
}

#[test]
fn undo_redo_restores_a_sentence_join() {
    let mut editor = editor_at(vec![Node::sentences(["01234", "56789"])], 10);
    let doc_before = editor.doc().clone();

    editor.handle_key(Key::Backspace).unwrap();
    let doc_after = editor.doc().clone();
    assert_eq!(doc_after.children[0].children().len(), 2);

    assert!(editor.undo());
    assert_eq!(editor.doc(), &doc_before);
    assert_eq!(editor.selection(), &Selection::collapsed(10));

    assert!(editor.redo());
    assert_eq!(editor.doc(), &doc_after);
    assert_eq!(editor.selection(), &Selection::collapsed(7));
}

#[test]
fn undo_of_a_fall_through_enter_keeps_the_moved_caret() {
    let mut editor = editor_at(vec![Node::sentences(["ab", "cd"])], 7);
    let doc_before = editor.doc().clone();

    assert!(editor.handle_key(Key::Enter).unwrap());
    assert_eq!(editor.doc().children.len(), 2);

    // The caret-only step leaves no history entry; the split is one entry.
    assert!(editor.undo());
    assert!(!editor.can_undo());
    assert_eq!(editor.doc(), &doc_before);
    assert_eq!(editor.selection(), &Selection::collapsed(6));
}

#[test]
fn new_edits_clear_the_redo_stack() {
    let mut editor = editor_at(vec![Node::sentences(["abc"])], 3);

    editor.run_command("sentence.split", None).unwrap();
    assert!(editor.undo());
    assert!(editor.can_redo());

    editor
        .apply(
            Transaction::new(vec![Op::InsertText {
                path: vec![0, 0],
                offset: 3,
                text: "d".to_string(),
            }])
            .source("test:insert"),
        )
        .unwrap();
    assert!(!editor.can_redo());
    assert_eq!(editor.doc().children, vec![Node::sentences(["abcd"])]);
}

#[test]
fn undo_stack_is_bounded_by_config() {
    let mut editor = editor_at(vec![Node::sentences(["a"])], 3).with_config(
        serde_json::from_value(serde_json::json!({ "max_undo": 2 })).unwrap(),
    );
    assert_eq!(editor.config().max_undo, 2);
    assert_eq!(editor.config().max_normalize_iterations, 100);

    for _ in 0..3 {
        editor
            .run_command("base.insert_text", Some(serde_json::json!({ "text": "x" })))
            .unwrap();
    }
    assert_eq!(editor.doc().children, vec![Node::sentences(["axxx"])]);

    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
    assert_eq!(editor.doc().children, vec![Node::sentences(["ax"])]);
}

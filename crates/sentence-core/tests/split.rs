use manos_sentence_core::{
    Document, Editor, Key, Node, PluginRegistry, Selection, SchemaViolation, ViolationKind,
};

fn editor_at(children: Vec<Node>, caret: usize) -> Editor {
    Editor::new(
        Document::new(children),
        Selection::collapsed(caret),
        PluginRegistry::sentence(),
    )
}

#[test]
fn split_mid_sentence_inserts_the_tail_as_the_next_sibling() {
    // p(s"ab", sp, s"cd"); caret after 'a'.
    let mut editor = editor_at(
        vec![Node::paragraph(vec![
            Node::sentence("ab"),
            Node::Space,
            Node::sentence("cd"),
        ])],
        3,
    );

    assert!(editor.run_command("sentence.split", None).unwrap());
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph(vec![
            Node::sentence("a"),
            Node::sentence("b"),
            Node::Space,
            Node::sentence("cd"),
        ])]
    );
    // Content start of "b".
    assert_eq!(editor.selection(), &Selection::collapsed(5));
}

#[test]
fn split_keeps_every_char() {
    let mut editor = editor_at(vec![Node::sentences(["héllo wörld"])], 2 + 4);

    assert!(editor.run_command("sentence.split", None).unwrap());
    let paragraph = &editor.doc().children[0];
    let texts: Vec<&str> = paragraph
        .children()
        .iter()
        .filter_map(Node::as_sentence)
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(texts, vec!["héll", "o wörld"]);
    assert_eq!(editor.doc().text_content(), "héllo wörld");
}

#[test]
fn split_leaves_adjacent_sentences_flagged_by_the_schema() {
    let mut editor = editor_at(vec![Node::sentences(["ab", "cd"])], 3);
    assert!(editor.schema().check(editor.doc()).is_empty());

    editor.run_command("sentence.split", None).unwrap();
    assert_eq!(
        editor.schema().check(editor.doc()),
        vec![SchemaViolation {
            path: vec![0, 1],
            kind: ViolationKind::AdjacentSentences,
        }]
    );
}

#[test]
fn split_at_sentence_end_only_moves_the_caret() {
    let doc = vec![Node::sentences(["ab", "cd"])];
    let mut editor = editor_at(doc.clone(), 4);

    assert!(editor.run_command("sentence.split", None).unwrap());
    assert_eq!(editor.doc().children, doc);
    assert_eq!(editor.selection(), &Selection::collapsed(7));
    assert!(!editor.can_undo());

    // From the end of the last sentence the caret lands on the paragraph end.
    editor.set_selection(Selection::collapsed(9));
    assert!(editor.run_command("sentence.split", None).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(11));
}

#[test]
fn split_in_an_empty_sentence_moves_forward() {
    let mut editor = editor_at(vec![Node::sentences(["", "cd"])], 2);

    assert!(editor.run_command("sentence.split", None).unwrap());
    assert_eq!(editor.doc().children, vec![Node::sentences(["", "cd"])]);
    assert_eq!(editor.selection(), &Selection::collapsed(5));
}

#[test]
fn split_at_sentence_start_steps_back_and_is_not_handled() {
    let doc = vec![Node::sentences(["ab", "cd"])];
    let mut editor = editor_at(doc.clone(), 7);

    assert!(!editor.run_command("sentence.split", None).unwrap());
    assert_eq!(editor.doc().children, doc);
    assert_eq!(editor.selection(), &Selection::collapsed(6));
}

#[test]
fn enter_at_sentence_start_falls_through_to_a_paragraph_split() {
    let mut editor = editor_at(vec![Node::sentences(["ab", "cd"])], 7);

    assert!(editor.handle_key(Key::Enter).unwrap());
    assert_eq!(
        editor.doc().children,
        vec![Node::sentences(["ab"]), Node::sentences(["cd"])]
    );
    // Content start of the new paragraph.
    assert_eq!(editor.selection(), &Selection::collapsed(8));
    assert!(editor.schema().check(editor.doc()).is_empty());
}

#[test]
fn split_ignores_ranges_and_paragraph_positions() {
    let doc = vec![Node::sentences(["ab", "cd"])];
    let mut editor = editor_at(doc.clone(), 1);
    assert!(!editor.run_command("sentence.split", None).unwrap());

    editor.set_selection(Selection::new(2, 4));
    assert!(!editor.run_command("sentence.split", None).unwrap());
    assert_eq!(editor.doc().children, doc);
    assert_eq!(editor.selection(), &Selection::new(2, 4));
}

#[test]
fn enter_with_a_range_deletes_it_through_the_default_keymap() {
    let mut editor = editor_at(vec![Node::sentences(["abcd"])], 0);
    editor.set_selection(Selection::new(3, 5));

    assert!(editor.handle_key(Key::Enter).unwrap());
    assert_eq!(editor.doc().children, vec![Node::sentences(["ad"])]);
    assert_eq!(editor.selection(), &Selection::collapsed(3));
}

use manos_sentence_core::{Document, Editor, Key, Node, PluginRegistry, Selection};

fn editor_at(children: Vec<Node>, caret: usize) -> Editor {
    Editor::new(
        Document::new(children),
        Selection::collapsed(caret),
        PluginRegistry::sentence(),
    )
}

fn demo() -> Vec<Node> {
    vec![Node::sentences(["01234", "56789"])]
}

#[test]
fn delete_at_sentence_start_removes_the_preceding_space() {
    let mut editor = editor_at(demo(), 10);

    assert!(editor.run_command("sentence.delete_backward", None).unwrap());
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph(vec![Node::sentence("0123456789"), Node::Space])]
    );
    assert_eq!(editor.doc().text_content(), "0123456789");
    assert_eq!(editor.selection(), &Selection::collapsed(7));
    assert_eq!(editor.take_scroll_request(), Some(7));
}

#[test]
fn delete_at_first_sentence_start_joins_the_previous_paragraph() {
    let mut editor = editor_at(
        vec![Node::sentences(["ab"]), Node::sentences(["cd"])],
        9,
    );

    assert!(editor.handle_key(Key::Backspace).unwrap());
    assert_eq!(editor.doc().children, vec![Node::sentences(["ab", "cd"])]);
    // Content start of "cd".
    assert_eq!(editor.selection(), &Selection::collapsed(7));
}

#[test]
fn delete_at_document_start_changes_nothing() {
    let mut editor = editor_at(demo(), 2);

    assert!(editor.run_command("sentence.delete_backward", None).unwrap());
    assert_eq!(editor.doc().children, demo());
    assert_eq!(editor.selection(), &Selection::collapsed(2));
    assert!(!editor.can_undo());
}

#[test]
fn backspace_in_a_lone_empty_paragraph_is_not_handled() {
    let mut editor = editor_at(vec![Node::paragraph(Vec::new())], 1);

    assert!(!editor.run_command("sentence.delete_backward", None).unwrap());
    assert!(!editor.handle_key(Key::Backspace).unwrap());
    assert_eq!(editor.doc().children, vec![Node::paragraph(Vec::new())]);
    assert_eq!(editor.selection(), &Selection::collapsed(1));
}

#[test]
fn backspace_in_an_empty_paragraph_joins_it_into_the_previous_one() {
    let mut editor = editor_at(
        vec![Node::sentences(["ab"]), Node::paragraph(Vec::new())],
        8,
    );

    assert!(!editor.run_command("sentence.delete_backward", None).unwrap());
    assert!(editor.handle_key(Key::Backspace).unwrap());
    assert_eq!(editor.doc().children, vec![Node::sentences(["ab"])]);
    assert_eq!(editor.selection(), &Selection::collapsed(6));
}

#[test]
fn delete_at_paragraph_end_moves_back_one_stop() {
    let mut editor = editor_at(demo(), 17);

    assert!(editor.run_command("sentence.delete_backward", None).unwrap());
    assert_eq!(editor.doc().children, demo());
    assert_eq!(editor.selection(), &Selection::collapsed(15));
}

#[test]
fn delete_in_a_paragraph_gap_removes_the_separator_around_the_caret() {
    // 8 sits between "01234" and the space after it.
    let mut editor = editor_at(demo(), 8);

    assert!(editor.run_command("sentence.delete_backward", None).unwrap());
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph(vec![Node::sentence("0123456789"), Node::Space])]
    );
    assert_eq!(editor.selection(), &Selection::collapsed(7));
}

#[test]
fn backspace_inside_text_falls_through_to_char_deletion() {
    let mut editor = editor_at(demo(), 4);

    assert!(!editor.run_command("sentence.delete_backward", None).unwrap());
    assert!(editor.handle_key(Key::Backspace).unwrap());
    assert_eq!(editor.doc().children, vec![Node::sentences(["0234", "56789"])]);
    assert_eq!(editor.selection(), &Selection::collapsed(3));
}

#[test]
fn backspace_with_a_range_deletes_the_range() {
    let mut editor = editor_at(demo(), 0);
    editor.set_selection(Selection::new(5, 3));

    assert!(!editor.run_command("sentence.delete_backward", None).unwrap());
    assert!(editor.handle_key(Key::Backspace).unwrap());
    assert_eq!(editor.doc().children, vec![Node::sentences(["034", "56789"])]);
    assert_eq!(editor.selection(), &Selection::collapsed(3));
}

#[test]
fn backspace_across_sentences_joins_them() {
    let mut editor = editor_at(demo(), 0);
    editor.set_selection(Selection::new(5, 12));

    assert!(editor.handle_key(Key::Backspace).unwrap());
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph(vec![Node::sentence("012789"), Node::Space])]
    );
    assert_eq!(editor.selection(), &Selection::collapsed(5));
}

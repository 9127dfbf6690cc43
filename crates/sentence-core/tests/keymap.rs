use manos_sentence_core::{Document, Editor, Key, Node, PluginRegistry, Selection};

fn editor_at(caret: usize) -> Editor {
    Editor::new(
        Document::new(vec![Node::sentences(["01234", "56789"])]),
        Selection::collapsed(caret),
        PluginRegistry::sentence(),
    )
}

#[test]
fn arrow_left_between_sentences_jumps_to_the_previous_stop() {
    let mut editor = editor_at(8);

    assert!(editor.run_command("paragraph.go_left_sentence", None).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(7));
}

#[test]
fn arrow_left_from_a_range_starting_in_the_paragraph_jumps_back() {
    let mut editor = editor_at(8);
    editor.set_selection(Selection::new(12, 8));

    assert!(editor.run_command("paragraph.go_left_sentence", None).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(7));

    editor.set_selection(Selection::new(12, 8));
    assert!(editor.handle_key(Key::ArrowLeft).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(7));
}

#[test]
fn arrow_left_inside_a_sentence_falls_through_to_a_plain_move() {
    let mut editor = editor_at(12);

    assert!(!editor.run_command("paragraph.go_left_sentence", None).unwrap());
    assert!(editor.handle_key(Key::ArrowLeft).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(11));
}

#[test]
fn arrow_left_walks_out_of_a_sentence_and_over_the_space() {
    let mut editor = editor_at(10);

    // Sentence start: the default move steps in front of the sentence.
    assert!(editor.handle_key(Key::ArrowLeft).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(9));

    // Directly in the paragraph: jump over the space to the previous sentence end.
    assert!(editor.handle_key(Key::ArrowLeft).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(7));
}

#[test]
fn arrow_keys_collapse_ranges_and_stop_at_document_edges() {
    let mut editor = editor_at(0);
    assert!(!editor.handle_key(Key::ArrowLeft).unwrap());

    editor.set_selection(Selection::new(12, 4));
    assert!(editor.handle_key(Key::ArrowRight).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(12));

    editor.set_selection(Selection::collapsed(18));
    assert!(!editor.handle_key(Key::ArrowRight).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(18));
}

#[test]
fn unit_bindings_alone_leave_unhandled_keys_to_the_host() {
    let mut editor = Editor::new(
        Document::new(vec![Node::sentences(["01234", "56789"])]),
        Selection::collapsed(12),
        PluginRegistry::units(),
    );

    assert!(!editor.handle_key(Key::ArrowLeft).unwrap());
    assert!(!editor.handle_key(Key::ArrowRight).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(12));

    // Enter at a sentence start still moves the caret before reporting unhandled.
    editor.set_selection(Selection::collapsed(10));
    assert!(!editor.handle_key(Key::Enter).unwrap());
    assert_eq!(editor.selection(), &Selection::collapsed(9));
}

#[test]
fn insert_text_goes_into_the_sentence_under_the_caret() {
    let mut editor = editor_at(7);

    assert!(
        editor
            .run_command("base.insert_text", Some(serde_json::json!({ "text": "!" })))
            .unwrap()
    );
    assert_eq!(editor.doc().children, vec![Node::sentences(["01234!", "56789"])]);
    assert_eq!(editor.selection(), &Selection::collapsed(8));

    editor.set_selection(Selection::collapsed(9));
    assert!(
        !editor
            .run_command("base.insert_text", Some(serde_json::json!({ "text": "x" })))
            .unwrap()
    );
    assert!(editor.run_command("base.insert_text", None).is_err());
}

//! Default key behavior. Registered after the unit plugins, so these commands
//! only see a key that every unit binding left unhandled.

use serde_json::Value;

use crate::core::{ApplyError, Selection, StateView};
use crate::keymap::{Key, KeyBinding};
use crate::plugin::{CommandError, CommandOutcome, CommandSpec, SentencePlugin};
use crate::schema::UnitKind;
use crate::transform::Tr;

pub(crate) struct BaseKeymapPlugin;

impl SentencePlugin for BaseKeymapPlugin {
    fn id(&self) -> &'static str {
        "base.keymap"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("base.split_block", "Split paragraph", |editor, _args| {
                Ok(split_block(editor)?)
            })
            .description("Split the paragraph at the caret."),
            CommandSpec::new("base.delete_backward", "Delete backward", |editor, _args| {
                Ok(delete_backward(editor)?)
            })
            .description("Delete the selection, the previous char, or join with the previous paragraph."),
            CommandSpec::new("base.move_left", "Move left", |editor, _args| {
                Ok(move_by(editor, Direction::Left))
            }),
            CommandSpec::new("base.move_right", "Move right", |editor, _args| {
                Ok(move_by(editor, Direction::Right))
            }),
            CommandSpec::new("base.insert_text", "Insert text", |editor, args| {
                let text = args
                    .as_ref()
                    .and_then(|v| v.get("text"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| CommandError::InvalidArgs {
                        command: "base.insert_text".to_string(),
                        message: "missing args.text".to_string(),
                    })?;
                Ok(insert_text(editor, text)?)
            })
            .description("Insert text at the caret when it sits inside a sentence.")
            .args_example(serde_json::json!({ "text": "Hello" })),
        ]
    }

    fn keyboard_shortcuts(&self) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new(Key::Enter, "base.split_block"),
            KeyBinding::new(Key::Backspace, "base.delete_backward"),
            KeyBinding::new(Key::ArrowLeft, "base.move_left"),
            KeyBinding::new(Key::ArrowRight, "base.move_right"),
        ]
    }
}

/// Deletes a range selection and collapses the caret at its start.
fn delete_selection(tr: &mut Tr) -> Result<(), ApplyError> {
    let selection = *tr.selection();
    if selection.is_collapsed() {
        return Ok(());
    }
    tr.delete(selection.from(), selection.to())?;
    let from = tr.selection().from();
    tr.set_selection(Selection::collapsed(from));
    Ok(())
}

fn split_block(state: &impl StateView) -> Result<CommandOutcome, ApplyError> {
    let mut tr = Tr::from_state(state).source("command:base.split_block");
    delete_selection(&mut tr)?;

    let pos = tr.selection().focus;
    if tr.doc().resolve_clamped(pos).is_in(UnitKind::Paragraph) {
        tr.split(pos)?.scroll_into_view();
    }

    if !tr.doc_changed() {
        return Ok(CommandOutcome::unhandled());
    }
    Ok(CommandOutcome::handled(tr))
}

fn delete_backward(state: &impl StateView) -> Result<CommandOutcome, ApplyError> {
    let mut tr = Tr::from_state(state).source("command:base.delete_backward");
    if !state.selection().is_collapsed() {
        delete_selection(&mut tr)?;
        tr.scroll_into_view();
        return Ok(CommandOutcome::handled(tr));
    }

    let at = state.doc().resolve_clamped(state.selection().focus);
    match at.parent_kind() {
        Some(UnitKind::Sentence) if at.parent_offset() > 0 => {
            tr.delete(at.pos - 1, at.pos)?;
        }
        // Joins with the previous paragraph by removing both boundary tokens.
        Some(UnitKind::Paragraph) if at.pos == at.start() && at.index_at(0) > 0 => {
            tr.delete(at.pos - 2, at.pos)?;
        }
        _ => return Ok(CommandOutcome::unhandled()),
    }
    tr.scroll_into_view();
    Ok(CommandOutcome::handled(tr))
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Left,
    Right,
}

fn move_by(state: &impl StateView, direction: Direction) -> CommandOutcome {
    let selection = *state.selection();
    let target = match (selection.is_collapsed(), direction) {
        (false, Direction::Left) => selection.from(),
        (false, Direction::Right) => selection.to(),
        (true, Direction::Left) => selection.focus.saturating_sub(1),
        (true, Direction::Right) => selection.focus + 1,
    };

    let mut tr = Tr::from_state(state).source("command:base.move");
    tr.set_selection(Selection::collapsed(target))
        .scroll_into_view();
    if tr.selection() == &selection {
        return CommandOutcome::unhandled();
    }
    CommandOutcome::handled(tr)
}

fn insert_text(state: &impl StateView, text: &str) -> Result<CommandOutcome, ApplyError> {
    let mut tr = Tr::from_state(state).source("command:base.insert_text");
    delete_selection(&mut tr)?;

    let pos = tr.selection().focus;
    if tr.doc().resolve_clamped(pos).is_in(UnitKind::Sentence) {
        tr.insert_text(pos, text)?.scroll_into_view();
    }

    if !tr.doc_changed() {
        return Ok(CommandOutcome::unhandled());
    }
    Ok(CommandOutcome::handled(tr))
}

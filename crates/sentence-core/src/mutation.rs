//! Enter, Backspace and ArrowLeft behavior for sentence/space paragraphs.
//!
//! Every function reads a state snapshot and returns a [`CommandOutcome`];
//! `handled == false` lets the next binding for the key (ultimately the
//! default keymap) run against the state left by any returned transaction.

use tracing::debug;

use crate::core::{ApplyError, Node, Selection, StateView};
use crate::navigator::{self, go_to_next_cursor, go_to_prev_cursor};
use crate::plugin::CommandOutcome;
use crate::position::ResolvedPos;
use crate::schema::UnitKind;
use crate::transform::Tr;

fn caret(state: &impl StateView) -> Option<ResolvedPos> {
    let selection = state.selection();
    if !selection.is_collapsed() {
        return None;
    }
    Some(state.doc().resolve_clamped(selection.focus))
}

fn log_state(command: &str, at: &ResolvedPos) {
    debug!(
        command,
        pos = at.pos,
        start = at.start(),
        end = at.end(),
        parent = ?at.parent_kind(),
        "mutation state"
    );
}

/// Enter inside a sentence.
///
/// Mid-text the sentence is cut in two and the tail becomes its next sibling,
/// with no space between them. That leaves the paragraph outside its
/// `(sentence space)*` pattern; [`crate::Schema::check`] reports it.
pub fn split_sentence(state: &impl StateView) -> Result<CommandOutcome, ApplyError> {
    let Some(at) = caret(state) else {
        return Ok(CommandOutcome::unhandled());
    };
    log_state("sentence.split", &at);
    if !at.is_in(UnitKind::Sentence) {
        return Ok(CommandOutcome::unhandled());
    }

    let mut tr = Tr::from_state(state).source("command:sentence.split");
    let offset = at.parent_offset();
    let len = at.end() - at.start();

    if offset == len {
        go_to_next_cursor(&mut tr);
        return Ok(CommandOutcome::handled(tr));
    }

    if offset == 0 {
        // Step out in front of the sentence and let the default Enter run there.
        tr.set_selection(Selection::collapsed(at.pos.saturating_sub(1)));
        return Ok(CommandOutcome::fall_through(tr));
    }

    let tail: String = state
        .doc()
        .node(at.parent_path())
        .and_then(Node::as_sentence)
        .map(|s| s.text.chars().skip(offset).collect())
        .unwrap_or_default();

    // `after()` is Some for any position inside a sentence.
    let after = at.after().unwrap_or(at.end() + 1);
    tr.insert(after, Node::sentence(tail))?;
    tr.delete(at.pos, at.end())?;
    go_to_next_cursor(&mut tr);
    Ok(CommandOutcome::handled(tr))
}

/// Backspace at a sentence start or directly in a paragraph.
pub fn delete_backward(state: &impl StateView) -> Result<CommandOutcome, ApplyError> {
    let Some(at) = caret(state) else {
        return Ok(CommandOutcome::unhandled());
    };
    log_state("sentence.delete_backward", &at);

    let mut tr = Tr::from_state(state).source("command:sentence.delete_backward");
    match at.parent_kind() {
        Some(UnitKind::Sentence) if at.pos == at.start() => {
            let prev = navigator::prev_cursor(state).pos;
            tr.delete(prev, at.pos)?.scroll_into_view();
            Ok(CommandOutcome::handled(tr))
        }
        Some(UnitKind::Paragraph) if at.pos == at.end() => {
            if at.start() == at.end() {
                return Ok(CommandOutcome::unhandled());
            }
            go_to_prev_cursor(&mut tr);
            Ok(CommandOutcome::handled(tr))
        }
        Some(UnitKind::Paragraph) if at.start() <= at.pos && at.pos < at.end() => {
            let prev = navigator::prev_cursor(state).pos;
            let next = navigator::next_cursor(state).pos;
            tr.delete(prev, next)?.scroll_into_view();
            Ok(CommandOutcome::handled(tr))
        }
        _ => Ok(CommandOutcome::unhandled()),
    }
}

/// ArrowLeft while the caret sits directly in a paragraph.
///
/// Only the start of a range selection is looked at; the range collapses onto
/// the stop before it.
pub fn go_left_sentence(state: &impl StateView) -> Result<CommandOutcome, ApplyError> {
    let at = state.doc().resolve_clamped(state.selection().from());
    log_state("paragraph.go_left_sentence", &at);
    if !at.is_in(UnitKind::Paragraph) {
        return Ok(CommandOutcome::unhandled());
    }

    let mut tr = Tr::from_state(state).source("command:paragraph.go_left_sentence");
    go_to_prev_cursor(&mut tr);
    Ok(CommandOutcome::handled(tr))
}

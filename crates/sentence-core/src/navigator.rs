//! Legal caret stops.
//!
//! Forward traversal steps over spaces and sentence boundaries; backward
//! traversal additionally steps over paragraph boundaries. The two are not
//! inverses: `prev_cursor` after `next_cursor` can land somewhere other than
//! the starting position.

use tracing::trace;

use crate::core::{Document, Selection, StateView};
use crate::position::{Adjacent, ResolvedPos};
use crate::schema::UnitKind;
use crate::transform::Tr;

fn skipped_forward(at: &ResolvedPos) -> bool {
    matches!(
        at.node_after(),
        Some(Adjacent::Unit(UnitKind::Space | UnitKind::Sentence))
    )
}

fn skipped_backward(at: &ResolvedPos) -> bool {
    matches!(
        at.node_after(),
        Some(Adjacent::Unit(
            UnitKind::Space | UnitKind::Sentence | UnitKind::Paragraph
        ))
    )
}

/// First stop after `pos`, clamped to the document end.
pub fn next_cursor_from(doc: &Document, pos: usize) -> ResolvedPos {
    let mut probe = doc.resolve_clamped(pos + 1);
    while skipped_forward(&probe) {
        trace!(pos = probe.pos, "next_cursor: skip");
        probe = doc.resolve_clamped(probe.pos + 1);
    }
    probe
}

/// First stop before `pos`, clamped to the document start.
pub fn prev_cursor_from(doc: &Document, pos: usize) -> ResolvedPos {
    let mut probe = doc.resolve_clamped(pos.saturating_sub(1));
    while probe.pos > 0 && skipped_backward(&probe) {
        trace!(pos = probe.pos, "prev_cursor: skip");
        probe = doc.resolve_clamped(probe.pos - 1);
    }
    probe
}

pub fn next_cursor(state: &impl StateView) -> ResolvedPos {
    next_cursor_from(state.doc(), state.selection().from())
}

pub fn prev_cursor(state: &impl StateView) -> ResolvedPos {
    prev_cursor_from(state.doc(), state.selection().from())
}

pub fn go_to_next_cursor(tr: &mut Tr) {
    let next = next_cursor(&*tr);
    tr.set_selection(Selection::collapsed(next.pos))
        .scroll_into_view();
}

pub fn go_to_prev_cursor(tr: &mut Tr) {
    let prev = prev_cursor(&*tr);
    tr.set_selection(Selection::collapsed(prev.pos))
        .scroll_into_view();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Node;

    fn doc() -> Document {
        Document::new(vec![
            Node::sentences(["01234", "56789"]),
            Node::sentences(["ab"]),
        ])
    }

    #[test]
    fn next_cursor_jumps_from_sentence_end_into_the_next_sentence() {
        assert_eq!(next_cursor_from(&doc(), 7).pos, 10);
    }

    #[test]
    fn next_cursor_stops_at_the_paragraph_end_after_the_last_space() {
        assert_eq!(next_cursor_from(&doc(), 15).pos, 17);
    }

    #[test]
    fn next_cursor_does_not_skip_paragraph_boundaries() {
        // 17 is the end of the first paragraph; 18 sits before the second one.
        let at = next_cursor_from(&doc(), 17);
        assert_eq!(at.pos, 18);
        assert_eq!(at.parent_kind(), None);
    }

    #[test]
    fn prev_cursor_crosses_paragraph_boundaries() {
        // Start of "ab" in the second paragraph.
        assert_eq!(prev_cursor_from(&doc(), 20).pos, 17);
    }

    #[test]
    fn prev_cursor_is_clamped_at_the_document_start() {
        assert_eq!(prev_cursor_from(&doc(), 2).pos, 0);
        assert_eq!(prev_cursor_from(&doc(), 0).pos, 0);
    }

    #[test]
    fn next_cursor_is_clamped_at_the_document_end() {
        let doc = doc();
        let size = doc.content_size();
        assert_eq!(next_cursor_from(&doc, size).pos, size);
    }
}

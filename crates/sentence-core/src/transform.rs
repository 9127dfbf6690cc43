use crate::core::{
    ApplyError, Document, Node, ParagraphNode, Selection, StateView, apply_op_to, child_path,
};
use crate::ops::{Op, Path, StepMap, Transaction};
use crate::schema::UnitKind;

/// Transaction under construction: a working copy of the document that every
/// step is applied to immediately, so later steps can read the result of
/// earlier ones.
#[derive(Debug, Clone)]
pub struct Tr {
    doc: Document,
    selection: Selection,
    ops: Vec<Op>,
    scroll_into_view: bool,
    source: Option<String>,
}

impl Tr {
    pub fn new(doc: Document, selection: Selection) -> Self {
        Self {
            doc,
            selection,
            ops: Vec::new(),
            scroll_into_view: false,
            source: None,
        }
    }

    /// Starts a transaction over a copy of `state`.
    pub fn from_state(state: &impl StateView) -> Self {
        Self::new(state.doc().clone(), *state.selection())
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn doc_changed(&self) -> bool {
        !self.ops.is_empty()
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection.clamp(self.doc.content_size());
        self
    }

    pub fn scroll_into_view(&mut self) -> &mut Self {
        self.scroll_into_view = true;
        self
    }

    /// Applies one op and maps the selection through it.
    pub fn step(&mut self, op: Op) -> Result<&mut Self, ApplyError> {
        let (_, map) = apply_op_to(&mut self.doc, op.clone())?;
        self.selection = map.map_selection(&self.selection);
        self.ops.push(op);
        Ok(self)
    }

    /// Inserts `node` at a child boundary of the document or of a paragraph.
    pub fn insert(&mut self, pos: usize, node: Node) -> Result<&mut Self, ApplyError> {
        let at = self.resolve(pos)?;
        if at.is_in(UnitKind::Sentence) {
            return Err(ApplyError::InvalidPosition {
                pos,
                reason: "cannot insert a unit inside sentence text".into(),
            });
        }
        let path = child_path(at.parent_path(), at.index());
        self.step(Op::InsertNode { path, node })
    }

    pub fn insert_text(&mut self, pos: usize, text: &str) -> Result<&mut Self, ApplyError> {
        let at = self.resolve(pos)?;
        if !at.is_in(UnitKind::Sentence) {
            return Err(ApplyError::InvalidPosition {
                pos,
                reason: "text can only be inserted into a sentence".into(),
            });
        }
        if text.is_empty() {
            return Ok(self);
        }
        self.step(Op::InsertText {
            path: at.parent_path().to_vec(),
            offset: at.parent_offset(),
            text: text.to_string(),
        })
    }

    /// Deletes `[from, to)`. Units cut open on both sides at the same depth
    /// and of the same kind are joined; units cut open on one side only are
    /// trimmed. Out-of-range bounds are clamped.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, ApplyError> {
        let size_before = self.doc.content_size();
        let from = from.min(size_before);
        let to = to.min(size_before);
        if from >= to {
            return Ok(self);
        }

        let mut ops = Vec::new();
        delete_in(&self.doc.children, &mut Vec::new(), 0, from, to, &mut ops);
        for op in &ops {
            apply_op_to(&mut self.doc, op.clone())?;
        }
        self.ops.extend(ops);

        let removed = size_before - self.doc.content_size();
        let map = StepMap {
            start: from,
            old_size: to - from,
            new_size: (to - from) - removed,
        };
        self.selection = map.map_selection(&self.selection);
        Ok(self)
    }

    /// Splits the paragraph that directly contains `pos`: its children after
    /// `pos` move into a new paragraph inserted right after it.
    pub fn split(&mut self, pos: usize) -> Result<&mut Self, ApplyError> {
        let at = self.resolve(pos)?;
        if !at.is_in(UnitKind::Paragraph) {
            return Err(ApplyError::InvalidPosition {
                pos,
                reason: "only a paragraph can be split".into(),
            });
        }

        let paragraph_path = at.parent_path().to_vec();
        let moved: Vec<Node> = self
            .doc
            .node(&paragraph_path)
            .map(|p| p.children()[at.index()..].to_vec())
            .unwrap_or_default();

        let mut ops = Vec::with_capacity(moved.len() + 1);
        for ix in (at.index()..at.index() + moved.len()).rev() {
            ops.push(Op::RemoveNode {
                path: child_path(&paragraph_path, ix),
            });
        }
        let mut sibling_path = paragraph_path;
        if let Some(last) = sibling_path.last_mut() {
            *last += 1;
        }
        ops.push(Op::InsertNode {
            path: sibling_path,
            node: Node::Paragraph(ParagraphNode { children: moved }),
        });

        for op in &ops {
            apply_op_to(&mut self.doc, op.clone())?;
        }
        self.ops.extend(ops);
        self.selection = StepMap::insertion(pos, 2).map_selection(&self.selection);
        Ok(self)
    }

    pub fn into_transaction(self) -> Transaction {
        let mut tx = Transaction::new(self.ops).selection_after(self.selection);
        tx.meta.source = self.source;
        tx.meta.scroll_into_view = self.scroll_into_view;
        tx
    }

    fn resolve(&self, pos: usize) -> Result<crate::position::ResolvedPos, ApplyError> {
        self.doc
            .resolve(pos)
            .map_err(|err| ApplyError::InvalidPosition {
                pos,
                reason: err.to_string(),
            })
    }
}

impl StateView for Tr {
    fn doc(&self) -> &Document {
        &self.doc
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }
}

/// Emits the ops deleting `[from, to)` inside `children`, the content of the
/// container at `path` starting at flat position `base`. Ops are ordered right
/// to left so earlier paths stay valid.
fn delete_in(
    children: &[Node],
    path: &mut Path,
    base: usize,
    from: usize,
    to: usize,
    ops: &mut Vec<Op>,
) {
    let mut left: Option<(usize, usize)> = None;
    let mut right: Option<(usize, usize)> = None;
    let mut covered: Vec<usize> = Vec::new();

    let mut start = base;
    for (ix, child) in children.iter().enumerate() {
        let child_start = start;
        let child_end = child_start + child.node_size();
        start = child_end;

        if child_end <= from || child_start >= to {
            continue;
        }
        let open_left = child_start < from;
        let open_right = to < child_end;
        match (open_left, open_right) {
            (false, false) => covered.push(ix),
            (true, true) => {
                path.push(ix);
                delete_inside(child, path, child_start + 1, from, to, ops);
                path.pop();
                return;
            }
            (true, false) => left = Some((ix, child_start)),
            (false, true) => right = Some((ix, child_start)),
        }
    }

    if let (Some((l, l_start)), Some((r, r_start))) = (left, right) {
        if children[l].kind() == children[r].kind() {
            path.push(r);
            ops.push(Op::RemoveNode { path: path.clone() });
            path.pop();
            remove_covered(&covered, path, ops);

            path.push(l);
            delete_inside(&children[l], path, l_start + 1, from, to, ops);
            append_tail(
                &children[l],
                path,
                l_start + 1,
                from,
                &children[r],
                r_start + 1,
                to,
                ops,
            );
            path.pop();
            return;
        }
    }

    if let Some((r, r_start)) = right {
        path.push(r);
        delete_inside(&children[r], path, r_start + 1, from, to, ops);
        path.pop();
    }
    remove_covered(&covered, path, ops);
    if let Some((l, l_start)) = left {
        path.push(l);
        delete_inside(&children[l], path, l_start + 1, from, to, ops);
        path.pop();
    }
}

fn remove_covered(covered: &[usize], path: &mut Path, ops: &mut Vec<Op>) {
    for &ix in covered.iter().rev() {
        path.push(ix);
        ops.push(Op::RemoveNode { path: path.clone() });
        path.pop();
    }
}

/// Deletes the part of `[from, to)` that falls inside `node`'s content.
fn delete_inside(
    node: &Node,
    path: &mut Path,
    content_start: usize,
    from: usize,
    to: usize,
    ops: &mut Vec<Op>,
) {
    let content_end = content_start + node.content_size();
    let from = from.clamp(content_start, content_end);
    let to = to.clamp(content_start, content_end);
    if from >= to {
        return;
    }
    match node {
        Node::Sentence(_) => ops.push(Op::RemoveText {
            path: path.clone(),
            range: from - content_start..to - content_start,
        }),
        Node::Paragraph(p) => delete_in(&p.children, path, content_start, from, to, ops),
        Node::Space => {}
    }
}

/// Appends what follows `to` in `right` onto `left`, which has already been
/// truncated at `from`. Innermost units open on both sides are joined too.
#[allow(clippy::too_many_arguments)]
fn append_tail(
    left: &Node,
    left_path: &mut Path,
    left_content_start: usize,
    from: usize,
    right: &Node,
    right_content_start: usize,
    to: usize,
    ops: &mut Vec<Op>,
) {
    match (left, right) {
        (Node::Sentence(l), Node::Sentence(r)) => {
            let offset = (from - left_content_start).min(l.len_chars());
            let tail: String = r.text.chars().skip(to - right_content_start).collect();
            if !tail.is_empty() {
                ops.push(Op::InsertText {
                    path: left_path.clone(),
                    offset,
                    text: tail,
                });
            }
        }
        (Node::Paragraph(l), Node::Paragraph(r)) => {
            let mut kept = 0;
            let mut open_left: Option<(usize, usize)> = None;
            let mut start = left_content_start;
            for (ix, child) in l.children.iter().enumerate() {
                let child_end = start + child.node_size();
                if start < from {
                    kept += 1;
                    if from < child_end {
                        open_left = Some((ix, start));
                    }
                }
                start = child_end;
            }

            let mut tail: Vec<Node> = Vec::new();
            let mut start = right_content_start;
            for child in &r.children {
                let child_start = start;
                let child_end = child_start + child.node_size();
                start = child_end;

                if child_end <= to {
                    continue;
                }
                if child_start >= to {
                    tail.push(child.clone());
                    continue;
                }

                match open_left {
                    Some((li, li_start)) if l.children[li].kind() == child.kind() => {
                        left_path.push(li);
                        append_tail(
                            &l.children[li],
                            left_path,
                            li_start + 1,
                            from,
                            child,
                            child_start + 1,
                            to,
                            ops,
                        );
                        left_path.pop();
                    }
                    _ => tail.push(cut_before(child, child_start + 1, to)),
                }
            }

            for (ix, node) in tail.into_iter().enumerate() {
                ops.push(Op::InsertNode {
                    path: child_path(left_path, kept + ix),
                    node,
                });
            }
        }
        _ => {}
    }
}

/// Copy of `node` without the content before `to`.
fn cut_before(node: &Node, content_start: usize, to: usize) -> Node {
    let skip = to.saturating_sub(content_start);
    match node {
        Node::Sentence(s) => Node::sentence(s.text.chars().skip(skip).collect::<String>()),
        Node::Paragraph(p) => {
            let mut children = Vec::new();
            let mut start = content_start;
            for child in &p.children {
                let child_start = start;
                let child_end = child_start + child.node_size();
                start = child_end;
                if child_end <= to {
                    continue;
                }
                if child_start >= to {
                    children.push(child.clone());
                } else {
                    children.push(cut_before(child, child_start + 1, to));
                }
            }
            Node::paragraph(children)
        }
        Node::Space => Node::Space,
    }
}

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::keymap::Key;
use crate::markup::{self, MarkupError};
use crate::navigator;
use crate::ops::{Op, Path, StepMap, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError};
use crate::schema::{Schema, UnitKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn content_size(&self) -> usize {
        self.children.iter().map(Node::node_size).sum()
    }

    /// Concatenated sentence text, without separators.
    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        node_ref(self, path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum Node {
    Paragraph(ParagraphNode),
    Sentence(SentenceNode),
    Space,
}

impl Node {
    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph(ParagraphNode { children })
    }

    pub fn sentence(text: impl Into<String>) -> Self {
        Node::Sentence(SentenceNode { text: text.into() })
    }

    /// A paragraph holding one `sentence space` pair per text.
    pub fn sentences<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let children = texts
            .into_iter()
            .flat_map(|text| [Node::sentence(text), Node::Space])
            .collect();
        Node::paragraph(children)
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            Node::Paragraph(_) => UnitKind::Paragraph,
            Node::Sentence(_) => UnitKind::Sentence,
            Node::Space => UnitKind::Space,
        }
    }

    pub fn node_size(&self) -> usize {
        match self {
            Node::Space => 1,
            other => other.content_size() + 2,
        }
    }

    pub fn content_size(&self) -> usize {
        match self {
            Node::Paragraph(p) => p.children.iter().map(Node::node_size).sum(),
            Node::Sentence(s) => s.len_chars(),
            Node::Space => 0,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Paragraph(p) => p.children.iter().map(Node::text_content).collect(),
            Node::Sentence(s) => s.text.clone(),
            Node::Space => String::new(),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Paragraph(p) => &p.children,
            Node::Sentence(_) | Node::Space => &[],
        }
    }

    pub fn as_sentence(&self) -> Option<&SentenceNode> {
        match self {
            Node::Sentence(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParagraphNode {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SentenceNode {
    #[serde(default)]
    pub text: String,
}

impl SentenceNode {
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Anchor and focus are flat document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub focus: usize,
}

impl Selection {
    pub fn new(anchor: usize, focus: usize) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(pos: usize) -> Self {
        Self {
            anchor: pos,
            focus: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.focus)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.focus)
    }

    pub fn clamp(self, size: usize) -> Self {
        Self {
            anchor: self.anchor.min(size),
            focus: self.focus.min(size),
        }
    }
}

/// Read access to a document and its selection, shared by the editor and
/// transactions under construction.
pub trait StateView {
    fn doc(&self) -> &Document;
    fn selection(&self) -> &Selection;
}

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    registry: PluginRegistry,
    config: EditorConfig,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    scroll_request: Option<usize>,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        let config = EditorConfig::default().with_defaults();
        let mut editor = Self {
            doc,
            selection,
            registry,
            config,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            scroll_request: None,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_sentence_plugins() -> Self {
        let doc = Document::new(vec![Node::paragraph(Vec::new())]);
        Self::new(doc, Selection::collapsed(1), PluginRegistry::sentence())
    }

    /// Parses markup and puts the caret on the first stop of the forward navigator.
    pub fn from_markup(input: &str, registry: PluginRegistry) -> Result<Self, MarkupError> {
        let doc = markup::parse(input, registry.schema())?;
        let caret = navigator::next_cursor_from(&doc, 0).pos;
        Ok(Self::new(doc, Selection::collapsed(caret), registry))
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config.with_defaults();
        self
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn schema(&self) -> &Schema {
        self.registry.schema()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Position the last transaction asked the view to reveal, if any.
    pub fn take_scroll_request(&mut self) -> Option<usize> {
        self.scroll_request.take()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut redo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok((inv, _)) = apply_op_to(&mut self.doc, op) {
                redo_ops.push(inv);
            } else {
                // If we can't apply inverse ops, bail out and stop mutating further.
                break;
            }
        }
        redo_ops.reverse();

        self.selection = selection_before;
        self.normalize_in_place();

        self.redo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: redo_ops,
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut undo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok((inv, _)) = apply_op_to(&mut self.doc, op) {
                undo_ops.push(inv);
            } else {
                break;
            }
        }
        undo_ops.reverse();

        self.selection = selection_after;
        self.normalize_in_place();

        self.undo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: undo_ops,
        });
        true
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let selection_before = self.selection;
        let op_count = tx.ops.len();

        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in tx.ops.iter().cloned() {
            let (inv, map) = apply_op_to(&mut self.doc, op)?;
            self.selection = map.map_selection(&self.selection);
            inverse_ops.push(inv);
        }

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }

        let mut inverse_normalize = self.normalize_with_inverse_ops()?;
        inverse_ops.append(&mut inverse_normalize);
        inverse_ops.reverse();

        self.normalize_selection_in_place();

        if tx.meta.scroll_into_view {
            self.scroll_request = Some(self.selection.focus);
        }

        debug!(
            source = tx.meta.source.as_deref().unwrap_or("-"),
            ops = op_count,
            anchor = self.selection.anchor,
            focus = self.selection.focus,
            "applied transaction"
        );

        // Caret-only transactions leave no history entry.
        if inverse_ops.is_empty() {
            return Ok(());
        }

        let selection_after = self.selection;

        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }

        Ok(())
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<bool, CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::UnknownCommand(id.to_string()));
        };
        let outcome = (command.handler)(&*self, args)?;
        debug!(
            command = id,
            handled = outcome.handled,
            dispatched = outcome.transaction.is_some(),
            "ran command"
        );
        if let Some(tx) = outcome.transaction {
            self.apply(tx)?;
        }
        Ok(outcome.handled)
    }

    /// Runs the commands bound to `key` in registration order until one
    /// reports the key as handled.
    pub fn handle_key(&mut self, key: Key) -> Result<bool, CommandError> {
        let commands: Vec<String> = self
            .registry
            .bindings_for(key)
            .map(str::to_string)
            .collect();

        for id in commands {
            if self.run_command(&id, None)? {
                debug!(%key, command = %id, "key handled");
                return Ok(true);
            }
        }
        debug!(%key, "key fell through");
        Ok(false)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::UnknownQuery(id.to_string()));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value).map_err(QueryError::Decode)
    }

    fn normalize_in_place(&mut self) {
        let _ = self.normalize_with_inverse_ops();
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = self.selection.clamp(self.doc.content_size());
    }

    fn normalize_with_inverse_ops(&mut self) -> Result<Vec<Op>, ApplyError> {
        let mut inverse_ops: Vec<Op> = Vec::new();
        for _ in 0..self.config.max_normalize_iterations {
            let ops = self.registry.normalize(&self.doc);
            if ops.is_empty() {
                return Ok(inverse_ops);
            }
            for op in ops {
                let (inv, map) = apply_op_to(&mut self.doc, op)?;
                self.selection = map.map_selection(&self.selection);
                inverse_ops.push(inv);
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }
}

impl StateView for Editor {
    fn doc(&self) -> &Document {
        &self.doc
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }
}

pub(crate) fn apply_op_to(doc: &mut Document, op: Op) -> Result<(Op, StepMap), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let content_start = path_pos(doc, &path)? + 1;
            let sentence = sentence_mut(doc, &path)?;
            let offset = offset.min(sentence.len_chars());
            let len = text.chars().count();
            let at = byte_index(&sentence.text, offset);
            sentence.text.insert_str(at, &text);
            Ok((
                Op::RemoveText {
                    path,
                    range: offset..offset + len,
                },
                StepMap::insertion(content_start + offset, len),
            ))
        }
        Op::RemoveText { path, range } => {
            let content_start = path_pos(doc, &path)? + 1;
            let sentence = sentence_mut(doc, &path)?;
            let len = sentence.len_chars();
            let start = range.start.min(len);
            let end = range.end.min(len);
            if start >= end {
                return Ok((
                    Op::InsertText {
                        path,
                        offset: start,
                        text: String::new(),
                    },
                    StepMap::insertion(content_start + start, 0),
                ));
            }
            let byte_range = byte_index(&sentence.text, start)..byte_index(&sentence.text, end);
            let removed = sentence.text[byte_range.clone()].to_string();
            sentence.text.replace_range(byte_range, "");
            Ok((
                Op::InsertText {
                    path,
                    offset: start,
                    text: removed,
                },
                StepMap::deletion(content_start + start, end - start),
            ))
        }
        Op::InsertNode { path, node } => {
            let pos = path_pos(doc, &path)?;
            let size = node.node_size();
            insert_node(doc, &path, node)?;
            Ok((Op::RemoveNode { path }, StepMap::insertion(pos, size)))
        }
        Op::RemoveNode { path } => {
            let pos = path_pos(doc, &path)?;
            let removed = remove_node(doc, &path)?;
            let map = StepMap::deletion(pos, removed.node_size());
            Ok((
                Op::InsertNode {
                    path,
                    node: removed,
                },
                map,
            ))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid position {pos}: {reason}")]
    InvalidPosition { pos: usize, reason: String },
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug)]
pub struct PathError(pub String);

pub(crate) fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(ix, _)| ix)
        .unwrap_or(s.len())
}

/// Flat position just before the node at `path`. The last index may equal the
/// parent's child count, which addresses the end of the parent's content.
pub(crate) fn path_pos(doc: &Document, path: &[usize]) -> Result<usize, PathError> {
    let Some((&last, parents)) = path.split_last() else {
        return Err(PathError("Empty path".into()));
    };

    let mut pos = 0;
    let mut children: &[Node] = &doc.children;
    for (depth, &ix) in parents.iter().enumerate() {
        let Some(node) = children.get(ix) else {
            return Err(PathError(format!(
                "Path out of bounds at depth {depth}: {ix} >= {}",
                children.len()
            )));
        };
        pos += children[..ix].iter().map(Node::node_size).sum::<usize>() + 1;
        children = match node {
            Node::Paragraph(p) => &p.children,
            Node::Sentence(_) | Node::Space => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
        };
    }

    if last > children.len() {
        return Err(PathError(format!(
            "Path out of bounds at depth {}: {last} > {}",
            parents.len(),
            children.len()
        )));
    }
    Ok(pos + children[..last].iter().map(Node::node_size).sum::<usize>())
}

fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (&first, rest) = path.split_first()?;
    let mut node = doc.children.get(first)?;
    for &ix in rest {
        node = node.children().get(ix)?;
    }
    Some(node)
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let Some((&first, rest)) = path.split_first() else {
        return Err(PathError("Empty path".into()));
    };

    let len = doc.children.len();
    let mut node = doc
        .children
        .get_mut(first)
        .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;

    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Paragraph(p) => {
                let len = p.children.len();
                p.children.get_mut(ix).ok_or_else(|| {
                    PathError(format!(
                        "Path out of bounds at depth {}: {ix} >= {len}",
                        depth + 1
                    ))
                })?
            }
            Node::Sentence(_) | Node::Space => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
        };
    }
    Ok(node)
}

fn sentence_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut SentenceNode, PathError> {
    match node_mut(doc, path)? {
        Node::Sentence(s) => Ok(s),
        _ => Err(PathError("Expected Sentence node".into())),
    }
}

fn children_mut<'a>(doc: &'a mut Document, parent_path: &[usize]) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Paragraph(p) => Ok(&mut p.children),
        Node::Sentence(_) | Node::Space => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty insert path".into()));
    };

    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty remove path".into()));
    };

    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

pub(crate) fn child_path(parent: &[usize], index: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(index);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sentences() -> Document {
        Document::new(vec![Node::sentences(["01234", "56789"])])
    }

    #[test]
    fn sizes_follow_the_token_model() {
        let doc = two_sentences();
        assert_eq!(doc.children[0].node_size(), 18);
        assert_eq!(doc.content_size(), 18);
        assert_eq!(Node::Space.node_size(), 1);
        assert_eq!(Node::sentence("").node_size(), 2);
    }

    #[test]
    fn path_pos_addresses_node_starts() {
        let doc = two_sentences();
        assert_eq!(path_pos(&doc, &[0]).unwrap(), 0);
        assert_eq!(path_pos(&doc, &[1]).unwrap(), 18);
        assert_eq!(path_pos(&doc, &[0, 1]).unwrap(), 8);
        assert_eq!(path_pos(&doc, &[0, 2]).unwrap(), 9);
        assert_eq!(path_pos(&doc, &[0, 4]).unwrap(), 17);
        assert!(path_pos(&doc, &[0, 5]).is_err());
    }

    #[test]
    fn text_ops_count_chars_not_bytes() {
        let mut doc = Document::new(vec![Node::sentences(["héllo"])]);
        let (inverse, map) = apply_op_to(
            &mut doc,
            Op::RemoveText {
                path: vec![0, 0],
                range: 1..2,
            },
        )
        .unwrap();
        assert_eq!(doc.text_content(), "hllo");
        assert_eq!(map, StepMap::deletion(3, 1));
        assert_eq!(
            inverse,
            Op::InsertText {
                path: vec![0, 0],
                offset: 1,
                text: "é".to_string(),
            }
        );
    }
}

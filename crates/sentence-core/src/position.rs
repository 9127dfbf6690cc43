//! Flat document positions.
//!
//! Every container (paragraph, sentence) takes one position for its opening
//! and one for its closing boundary, every text char takes one, and a space
//! takes one. The document's own content starts at 0.

use crate::core::{Document, Node};
use crate::ops::Path;
use crate::schema::UnitKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("position {pos} outside document of size {size}")]
    OutOfRange { pos: usize, size: usize },
}

/// What sits directly next to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacent {
    Unit(UnitKind),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    /// `None` for the document root.
    kind: Option<UnitKind>,
    path: Path,
    start: usize,
    end: usize,
    index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    frames: Vec<Frame>,
    node_before: Option<Adjacent>,
    node_after: Option<Adjacent>,
}

impl ResolvedPos {
    /// 0 at the document root, 1 inside a paragraph, 2 inside a sentence.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn parent(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    /// Kind of the innermost enclosing unit; `None` at the document root.
    pub fn parent_kind(&self) -> Option<UnitKind> {
        self.parent().kind
    }

    pub fn parent_path(&self) -> &[usize] {
        &self.parent().path
    }

    /// Start of the parent's content.
    pub fn start(&self) -> usize {
        self.parent().start
    }

    /// End of the parent's content.
    pub fn end(&self) -> usize {
        self.parent().end
    }

    /// Position just before the parent unit; `None` at the document root.
    pub fn before(&self) -> Option<usize> {
        match self.depth() {
            0 => None,
            _ => Some(self.start() - 1),
        }
    }

    /// Position just after the parent unit; `None` at the document root.
    pub fn after(&self) -> Option<usize> {
        match self.depth() {
            0 => None,
            _ => Some(self.end() + 1),
        }
    }

    pub fn parent_offset(&self) -> usize {
        self.pos - self.start()
    }

    /// Child index inside the parent at `depth`. Inside a sentence this is the
    /// sentence's index in its paragraph one level up.
    pub fn index_at(&self, depth: usize) -> usize {
        self.frames[depth].index
    }

    pub fn index(&self) -> usize {
        self.parent().index
    }

    pub fn node_after(&self) -> Option<Adjacent> {
        self.node_after
    }

    pub fn node_before(&self) -> Option<Adjacent> {
        self.node_before
    }

    pub fn is_in(&self, kind: UnitKind) -> bool {
        self.parent_kind() == Some(kind)
    }
}

impl Document {
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, PositionError> {
        let size = self.content_size();
        if pos > size {
            return Err(PositionError::OutOfRange { pos, size });
        }
        Ok(self.resolve_in(pos, size))
    }

    /// Resolves `pos`, clamped to the document end.
    pub fn resolve_clamped(&self, pos: usize) -> ResolvedPos {
        let size = self.content_size();
        self.resolve_in(pos.min(size), size)
    }

    fn resolve_in(&self, pos: usize, size: usize) -> ResolvedPos {
        let mut frames = Vec::new();
        let mut path: Path = Vec::new();
        let mut kind = None;
        let mut start = 0;
        let mut end = size;
        let mut children: &[Node] = &self.children;

        loop {
            let mut cursor = start;
            let mut index = children.len();
            let mut inside = None;
            for (ix, child) in children.iter().enumerate() {
                let child_end = cursor + child.node_size();
                if pos == cursor {
                    index = ix;
                    break;
                }
                if pos < child_end {
                    index = ix;
                    inside = Some((cursor, child));
                    break;
                }
                cursor = child_end;
            }

            frames.push(Frame {
                kind,
                path: path.clone(),
                start,
                end,
                index,
            });

            let Some((child_start, child)) = inside else {
                return ResolvedPos {
                    pos,
                    frames,
                    node_before: index
                        .checked_sub(1)
                        .and_then(|ix| children.get(ix))
                        .map(|n| Adjacent::Unit(n.kind())),
                    node_after: children.get(index).map(|n| Adjacent::Unit(n.kind())),
                };
            };

            path.push(index);
            if let Node::Sentence(s) = child {
                let start = child_start + 1;
                let len = s.len_chars();
                frames.push(Frame {
                    kind: Some(UnitKind::Sentence),
                    path,
                    start,
                    end: start + len,
                    index: 0,
                });
                let offset = pos - start;
                return ResolvedPos {
                    pos,
                    frames,
                    node_before: (offset > 0).then_some(Adjacent::Text),
                    node_after: (offset < len).then_some(Adjacent::Text),
                };
            }

            kind = Some(child.kind());
            start = child_start + 1;
            end = start + child.content_size();
            children = child.children();
        }
    }
}

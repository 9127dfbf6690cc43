use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::{Node, Selection};

pub type Path = Vec<usize>;

/// Primitive tree edit. Text offsets and ranges count `char`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertText {
        #[serde(default)]
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        #[serde(default)]
        path: Path,
        range: Range<usize>,
    },
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
}

/// Flat-position effect of one edit: `old_size` positions starting at `start`
/// were replaced by `new_size` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl StepMap {
    pub fn insertion(start: usize, size: usize) -> Self {
        Self {
            start,
            old_size: 0,
            new_size: size,
        }
    }

    pub fn deletion(start: usize, size: usize) -> Self {
        Self {
            start,
            old_size: size,
            new_size: 0,
        }
    }

    /// Positions before the edit stay, positions at or after its end move with
    /// the following content, positions strictly inside collapse to `start`.
    /// A position exactly at an insertion point moves past the inserted content.
    pub fn map(&self, pos: usize) -> usize {
        let end = self.start + self.old_size;
        if pos < self.start {
            return pos;
        }
        if pos >= end {
            return pos - self.old_size + self.new_size;
        }
        self.start
    }

    pub fn map_selection(&self, selection: &Selection) -> Selection {
        Selection {
            anchor: self.map(selection.anchor),
            focus: self.map(selection.focus),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub scroll_into_view: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }

    pub fn scroll_into_view(mut self) -> Self {
        self.meta.scroll_into_view = true;
        self
    }
}

use serde::{Deserialize, Serialize};

use crate::core::{Document, Node};
use crate::ops::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Paragraph,
    Sentence,
    Space,
}

impl UnitKind {
    pub fn name(self) -> &'static str {
        match self {
            UnitKind::Paragraph => "paragraph",
            UnitKind::Sentence => "sentence",
            UnitKind::Space => "space",
        }
    }

    fn slot(self) -> usize {
        match self {
            UnitKind::Paragraph => 0,
            UnitKind::Sentence => 1,
            UnitKind::Space => 2,
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentRule {
    /// `(sentence space)*`
    SentenceSpacePairs,
    /// Plain text, no nested units.
    Text,
    Empty,
}

/// How a unit reads from and writes to markup. `display` is fixed content
/// rendered in place of children (atoms only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupSpec {
    pub tag: &'static str,
    pub class: Option<&'static str>,
    pub display: Option<&'static str>,
}

impl MarkupSpec {
    pub fn matches(&self, tag: &str, classes: &[String]) -> bool {
        if !self.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
        match self.class {
            Some(class) => classes.iter().any(|c| c == class),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpec {
    pub kind: UnitKind,
    pub role: NodeRole,
    pub atom: bool,
    pub selectable: bool,
    pub content: ContentRule,
    pub markup: MarkupSpec,
}

impl UnitSpec {
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Paragraph => Self::paragraph(),
            UnitKind::Sentence => Self::sentence(),
            UnitKind::Space => Self::space(),
        }
    }

    pub fn paragraph() -> Self {
        Self {
            kind: UnitKind::Paragraph,
            role: NodeRole::Block,
            atom: false,
            selectable: true,
            content: ContentRule::SentenceSpacePairs,
            markup: MarkupSpec {
                tag: "p",
                class: None,
                display: None,
            },
        }
    }

    pub fn sentence() -> Self {
        Self {
            kind: UnitKind::Sentence,
            role: NodeRole::Inline,
            atom: false,
            selectable: true,
            content: ContentRule::Text,
            markup: MarkupSpec {
                tag: "span",
                class: Some("sentence"),
                display: None,
            },
        }
    }

    pub fn space() -> Self {
        Self {
            kind: UnitKind::Space,
            role: NodeRole::Inline,
            atom: true,
            selectable: false,
            content: ContentRule::Empty,
            markup: MarkupSpec {
                tag: "span",
                class: Some("space"),
                display: Some("1.5"),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate unit spec: {0}")]
    DuplicateUnit(UnitKind),
}

/// Behavior table for the three unit kinds, indexed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    specs: [Option<UnitSpec>; 3],
}

impl Schema {
    pub fn sentence() -> Self {
        Self {
            specs: [
                Some(UnitSpec::paragraph()),
                Some(UnitSpec::sentence()),
                Some(UnitSpec::space()),
            ],
        }
    }

    pub fn register(&mut self, spec: UnitSpec) -> Result<(), SchemaError> {
        let slot = &mut self.specs[spec.kind.slot()];
        if slot.is_some() {
            return Err(SchemaError::DuplicateUnit(spec.kind));
        }
        *slot = Some(spec);
        Ok(())
    }

    pub fn spec(&self, kind: UnitKind) -> Option<&UnitSpec> {
        self.specs[kind.slot()].as_ref()
    }

    pub fn specs(&self) -> impl Iterator<Item = &UnitSpec> {
        self.specs.iter().flatten()
    }

    pub fn role(&self, kind: UnitKind) -> Option<NodeRole> {
        self.spec(kind).map(|spec| spec.role)
    }

    pub fn is_atom(&self, kind: UnitKind) -> bool {
        self.spec(kind).is_some_and(|spec| spec.atom)
    }

    pub fn spec_for_markup(&self, tag: &str, classes: &[String]) -> Option<&UnitSpec> {
        // Class-qualified rules first so `span.space` never reads as a bare `span`.
        self.specs()
            .filter(|spec| spec.markup.class.is_some())
            .chain(self.specs().filter(|spec| spec.markup.class.is_none()))
            .find(|spec| spec.markup.matches(tag, classes))
    }

    /// Reports content-pattern violations without rejecting anything.
    pub fn check(&self, doc: &Document) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();
        for (ix, node) in doc.children.iter().enumerate() {
            let path = vec![ix];
            match (self.role(node.kind()), node) {
                (Some(NodeRole::Block), Node::Paragraph(p)) => {
                    self.check_paragraph(&p.children, &path, &mut violations)
                }
                (None, other) => violations.push(SchemaViolation {
                    path,
                    kind: ViolationKind::UnknownUnit { unit: other.kind() },
                }),
                (_, other) => violations.push(SchemaViolation {
                    path,
                    kind: ViolationKind::UnexpectedUnit {
                        parent: None,
                        unit: other.kind(),
                    },
                }),
            }
        }
        violations
    }

    fn check_paragraph(&self, children: &[Node], path: &Path, out: &mut Vec<SchemaViolation>) {
        let mut expect_space = false;
        for (ix, child) in children.iter().enumerate() {
            let mut child_path = path.clone();
            child_path.push(ix);

            match self.role(child.kind()) {
                Some(NodeRole::Inline) => {}
                Some(NodeRole::Block) => {
                    out.push(SchemaViolation {
                        path: child_path,
                        kind: ViolationKind::UnexpectedUnit {
                            parent: Some(UnitKind::Paragraph),
                            unit: child.kind(),
                        },
                    });
                    continue;
                }
                None => {
                    out.push(SchemaViolation {
                        path: child_path,
                        kind: ViolationKind::UnknownUnit { unit: child.kind() },
                    });
                    continue;
                }
            }

            // Inline units are sentences or spaces.
            match (expect_space, child.kind() == UnitKind::Sentence) {
                (false, true) => expect_space = true,
                (true, false) => expect_space = false,
                (true, true) => out.push(SchemaViolation {
                    path: child_path,
                    kind: ViolationKind::AdjacentSentences,
                }),
                (false, false) => out.push(SchemaViolation {
                    path: child_path,
                    kind: ViolationKind::MisplacedSpace,
                }),
            }
        }

        if expect_space {
            let mut last = path.clone();
            last.push(children.len() - 1);
            out.push(SchemaViolation {
                path: last,
                kind: ViolationKind::TrailingSentence,
            });
        }
    }

    /// Coerces paragraph content into `(sentence space)*` by adding the missing
    /// units: a space between adjacent sentences, an empty sentence before a
    /// stray space, and a closing space. Nested paragraphs are dropped.
    pub fn fill_paragraph(&self, children: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::with_capacity(children.len() + 1);
        let mut expect_space = false;
        for child in children {
            if self.role(child.kind()) != Some(NodeRole::Inline) {
                continue;
            }
            let sentence = child.kind() == UnitKind::Sentence;
            match (expect_space, sentence) {
                (false, true) | (true, false) => {}
                (true, true) => out.push(Node::Space),
                (false, false) => out.push(Node::sentence("")),
            }
            expect_space = sentence;
            out.push(child);
        }
        if expect_space {
            out.push(Node::Space);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    pub path: Path,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ViolationKind {
    AdjacentSentences,
    MisplacedSpace,
    TrailingSentence,
    UnexpectedUnit {
        parent: Option<UnitKind>,
        unit: UnitKind,
    },
    UnknownUnit {
        unit: UnitKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_paragraph_inserts_missing_units() {
        let schema = Schema::sentence();
        let filled = schema.fill_paragraph(vec![
            Node::sentence("a"),
            Node::sentence("b"),
            Node::Space,
            Node::Space,
        ]);
        assert_eq!(
            filled,
            vec![
                Node::sentence("a"),
                Node::Space,
                Node::sentence("b"),
                Node::Space,
                Node::sentence(""),
                Node::Space,
            ]
        );
    }

    #[test]
    fn fill_paragraph_output_passes_check() {
        let schema = Schema::sentence();
        let filled = schema.fill_paragraph(vec![
            Node::Space,
            Node::sentence("a"),
            Node::paragraph(Vec::new()),
            Node::sentence("b"),
            Node::Space,
            Node::Space,
            Node::sentence("c"),
        ]);
        assert_eq!(
            filled,
            vec![
                Node::sentence(""),
                Node::Space,
                Node::sentence("a"),
                Node::Space,
                Node::sentence("b"),
                Node::Space,
                Node::sentence(""),
                Node::Space,
                Node::sentence("c"),
                Node::Space,
            ]
        );
        let doc = Document::new(vec![Node::paragraph(filled)]);
        assert!(schema.check(&doc).is_empty());
    }

    #[test]
    fn units_missing_from_the_table_are_unknown() {
        let mut schema = Schema::default();
        schema.register(UnitSpec::paragraph()).unwrap();
        let doc = Document::new(vec![Node::sentences(["a"])]);
        assert_eq!(
            schema.check(&doc),
            vec![
                SchemaViolation {
                    path: vec![0, 0],
                    kind: ViolationKind::UnknownUnit {
                        unit: UnitKind::Sentence,
                    },
                },
                SchemaViolation {
                    path: vec![0, 1],
                    kind: ViolationKind::UnknownUnit {
                        unit: UnitKind::Space,
                    },
                },
            ]
        );
    }

    #[test]
    fn duplicate_units_are_rejected() {
        let mut schema = Schema::sentence();
        assert!(matches!(
            schema.register(UnitSpec::space()),
            Err(SchemaError::DuplicateUnit(UnitKind::Space))
        ));
    }
}

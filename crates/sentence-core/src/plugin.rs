use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::base_keymap::BaseKeymapPlugin;
use crate::core::{ApplyError, Document, Editor, Node};
use crate::keymap::{Key, KeyBinding};
use crate::mutation;
use crate::navigator;
use crate::ops::{Op, Transaction};
use crate::schema::{Schema, SchemaError, UnitKind, UnitSpec};
use crate::transform::Tr;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid args for {command}: {message}")]
    InvalidArgs { command: String, message: String },
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unknown query: {0}")]
    UnknownQuery(String),
    #[error("failed to encode query result: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode query result: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate unit spec: {0}")]
    DuplicateUnit(UnitKind),
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
}

impl From<SchemaError> for RegistryError {
    fn from(value: SchemaError) -> Self {
        match value {
            SchemaError::DuplicateUnit(kind) => RegistryError::DuplicateUnit(kind),
        }
    }
}

/// What a command decided: an optional transaction to apply and whether the
/// key that triggered it is consumed. A transaction is applied even when
/// `handled` is false.
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    pub transaction: Option<Transaction>,
    pub handled: bool,
}

impl CommandOutcome {
    pub fn unhandled() -> Self {
        Self::default()
    }

    pub fn handled(tr: Tr) -> Self {
        Self {
            transaction: Some(tr.into_transaction()),
            handled: true,
        }
    }

    /// Applies `tr` but lets later bindings run.
    pub fn fall_through(tr: Tr) -> Self {
        Self {
            transaction: Some(tr.into_transaction()),
            handled: false,
        }
    }
}

type CommandHandler =
    Arc<dyn Fn(&Editor, Option<Value>) -> Result<CommandOutcome, CommandError> + Send + Sync>;

type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<CommandOutcome, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

pub trait SentencePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn unit_specs(&self) -> Vec<UnitSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
    fn keyboard_shortcuts(&self) -> Vec<KeyBinding> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    schema: Schema,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
    bindings: Vec<KeyBinding>,
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn SentencePlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Unit plugins only: no default key behavior.
    pub fn units() -> Self {
        Self::new(unit_plugins()).expect("unit registry must be valid")
    }

    /// Unit plugins followed by the default keymap.
    pub fn sentence() -> Self {
        let mut plugins = unit_plugins();
        plugins.push(Box::new(BaseKeymapPlugin));
        Self::new(plugins).expect("sentence registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn SentencePlugin>) -> Result<(), RegistryError> {
        for spec in plugin.unit_specs() {
            self.schema.register(spec)?;
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(RegistryError::DuplicateQuery(query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        self.bindings.extend(plugin.keyboard_shortcuts());
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    /// Command ids bound to `key`, in registration order.
    pub fn bindings_for(&self, key: Key) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .filter(move |binding| binding.key == key)
            .map(|binding| binding.command.as_str())
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        let mut ops: Vec<Op> = Vec::new();
        for pass in &self.normalize_passes {
            ops.extend(pass.run(doc, self));
        }
        ops
    }
}

fn unit_plugins() -> Vec<Box<dyn SentencePlugin>> {
    vec![
        Box::new(ParagraphUnitPlugin),
        Box::new(SentenceUnitPlugin),
        Box::new(SpaceUnitPlugin),
        Box::new(CursorPlugin),
        Box::new(CoreNormalizePlugin),
    ]
}

struct ParagraphUnitPlugin;

impl SentencePlugin for ParagraphUnitPlugin {
    fn id(&self) -> &'static str {
        "unit.paragraph"
    }

    fn unit_specs(&self) -> Vec<UnitSpec> {
        vec![UnitSpec::paragraph()]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(
                "paragraph.go_left_sentence",
                "Previous sentence",
                |editor, _args| Ok(mutation::go_left_sentence(editor)?),
            )
            .description("Move the caret to the previous stop when it sits between sentences."),
        ]
    }

    fn keyboard_shortcuts(&self) -> Vec<KeyBinding> {
        vec![KeyBinding::new(Key::ArrowLeft, "paragraph.go_left_sentence")]
    }
}

struct SentenceUnitPlugin;

impl SentencePlugin for SentenceUnitPlugin {
    fn id(&self) -> &'static str {
        "unit.sentence"
    }

    fn unit_specs(&self) -> Vec<UnitSpec> {
        vec![UnitSpec::sentence()]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("sentence.split", "Split sentence", |editor, _args| {
                Ok(mutation::split_sentence(editor)?)
            })
            .description("Split the sentence at the caret, or move past its end."),
            CommandSpec::new(
                "sentence.delete_backward",
                "Delete separator",
                |editor, _args| Ok(mutation::delete_backward(editor)?),
            )
            .description("Remove the separator before the caret."),
        ]
    }

    fn keyboard_shortcuts(&self) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new(Key::Enter, "sentence.split"),
            KeyBinding::new(Key::Backspace, "sentence.delete_backward"),
        ]
    }
}

struct SpaceUnitPlugin;

impl SentencePlugin for SpaceUnitPlugin {
    fn id(&self) -> &'static str {
        "unit.space"
    }

    fn unit_specs(&self) -> Vec<UnitSpec> {
        vec![UnitSpec::space()]
    }
}

struct CursorPlugin;

impl SentencePlugin for CursorPlugin {
    fn id(&self) -> &'static str {
        "core.cursor"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("cursor.go_next", "Next stop", |editor, _args| {
                let mut tr = Tr::from_state(editor).source("command:cursor.go_next");
                navigator::go_to_next_cursor(&mut tr);
                Ok(CommandOutcome::handled(tr))
            }),
            CommandSpec::new("cursor.go_prev", "Previous stop", |editor, _args| {
                let mut tr = Tr::from_state(editor).source("command:cursor.go_prev");
                navigator::go_to_prev_cursor(&mut tr);
                Ok(CommandOutcome::handled(tr))
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("cursor.next", |editor, _args| {
                Ok(Value::from(navigator::next_cursor(editor).pos))
            }),
            QuerySpec::new("cursor.prev", |editor, _args| {
                Ok(Value::from(navigator::prev_cursor(editor).pos))
            }),
            QuerySpec::new("schema.violations", |editor, _args| {
                let violations = editor.schema().check(editor.doc());
                serde_json::to_value(violations).map_err(QueryError::Encode)
            }),
        ]
    }
}

struct CoreNormalizePlugin;

impl SentencePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(EnsureNonEmptyDocument)]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(Vec::new()),
            }];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keymap_runs_after_unit_bindings() {
        let registry = PluginRegistry::sentence();
        let enter: Vec<&str> = registry.bindings_for(Key::Enter).collect();
        assert_eq!(enter, vec!["sentence.split", "base.split_block"]);
        let left: Vec<&str> = registry.bindings_for(Key::ArrowLeft).collect();
        assert_eq!(left, vec!["paragraph.go_left_sentence", "base.move_left"]);
    }

    #[test]
    fn registering_a_plugin_twice_is_rejected() {
        let mut registry = PluginRegistry::units();
        assert!(matches!(
            registry.register_plugin(Box::new(SpaceUnitPlugin)),
            Err(RegistryError::DuplicateUnit(UnitKind::Space))
        ));
        assert!(matches!(
            registry.register_plugin(Box::new(CursorPlugin)),
            Err(RegistryError::DuplicateCommand(_))
        ));
    }

    #[test]
    fn schema_is_built_from_unit_plugins() {
        let registry = PluginRegistry::units();
        assert_eq!(registry.schema(), &Schema::sentence());
        assert_eq!(registry.bindings_for(Key::ArrowRight).count(), 0);
    }
}

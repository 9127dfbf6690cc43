use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context as _;
use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use manos_sentence_core::{
    Document, Editor, EditorConfig, Key, Node, PluginRegistry, Selection, SentenceValue, markup,
    navigator,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Replays keys against a sentence document and prints the result.
#[derive(Parser, Debug)]
#[command(name = "sentence")]
#[command(about = "Sentence/space structured editor")]
struct Args {
    /// Document to load; `.json` files are read as a sentence value, anything else as markup
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Initial caret position (defaults to the first caret stop)
    #[arg(short, long, value_name = "POS")]
    caret: Option<usize>,

    /// Comma-separated steps: enter, backspace, left, right, undo, redo, type:<text>.
    /// A `type:` step takes the rest of the script, commas included
    #[arg(short, long, value_name = "SCRIPT", default_value = "")]
    keys: String,

    /// Editor config as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Output::Markup)]
    output: Output,

    /// Log verbosity: -v for debug, -vv for trace (RUST_LOG wins)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Markup,
    Json,
    Outline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(Key),
    Undo,
    Redo,
    Type(String),
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(text) = s.strip_prefix("type:") {
            return Ok(Step::Type(text.to_string()));
        }
        match s.to_ascii_lowercase().as_str() {
            "undo" => Ok(Step::Undo),
            "redo" => Ok(Step::Redo),
            _ => s
                .parse::<Key>()
                .map(Step::Key)
                .map_err(|err| anyhow!("invalid step {s:?}: {err}")),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(key) => write!(f, "{key}"),
            Step::Undo => f.write_str("undo"),
            Step::Redo => f.write_str("redo"),
            Step::Type(text) => write!(f, "type:{text}"),
        }
    }
}

fn parse_script(script: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut rest = script;
    loop {
        let trimmed = rest.trim_start();
        if let Some(text) = trimmed.strip_prefix("type:") {
            steps.push(Step::Type(text.to_string()));
            break;
        }
        let (step, tail) = match trimmed.split_once(',') {
            Some((step, tail)) => (step.trim(), Some(tail)),
            None => (trimmed.trim(), None),
        };
        if !step.is_empty() {
            steps.push(step.parse()?);
        }
        match tail {
            Some(tail) => rest = tail,
            None => break,
        }
    }
    Ok(steps)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn demo_document() -> Document {
    Document::new(vec![
        Node::sentences(["The quick brown fox.", "It jumps over the dog."]),
        Node::sentences(["A second paragraph."]),
    ])
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn load_config(path: &Path) -> Result<EditorConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn load_editor(args: &Args) -> Result<Editor> {
    let registry = PluginRegistry::sentence();
    let mut editor = match &args.input {
        None => Editor::new(demo_document(), Selection::collapsed(0), registry),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if is_json(path) {
                let value = SentenceValue::from_json_str(&text)
                    .with_context(|| format!("invalid sentence value {}", path.display()))?;
                Editor::new(value.into_document(), Selection::collapsed(0), registry)
            } else {
                Editor::from_markup(&text, registry)
                    .with_context(|| format!("invalid markup {}", path.display()))?
            }
        }
    };

    if let Some(path) = &args.config {
        editor = editor.with_config(load_config(path)?);
    }

    let caret = args
        .caret
        .unwrap_or_else(|| navigator::next_cursor_from(editor.doc(), 0).pos);
    editor.set_selection(Selection::collapsed(caret));
    debug!(caret = editor.selection().focus, "editor loaded");
    Ok(editor)
}

fn run_step(editor: &mut Editor, step: &Step) -> Result<bool> {
    let handled = match step {
        Step::Key(key) => editor.handle_key(*key)?,
        Step::Undo => editor.undo(),
        Step::Redo => editor.redo(),
        Step::Type(text) => editor.run_command(
            "base.insert_text",
            Some(serde_json::json!({ "text": text })),
        )?,
    };
    Ok(handled)
}

/// One line per paragraph: sentences quoted, spaces as `_`.
fn outline(doc: &Document) -> String {
    let mut lines = Vec::with_capacity(doc.children.len());
    for node in &doc.children {
        let units: Vec<String> = node
            .children()
            .iter()
            .map(|unit| match unit {
                Node::Sentence(s) => format!("{:?}", s.text),
                Node::Space => "_".to_string(),
                Node::Paragraph(_) => "¶".to_string(),
            })
            .collect();
        lines.push(format!("p: {}", units.join(" ")));
    }
    lines.join("\n")
}

fn render(editor: &Editor, output: Output) -> Result<String> {
    match output {
        Output::Markup => Ok(markup::render(editor.doc(), editor.schema())),
        Output::Json => SentenceValue::from_document(editor.doc().clone())
            .to_json_pretty()
            .context("failed to encode document"),
        Output::Outline => Ok(outline(editor.doc())),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let steps = parse_script(&args.keys)?;
    let mut editor = load_editor(&args)?;

    for step in &steps {
        let handled = run_step(&mut editor, step).with_context(|| format!("step {step} failed"))?;
        println!(
            "{step}\thandled={handled}\tcaret={}",
            editor.selection().focus
        );
    }

    for violation in editor.schema().check(editor.doc()) {
        warn!(path = ?violation.path, kind = ?violation.kind, "schema violation");
    }

    println!("{}", render(&editor, args.output)?);
    Ok(())
}

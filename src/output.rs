//! Output for td commands
//!
//! Every command produces a payload and a [`HumanOutput`]. With `--json` the
//! payload goes to stdout inside a versioned envelope; otherwise the human
//! rendering does, unless `--quiet`. Errors follow the same split, with the
//! human form on stderr.

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "taskdeck.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text rendering of a command result: a header, `Key: value` fields, free
/// lines (task rows) and hints.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    hints: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            fields: Vec::new(),
            lines: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn hint(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    pub fn render(&self) -> String {
        let mut out = vec![self.header.clone()];
        out.extend(self.fields.iter().map(|(key, value)| {
            if value.is_empty() {
                format!("  {key}")
            } else {
                format!("  {key}: {value}")
            }
        }));
        if !self.lines.is_empty() {
            out.push(String::new());
            out.extend(self.lines.iter().map(|line| format!("  {line}")));
        }
        out.extend(self.hints.iter().map(|h| format!("hint: {h}")));
        out.join("\n")
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "no_items")]
    next_steps: &'a [String],
}

fn no_items(items: &&[String]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            next_steps: human.map_or(&[][..], |h| h.hints.as_slice()),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if let Some(human) = human.filter(|_| !options.quiet) {
        println!("{}", human.render());
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hints = error_hints(err);
    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            }),
            next_steps: &hints,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    for hint in &hints {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

/// First positional argument, skipping global flags and their values.
pub fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" => {
                args.next();
            }
            flag if flag.starts_with('-') => {}
            _ => return arg,
        }
    }
    "td".to_string()
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        exit_codes::PRECONDITION_FAILED => "precondition_failed",
        _ => "storage_failed",
    }
}

fn error_hints(err: &Error) -> Vec<String> {
    let hint = match err {
        Error::TaskNotFound(_) => "td list --all",
        Error::NothingToUndo(_) => "undo applies to the last add or edit in this td shell session",
        Error::EmptyDescription => "td add <description>",
        Error::InvalidConfig(_) | Error::TomlParse(_) => {
            "fix config.toml in the data directory then retry"
        }
        Error::LockFailed(_) => "retry once the other td process finishes",
        _ => return Vec::new(),
    };
    vec![hint.to_string()]
}

//! td shell: a line-oriented session.
//!
//! Each line is parsed with clap as if it were a td command (without the
//! program name). The session stays open across lines, so `undo add` and
//! `undo edit` refer to the last add or edit made in this shell. Reminders
//! fire on a background tokio runtime and are printed between commands.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::task::{execute, Outcome, TaskOutput};
use crate::cli::{Context, TaskCommand};
use crate::clock::SystemClock;
use crate::error::{Error, Result};
use crate::notify::{NoopNotifier, Notifier, Reminder, ReminderQueue, TimerNotifier};
use crate::output::{emit_error, emit_success, HumanOutput, OutputOptions};
use crate::session::TaskSession;
use crate::storage::JsonTaskStore;

#[derive(Parser, Debug)]
#[command(name = "shell", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Task(TaskCommand),

    /// Show only tasks whose description contains TEXT
    Filter {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Clear the active filter
    Reset,

    /// Undo the last add or edit made in this shell
    Undo { target: UndoTarget },

    /// Recompute urgency against the current time
    Refresh,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum UndoTarget {
    Add,
    Edit,
}

enum Step {
    Continue(Outcome),
    Quit,
}

type ShellSession = TaskSession<JsonTaskStore, Box<dyn Notifier>>;

pub(super) fn run(context: &Context, options: OutputOptions) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()?;

    let (notifier, mut reminders): (Box<dyn Notifier>, Option<ReminderQueue>) =
        if context.config.notifications.enabled {
            let (timer, queue) = TimerNotifier::new(runtime.handle().clone(), Arc::new(SystemClock));
            let lead = chrono::Duration::minutes(i64::from(context.config.notifications.lead_minutes));
            (Box::new(timer.with_lead_time(lead)), Some(queue))
        } else {
            (Box::new(NoopNotifier), None)
        };

    let mut session: ShellSession = context.open_session(notifier)?;
    let interactive = io::stdin().is_terminal() && !options.json;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if interactive {
            print!("td> ");
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        if let Some(queue) = reminders.as_mut() {
            for reminder in queue.drain() {
                emit_reminder(options, &reminder)?;
            }
        }

        let tokens = match split_line(&line) {
            Ok(tokens) if tokens.is_empty() => continue,
            Ok(tokens) => tokens,
            Err(err) => {
                emit_error("shell", &err, options.json)?;
                continue;
            }
        };

        let parsed = match ShellLine::try_parse_from(&tokens) {
            Ok(parsed) => parsed,
            Err(err) => {
                let _ = err.print();
                continue;
            }
        };

        match dispatch(&mut session, parsed.command) {
            Ok(Step::Continue(outcome)) => outcome.emit(options)?,
            Ok(Step::Quit) => break,
            Err(err) => emit_error(&tokens[0], &err, options.json)?,
        }
    }

    tracing::debug!("shell closed");
    Ok(())
}

fn dispatch(session: &mut ShellSession, command: ShellCommand) -> Result<Step> {
    let outcome = match command {
        ShellCommand::Task(command) => execute(session, command)?,
        ShellCommand::Filter { words } => execute(
            session,
            TaskCommand::List {
                filter: Some(words.join(" ")),
                all: true,
            },
        )?,
        ShellCommand::Reset => {
            session.reset_filter();
            execute(
                session,
                TaskCommand::List {
                    filter: None,
                    all: true,
                },
            )?
        }
        ShellCommand::Undo { target } => {
            let (task, header) = match target {
                UndoTarget::Add => {
                    let task = session.undo_latest_add()?;
                    let header = format!("Removed task {} (undo add)", task.id);
                    (task, header)
                }
                UndoTarget::Edit => {
                    let task = session.undo_latest_edit()?;
                    let header = format!("Restored task {} (undo edit)", task.id);
                    (task, header)
                }
            };
            let mut human = HumanOutput::new(header);
            human.field("Description", task.description.as_str());
            Outcome::new("undo", &TaskOutput { task: &task }, human)?
        }
        ShellCommand::Refresh => {
            session.refresh_urgency();
            execute(
                session,
                TaskCommand::List {
                    filter: None,
                    all: false,
                },
            )?
        }
        ShellCommand::Quit => return Ok(Step::Quit),
    };
    Ok(Step::Continue(outcome))
}

fn emit_reminder(options: OutputOptions, reminder: &Reminder) -> Result<()> {
    let mut human = HumanOutput::new(format!("Reminder: task {} is due", reminder.id));
    human.field("Description", reminder.description.as_str());
    human.field("Due", reminder.due.to_rfc3339());
    emit_success(options, "reminder", reminder, Some(&human))
}

/// Split a shell line into arguments with POSIX quoting rules.
fn split_line(line: &str) -> Result<Vec<String>> {
    shell_words::split(line)
        .map_err(|err| Error::InvalidArgument(format!("unterminated quote: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_quoted_runs() {
        assert_eq!(
            split_line(r#"edit 3 --description "call the bank" -p h"#).unwrap(),
            vec!["edit", "3", "--description", "call the bank", "-p", "h"]
        );
        assert_eq!(split_line(r#"add """#).unwrap(), vec!["add", ""]);
        assert!(split_line("   ").unwrap().is_empty());
        assert!(split_line(r#"add "open"#).is_err());
    }

    #[test]
    fn split_honours_escapes_and_single_quotes() {
        assert_eq!(
            split_line(r#"add "say \"hi\"""#).unwrap(),
            vec!["add", r#"say "hi""#]
        );
        assert_eq!(
            split_line(r#"annotate 2 'it''s done' plan\ b"#).unwrap(),
            vec!["annotate", "2", "its done", "plan b"]
        );
        assert!(split_line("add 'open").is_err());
    }

    #[test]
    fn parses_shell_only_verbs() {
        let line = ShellLine::try_parse_from(["undo", "add"]).unwrap();
        assert!(matches!(
            line.command,
            ShellCommand::Undo {
                target: UndoTarget::Add
            }
        ));

        let line = ShellLine::try_parse_from(["exit"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Quit));

        let line = ShellLine::try_parse_from(["filter", "pay", "rent"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Filter { ref words } if words.len() == 2));
    }

    #[test]
    fn parses_task_verbs() {
        let line = ShellLine::try_parse_from(["add", "buy", "milk", "--priority", "h"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Task(TaskCommand::Add { .. })));
        assert!(ShellLine::try_parse_from(["undo", "everything"]).is_err());
    }

    #[test]
    fn shell_definition_is_consistent() {
        use clap::CommandFactory;
        ShellLine::command().debug_assert();
    }
}

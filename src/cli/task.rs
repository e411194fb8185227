//! td task verbs.
//!
//! `execute` runs one verb against an open session and describes the result;
//! the one-shot CLI and the shell both go through it.

use serde::Serialize;

use crate::cli::{Context, TaskCommand};
use crate::edit::FieldEdit;
use crate::error::{Error, Result};
use crate::notify::{NoopNotifier, Notifier};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::{validate_tag, TaskSession};
use crate::storage::JsonTaskStore;
use crate::task::{Status, Task, TaskId};

/// What a verb produced, ready to print
pub(crate) struct Outcome {
    pub command: &'static str,
    pub data: serde_json::Value,
    pub human: HumanOutput,
}

impl Outcome {
    pub fn new<T: Serialize>(command: &'static str, data: &T, human: HumanOutput) -> Result<Self> {
        Ok(Self {
            command,
            data: serde_json::to_value(data)?,
            human,
        })
    }

    pub fn emit(&self, options: OutputOptions) -> Result<()> {
        emit_success(options, self.command, &self.data, Some(&self.human))
    }
}

#[derive(Serialize)]
pub(crate) struct TaskOutput<'a> {
    pub task: &'a Task,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct DeletedOutput {
    id: TaskId,
    description: String,
}

pub(super) fn run(context: &Context, command: TaskCommand, options: OutputOptions) -> Result<()> {
    let mut session = context.open_session(NoopNotifier)?;
    execute(&mut session, command)?.emit(options)
}

pub(crate) fn execute<N: Notifier>(
    session: &mut TaskSession<JsonTaskStore, N>,
    command: TaskCommand,
) -> Result<Outcome> {
    match command {
        TaskCommand::Add {
            words,
            priority,
            due,
            tags,
            project,
        } => {
            // Reject bad input before an id is handed out
            let description = words.join(" ");
            if description.trim().is_empty() {
                return Err(Error::EmptyDescription);
            }
            let tags = tags
                .iter()
                .map(|tag| validate_tag(tag))
                .collect::<Result<Vec<_>>>()?;

            let now = session.now();
            let mut edit = session.new_task()?;
            edit.log_edit(FieldEdit::Description(description), now);
            if let Some(priority) = priority {
                edit.log_edit(FieldEdit::Priority(priority), now);
            }
            if let Some(due) = due {
                edit.log_edit(FieldEdit::DueDate(Some(due)), now);
            }
            let mut task = edit.commit()?;
            task.tags.extend(tags);
            task.project = project.filter(|p| !p.trim().is_empty());

            let id = session.add(task)?;
            task_outcome(session, "add", id, format!("Added task {id}"))
        }

        TaskCommand::List { filter, all } => {
            if let Some(needle) = filter.as_deref() {
                session.filter(needle);
            }
            let tasks: Vec<&Task> = session
                .visible()
                .into_iter()
                .filter(|t| all || !t.is_completed())
                .collect();

            let mut human = HumanOutput::new("Tasks");
            human.field("Total", tasks.len().to_string());
            if let Some(needle) = session.active_filter() {
                human.field("Filter", needle);
            }
            for task in &tasks {
                human.line(task_line(task));
            }
            if tasks.is_empty() {
                human.hint("td add <description>");
            }

            let output = TaskListOutput {
                total: tasks.len(),
                filter: session.active_filter(),
                tasks,
            };
            Outcome::new("list", &output, human)
        }

        TaskCommand::Show { id } => {
            let task = session.get(id).ok_or(Error::TaskNotFound(id))?;
            let mut human = HumanOutput::new(format!("Task {id}"));
            human.field("Description", task.description.as_str());
            human.field("Status", task.status.as_str());
            human.field("Priority", task.priority.as_str());
            human.field("Urgency", format!("{:.2}", task.urgency));
            if let Some(project) = &task.project {
                human.field("Project", project.as_str());
            }
            if !task.tags.is_empty() {
                let tags: Vec<&str> = task.tags.iter().map(String::as_str).collect();
                human.field("Tags", tags.join(" "));
            }
            for (label, value) in [
                ("Due", task.due),
                ("Entered", task.entry),
                ("Modified", task.modified),
                ("Started", task.start),
                ("Ended", task.end),
            ] {
                if let Some(value) = value {
                    human.field(label, value.to_rfc3339());
                }
            }
            for annotation in &task.annotations {
                human.line(format!(
                    "{} {}",
                    annotation.entry.format("%Y-%m-%d"),
                    annotation.description
                ));
            }
            Outcome::new("show", &TaskOutput { task }, human)
        }

        TaskCommand::Done { id } => {
            session.complete(id)?;
            task_outcome(session, "done", id, format!("Completed task {id}"))
        }

        TaskCommand::Reopen { id } => {
            session.set_status(id, Status::Pending)?;
            task_outcome(session, "reopen", id, format!("Reopened task {id}"))
        }

        TaskCommand::Start { id } => {
            session.start(id)?;
            task_outcome(session, "start", id, format!("Started task {id}"))
        }

        TaskCommand::Stop { id } => {
            session.stop(id)?;
            task_outcome(session, "stop", id, format!("Stopped task {id}"))
        }

        TaskCommand::Edit {
            id,
            description,
            priority,
            due,
            clear_due,
        } => {
            let now = session.now();
            let mut edit = session.edit_task(id)?;
            if let Some(description) = description {
                edit.log_edit(FieldEdit::Description(description), now);
            }
            if let Some(priority) = priority {
                edit.log_edit(FieldEdit::Priority(priority), now);
            }
            if due.is_some() || clear_due {
                edit.log_edit(FieldEdit::DueDate(due), now);
            }
            if !edit.is_modified() {
                return Err(Error::InvalidArgument(
                    "nothing to change; pass --description, --priority, --due or --clear-due"
                        .to_string(),
                ));
            }
            session.commit(edit)?;
            task_outcome(session, "edit", id, format!("Edited task {id}"))
        }

        TaskCommand::Annotate { id, words } => {
            session.annotate(id, &words.join(" "))?;
            task_outcome(session, "annotate", id, format!("Annotated task {id}"))
        }

        TaskCommand::Tag { id, tag } => {
            session.tag(id, &tag)?;
            task_outcome(session, "tag", id, format!("Tagged task {id}"))
        }

        TaskCommand::Untag { id, tag } => {
            session.untag(id, &tag)?;
            task_outcome(session, "untag", id, format!("Untagged task {id}"))
        }

        TaskCommand::Delete { id } => {
            let task = session.delete(id)?;
            let mut human = HumanOutput::new(format!("Deleted task {id}"));
            human.field("Description", task.description.as_str());
            let output = DeletedOutput {
                id,
                description: task.description,
            };
            Outcome::new("delete", &output, human)
        }
    }
}

fn task_outcome<N: Notifier>(
    session: &TaskSession<JsonTaskStore, N>,
    command: &'static str,
    id: TaskId,
    header: String,
) -> Result<Outcome> {
    let task = session.get(id).ok_or(Error::TaskNotFound(id))?;
    let mut human = HumanOutput::new(header);
    human.field("Description", task.description.as_str());
    human.field("Status", task.status.as_str());
    human.field("Urgency", format!("{:.2}", task.urgency));
    Outcome::new(command, &TaskOutput { task }, human)
}

/// One-line rendering used by `list`.
pub(crate) fn task_line(task: &Task) -> String {
    let mut line = format!(
        "{:>3} [{}] {:>6.2} {}",
        task.id.get(),
        task.priority.short(),
        task.urgency,
        task.description
    );
    if let Some(due) = task.due {
        line.push_str(&format!(" (due {})", due.format("%Y-%m-%d")));
    }
    for tag in &task.tags {
        line.push_str(&format!(" +{tag}"));
    }
    if task.is_completed() {
        line.push_str(" [done]");
    } else if task.is_active() {
        line.push_str(" [active]");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use chrono::{TimeZone, Utc};

    #[test]
    fn task_line_shows_markers() {
        let mut task = Task::new(TaskId::new(4));
        task.description = "Renew passport".to_string();
        task.priority = Priority::High;
        task.urgency = 7.0;
        task.status = Status::Completed;
        task.due = Some(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
        task.tags.insert("admin".to_string());

        assert_eq!(
            task_line(&task),
            "  4 [H]   7.00 Renew passport (due 2024-07-01) +admin [done]"
        );
    }
}

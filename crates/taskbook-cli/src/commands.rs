use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use taskbook_core::{Category, Deadline, NewRecord, Priority, Record, RecordId, Status};
use taskbook_storage::RecordStore;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum TaskCommand {
    #[command(alias = "create")]
    Add(AddArgs),
    #[command(aliases = ["rm", "delete"])]
    Remove(TargetArgs),
    #[command(aliases = ["rm-category", "delete-category"])]
    RemoveCategory(CategoryArgs),
    #[command(alias = "complete")]
    Done(TargetArgs),
    #[command(alias = "set")]
    Edit(EditArgs),
    Show(ShowArgs),
    #[command(alias = "ls")]
    List(ListArgs),
    Search(SearchArgs),
    /// Interactive prompt; the default when no command is given
    Shell,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub name: String,
    #[arg(long, alias = "description", default_value = "")]
    pub desc: String,
    #[arg(long)]
    pub category: Category,
    #[arg(long)]
    pub deadline: Deadline,
    #[arg(long, default_value = "middle")]
    pub priority: Priority,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    pub id: RecordId,
}

#[derive(Args, Debug)]
pub struct CategoryArgs {
    pub category: Category,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: RecordId,
    pub field: String,
    pub value: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: RecordId,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, conflicts_with = "status")]
    pub category: Option<Category>,
    #[arg(long)]
    pub status: Option<Status>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum ListFilter {
    All,
    Category(Category),
    Status(Status),
}

#[derive(Serialize)]
struct RecordView<'a> {
    id: RecordId,
    #[serde(flatten)]
    record: &'a Record,
}

/// Runs one command against an open store. `Shell` is handled by the caller.
pub fn handle_task_command(
    store: &mut RecordStore,
    command: TaskCommand,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        TaskCommand::Add(args) => {
            let name = args.name.trim();
            if name.is_empty() {
                anyhow::bail!("Task name cannot be empty");
            }
            let draft = NewRecord {
                name: name.to_string(),
                description: args.desc.trim().to_string(),
                category: args.category,
                deadline: args.deadline,
                priority: args.priority,
            };
            add_task(store, draft, out).map(|_| ())
        }
        TaskCommand::Remove(args) => remove_task(store, args.id, out),
        TaskCommand::RemoveCategory(args) => remove_category(store, args.category, out),
        TaskCommand::Done(args) => complete_task(store, args.id, out),
        TaskCommand::Edit(args) => edit_task(store, args.id, &args.field, &args.value, out),
        TaskCommand::Show(args) => show_task(store, args.id, args.json, out),
        TaskCommand::List(args) => {
            let filter = match (args.category, args.status) {
                (Some(category), _) => ListFilter::Category(category),
                (None, Some(status)) => ListFilter::Status(status),
                (None, None) => ListFilter::All,
            };
            list_tasks(store, filter, args.json, out)
        }
        TaskCommand::Search(args) => search_tasks(store, &args.query, args.json, out),
        TaskCommand::Shell => Ok(()),
    }
}

pub fn add_task(store: &mut RecordStore, draft: NewRecord, out: &mut dyn Write) -> Result<RecordId> {
    let id = store.create(draft);
    writeln!(out, "Added task [{id}].")?;
    Ok(id)
}

pub fn remove_task(store: &mut RecordStore, id: RecordId, out: &mut dyn Write) -> Result<()> {
    store.delete(id)?;
    writeln!(out, "Removed task [{id}].")?;
    Ok(())
}

pub fn remove_category(
    store: &mut RecordStore,
    category: Category,
    out: &mut dyn Write,
) -> Result<()> {
    let removed = store.delete_by_category(category)?;
    writeln!(
        out,
        "Removed {} task(s) from category '{category}'.",
        removed.len()
    )?;
    Ok(())
}

pub fn complete_task(store: &mut RecordStore, id: RecordId, out: &mut dyn Write) -> Result<()> {
    if store.set_complete(id)? {
        writeln!(out, "Task [{id}] marked complete.")?;
    } else {
        writeln!(out, "Task [{id}] is already complete.")?;
    }
    Ok(())
}

pub fn edit_task(
    store: &mut RecordStore,
    id: RecordId,
    field: &str,
    value: &str,
    out: &mut dyn Write,
) -> Result<()> {
    store.update_field(id, field, value)?;
    writeln!(out, "Updated {} of task [{id}].", field.trim())?;
    Ok(())
}

pub fn show_task(store: &RecordStore, id: RecordId, json: bool, out: &mut dyn Write) -> Result<()> {
    let record = store.get(id)?;
    if json {
        let payload = serde_json::to_string_pretty(&RecordView { id, record })?;
        writeln!(out, "{payload}")?;
    } else {
        writeln!(out, "{}", render_record(id, record))?;
    }
    Ok(())
}

pub fn list_tasks(
    store: &RecordStore,
    filter: ListFilter,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let records = match filter {
        ListFilter::All => store.list_all(),
        ListFilter::Category(category) => store.list_by_category(category)?,
        ListFilter::Status(status) => store.list_by_status(status)?,
    };
    write_records(&records, json, out)
}

pub fn search_tasks(store: &RecordStore, query: &str, json: bool, out: &mut dyn Write) -> Result<()> {
    let records = store.search_by_keyword(query);
    write_records(&records, json, out)
}

fn write_records(records: &[(RecordId, &Record)], json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        let views: Vec<_> = records
            .iter()
            .map(|(id, record)| RecordView {
                id: *id,
                record: *record,
            })
            .collect();
        let payload = serde_json::to_string_pretty(&views).context("Failed to serialize tasks")?;
        writeln!(out, "{payload}")?;
        return Ok(());
    }
    if records.is_empty() {
        writeln!(out, "No tasks found.")?;
        return Ok(());
    }
    for (id, record) in records {
        writeln!(out, "{}", render_record(*id, record))?;
    }
    Ok(())
}

pub fn render_record(id: RecordId, record: &Record) -> String {
    let mut line = format!(
        "- [{id}] ({}/{}) {} [{}] due {}",
        record.status, record.priority, record.name, record.category, record.deadline
    );
    if !record.description.is_empty() {
        line.push_str(" - ");
        line.push_str(&record.description);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(names: &[(&str, &str)]) -> RecordStore {
        let mut store = RecordStore::new();
        for (name, category) in names {
            store.create(
                NewRecord::parse(name, "", category, "2026.02.23", "low").expect("valid draft"),
            );
        }
        store
    }

    fn run(store: &mut RecordStore, command: TaskCommand) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = handle_task_command(store, command, &mut out);
        (result, String::from_utf8(out).expect("utf8 output"))
    }

    #[test]
    fn render_includes_status_priority_and_description() {
        let mut record = NewRecord::parse("pay rent", "before 5th", "home", "2026.03.01", "high")
            .expect("valid draft")
            .into_record();
        assert_eq!(
            render_record(7, &record),
            "- [7] (incomplete/high) pay rent [home] due 2026.03.01 - before 5th"
        );
        record.description.clear();
        assert_eq!(
            render_record(7, &record),
            "- [7] (incomplete/high) pay rent [home] due 2026.03.01"
        );
    }

    #[test]
    fn add_rejects_blank_name() {
        let mut store = RecordStore::new();
        let (result, _) = run(
            &mut store,
            TaskCommand::Add(AddArgs {
                name: "   ".to_string(),
                desc: String::new(),
                category: Category::Home,
                deadline: "2026.01.01".parse().expect("date"),
                priority: Priority::Low,
            }),
        );
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn list_by_category_prints_only_matching_tasks() {
        let mut store = store_with(&[("dishes", "home"), ("deploy", "work")]);
        let (result, output) = run(
            &mut store,
            TaskCommand::List(ListArgs {
                category: Some(Category::Work),
                status: None,
                json: false,
            }),
        );
        result.expect("list");
        assert_eq!(output, "- [2] (incomplete/low) deploy [work] due 2026.02.23\n");
    }

    #[test]
    fn list_json_includes_ids() {
        let mut store = store_with(&[("dishes", "home")]);
        let (result, output) = run(
            &mut store,
            TaskCommand::List(ListArgs {
                category: None,
                status: None,
                json: true,
            }),
        );
        result.expect("list");
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value[0]["id"], 1);
        assert_eq!(value[0]["name"], "dishes");
        assert_eq!(value[0]["status"], "incomplete");
    }

    #[test]
    fn done_twice_reports_already_complete() {
        let mut store = store_with(&[("dishes", "home")]);
        let (first, _) = run(&mut store, TaskCommand::Done(TargetArgs { id: 1 }));
        first.expect("first");
        let (second, output) = run(&mut store, TaskCommand::Done(TargetArgs { id: 1 }));
        second.expect("second");
        assert_eq!(output, "Task [1] is already complete.\n");
    }

    #[test]
    fn missing_category_surfaces_store_error() {
        let mut store = store_with(&[("dishes", "home")]);
        let (result, _) = run(
            &mut store,
            TaskCommand::RemoveCategory(CategoryArgs {
                category: Category::Study,
            }),
        );
        let err = result.expect_err("no study bucket");
        assert!(err.to_string().contains("study"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn search_without_hits_says_so() {
        let mut store = store_with(&[("dishes", "home")]);
        let (result, output) = run(
            &mut store,
            TaskCommand::Search(SearchArgs {
                query: "zebra".to_string(),
                json: false,
            }),
        );
        result.expect("search");
        assert_eq!(output, "No tasks found.\n");
    }
}

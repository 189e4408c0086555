use crate::commands::{
    add_task, complete_task, edit_task, list_tasks, remove_category, remove_task, search_tasks,
    ListFilter,
};
use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use taskbook_core::{Category, NewRecord, RecordId, Status};
use taskbook_storage::RecordStore;

const HELP: &str = "\
Commands:
  create           add a task
  delete           remove a task by id
  delete_category  remove every task in a category
  search           find tasks by keyword, category or status
  change_status    mark a task complete
  change_field     edit one field of a task
  show             list all tasks
  show_category    list tasks in a category
  show_status      list tasks with a status
  help             show this text
  exit             save and quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellCommand {
    Create,
    Delete,
    DeleteCategory,
    Search,
    ChangeStatus,
    ChangeField,
    Show,
    ShowCategory,
    ShowStatus,
    Help,
    Exit,
}

impl ShellCommand {
    fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_lowercase().replace('-', "_");
        let command = match normalized.as_str() {
            "create" | "add" => Self::Create,
            "delete" | "rm" => Self::Delete,
            "delete_category" => Self::DeleteCategory,
            "search" => Self::Search,
            "change_status" | "done" => Self::ChangeStatus,
            "change_field" | "edit" => Self::ChangeField,
            "show" | "list" => Self::Show,
            "show_category" => Self::ShowCategory,
            "show_status" => Self::ShowStatus,
            "help" | "?" => Self::Help,
            "exit" | "quit" => Self::Exit,
            _ => return None,
        };
        Some(command)
    }
}

/// Line-oriented prompt loop. Failed commands are reported and the loop goes
/// on; it ends on `exit` or end of input.
pub struct Shell<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn run(&mut self, store: &mut RecordStore) -> Result<()> {
        writeln!(self.output, "Type `help` for commands, `exit` to quit.")?;
        while let Some(line) = self.prompt("taskbook> ")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(command) = ShellCommand::parse(line) else {
                writeln!(self.output, "Unknown command: {line}")?;
                continue;
            };
            if command == ShellCommand::Exit {
                break;
            }
            if let Err(err) = self.dispatch(store, command) {
                writeln!(self.output, "Error: {err:#}")?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, store: &mut RecordStore, command: ShellCommand) -> Result<()> {
        match command {
            ShellCommand::Create => {
                let name = self.ask("Name: ")?;
                let description = self.ask("Description: ")?;
                let category = self.ask("Category (home, work, study, personal): ")?;
                let deadline = self.ask("Deadline (YYYY.MM.DD): ")?;
                let priority = self.ask("Priority (low, middle, high): ")?;
                let draft = NewRecord::parse(&name, &description, &category, &deadline, &priority)?;
                add_task(store, draft, &mut self.output)?;
            }
            ShellCommand::Delete => {
                let id = self.ask_id()?;
                remove_task(store, id, &mut self.output)?;
            }
            ShellCommand::DeleteCategory => {
                let category: Category = self.ask("Category: ")?.parse()?;
                remove_category(store, category, &mut self.output)?;
            }
            ShellCommand::Search => {
                let field = self.ask("Search by (keyword, category, status): ")?;
                let value = self.ask("Value: ")?;
                match field.trim().to_lowercase().as_str() {
                    "keyword" | "key_word" => search_tasks(store, &value, false, &mut self.output)?,
                    "category" => {
                        let filter = ListFilter::Category(value.parse()?);
                        list_tasks(store, filter, false, &mut self.output)?
                    }
                    "status" => {
                        let filter = ListFilter::Status(value.parse()?);
                        list_tasks(store, filter, false, &mut self.output)?
                    }
                    other => bail!("Cannot search by '{other}'"),
                }
            }
            ShellCommand::ChangeStatus => {
                let id = self.ask_id()?;
                complete_task(store, id, &mut self.output)?;
            }
            ShellCommand::ChangeField => {
                let id = self.ask_id()?;
                let field = self.ask("Field: ")?;
                let value = self.ask("New value: ")?;
                edit_task(store, id, &field, &value, &mut self.output)?;
            }
            ShellCommand::Show => list_tasks(store, ListFilter::All, false, &mut self.output)?,
            ShellCommand::ShowCategory => {
                let category: Category = self.ask("Category: ")?.parse()?;
                list_tasks(store, ListFilter::Category(category), false, &mut self.output)?;
            }
            ShellCommand::ShowStatus => {
                let status: Status = self.ask("Status (incomplete, complete): ")?.parse()?;
                list_tasks(store, ListFilter::Status(status), false, &mut self.output)?;
            }
            ShellCommand::Help => writeln!(self.output, "{HELP}")?,
            ShellCommand::Exit => {}
        }
        Ok(())
    }

    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    /// Empty answer on end of input; the main loop then stops.
    fn ask(&mut self, label: &str) -> Result<String> {
        Ok(self.prompt(label)?.unwrap_or_default())
    }

    fn ask_id(&mut self) -> Result<RecordId> {
        let raw = self.ask("Task id: ")?;
        raw.trim()
            .parse()
            .with_context(|| format!("'{}' is not a task id", raw.trim()))
    }
}

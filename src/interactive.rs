//! Interactive menu shell.

use crate::error::{PassbookError, Result};
use crate::gate::{self, GateState, MasterGate};
use crate::models::{Entry, EntryUpdate, NewEntry};
use crate::store::EntryStore;
use crate::utils::{self, format_table, format_timestamp};
use colored::*;
use dialoguer::{Input, Password};
use std::io::{self, BufRead, Write};
use tracing::debug;
use zeroize::Zeroize;

/// Source of user answers.
///
/// Every answer comes back trimmed. End of input is reported as
/// [`PassbookError::Cancelled`].
pub trait Prompter {
    /// Read a visible line.
    fn input(&mut self, prompt: &str) -> Result<String>;

    /// Read a line without echoing it.
    fn secret(&mut self, prompt: &str) -> Result<String>;

    /// Wait for Enter.
    fn pause(&mut self) -> Result<()> {
        self.input("\nPress Enter to continue...").map(|_| ())
    }
}

/// Prompts on the controlling terminal, or plain stdin lines when piped.
pub struct TerminalPrompter {
    interactive: bool,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            interactive: atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout),
        }
    }

    fn read_plain(&self, prompt: &str) -> Result<String> {
        print!("{prompt}: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(PassbookError::Cancelled);
        }
        Ok(take_trimmed(line))
    }
}

/// Trimmed copy of `raw`; the original buffer is wiped before it is dropped.
fn take_trimmed(mut raw: String) -> String {
    let trimmed = raw.trim().to_string();
    raw.zeroize();
    trimmed
}

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str) -> Result<String> {
        if !self.interactive {
            return self.read_plain(prompt);
        }
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(take_trimmed(answer))
    }

    fn secret(&mut self, prompt: &str) -> Result<String> {
        if !self.interactive {
            return self.read_plain(prompt);
        }
        let answer = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(take_trimmed(answer))
    }

    fn pause(&mut self) -> Result<()> {
        print!("\nPress Enter to continue...");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(PassbookError::Cancelled);
        }
        Ok(())
    }
}

/// Run first-time setup or login against `gate`.
///
/// Returns [`PassbookError::AuthFailed`] once every login attempt is used up.
pub fn unlock_gate<P: Prompter, W: Write>(
    gate: &mut MasterGate,
    prompter: &mut P,
    out: &mut W,
) -> Result<()> {
    match gate.state() {
        GateState::Unlocked => Ok(()),
        GateState::Uninitialized => {
            writeln!(out, "{}", "=== First-time setup: Create Master Password ===".bold())?;
            gate::run_setup(
                gate,
                || {
                    let first = prompter.secret("Create master password")?;
                    let second = prompter.secret("Confirm master password")?;
                    Ok((first, second))
                },
                |msg| Ok(writeln!(out, "{}\n", msg.yellow())?),
            )?;
            writeln!(out, "{} Master password set.\n", "✓".green())?;
            Ok(())
        }
        GateState::Locked => {
            writeln!(out, "{}", "=== Login ===".bold())?;
            let result = gate::run_login(
                gate,
                || prompter.secret("Enter master password"),
                |msg| Ok(writeln!(out, "{} {}", "✗".red(), msg)?),
            );
            match result {
                Ok(()) => {
                    writeln!(out, "{} Login successful.\n", "✓".green())?;
                    Ok(())
                }
                Err(PassbookError::AuthFailed) => {
                    writeln!(out, "Too many failed attempts. Exiting.")?;
                    Err(PassbookError::AuthFailed)
                }
                Err(e) => Err(e),
            }
        }
    }
}

/// A menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Add,
    View,
    Search,
    Edit,
    Delete,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Add),
            "2" => Some(Self::View),
            "3" => Some(Self::Search),
            "4" => Some(Self::Edit),
            "5" => Some(Self::Delete),
            "6" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Interactive password book shell over an unlocked store.
pub struct InteractiveShell<P, W> {
    store: EntryStore,
    prompter: P,
    out: W,
}

impl<P: Prompter, W: Write> InteractiveShell<P, W> {
    pub fn new(store: EntryStore, prompter: P, out: W) -> Self {
        Self {
            store,
            prompter,
            out,
        }
    }

    /// Give the store back, e.g. to close it.
    pub fn into_store(self) -> EntryStore {
        self.store
    }

    /// Run the menu loop until Exit or end of input.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.print_menu()?;
            let line = match self.prompter.input("Choose an option (1-6)") {
                Ok(line) => line,
                Err(PassbookError::Cancelled) => break,
                Err(e) => return Err(e),
            };

            let Some(choice) = MenuChoice::parse(&line) else {
                writeln!(self.out, "Invalid choice.")?;
                if self.wait()? {
                    continue;
                }
                break;
            };

            if choice == MenuChoice::Exit {
                writeln!(self.out, "Goodbye!")?;
                break;
            }

            debug!(?choice, "menu selection");
            match self.execute(choice) {
                Ok(()) => {}
                Err(PassbookError::Cancelled) => break,
                Err(e) => writeln!(self.out, "{} {}", "Error:".red(), e)?,
            }

            if !self.wait()? {
                break;
            }
        }
        Ok(())
    }

    /// Pause after an action; false once input has ended.
    fn wait(&mut self) -> Result<bool> {
        match self.prompter.pause() {
            Ok(()) => Ok(true),
            Err(PassbookError::Cancelled) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.out, "\n{}", "=== Password Book ===".bold().cyan())?;
        writeln!(self.out, "1) Add entry")?;
        writeln!(self.out, "2) View entries")?;
        writeln!(self.out, "3) Search entries")?;
        writeln!(self.out, "4) Edit entry")?;
        writeln!(self.out, "5) Delete entry")?;
        writeln!(self.out, "6) Exit")?;
        Ok(())
    }

    fn execute(&mut self, choice: MenuChoice) -> Result<()> {
        match choice {
            MenuChoice::Add => self.add_entry(),
            MenuChoice::View => self.view_entries(),
            MenuChoice::Search => self.search_entries(),
            MenuChoice::Edit => self.edit_entry(),
            MenuChoice::Delete => self.delete_entry(),
            MenuChoice::Exit => Ok(()),
        }
    }

    fn add_entry(&mut self) -> Result<()> {
        writeln!(self.out, "{}", "=== Add New Entry ===".bold())?;
        let fields = NewEntry {
            name: self.prompter.input("Name (e.g., Gmail, Facebook)")?,
            username: self.prompter.input("Username")?,
            password: self.prompter.secret("Password")?,
            auth_key: self.prompter.input("Authentication key (optional)")?,
            url: self.prompter.input("Website URL")?,
            notes: self.prompter.input("Notes")?,
        };

        let entry = self.store.add(fields)?;
        writeln!(self.out, "{} Added entry with ID {}.", "✓".green(), entry.id)?;
        Ok(())
    }

    fn view_entries(&mut self) -> Result<()> {
        let entries = self.store.list();
        if entries.is_empty() {
            writeln!(self.out, "No entries found.")?;
            return Ok(());
        }

        let headers = [
            "ID",
            "Name",
            "Username",
            "Password",
            "Auth Key",
            "Website",
            "Notes",
            "Last Updated",
        ];
        let rows: Vec<Vec<String>> = entries
            .iter()
            .map(|e| {
                vec![
                    e.id.to_string(),
                    e.name.clone(),
                    e.username.clone(),
                    e.password.clone(),
                    e.auth_key.clone(),
                    e.url.clone(),
                    e.notes.clone(),
                    format_timestamp(&e.last_updated),
                ]
            })
            .collect();

        for line in format_table(&headers, &rows) {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn search_entries(&mut self) -> Result<()> {
        let keyword = self
            .prompter
            .input("Enter keyword (name/username/website/notes)")?;

        let matches = match self.store.search(&keyword) {
            Ok(matches) => matches,
            Err(PassbookError::InvalidInput(msg)) => {
                writeln!(self.out, "{msg}")?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if matches.is_empty() {
            writeln!(self.out, "No matching entries.")?;
            return Ok(());
        }

        let headers = ["ID", "Name", "Username", "Website", "Notes", "Last Updated"];
        let rows: Vec<Vec<String>> = matches
            .iter()
            .map(|e| {
                vec![
                    e.id.to_string(),
                    e.name.clone(),
                    e.username.clone(),
                    e.url.clone(),
                    e.notes.clone(),
                    format_timestamp(&e.last_updated),
                ]
            })
            .collect();

        for line in format_table(&headers, &rows) {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn edit_entry(&mut self) -> Result<()> {
        let Some(current) = self.select_entry("Enter ID to edit")? else {
            return Ok(());
        };

        writeln!(self.out, "Leave a field blank to keep current value.")?;
        let name = self.ask_replacement("Name", &current.name)?;
        let username = self.ask_replacement("Username", &current.username)?;

        let change_password = self.prompter.input("Change password? (y/N)")?;
        let password = if change_password.eq_ignore_ascii_case("y") {
            non_empty(self.prompter.secret("New Password")?)
        } else {
            None
        };

        let update = EntryUpdate {
            name,
            username,
            password,
            auth_key: self.ask_replacement("Auth Key", &current.auth_key)?,
            url: self.ask_replacement("Website", &current.url)?,
            notes: self.ask_replacement("Notes", &current.notes)?,
        };

        if update.is_empty() {
            writeln!(self.out, "No changes made.")?;
            return Ok(());
        }

        self.store.update(current.id, update)?;
        writeln!(self.out, "{} Entry updated.", "✓".green())?;
        Ok(())
    }

    fn delete_entry(&mut self) -> Result<()> {
        let Some(entry) = self.select_entry("Enter ID to delete")? else {
            return Ok(());
        };

        let confirm = self
            .prompter
            .input(&format!("Delete '{}' (ID {})? (y/N)", entry.name, entry.id))?;
        if !confirm.eq_ignore_ascii_case("y") {
            writeln!(self.out, "Deletion cancelled.")?;
            return Ok(());
        }

        self.store.remove(entry.id)?;
        writeln!(self.out, "{} Entry deleted.", "✓".green())?;
        Ok(())
    }

    /// Ask for an id and look it up; prints why when nothing is selected.
    fn select_entry(&mut self, prompt: &str) -> Result<Option<Entry>> {
        let raw = self.prompter.input(prompt)?;
        let Ok(id) = raw.parse::<u64>() else {
            writeln!(self.out, "Invalid ID.")?;
            return Ok(None);
        };

        match self.store.get(id) {
            Some(entry) => Ok(Some(entry.clone())),
            None => {
                writeln!(self.out, "Entry not found.")?;
                Ok(None)
            }
        }
    }

    fn ask_replacement(&mut self, label: &str, current: &str) -> Result<Option<String>> {
        writeln!(self.out, "Current {label}: {current}")?;
        let answer = self.prompter.input(&format!("New {label}"))?;
        Ok(non_empty(answer))
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Report a store error the way the shell does, for callers outside the loop.
pub fn report_error(err: &PassbookError) {
    if err.is_storage() {
        utils::failure(&format!("Storage problem: {err}"));
    } else {
        utils::failure(&err.to_string());
    }
}

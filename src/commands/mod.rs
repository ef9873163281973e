//! Built-in REPL commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! and help generation. Anything that is not a command is treated as a
//! trigger line by the REPL.

mod help;
mod quit;
mod shutdown;
mod status;

use async_trait::async_trait;
use std::sync::Arc;

use crate::bootstrap::Bootstrapper;
use crate::registry::EngineRegistry;

/// Session info available to commands during execution.
pub struct SessionInfo<'a> {
    pub engine_id: &'a str,
    pub registry: &'a EngineRegistry,
    /// Needed by `/shutdown`; absent when the REPL runs without a startup hook.
    pub bootstrapper: Option<&'a Bootstrapper>,
    pub db_path: &'a str,
}

/// What the REPL should do after a command runs.
#[derive(Debug)]
pub enum CommandResult {
    /// Not a command, treat the input as a trigger.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// Exit the REPL.
    Quit,
}

/// A REPL command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/status"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    async fn execute(&self, info: &SessionInfo<'_>) -> CommandResult;
}

/// The fixed set of REPL commands.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(status::StatusCommand),
            Arc::new(shutdown::ShutdownCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    fn find(&self, input: &str) -> Option<&Arc<dyn Command>> {
        self.commands
            .iter()
            .find(|c| c.name() == input || c.aliases().contains(&input))
    }

    /// Run the command `input` names. Slash-prefixed input that names no
    /// command is reported and swallowed; anything else is left to the
    /// trigger parser.
    pub async fn dispatch(&self, input: &str, info: &SessionInfo<'_>) -> CommandResult {
        let input = input.trim();
        match self.find(input) {
            Some(command) if command.name() == help::HelpCommand.name() => {
                print!("{}", self.help_text());
                CommandResult::Handled
            }
            Some(command) => command.execute(info).await,
            None if input.starts_with('/') => {
                println!("unknown command: {input} (try /help)");
                CommandResult::Handled
            }
            None => CommandResult::NotACommand,
        }
    }

    /// One line per command, then the trigger syntax.
    pub fn help_text(&self) -> String {
        let mut rows: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (label(c.as_ref()), c.description()))
            .collect();
        rows.push((
            "<kind> [payload]".to_string(),
            "fire a trigger, e.g. `alarm aspirin 08:00`",
        ));

        let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        rows.iter()
            .map(|(l, desc)| format!("  {l:<width$}  {desc}\n"))
            .collect()
    }

    #[cfg(test)]
    fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    #[cfg(test)]
    fn all_names(&self) -> Vec<&str> {
        self.commands
            .iter()
            .flat_map(|c| std::iter::once(c.name()).chain(c.aliases().iter().copied()))
            .collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn label(command: &dyn Command) -> String {
    match command.aliases() {
        [] => command.name().to_string(),
        aliases => format!("{} ({})", command.name(), aliases.join(", ")),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_info(registry: &EngineRegistry) -> SessionInfo<'_> {
        SessionInfo {
            engine_id: "background_engine",
            registry,
            bootstrapper: None,
            db_path: ":memory:",
        }
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        assert!(names.contains(&"/help"));
        assert!(names.contains(&"/status"));
        assert!(names.contains(&"/shutdown"));
        assert!(names.contains(&"/quit"));
    }

    #[test]
    fn no_duplicate_names() {
        let reg = CommandRegistry::new();
        let mut names = reg.all_names();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn trigger_kinds_are_not_command_names() {
        let reg = CommandRegistry::new();
        for kind in crate::trigger::TriggerKind::ALL {
            assert!(!reg.all_names().contains(&kind.as_str()));
        }
    }

    #[test]
    fn help_text_includes_all_commands() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in reg.names() {
            assert!(text.contains(name), "help missing: {name}");
        }
        assert!(text.contains("/?"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let registry = EngineRegistry::new();
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("/foobar", &test_info(&registry)).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn trigger_line_passes_through() {
        let registry = EngineRegistry::new();
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("alarm aspirin", &test_info(&registry)).await,
            CommandResult::NotACommand
        ));
    }

    #[test]
    fn label_lists_aliases() {
        assert_eq!(label(&status::StatusCommand), "/status");
        assert_eq!(label(&help::HelpCommand), "/help (/h, /?)");
    }

    #[tokio::test]
    async fn alias_reaches_command() {
        let registry = EngineRegistry::new();
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("exit", &test_info(&registry)).await,
            CommandResult::Quit
        ));
    }
}

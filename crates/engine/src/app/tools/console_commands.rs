use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::app::SceneKey;
use crate::narrative::ProgressRegistry;

use super::CheatConsole;

pub const UNKNOWN_COMMAND_MESSAGE: &str = "Unknown cheat code";

/// Work a console line hands back to the loop because it touches the scene
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    SwitchScene(SceneKey),
    DumpProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Print(String),
    Queue(ConsoleCommand),
    /// Prints the message, then hands the command to the loop.
    Announce(String, ConsoleCommand),
    ListCommands,
    ClearOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error: {reason}. usage: {usage}")]
pub struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    pub fn new(reason: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandRegistrationError {
    #[error("command name cannot be empty")]
    EmptyName,
    #[error("duplicate command registration: {0}")]
    Duplicate(String),
}

type ParseFn = dyn Fn(&[&str]) -> Result<CommandOutcome, CommandParseError>;
type BuiltinParse = fn(&[&str]) -> Result<CommandOutcome, CommandParseError>;

struct CommandSpec {
    name: String,
    usage: String,
    help: String,
    parse: Box<ParseFn>,
}

/// Case-insensitive command table. `help` lists entries in registration
/// order.
pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
    by_name: HashMap<String, usize>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self {
            specs: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        let builtins: [(&str, &str, BuiltinParse); 3] = [
            ("help", "list commands", |args| {
                no_args(args, "help").map(|()| CommandOutcome::ListCommands)
            }),
            ("clear", "clear console output", |args| {
                no_args(args, "clear").map(|()| CommandOutcome::ClearOutput)
            }),
            ("progress", "log the progress registry", |args| {
                no_args(args, "progress")
                    .map(|()| CommandOutcome::Queue(ConsoleCommand::DumpProgress))
            }),
        ];
        for (name, help, parse) in builtins {
            if let Err(err) = registry.register(name, "", help, parse) {
                warn!(command = name, error = %err, "builtin_command_registration_failed");
            }
        }
        registry
    }

    pub fn register<F>(
        &mut self,
        name: &str,
        usage: &str,
        help: &str,
        parse: F,
    ) -> Result<(), CommandRegistrationError>
    where
        F: Fn(&[&str]) -> Result<CommandOutcome, CommandParseError> + 'static,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(CommandRegistrationError::EmptyName);
        }
        let key = name.to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(CommandRegistrationError::Duplicate(name.to_string()));
        }
        self.specs.push(CommandSpec {
            name: name.to_string(),
            usage: usage.to_string(),
            help: help.to_string(),
            parse: Box::new(parse),
        });
        self.by_name.insert(key, self.specs.len() - 1);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        let index = self.by_name.get(&name.to_ascii_lowercase())?;
        self.specs.get(*index)
    }

    /// Runs one line. `None` for blank input.
    pub fn execute(&self, line: &str) -> Option<CommandOutcome> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = tokens.split_first()?;
        let Some(spec) = self.lookup(name) else {
            return Some(CommandOutcome::Print(UNKNOWN_COMMAND_MESSAGE.to_string()));
        };
        Some(match (spec.parse)(args) {
            Ok(outcome) => outcome,
            Err(error) => CommandOutcome::Print(error.to_string()),
        })
    }

    fn help_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.specs
            .iter()
            .map(|spec| {
                let usage = if spec.usage.is_empty() {
                    &spec.name
                } else {
                    &spec.usage
                };
                format!("{usage} - {}", spec.help)
            })
    }
}

pub fn no_args(args: &[&str], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected arguments", usage))
    }
}

/// Drains submitted console lines, prints local results and returns the
/// commands the loop must apply.
pub(crate) struct CommandProcessor {
    registry: CommandRegistry,
}

impl CommandProcessor {
    pub(crate) fn new(registry: CommandRegistry) -> Self {
        Self { registry }
    }

    pub(crate) fn process(&self, console: &mut CheatConsole) -> Vec<ConsoleCommand> {
        let mut queued = Vec::new();
        for line in console.take_submitted() {
            let Some(outcome) = self.registry.execute(&line) else {
                continue;
            };
            info!(line = line.as_str(), outcome = ?outcome, "console_command");
            match outcome {
                CommandOutcome::Print(text) => console.print(text),
                CommandOutcome::Queue(command) => queued.push(command),
                CommandOutcome::Announce(text, command) => {
                    console.print(text);
                    queued.push(command);
                }
                CommandOutcome::ListCommands => {
                    for help_line in self.registry.help_lines() {
                        console.print(help_line);
                    }
                }
                CommandOutcome::ClearOutput => console.clear_output(),
            }
        }
        queued
    }
}

/// Applies `DumpProgress` output to the console and the log.
pub(crate) fn print_progress(console: &mut CheatConsole, registry: &ProgressRegistry) {
    match registry.snapshot_json() {
        Ok(json) => {
            info!(progress = json.as_str(), "progress_snapshot");
            console.print(json);
        }
        Err(error) => {
            warn!(error = %error, "progress_snapshot_failed");
            console.print(format!("error: {error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_jump() -> CommandRegistry {
        let mut registry = CommandRegistry::with_builtins();
        registry
            .register("jump", "jump <scene>", "switch scene", |args| match args {
                [] => Ok(CommandOutcome::Print("usage: jump <scene>".to_string())),
                ["north"] => Ok(CommandOutcome::Queue(ConsoleCommand::SwitchScene(SceneKey(
                    "Northgate",
                )))),
                [other] => Err(CommandParseError::new(
                    format!("no scene named {other}"),
                    "jump <scene>",
                )),
                _ => Err(CommandParseError::new("too many arguments", "jump <scene>")),
            })
            .expect("register jump");
        registry
    }

    fn submit(console: &mut CheatConsole, line: &str) {
        console.submit_line(line);
    }

    #[test]
    fn registration_rejects_empty_and_duplicate_names() {
        let mut registry = CommandRegistry::with_builtins();
        assert_eq!(
            registry.register("  ", "", "", |_| Ok(CommandOutcome::ClearOutput)),
            Err(CommandRegistrationError::EmptyName)
        );
        assert_eq!(
            registry.register("HELP", "", "", |_| Ok(CommandOutcome::ClearOutput)),
            Err(CommandRegistrationError::Duplicate("HELP".to_string()))
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn builtins_are_all_registered_and_runnable() {
        let registry = CommandRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.execute("help"), Some(CommandOutcome::ListCommands));
        assert_eq!(registry.execute("CLEAR"), Some(CommandOutcome::ClearOutput));
        assert_eq!(
            registry.execute("progress"),
            Some(CommandOutcome::Queue(ConsoleCommand::DumpProgress))
        );
    }

    #[test]
    fn blank_lines_do_nothing_and_unknown_lines_say_so() {
        let registry = registry_with_jump();
        assert_eq!(registry.execute("   "), None);
        assert_eq!(
            registry.execute("iddqd"),
            Some(CommandOutcome::Print(UNKNOWN_COMMAND_MESSAGE.to_string()))
        );
    }

    #[test]
    fn lookup_ignores_case_and_parse_errors_carry_usage() {
        let registry = registry_with_jump();
        assert_eq!(
            registry.execute("JUMP north"),
            Some(CommandOutcome::Queue(ConsoleCommand::SwitchScene(SceneKey(
                "Northgate"
            ))))
        );
        assert_eq!(
            registry.execute("jump moon"),
            Some(CommandOutcome::Print(
                "error: no scene named moon. usage: jump <scene>".to_string()
            ))
        );
        assert_eq!(
            registry.execute("clear now"),
            Some(CommandOutcome::Print(
                "error: unexpected arguments. usage: clear".to_string()
            ))
        );
    }

    #[test]
    fn processor_prints_help_in_registration_order_and_queues_commands() {
        let processor = CommandProcessor::new(registry_with_jump());
        let mut console = CheatConsole::default();
        submit(&mut console, "help");
        assert!(processor.process(&mut console).is_empty());
        let printed: Vec<&str> = console.output().collect();
        assert_eq!(
            printed,
            vec![
                "> help",
                "help - list commands",
                "clear - clear console output",
                "progress - log the progress registry",
                "jump <scene> - switch scene",
            ]
        );

        submit(&mut console, "progress");
        assert_eq!(
            processor.process(&mut console),
            vec![ConsoleCommand::DumpProgress]
        );
    }

    #[test]
    fn announced_commands_print_before_queueing() {
        let mut registry = CommandRegistry::empty();
        registry
            .register("warp", "", "warp north", |args| {
                no_args(args, "warp").map(|()| {
                    CommandOutcome::Announce(
                        "warping".to_string(),
                        ConsoleCommand::SwitchScene(SceneKey("Northgate")),
                    )
                })
            })
            .expect("register warp");
        let processor = CommandProcessor::new(registry);
        let mut console = CheatConsole::default();
        submit(&mut console, "warp");
        assert_eq!(
            processor.process(&mut console),
            vec![ConsoleCommand::SwitchScene(SceneKey("Northgate"))]
        );
        assert_eq!(console.output().last(), Some("warping"));
    }

    #[test]
    fn progress_snapshot_is_printed_as_json() {
        let mut console = CheatConsole::default();
        let mut registry = ProgressRegistry::new();
        registry.raise_flag("hasTicket");
        print_progress(&mut console, &registry);
        let printed = console.output().last().unwrap_or_default().to_string();
        assert!(printed.contains("hasTicket"), "{printed}");
    }
}

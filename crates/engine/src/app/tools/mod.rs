mod console;
mod console_commands;

pub(crate) use console::{draw_console, CheatConsole};
pub(crate) use console_commands::{print_progress, CommandProcessor};
pub use console_commands::{
    no_args, CommandOutcome, CommandParseError, CommandRegistrationError, CommandRegistry,
    ConsoleCommand, UNKNOWN_COMMAND_MESSAGE,
};

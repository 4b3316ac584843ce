use narrative_engine::app::{CommandRegistrationError, UNKNOWN_COMMAND_MESSAGE};
use narrative_engine::{CommandOutcome, CommandParseError, CommandRegistry, ConsoleCommand};

use super::gameplay;

const LEVEL_JUMP_COMMAND: &str = "klapaucius";
const LEVEL_JUMP_USAGE: &str = "Usage: klapaucius <level> (1, 2, or 3)";
const INVALID_LEVEL_MESSAGE: &str = "Invalid level. Use: klapaucius 1, 2, or 3";

/// Adds the game's cheat codes on top of the engine builtins.
pub(crate) fn register_cheats(registry: &mut CommandRegistry) -> Result<(), CommandRegistrationError> {
    registry.register(
        LEVEL_JUMP_COMMAND,
        "klapaucius <1|2|3>",
        "jump straight to a level",
        parse_level_jump,
    )
}

fn parse_level_jump(args: &[&str]) -> Result<CommandOutcome, CommandParseError> {
    let outcome = match args {
        [] => CommandOutcome::Print(LEVEL_JUMP_USAGE.to_string()),
        [raw] if !raw.is_empty() && raw.bytes().all(|byte| byte.is_ascii_digit()) => {
            let level = raw.parse::<u32>().ok();
            match level.and_then(|level| gameplay::level_scene(level).map(|scene| (level, scene))) {
                Some((level, scene)) => CommandOutcome::Announce(
                    format!("Cheat activated: Jumping to level {level}"),
                    ConsoleCommand::SwitchScene(scene),
                ),
                None => CommandOutcome::Print(INVALID_LEVEL_MESSAGE.to_string()),
            }
        }
        _ => CommandOutcome::Print(UNKNOWN_COMMAND_MESSAGE.to_string()),
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use narrative_engine::SceneKey;

    use super::*;

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::default();
        register_cheats(&mut registry).expect("cheats register once");
        registry
    }

    fn printed(text: &str) -> Option<CommandOutcome> {
        Some(CommandOutcome::Print(text.to_string()))
    }

    #[test]
    fn level_jump_targets_each_level_scene() {
        let registry = registry();
        for (line, scene) in [
            ("klapaucius 1", "Northgate"),
            ("KLAPAUCIUS 2", "IceHockey"),
            ("klapaucius   3", "FarmersMarket"),
        ] {
            let Some(CommandOutcome::Announce(message, command)) = registry.execute(line) else {
                panic!("{line} should jump");
            };
            assert!(message.starts_with("Cheat activated: Jumping to level"), "{message}");
            assert_eq!(command, ConsoleCommand::SwitchScene(SceneKey(scene)));
        }
    }

    #[test]
    fn level_jump_rejects_out_of_range_levels() {
        let registry = registry();
        assert_eq!(registry.execute("klapaucius 0"), printed(INVALID_LEVEL_MESSAGE));
        assert_eq!(registry.execute("klapaucius 4"), printed(INVALID_LEVEL_MESSAGE));
        assert_eq!(
            registry.execute("klapaucius 99999999999999999999"),
            printed(INVALID_LEVEL_MESSAGE)
        );
    }

    #[test]
    fn bare_and_malformed_jumps_follow_the_console_messages() {
        let registry = registry();
        assert_eq!(registry.execute("klapaucius"), printed(LEVEL_JUMP_USAGE));
        assert_eq!(registry.execute("klapaucius two"), printed(UNKNOWN_COMMAND_MESSAGE));
        assert_eq!(registry.execute("klapaucius 1 2"), printed(UNKNOWN_COMMAND_MESSAGE));
        assert_eq!(registry.execute("iddqd"), printed("Unknown cheat code"));
        assert_eq!(registry.execute(""), None);
    }

    #[test]
    fn registering_twice_is_refused() {
        let mut registry = registry();
        assert!(matches!(
            register_cheats(&mut registry),
            Err(CommandRegistrationError::Duplicate(_))
        ));
    }
}

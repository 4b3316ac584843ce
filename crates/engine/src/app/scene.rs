use std::fmt;

use thiserror::Error;
use tracing::info;

use super::input::InputSnapshot;
use crate::narrative::{ActorStage, DialogueSession, Effect, MenuKind, ProgressRegistry, Prompt};

/// Names a scene. The game's scene factory decides what each key builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneKey(pub &'static str);

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(SceneKey),
    /// Tear down the active scene and build it again from scratch.
    Restart,
}

/// The only state that outlives a scene instance.
pub struct SceneContext<'a> {
    pub registry: &'a mut ProgressRegistry,
    pub dialogue: &'a mut DialogueSession,
}

/// Everything the renderer needs from the active scene for one frame.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub stage: &'a ActorStage,
    pub effects: &'a [Effect],
    pub prompt: Option<Prompt>,
    pub menu: Option<MenuKind>,
    pub backdrop: [u8; 4],
}

pub trait Scene {
    fn load(&mut self, ctx: &mut SceneContext<'_>);
    fn update(
        &mut self,
        dt_ms: u64,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand;
    fn unload(&mut self, ctx: &mut SceneContext<'_>);
    fn view(&self, registry: &ProgressRegistry) -> SceneView<'_>;
    fn debug_title(&self, _registry: &ProgressRegistry) -> Option<String> {
        None
    }
}

pub type SceneFactory = Box<dyn Fn(SceneKey) -> Option<Box<dyn Scene>>>;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no scene is registered under key {0}")]
    UnknownScene(SceneKey),
}

struct ActiveScene {
    key: SceneKey,
    scene: Box<dyn Scene>,
}

/// Owns the registry, the shared dialogue box and at most one live scene.
/// Every entry builds a fresh scene instance; nothing scene-local survives.
pub struct SceneMachine {
    factory: SceneFactory,
    registry: ProgressRegistry,
    dialogue: DialogueSession,
    active: Option<ActiveScene>,
    pending: Option<SceneKey>,
}

impl SceneMachine {
    pub fn new(factory: SceneFactory, registry: ProgressRegistry) -> Self {
        Self {
            factory,
            registry,
            dialogue: DialogueSession::new(),
            active: None,
            pending: None,
        }
    }

    pub fn active_scene(&self) -> Option<SceneKey> {
        self.active.as_ref().map(|active| active.key)
    }

    pub fn registry(&self) -> &ProgressRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProgressRegistry {
        &mut self.registry
    }

    pub fn dialogue(&self) -> &DialogueSession {
        &self.dialogue
    }

    /// Replaces the active scene with a freshly built `key`. On an unknown
    /// key the current scene keeps running.
    pub fn enter_scene(&mut self, key: SceneKey) -> Result<(), SceneError> {
        let mut scene = (self.factory)(key).ok_or(SceneError::UnknownScene(key))?;
        let previous = self.unload_active();
        self.dialogue.hide();
        self.dialogue.take_abandoned();
        let mut ctx = SceneContext {
            registry: &mut self.registry,
            dialogue: &mut self.dialogue,
        };
        scene.load(&mut ctx);
        info!(
            from = previous.map(|key| key.0).unwrap_or("none"),
            to = key.0,
            level = self.registry.level(),
            "scene_entered"
        );
        self.active = Some(ActiveScene { key, scene });
        Ok(())
    }

    /// Takes effect at the start of the next `update`.
    pub fn request_scene_transition(&mut self, key: SceneKey) {
        self.pending = Some(key);
    }

    /// Runs one tick of the active scene and applies the command it returns.
    pub fn update(&mut self, dt_ms: u64, input: &InputSnapshot) -> Result<(), SceneError> {
        if let Some(key) = self.pending.take() {
            self.enter_scene(key)?;
        }
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let mut ctx = SceneContext {
            registry: &mut self.registry,
            dialogue: &mut self.dialogue,
        };
        let command = active.scene.update(dt_ms, input, &mut ctx);
        let current = active.key;
        match command {
            SceneCommand::None => Ok(()),
            SceneCommand::SwitchTo(key) => self.enter_scene(key),
            SceneCommand::Restart => self.enter_scene(current),
        }
    }

    pub fn view(&self) -> Option<SceneView<'_>> {
        self.active
            .as_ref()
            .map(|active| active.scene.view(&self.registry))
    }

    pub fn debug_title(&self) -> Option<String> {
        self.active
            .as_ref()
            .and_then(|active| active.scene.debug_title(&self.registry))
    }

    pub fn shutdown(&mut self) {
        self.unload_active();
        self.dialogue.hide();
        self.dialogue.take_abandoned();
    }

    fn unload_active(&mut self) -> Option<SceneKey> {
        let mut active = self.active.take()?;
        let mut ctx = SceneContext {
            registry: &mut self.registry,
            dialogue: &mut self.dialogue,
        };
        active.scene.unload(&mut ctx);
        Some(active.key)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct JournalScene {
        key: SceneKey,
        journal: Journal,
        stage: ActorStage,
        ticks: u32,
        command_on_tick: Option<(u32, SceneCommand)>,
    }

    impl Scene for JournalScene {
        fn load(&mut self, ctx: &mut SceneContext<'_>) {
            ctx.registry.increment_counter("loads");
            self.journal.borrow_mut().push(format!("load {}", self.key));
        }

        fn update(
            &mut self,
            _dt_ms: u64,
            _input: &InputSnapshot,
            _ctx: &mut SceneContext<'_>,
        ) -> SceneCommand {
            self.ticks += 1;
            self.journal
                .borrow_mut()
                .push(format!("tick {} {}", self.key, self.ticks));
            match self.command_on_tick {
                Some((tick, command)) if tick == self.ticks => command,
                _ => SceneCommand::None,
            }
        }

        fn unload(&mut self, _ctx: &mut SceneContext<'_>) {
            self.journal.borrow_mut().push(format!("unload {}", self.key));
        }

        fn view(&self, _registry: &ProgressRegistry) -> SceneView<'_> {
            SceneView {
                stage: &self.stage,
                effects: &[],
                prompt: None,
                menu: None,
                backdrop: [0, 0, 0, 255],
            }
        }
    }

    fn machine_with(journal: &Journal, commands: Vec<(SceneKey, u32, SceneCommand)>) -> SceneMachine {
        let journal = Rc::clone(journal);
        let factory: SceneFactory = Box::new(move |key| {
            if key.0 == "missing" {
                return None;
            }
            let command_on_tick = commands
                .iter()
                .find(|(scene, _, _)| *scene == key)
                .map(|(_, tick, command)| (*tick, *command));
            Some(Box::new(JournalScene {
                key,
                journal: Rc::clone(&journal),
                stage: ActorStage::default(),
                ticks: 0,
                command_on_tick,
            }) as Box<dyn Scene>)
        });
        SceneMachine::new(factory, ProgressRegistry::new())
    }

    #[test]
    fn unknown_scene_is_an_error_and_keeps_current() {
        let journal = Journal::default();
        let mut machine = machine_with(&journal, Vec::new());
        machine.enter_scene(SceneKey("Title")).expect("title");
        let err = machine
            .enter_scene(SceneKey("missing"))
            .expect_err("missing scene");
        assert!(matches!(err, SceneError::UnknownScene(SceneKey("missing"))));
        assert_eq!(machine.active_scene(), Some(SceneKey("Title")));
        assert_eq!(*journal.borrow(), vec!["load Title".to_string()]);
    }

    #[test]
    fn switch_unloads_before_loading_and_registry_survives() {
        let journal = Journal::default();
        let mut machine = machine_with(
            &journal,
            vec![(SceneKey("Title"), 1, SceneCommand::SwitchTo(SceneKey("Game")))],
        );
        machine.enter_scene(SceneKey("Title")).expect("title");
        machine
            .update(16, &InputSnapshot::empty())
            .expect("update");
        assert_eq!(machine.active_scene(), Some(SceneKey("Game")));
        assert_eq!(machine.registry().counter("loads"), 2);
        assert_eq!(
            *journal.borrow(),
            vec!["load Title", "tick Title 1", "unload Title", "load Game"]
        );
    }

    #[test]
    fn restart_builds_a_fresh_instance() {
        let journal = Journal::default();
        let mut machine = machine_with(
            &journal,
            vec![(SceneKey("Market"), 2, SceneCommand::Restart)],
        );
        machine.enter_scene(SceneKey("Market")).expect("market");
        for _ in 0..3 {
            machine
                .update(16, &InputSnapshot::empty())
                .expect("update");
        }
        assert_eq!(
            *journal.borrow(),
            vec![
                "load Market",
                "tick Market 1",
                "tick Market 2",
                "unload Market",
                "load Market",
                "tick Market 1",
            ]
        );
    }

    #[test]
    fn requested_transition_applies_before_next_tick_and_hides_dialogue() {
        let journal = Journal::default();
        let mut machine = machine_with(&journal, Vec::new());
        machine.enter_scene(SceneKey("Title")).expect("title");
        machine.dialogue.show(["left over"]);
        machine.request_scene_transition(SceneKey("Game"));
        machine
            .update(16, &InputSnapshot::empty())
            .expect("update");
        assert!(!machine.dialogue().is_visible());
        assert_eq!(
            journal.borrow().last().map(String::as_str),
            Some("tick Game 1")
        );
    }

    #[test]
    fn shutdown_unloads_once() {
        let journal = Journal::default();
        let mut machine = machine_with(&journal, Vec::new());
        machine.enter_scene(SceneKey("Title")).expect("title");
        machine.shutdown();
        machine.shutdown();
        assert_eq!(machine.active_scene(), None);
        assert_eq!(*journal.borrow(), vec!["load Title", "unload Title"]);
    }
}

//! Static screen table: legal targets, input bindings and per-screen flags.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

/// Allowed targets fit inline for every screen in the bundled table.
pub type ScreenTargets = SmallVec<[Screen; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Menu,
    Setup,
    Load,
    Help,
    Training,
    PreRace,
    Lineup,
    Racing,
    Results,
    CareerComplete,
    Tutorial,
    TutorialTraining,
    TutorialRace,
    TutorialResults,
}

impl Screen {
    pub const ALL: [Self; 14] = [
        Self::Menu,
        Self::Setup,
        Self::Load,
        Self::Help,
        Self::Training,
        Self::PreRace,
        Self::Lineup,
        Self::Racing,
        Self::Results,
        Self::CareerComplete,
        Self::Tutorial,
        Self::TutorialTraining,
        Self::TutorialRace,
        Self::TutorialResults,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Setup => "setup",
            Self::Load => "load",
            Self::Help => "help",
            Self::Training => "training",
            Self::PreRace => "pre_race",
            Self::Lineup => "lineup",
            Self::Racing => "racing",
            Self::Results => "results",
            Self::CareerComplete => "career_complete",
            Self::Tutorial => "tutorial",
            Self::TutorialTraining => "tutorial_training",
            Self::TutorialRace => "tutorial_race",
            Self::TutorialResults => "tutorial_results",
        }
    }

    #[must_use]
    pub const fn is_tutorial(self) -> bool {
        matches!(
            self,
            Self::Tutorial | Self::TutorialTraining | Self::TutorialRace | Self::TutorialResults
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an input token resolves to on a given screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputBinding {
    Screen(Screen),
    Action(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoProgress {
    pub target: Screen,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(default)]
    pub targets: ScreenTargets,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputBinding>,
    /// Unmapped tokens are captured as literal text instead of rejected.
    #[serde(default)]
    pub free_text: bool,
    /// The empty token resolves to the `""` binding.
    #[serde(default)]
    pub accepts_empty: bool,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub auto_progress: Option<AutoProgress>,
}

impl ScreenConfig {
    #[must_use]
    pub fn allows(&self, target: Screen) -> bool {
        self.targets.contains(&target)
    }
}

/// Integrity problem found by [`NavigationConfig::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    MissingScreen(Screen),
    Unreachable(Screen),
    DeadEnd(Screen),
    InputTargetNotAllowed {
        screen: Screen,
        input: String,
        target: Screen,
    },
    AutoProgressNotAllowed {
        screen: Screen,
        target: Screen,
    },
    EmptyInputUnbound(Screen),
    UnknownAction {
        screen: Screen,
        input: String,
        action: String,
    },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingScreen(screen) => write!(f, "screen {screen} has no table entry"),
            Self::Unreachable(screen) => write!(f, "screen {screen} is unreachable from the start"),
            Self::DeadEnd(screen) => {
                write!(f, "non-terminal screen {screen} has no outgoing transitions")
            }
            Self::InputTargetNotAllowed {
                screen,
                input,
                target,
            } => write!(
                f,
                "input '{input}' on {screen} targets {target}, which is not an allowed transition"
            ),
            Self::AutoProgressNotAllowed { screen, target } => write!(
                f,
                "auto-progress on {screen} targets {target}, which is not an allowed transition"
            ),
            Self::EmptyInputUnbound(screen) => {
                write!(f, "screen {screen} accepts empty input but binds nothing to it")
            }
            Self::UnknownAction {
                screen,
                input,
                action,
            } => write!(f, "input '{input}' on {screen} names unknown action '{action}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "NavigationConfig::default_initial")]
    pub initial: Screen,
    pub screens: HashMap<Screen, ScreenConfig>,
}

impl NavigationConfig {
    const fn default_initial() -> Screen {
        Screen::Menu
    }

    /// Parse a table from JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the JSON does not match the table shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn screen(&self, screen: Screen) -> Option<&ScreenConfig> {
        self.screens.get(&screen)
    }

    #[must_use]
    pub fn targets(&self, screen: Screen) -> &[Screen] {
        self.screen(screen).map_or(&[], |cfg| cfg.targets.as_slice())
    }

    /// Every `(screen, input, action id)` binding in the table, in stable order.
    #[must_use]
    pub fn action_bindings(&self) -> Vec<(Screen, &str, &str)> {
        Screen::ALL
            .iter()
            .filter_map(|&screen| self.screen(screen).map(|cfg| (screen, cfg)))
            .flat_map(|(screen, cfg)| {
                cfg.inputs.iter().filter_map(move |(input, binding)| match binding {
                    InputBinding::Action(action) => Some((screen, input.as_str(), action.as_str())),
                    InputBinding::Screen(_) => None,
                })
            })
            .collect()
    }

    fn reachable(&self) -> HashSet<Screen> {
        let mut seen = HashSet::from([self.initial]);
        let mut queue = VecDeque::from([self.initial]);
        while let Some(screen) = queue.pop_front() {
            for &next in self.targets(screen) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Walk the table once and report authoring mistakes without failing.
    #[must_use]
    pub fn check(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let reachable = self.reachable();
        for screen in Screen::ALL {
            let Some(cfg) = self.screen(screen) else {
                issues.push(ConfigIssue::MissingScreen(screen));
                continue;
            };
            if !reachable.contains(&screen) {
                issues.push(ConfigIssue::Unreachable(screen));
            }
            if cfg.targets.is_empty() && !cfg.terminal {
                issues.push(ConfigIssue::DeadEnd(screen));
            }
            for (input, binding) in &cfg.inputs {
                if let InputBinding::Screen(target) = binding
                    && *target != screen
                    && !cfg.allows(*target)
                {
                    issues.push(ConfigIssue::InputTargetNotAllowed {
                        screen,
                        input: input.clone(),
                        target: *target,
                    });
                }
            }
            if let Some(auto) = cfg.auto_progress
                && !cfg.allows(auto.target)
            {
                issues.push(ConfigIssue::AutoProgressNotAllowed {
                    screen,
                    target: auto.target,
                });
            }
            if cfg.accepts_empty && !cfg.inputs.contains_key("") {
                issues.push(ConfigIssue::EmptyInputUnbound(screen));
            }
        }
        issues
    }
}

//! Screen navigation state machine.
//!
//! The transition table is immutable and shared; a [`Navigator`] owns the only
//! mutable state, the current screen and the history stack. Every accepted
//! change is reported to the observer supplied at construction.
use log::{debug, warn};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

pub mod config;
pub use config::{
    AutoProgress, ConfigIssue, InputBinding, NavigationConfig, Screen, ScreenConfig,
    ScreenTargets,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("cannot move from {from} to {to} (allowed: {allowed:?})")]
    InvalidTransition {
        from: Screen,
        to: Screen,
        allowed: Vec<Screen>,
    },
    #[error("input '{input}' is not accepted on {screen}")]
    InvalidInput { screen: Screen, input: String },
    #[error("no earlier screen to return to")]
    NoHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Transition,
    Back,
    AutoProgress,
    /// Same screen, new data (e.g. stats after a training turn).
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: Screen,
    pub to: Screen,
    pub cause: ChangeCause,
}

/// Render hook notified after every accepted screen change.
pub trait StateObserver {
    fn state_changed(&mut self, change: &StateChange);
}

impl<F> StateObserver for F
where
    F: FnMut(&StateChange),
{
    fn state_changed(&mut self, change: &StateChange) {
        self(change);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StateObserver for NoopObserver {
    fn state_changed(&mut self, _change: &StateChange) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Moved { from: Screen, to: Screen },
    /// Target was already current; history is untouched and nothing is notified.
    Ignored { screen: Screen },
}

impl TransitionOutcome {
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

/// A data-driven action the domain layer must execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: String,
    pub input: String,
    pub screen: Screen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Transition(TransitionOutcome),
    Action(ActionRequest),
    /// Literal text captured on a free-text screen.
    Text(String),
}

pub struct Navigator {
    config: Rc<NavigationConfig>,
    current: Screen,
    history: Vec<Screen>,
    observer: Box<dyn StateObserver>,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

/// Deepest back stack kept; older entries fall off the bottom.
pub const HISTORY_LIMIT: usize = 32;

impl Navigator {
    #[must_use]
    pub fn new(config: Rc<NavigationConfig>, observer: impl StateObserver + 'static) -> Self {
        let current = config.initial;
        Self {
            config,
            current,
            history: vec![current],
            observer: Box::new(observer),
        }
    }

    #[must_use]
    pub const fn current(&self) -> Screen {
        self.current
    }

    #[must_use]
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    #[must_use]
    pub fn current_config(&self) -> Option<&ScreenConfig> {
        self.config.screen(self.current)
    }

    /// History, most recent first; the first entry is always the current screen.
    /// Arriving at the initial screen starts a fresh history.
    pub fn history(&self) -> impl Iterator<Item = Screen> + '_ {
        self.history.iter().rev().copied()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn can_transition(&self, target: Screen) -> bool {
        target == self.current
            || self
                .current_config()
                .is_some_and(|cfg| cfg.allows(target))
    }

    /// Move to `target` if the table allows it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` naming the legal targets; the current
    /// screen is unchanged.
    pub fn attempt_transition(
        &mut self,
        target: Screen,
    ) -> Result<TransitionOutcome, NavigationError> {
        self.transition_with(target, ChangeCause::Transition)
    }

    fn transition_with(
        &mut self,
        target: Screen,
        cause: ChangeCause,
    ) -> Result<TransitionOutcome, NavigationError> {
        let from = self.current;
        if target == from {
            debug!("transition to {target} ignored: already current");
            return Ok(TransitionOutcome::Ignored { screen: target });
        }
        if !self.can_transition(target) {
            let allowed = self.config.targets(from).to_vec();
            warn!("rejected transition {from} -> {target}");
            return Err(NavigationError::InvalidTransition {
                from,
                to: target,
                allowed,
            });
        }
        self.current = target;
        if target == self.config.initial {
            self.history.clear();
        } else if self.history.len() >= HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(target);
        debug!("screen {from} -> {target} ({cause:?})");
        self.notify(from, cause);
        Ok(TransitionOutcome::Moved { from, to: target })
    }

    /// Resolve `token` against the current screen's input map.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for tokens the screen neither maps nor captures
    /// as text, and `InvalidTransition` when a mapped screen is not allowed.
    pub fn dispatch(&mut self, token: &str) -> Result<Dispatch, NavigationError> {
        let screen = self.current;
        let config = Rc::clone(&self.config);
        let Some(cfg) = config.screen(screen) else {
            return Err(self.reject(token));
        };
        let key = token.trim();
        if key.is_empty() && !cfg.accepts_empty {
            return Err(self.reject(token));
        }
        let binding = cfg
            .inputs
            .get(key)
            .or_else(|| cfg.inputs.get(&key.to_ascii_lowercase()));
        match binding.cloned() {
            Some(InputBinding::Screen(target)) => {
                self.attempt_transition(target).map(Dispatch::Transition)
            }
            Some(InputBinding::Action(action)) => {
                debug!("{screen}: input '{key}' -> action {action}");
                Ok(Dispatch::Action(ActionRequest {
                    action,
                    input: token.to_string(),
                    screen,
                }))
            }
            None if cfg.free_text && !key.is_empty() => Ok(Dispatch::Text(key.to_string())),
            None => Err(self.reject(token)),
        }
    }

    fn reject(&self, token: &str) -> NavigationError {
        warn!("input '{token}' rejected on {}", self.current);
        NavigationError::InvalidInput {
            screen: self.current,
            input: token.to_string(),
        }
    }

    /// Return to the previous screen.
    ///
    /// # Errors
    ///
    /// Returns `NoHistory` when there is no earlier screen.
    pub fn go_back(&mut self) -> Result<Screen, NavigationError> {
        let [.., previous, _] = self.history.as_slice() else {
            return Err(NavigationError::NoHistory);
        };
        let previous = *previous;
        let from = self.current;
        self.history.pop();
        self.current = previous;
        debug!("screen {from} -> {previous} (back)");
        self.notify(from, ChangeCause::Back);
        Ok(previous)
    }

    /// Auto-advance configured for the current screen, if any.
    #[must_use]
    pub fn pending_auto_progress(&self) -> Option<AutoProgress> {
        self.current_config().and_then(|cfg| cfg.auto_progress)
    }

    /// Fire the current screen's auto-advance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when the configured target is not allowed.
    pub fn auto_progress(&mut self) -> Result<Option<TransitionOutcome>, NavigationError> {
        let Some(auto) = self.pending_auto_progress() else {
            return Ok(None);
        };
        self.transition_with(auto.target, ChangeCause::AutoProgress)
            .map(Some)
    }

    /// Notify the observer that the current screen's data changed.
    pub fn refresh(&mut self) {
        self.notify(self.current, ChangeCause::Refresh);
    }

    fn notify(&mut self, from: Screen, cause: ChangeCause) {
        let change = StateChange {
            from,
            to: self.current,
            cause,
        };
        self.observer.state_changed(&change);
    }
}

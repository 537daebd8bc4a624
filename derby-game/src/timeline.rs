//! Fixed race schedule keyed by career turn.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceKind {
    Sprint,
    Mile,
    Dirt,
    Final,
}

impl RaceKind {
    /// Every kind a complete career schedule must contain.
    pub const REQUIRED: [Self; 4] = [Self::Sprint, Self::Mile, Self::Dirt, Self::Final];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sprint => "sprint",
            Self::Mile => "mile",
            Self::Dirt => "dirt",
            Self::Final => "final",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    #[default]
    Turf,
    Dirt,
}

/// Descriptive metadata attached to a scheduled race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceMeta {
    pub kind: RaceKind,
    pub distance_m: u32,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default = "RaceMeta::default_field_size")]
    pub field_size: u8,
}

impl RaceMeta {
    const fn default_field_size() -> u8 {
        8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRace {
    pub turn: u32,
    pub name: String,
    pub meta: RaceMeta,
}

/// Nearest race still ahead of a given turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingRace<'a> {
    pub race: &'a ScheduledRace,
    pub turns_remaining: u32,
    pub is_immediately_next: bool,
}

/// A violated schedule invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineIssue {
    Empty,
    NotIncreasing { index: usize, turn: u32, previous: u32 },
    DuplicateTurn { turn: u32 },
    ZeroTurn { index: usize },
    MissingKind(RaceKind),
}

impl TimelineIssue {
    /// Stable name of the invariant this issue violates.
    #[must_use]
    pub const fn invariant(&self) -> &'static str {
        match self {
            Self::Empty => "empty_schedule",
            Self::NotIncreasing { .. } => "strictly_increasing_turns",
            Self::DuplicateTurn { .. } => "unique_turns",
            Self::ZeroTurn { .. } => "positive_turns",
            Self::MissingKind(_) => "required_kind_present",
        }
    }
}

impl fmt::Display for TimelineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "{}: schedule has no races", self.invariant()),
            Self::NotIncreasing {
                index,
                turn,
                previous,
            } => write!(
                f,
                "{}: entry {index} at turn {turn} does not follow turn {previous}",
                self.invariant()
            ),
            Self::DuplicateTurn { turn } => {
                write!(f, "{}: turn {turn} scheduled twice", self.invariant())
            }
            Self::ZeroTurn { index } => {
                write!(f, "{}: entry {index} is scheduled at turn 0", self.invariant())
            }
            Self::MissingKind(kind) => {
                write!(f, "{}: no {} race scheduled", self.invariant(), kind.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<ScheduledRace>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Timeline {
    #[must_use]
    pub const fn from_entries(entries: Vec<ScheduledRace>) -> Self {
        Self { entries }
    }

    /// The four-race career used by default.
    #[must_use]
    pub fn standard() -> Self {
        let race = |turn, name: &str, kind, distance_m, surface| ScheduledRace {
            turn,
            name: name.to_string(),
            meta: RaceMeta {
                kind,
                distance_m,
                surface,
                field_size: RaceMeta::default_field_size(),
            },
        };
        Self::from_entries(vec![
            race(4, "Maiden Sprint", RaceKind::Sprint, 1_200, Surface::Turf),
            race(7, "Mile Championship", RaceKind::Mile, 1_600, Surface::Turf),
            race(10, "Dirt Stakes", RaceKind::Dirt, 1_800, Surface::Dirt),
            race(12, "Turf Cup Final", RaceKind::Final, 2_400, Surface::Turf),
        ])
    }

    #[must_use]
    pub fn entries(&self) -> &[ScheduledRace] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn event_at(&self, turn: u32) -> Option<&ScheduledRace> {
        self.entries.iter().find(|race| race.turn == turn)
    }

    /// Zero-based index of the race scheduled at `turn`.
    #[must_use]
    pub fn position_of(&self, turn: u32) -> Option<usize> {
        self.entries.iter().position(|race| race.turn == turn)
    }

    #[must_use]
    pub fn next_event(&self, current: u32) -> Option<UpcomingRace<'_>> {
        self.entries
            .iter()
            .find(|race| race.turn > current)
            .map(|race| {
                let turns_remaining = race.turn - current;
                UpcomingRace {
                    race,
                    turns_remaining,
                    is_immediately_next: turns_remaining == 1,
                }
            })
    }

    pub fn events_after(&self, turn: u32) -> impl Iterator<Item = &ScheduledRace> + '_ {
        self.entries.iter().filter(move |race| race.turn > turn)
    }

    /// Turn of the last scheduled race, which closes the career.
    #[must_use]
    pub fn final_turn(&self) -> u32 {
        self.entries.last().map_or(0, |race| race.turn)
    }

    /// List every violated schedule invariant without failing.
    #[must_use]
    pub fn validate(&self) -> Vec<TimelineIssue> {
        let mut issues = Vec::new();
        if self.entries.is_empty() {
            issues.push(TimelineIssue::Empty);
        }
        let mut seen = HashSet::new();
        for (index, race) in self.entries.iter().enumerate() {
            if race.turn == 0 {
                issues.push(TimelineIssue::ZeroTurn { index });
            }
            if !seen.insert(race.turn) {
                issues.push(TimelineIssue::DuplicateTurn { turn: race.turn });
            }
            if let Some(previous) = index.checked_sub(1).map(|i| self.entries[i].turn)
                && race.turn <= previous
            {
                issues.push(TimelineIssue::NotIncreasing {
                    index,
                    turn: race.turn,
                    previous,
                });
            }
        }
        for kind in RaceKind::REQUIRED {
            if !self.entries.iter().any(|race| race.meta.kind == kind) {
                issues.push(TimelineIssue::MissingKind(kind));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_schedule_is_valid() {
        let timeline = Timeline::standard();
        assert!(timeline.validate().is_empty());
        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline.final_turn(), 12);
        let turns: Vec<u32> = timeline.entries().iter().map(|r| r.turn).collect();
        assert_eq!(turns, vec![4, 7, 10, 12]);
    }

    #[test]
    fn lookups_resolve_by_turn() {
        let timeline = Timeline::standard();
        assert_eq!(timeline.event_at(4).unwrap().name, "Maiden Sprint");
        assert!(timeline.event_at(5).is_none());
        assert_eq!(timeline.position_of(10), Some(2));
        assert_eq!(timeline.position_of(11), None);

        let after: Vec<&str> = timeline.events_after(7).map(|r| r.name.as_str()).collect();
        assert_eq!(after, vec!["Dirt Stakes", "Turf Cup Final"]);
        assert_eq!(timeline.events_after(12).count(), 0);
    }

    #[test]
    fn next_event_reports_distance() {
        let timeline = Timeline::standard();
        let upcoming = timeline.next_event(1).unwrap();
        assert_eq!(upcoming.race.turn, 4);
        assert_eq!(upcoming.turns_remaining, 3);
        assert!(!upcoming.is_immediately_next);

        let upcoming = timeline.next_event(11).unwrap();
        assert_eq!(upcoming.race.name, "Turf Cup Final");
        assert!(upcoming.is_immediately_next);

        // A race on the current turn is not "upcoming".
        assert_eq!(timeline.next_event(4).unwrap().race.turn, 7);
        assert!(timeline.next_event(12).is_none());
    }

    #[test]
    fn validate_names_each_broken_invariant() {
        let mut entries = Timeline::standard().entries().to_vec();
        entries[1].turn = 4;
        entries[2].meta.kind = RaceKind::Sprint;
        let broken = Timeline::from_entries(entries);
        let names: Vec<&str> = broken.validate().iter().map(TimelineIssue::invariant).collect();
        assert!(names.contains(&"unique_turns"));
        assert!(names.contains(&"strictly_increasing_turns"));
        assert!(names.contains(&"required_kind_present"));

        let mut entries = Timeline::standard().entries().to_vec();
        entries[0].turn = 0;
        let issues = Timeline::from_entries(entries).validate();
        assert!(issues.contains(&TimelineIssue::ZeroTurn { index: 0 }));
        assert!(issues.iter().any(|i| i.invariant() == "positive_turns"));

        let empty = Timeline::from_entries(Vec::new());
        let issues = empty.validate();
        assert_eq!(issues[0], TimelineIssue::Empty);
        assert_eq!(empty.final_turn(), 0);
        assert!(issues.iter().any(|i| i.to_string().contains("no final race")));
    }

    #[test]
    fn timeline_roundtrips_as_plain_list() {
        let json = serde_json::to_string(&Timeline::standard()).unwrap();
        assert!(json.starts_with('['));
        let parsed: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Timeline::standard());
    }
}

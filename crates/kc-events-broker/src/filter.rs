//! User event filtering.
//!
//! Admin events are never filtered.

use std::collections::HashSet;
use std::sync::Arc;

use kc_core::{EventType, UserEvent};

/// Event kinds that must not be forwarded.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    kinds: HashSet<EventType>,
}

impl ExclusionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses event kind names (`LOGIN`, `CODE_TO_TOKEN`, ...).
    ///
    /// ## Errors
    ///
    /// Returns an error naming the first unknown kind.
    pub fn parse<I, S>(names: I) -> kc_core::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| name.as_ref().trim().parse::<EventType>())
            .collect()
    }

    /// Returns whether the kind is excluded.
    #[must_use]
    pub fn contains(&self, kind: EventType) -> bool {
        self.kinds.contains(&kind)
    }

    /// Returns the number of excluded kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns whether nothing is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Iterates over the excluded kinds.
    pub fn iter(&self) -> impl Iterator<Item = EventType> + '_ {
        self.kinds.iter().copied()
    }
}

impl FromIterator<EventType> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = EventType>>(iter: I) -> Self {
        Self {
            kinds: iter.into_iter().collect(),
        }
    }
}

/// Returns whether a user event should be forwarded.
///
/// `false` iff the event's kind is in `exclusions`. No exclusion set
/// behaves like an empty one.
#[must_use]
pub fn accepts(event: &UserEvent, exclusions: Option<&ExclusionSet>) -> bool {
    exclusions.map_or(true, |set| !set.contains(event.event_type))
}

/// Gate in front of the relay for user events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    exclusions: Option<Arc<ExclusionSet>>,
}

impl EventFilter {
    /// Creates a filter over a shared exclusion set.
    #[must_use]
    pub const fn new(exclusions: Option<Arc<ExclusionSet>>) -> Self {
        Self { exclusions }
    }

    /// Creates a filter that forwards everything.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self { exclusions: None }
    }

    /// Returns whether the event should be forwarded.
    #[must_use]
    pub fn accepts(&self, event: &UserEvent) -> bool {
        accepts(event, self.exclusions.as_deref())
    }

    /// Returns the exclusion set, if any.
    #[must_use]
    pub fn exclusions(&self) -> Option<&ExclusionSet> {
        self.exclusions.as_deref()
    }
}

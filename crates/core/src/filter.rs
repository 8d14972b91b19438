// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event filters matched before a callback is invoked.
//!
//! A filter maps event types (or the wildcard `*`) to the set of
//! attribute names it accepts. The shape is a small closed grammar, so
//! it is modelled as a tagged variant rather than an untyped map.

use crate::event::Event;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Which attribute names an event-type rule accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeFilter {
    /// Any attribute (including none).
    All,
    /// Only events whose attribute name is in the set.
    Named(BTreeSet<String>),
}

impl AttributeFilter {
    /// Build from a manifest-style list: an empty list or a `*` entry
    /// means all attributes.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if set.is_empty() || set.contains("*") {
            AttributeFilter::All
        } else {
            AttributeFilter::Named(set)
        }
    }

    fn matches(&self, attribute_name: Option<&str>) -> bool {
        match self {
            AttributeFilter::All => true,
            AttributeFilter::Named(names) => match attribute_name {
                Some(attr) if !attr.is_empty() => names.contains(attr),
                _ => false,
            },
        }
    }
}

/// Filter deciding which events a callback receives.
///
/// An empty filter matches every event. A wildcard rule, when present,
/// takes precedence over per-type rules.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    wildcard: Option<AttributeFilter>,
    by_type: BTreeMap<String, AttributeFilter>,
}

impl EventFilter {
    /// A filter that matches every event.
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.wildcard.is_none() && self.by_type.is_empty()
    }

    /// Add a rule for every event type.
    pub fn with_wildcard(mut self, attributes: AttributeFilter) -> Self {
        self.wildcard = Some(attributes);
        self
    }

    /// Add a rule for one event type.
    pub fn with_event_type(mut self, event_type: impl Into<String>, attributes: AttributeFilter) -> Self {
        self.by_type.insert(event_type.into(), attributes);
        self
    }

    /// True when the filter accepts `event`.
    pub fn matches(&self, event: &Event) -> bool {
        if self.is_empty() {
            return true;
        }
        let rule = match &self.wildcard {
            Some(rule) => rule,
            None => match self.by_type.get(&event.event_type) {
                Some(rule) => rule,
                None => return false,
            },
        };
        rule.matches(event.attribute_name.as_deref())
    }
}

/// Manifest form: `{ event_type → [attribute, ...] }` with `*` accepted
/// as both an event-type key and an attribute entry.
impl From<BTreeMap<String, Vec<String>>> for EventFilter {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        let mut filter = EventFilter::default();
        for (event_type, names) in map {
            let attributes = AttributeFilter::from_names(names);
            if event_type == "*" {
                filter.wildcard = Some(attributes);
            } else {
                filter.by_type.insert(event_type, attributes);
            }
        }
        filter
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;

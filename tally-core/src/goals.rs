//! Revenue goals per period, persisted as display strings in a key-value store.
//!
//! Each period kind has three tiers. The store key is the period prefix
//! followed by the tier name, e.g. `monthlyMeta` or `yearlyUltraMeta`.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::currency::{format_keystrokes, parse_minor, Money};
use crate::progress::{progress, GoalProgress};
use crate::time::TimeWindow;

/// Value shown for a goal nobody has set.
pub const DEFAULT_GOAL_DISPLAY: &str = "R$ 0,00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Daily,
    Monthly,
    Yearly,
}

impl PeriodKind {
    pub fn key_prefix(&self) -> &'static str {
        match self {
            PeriodKind::Daily => "daily",
            PeriodKind::Monthly => "monthly",
            PeriodKind::Yearly => "yearly",
        }
    }

    /// The period of this kind that contains `date`.
    pub fn window_containing(&self, date: NaiveDate) -> TimeWindow {
        match self {
            PeriodKind::Daily => TimeWindow::single_day(date),
            PeriodKind::Monthly => TimeWindow::month_of(date),
            PeriodKind::Yearly => TimeWindow::year_of(date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GoalTier {
    Meta,
    SuperMeta,
    UltraMeta,
}

impl GoalTier {
    pub const ALL: [GoalTier; 3] = [GoalTier::Meta, GoalTier::SuperMeta, GoalTier::UltraMeta];

    pub fn key_suffix(&self) -> &'static str {
        match self {
            GoalTier::Meta => "Meta",
            GoalTier::SuperMeta => "SuperMeta",
            GoalTier::UltraMeta => "UltraMeta",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GoalTier::Meta => "Meta",
            GoalTier::SuperMeta => "Super Meta",
            GoalTier::UltraMeta => "Ultra Meta",
        }
    }

    fn index(&self) -> usize {
        match self {
            GoalTier::Meta => 0,
            GoalTier::SuperMeta => 1,
            GoalTier::UltraMeta => 2,
        }
    }
}

pub fn goal_key(period: PeriodKind, tier: GoalTier) -> String {
    format!("{}{}", period.key_prefix(), tier.key_suffix())
}

/// Durable string store for goal figures.
pub trait GoalStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGoalStore {
    values: HashMap<String, String>,
}

impl MemoryGoalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GoalStore for MemoryGoalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Progress towards one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierProgress {
    pub tier: GoalTier,
    pub label: &'static str,
    pub target: Money,
    pub display: String,
    pub progress: GoalProgress,
}

/// The three goal figures of one period kind.
///
/// Loaded once, edited in memory through the keystroke codec, written back
/// only by [`GoalBoard::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalBoard {
    period: PeriodKind,
    displays: [String; 3],
}

impl GoalBoard {
    pub fn load(store: &impl GoalStore, period: PeriodKind) -> Result<Self> {
        let mut displays: [String; 3] = Default::default();
        for tier in GoalTier::ALL {
            displays[tier.index()] = store
                .get(&goal_key(period, tier))?
                .unwrap_or_else(|| DEFAULT_GOAL_DISPLAY.to_string());
        }
        Ok(Self { period, displays })
    }

    pub fn period(&self) -> PeriodKind {
        self.period
    }

    pub fn display(&self, tier: GoalTier) -> &str {
        &self.displays[tier.index()]
    }

    pub fn target(&self, tier: GoalTier) -> Money {
        parse_minor(self.display(tier))
    }

    /// Replace a tier's draft with the rendering of `keystrokes`.
    pub fn edit(&mut self, tier: GoalTier, keystrokes: &str) -> &str {
        self.displays[tier.index()] = format_keystrokes(keystrokes);
        self.display(tier)
    }

    pub fn save(&self, store: &mut impl GoalStore, tier: GoalTier) -> Result<()> {
        let key = goal_key(self.period, tier);
        store.set(&key, self.display(tier))?;
        tracing::info!(%key, value = self.display(tier), "goal saved");
        Ok(())
    }

    /// Progress of `current` towards every tier over `period`.
    pub fn progress(
        &self,
        current: Money,
        period: &TimeWindow,
        now: NaiveDateTime,
    ) -> Vec<TierProgress> {
        GoalTier::ALL
            .into_iter()
            .map(|tier| {
                let target = self.target(tier);
                TierProgress {
                    tier,
                    label: tier.label(),
                    target,
                    display: self.display(tier).to_string(),
                    progress: progress(current, target, period, now),
                }
            })
            .collect()
    }
}

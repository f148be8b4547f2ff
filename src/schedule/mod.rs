use crate::config::{BroadcastConfig, ConfigError, SchedulerConfig};
use crate::prayer::Anchor;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

pub mod matcher;

pub use matcher::{due_events, truncate_to_minute};

/// Event key for the daily verse broadcast.
pub const KEY_DAILY_VERSE: &str = "daily_verse";

/// Event key for the weekly jumu'ah broadcast.
pub const KEY_WEEKLY_JUMUA: &str = "weekly_jumua";

/// When a definition's target instant occurs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRule {
    /// Derived from an astronomical anchor; offset 0 is the exact instant,
    /// a negative offset is a pre-reminder.
    Anchor {
        anchor: Anchor,
        offset_minutes: i64,
    },
    /// Fixed clock time every day.
    FixedDaily { hour: u32, minute: u32 },
    /// Fixed clock time on one weekday. The weekday check is a precondition,
    /// not a separate dedup field: fire records stay keyed by date.
    Weekly {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

/// A scheduled notification rule with its dedup key.
///
/// Keys are unique per entity: the same anchor yields distinct keys for
/// its exact-time and pre-reminder variants (`"fajr"`, `"fajr_pre"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub key: String,
    pub rule: EventRule,
}

impl EventDefinition {
    /// Exact-time definition for an anchor.
    pub fn exact(anchor: Anchor) -> Self {
        Self {
            key: anchor.key().to_string(),
            rule: EventRule::Anchor {
                anchor,
                offset_minutes: 0,
            },
        }
    }

    /// Pre-reminder definition firing `minutes` before the anchor.
    pub fn pre_reminder(anchor: Anchor, minutes: i64) -> Self {
        Self {
            key: format!("{}_pre", anchor.key()),
            rule: EventRule::Anchor {
                anchor,
                offset_minutes: -minutes,
            },
        }
    }

    /// Fixed-daily definition at a clock time.
    pub fn fixed_daily(key: &str, hour: u32, minute: u32) -> Self {
        Self {
            key: key.to_string(),
            rule: EventRule::FixedDaily { hour, minute },
        }
    }

    /// Weekly definition gated to one weekday.
    pub fn weekly(key: &str, weekday: Weekday, hour: u32, minute: u32) -> Self {
        Self {
            key: key.to_string(),
            rule: EventRule::Weekly {
                weekday,
                hour,
                minute,
            },
        }
    }
}

/// Build the full definition list shared by all entities: every anchor's
/// exact instant, the configured pre-reminders, and the fixed broadcasts.
///
/// Definition-list order is the fire order within a tick.
pub fn build_definitions(
    scheduler: &SchedulerConfig,
    broadcast: &BroadcastConfig,
) -> Result<Vec<EventDefinition>, ConfigError> {
    let weekday = broadcast.weekday()?;

    let mut defs = Vec::new();
    for anchor in Anchor::ALL {
        defs.push(EventDefinition::exact(anchor));
        if scheduler.pre_reminder_minutes > 0 {
            defs.push(EventDefinition::pre_reminder(
                anchor,
                scheduler.pre_reminder_minutes,
            ));
        }
    }
    defs.push(EventDefinition::fixed_daily(
        KEY_DAILY_VERSE,
        broadcast.daily_hour,
        broadcast.daily_minute,
    ));
    defs.push(EventDefinition::weekly(
        KEY_WEEKLY_JUMUA,
        weekday,
        broadcast.weekly_hour,
        broadcast.weekly_minute,
    ));

    Ok(defs)
}

use crate::config::MuezzinConfig;
use crate::content::{self, ContentKind, ContentProvider};
use crate::notify::Notifier;
use crate::prayer::{self, CalculationParams, PrayerTimes};
use crate::registry::{GroupRecord, GroupRegistry};
use crate::schedule::{matcher, EventDefinition, EventRule};
use crate::store::{FireRecords, ScheduleStore, StateDocument};
use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};


/// Polling notification scheduler.
///
/// Runs the full load -> compute -> match -> fire -> save cycle
/// synchronously inside each tick; ticks never overlap. Fire records are
/// marked before delivery is attempted (at-most-once), and the whole
/// state document is persisted once per tick.
pub struct Scheduler {
    registry: Arc<GroupRegistry>,
    store: ScheduleStore,
    notifier: Arc<dyn Notifier>,
    content: Arc<ContentProvider>,
    definitions: Vec<EventDefinition>,
    params: CalculationParams,
    utc_offset: FixedOffset,
    tick_interval: Duration,
    fire_records: Mutex<FireRecords>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<GroupRegistry>,
        store: ScheduleStore,
        notifier: Arc<dyn Notifier>,
        content: Arc<ContentProvider>,
        definitions: Vec<EventDefinition>,
        config: &MuezzinConfig,
    ) -> Self {
        // Offset range is enforced by config validation; fall back to UTC
        // rather than panic if an unvalidated config slips through
        let utc_offset = FixedOffset::east_opt(config.calculation.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));

        Self {
            registry,
            store,
            notifier,
            content,
            definitions,
            params: config.calculation.params(),
            utc_offset,
            tick_interval: Duration::from_secs(config.scheduler.tick_interval_seconds),
            fire_records: Mutex::new(FireRecords::new()),
        }
    }

    /// Seed fire records from a persisted document (restart recovery).
    pub fn with_fire_records(self, records: FireRecords) -> Self {
        *self.lock_records() = records;
        self
    }

    /// Run the tick loop until the shutdown signal flips.
    ///
    /// Ticks are strictly sequential; if one overruns the interval the
    /// missed firings are skipped, never run concurrently. Shutdown is
    /// only observed between ticks, so an in-flight tick always finishes
    /// and the final save is never torn.
    pub async fn run_tick_loop(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            interval_seconds = self.tick_interval.as_secs(),
            definitions = self.definitions.len(),
            groups = self.registry.len(),
            "Starting notification scheduler"
        );

        let mut timer = interval(self.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = shutdown.changed() => {
                    info!("Scheduler stopping");
                    break;
                }
            }
        }

        Ok(())
    }

    /// One full scheduling pass at the given instant.
    ///
    /// Public so tests can drive the scheduler at fixed instants.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let local = now.with_timezone(&self.utc_offset);
        let now_minute = matcher::truncate_to_minute(local.naive_local());
        let today = now_minute.date();

        // Sorted snapshot: entity processing order is fixed across ticks
        let groups = self.registry.snapshot();
        let mut fired = 0usize;

        for (entity_id, record) in &groups {
            if !record.enabled {
                continue;
            }
            match self.process_entity(entity_id, record, now_minute, today).await {
                Ok(count) => fired += count,
                Err(e) => {
                    error!(
                        entity_id = %entity_id,
                        error = %e,
                        "Entity processing failed, continuing tick"
                    );
                }
            }
        }

        if fired > 0 {
            info!(fired = fired, groups = groups.len(), "Tick dispatched notifications");
        } else {
            debug!(groups = groups.len(), "Tick complete, nothing due");
        }

        // Batched persistence: one save per tick regardless of fire count
        let document = StateDocument {
            entities: groups,
            fire_records: self.lock_records().clone(),
        };
        if let Err(e) = self.store.save(&document) {
            error!(error = %e, "Failed to persist schedule state");
        }
    }

    /// Match and fire one entity's due events. Returns the fire count.
    async fn process_entity(
        &self,
        entity_id: &str,
        record: &GroupRecord,
        now_minute: NaiveDateTime,
        today: NaiveDate,
    ) -> Result<usize> {
        let times = prayer::compute(
            record.coordinates,
            today,
            &self.params,
            self.utc_offset.local_minus_utc() / 60,
        );

        // Judge and mark under the lock, then deliver outside it.
        // Mark-before-confirm: a failed delivery stays marked, so a
        // transport outage drops that day's notification, never duplicates.
        let due: Vec<EventDefinition> = {
            let mut records = self.lock_records();
            let due: Vec<EventDefinition> =
                matcher::due_events(now_minute, &self.definitions, &times, records.get(entity_id))
                    .into_iter()
                    .cloned()
                    .collect();

            if !due.is_empty() {
                let entity_records = records.entry(entity_id.to_string()).or_default();
                for def in &due {
                    entity_records.insert(def.key.clone(), today);
                }
            }
            due
        };

        for def in &due {
            let text = self.render(def, &times).await;
            info!(
                entity_id = %entity_id,
                event_key = %def.key,
                "Event due, dispatching notification"
            );
            if let Err(e) = self.notifier.send(entity_id, &text).await {
                warn!(
                    entity_id = %entity_id,
                    event_key = %def.key,
                    error = %e,
                    "Delivery failed; event stays marked for today"
                );
            }
        }

        Ok(due.len())
    }

    /// Render the notification body for one definition.
    async fn render(&self, def: &EventDefinition, times: &PrayerTimes) -> String {
        match &def.rule {
            EventRule::Anchor {
                anchor,
                offset_minutes,
            } => {
                let at = times.get(*anchor);
                if *offset_minutes < 0 {
                    content::pre_reminder_message(*anchor, -offset_minutes, at)
                } else {
                    content::adhan_message(*anchor, at)
                }
            }
            EventRule::FixedDaily { .. } => self.content.fetch(ContentKind::Verse).await,
            EventRule::Weekly { .. } => {
                format!(
                    "{}\n\n{}",
                    content::jumua_greeting(),
                    self.content.fetch(ContentKind::Dua).await
                )
            }
        }
    }

    fn lock_records(&self) -> MutexGuard<'_, FireRecords> {
        // A poisoned lock only means a previous tick panicked mid-update;
        // the records themselves are still usable
        match self.fire_records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current fire records snapshot (for tests and diagnostics).
    pub fn fire_records(&self) -> FireRecords {
        self.lock_records().clone()
    }
}

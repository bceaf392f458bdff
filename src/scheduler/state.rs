//! Schedule configuration and persistence.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::answers::StoreError;

/// How often a schedule fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// Fire once at the next occurrence of the configured time.
    Once,
    /// Fire every day at the configured time.
    Daily,
    /// Fire every week at the configured time.
    Weekly,
    /// Fire on a fixed interval.
    Every { minutes: u32 },
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Every { minutes } => write!(f, "every {minutes}m"),
        }
    }
}

/// A user's submission schedule.
///
/// `next_due_unix` is the only clock state; it survives restarts as a unix
/// timestamp so wall-clock time-of-day math stays consistent across zones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Time of day the schedule fires (absent for interval schedules).
    pub time: Option<NaiveTime>,

    /// Recurrence of the schedule.
    pub recurrence: Recurrence,

    /// Unix timestamp of the next fire time (seconds).
    pub next_due_unix: i64,
}

impl ScheduleConfig {
    /// Creates a time-of-day schedule (`once`, `daily` or `weekly`).
    ///
    /// The first fire time is the next occurrence of `time` strictly after
    /// `now`.
    #[must_use]
    pub fn at(time: NaiveTime, recurrence: Recurrence, now: DateTime<Local>) -> Self {
        let next = next_occurrence(time, now).unwrap_or_else(|| now + TimeDelta::days(1));
        Self {
            time: Some(time),
            recurrence,
            next_due_unix: next.timestamp(),
        }
    }

    /// Creates an interval schedule firing every `minutes` minutes,
    /// starting one interval from `now`.
    #[must_use]
    pub fn every(minutes: u32, now: DateTime<Local>) -> Self {
        Self {
            time: None,
            recurrence: Recurrence::Every { minutes },
            next_due_unix: now.timestamp() + i64::from(minutes) * 60,
        }
    }

    /// Returns the next fire time in local time.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Local>> {
        DateTime::from_timestamp(self.next_due_unix, 0).map(|dt| dt.with_timezone(&Local))
    }

    /// Checks whether the schedule is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        now.timestamp() >= self.next_due_unix
    }

    /// Advances past the current fire time.
    ///
    /// Returns `false` when the schedule is exhausted and should be
    /// removed. The new fire time is always strictly after `now`, so one
    /// fire time is consumed exactly once however late the tick ran.
    pub fn advance(&mut self, now: DateTime<Local>) -> bool {
        match self.recurrence {
            Recurrence::Once => false,
            Recurrence::Daily => {
                let Some(time) = self.time else { return false };
                match next_occurrence(time, now) {
                    Some(next) => {
                        self.next_due_unix = next.timestamp();
                        true
                    }
                    None => false,
                }
            }
            Recurrence::Weekly => {
                let Some(time) = self.time else { return false };
                let anchor = self.next_due().map_or_else(|| now.date_naive(), |d| d.date_naive());
                match next_weekly_occurrence(anchor, time, now) {
                    Some(next) => {
                        self.next_due_unix = next.timestamp();
                        true
                    }
                    None => false,
                }
            }
            Recurrence::Every { minutes } => {
                self.next_due_unix = now.timestamp() + i64::from(minutes) * 60;
                true
            }
        }
    }

    /// Rolls a fire time missed while the process was down forward without
    /// firing. Returns `false` when the schedule is exhausted.
    pub fn roll_forward(&mut self, now: DateTime<Local>) -> bool {
        if !self.is_due(now) {
            return true;
        }
        self.advance(now)
    }
}

/// Next occurrence of a wall-clock time strictly after `after`.
///
/// Skips days where the local time does not exist (DST spring-forward).
fn next_occurrence(time: NaiveTime, after: DateTime<Local>) -> Option<DateTime<Local>> {
    let mut date = after.date_naive();
    for _ in 0..4 {
        if let Some(candidate) = date.and_time(time).and_local_timezone(Local).earliest()
            && candidate > after
        {
            return Some(candidate);
        }
        date = date.checked_add_days(Days::new(1))?;
    }
    None
}

/// Next occurrence on the weekday of `anchor`, strictly after `now`.
fn next_weekly_occurrence(
    anchor: NaiveDate,
    time: NaiveTime,
    now: DateTime<Local>,
) -> Option<DateTime<Local>> {
    let mut date = anchor;
    loop {
        date = date.checked_add_days(Days::new(7))?;
        if let Some(candidate) = date.and_time(time).and_local_timezone(Local).earliest()
            && candidate > now
        {
            return Some(candidate);
        }
    }
}

/// On-disk store of schedules, one per user.
#[derive(Debug)]
pub struct ScheduleStore {
    schedules: HashMap<i64, ScheduleConfig>,
    path: PathBuf,
}

impl ScheduleStore {
    /// Loads the store from a JSON file; a missing file yields an empty
    /// store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let schedules = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { schedules, path })
    }

    /// Saves the store to its JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.schedules)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Returns a user's schedule, if one is set.
    #[must_use]
    pub fn get(&self, user: i64) -> Option<&ScheduleConfig> {
        self.schedules.get(&user)
    }

    /// Sets or replaces a user's schedule.
    pub fn set(&mut self, user: i64, schedule: ScheduleConfig) {
        self.schedules.insert(user, schedule);
    }

    /// Removes a user's schedule. Returns whether one existed.
    pub fn remove(&mut self, user: i64) -> bool {
        self.schedules.remove(&user).is_some()
    }

    /// Collects the users due at `now`, advancing each schedule past the
    /// consumed fire time so an exact time match fires exactly once.
    ///
    /// Exhausted schedules (`once`) are removed.
    pub fn collect_due(&mut self, now: DateTime<Local>) -> Vec<i64> {
        let mut due = Vec::new();
        let mut exhausted = Vec::new();

        for (&user, schedule) in &mut self.schedules {
            if schedule.is_due(now) {
                due.push(user);
                if !schedule.advance(now) {
                    exhausted.push(user);
                }
            }
        }

        for user in exhausted {
            self.schedules.remove(&user);
        }

        due
    }

    /// Rolls forward fire times missed while the process was down, without
    /// firing. Returns the users whose schedules were dropped.
    pub fn roll_forward_all(&mut self, now: DateTime<Local>) -> Vec<i64> {
        let mut dropped = Vec::new();

        for (&user, schedule) in &mut self.schedules {
            if !schedule.roll_forward(now) {
                dropped.push(user);
            }
        }

        for &user in &dropped {
            self.schedules.remove(&user);
        }

        dropped
    }

    /// Returns the number of scheduled users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    /// Checks if no schedules are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_daily_first_fire_is_later_today() {
        let now = local(2024, 6, 10, 8, 0);
        let schedule = ScheduleConfig::at(hm(9, 30), Recurrence::Daily, now);

        let next = schedule.next_due().unwrap();
        assert_eq!(next.date_naive(), now.date_naive());
        assert_eq!((next.hour(), next.minute()), (9, 30));
    }

    #[test]
    fn test_daily_first_fire_rolls_to_tomorrow() {
        let now = local(2024, 6, 10, 10, 0);
        let schedule = ScheduleConfig::at(hm(9, 30), Recurrence::Daily, now);

        let next = schedule.next_due().unwrap();
        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
    }

    #[test]
    fn test_exact_time_match_is_due() {
        let now = local(2024, 6, 10, 8, 0);
        let mut schedule = ScheduleConfig::at(hm(9, 30), Recurrence::Daily, now);
        schedule.next_due_unix = local(2024, 6, 10, 9, 30).timestamp();

        assert!(schedule.is_due(local(2024, 6, 10, 9, 30)));
        assert!(!schedule.is_due(local(2024, 6, 10, 9, 29)));
    }

    #[test]
    fn test_daily_advance_moves_to_next_day() {
        let now = local(2024, 6, 10, 9, 30);
        let mut schedule = ScheduleConfig::at(hm(9, 30), Recurrence::Daily, local(2024, 6, 10, 8, 0));

        assert!(schedule.advance(now));
        let next = schedule.next_due().unwrap();
        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
        assert!(!schedule.is_due(now));
    }

    #[test]
    fn test_once_is_exhausted_after_advance() {
        let now = local(2024, 6, 10, 9, 30);
        let mut schedule = ScheduleConfig::at(hm(9, 30), Recurrence::Once, local(2024, 6, 10, 8, 0));

        assert!(!schedule.advance(now));
    }

    #[test]
    fn test_weekly_advance_keeps_weekday() {
        let now = local(2024, 6, 10, 9, 30); // a Monday
        let mut schedule =
            ScheduleConfig::at(hm(9, 30), Recurrence::Weekly, local(2024, 6, 10, 8, 0));

        let weekday = schedule.next_due().unwrap().weekday();
        assert!(schedule.advance(now));
        let next = schedule.next_due().unwrap();
        assert_eq!(next.weekday(), weekday);
        assert!(next > now);
    }

    #[test]
    fn test_weekly_advance_skips_missed_weeks() {
        let mut schedule =
            ScheduleConfig::at(hm(9, 30), Recurrence::Weekly, local(2024, 6, 10, 8, 0));

        // Three weeks pass without a tick.
        let late = local(2024, 7, 2, 12, 0);
        assert!(schedule.advance(late));
        assert!(schedule.next_due().unwrap() > late);
    }

    #[test]
    fn test_every_advances_by_interval() {
        let now = local(2024, 6, 10, 9, 0);
        let mut schedule = ScheduleConfig::every(45, now);

        assert_eq!(schedule.next_due_unix, now.timestamp() + 45 * 60);
        assert!(schedule.advance(local(2024, 6, 10, 9, 45)));
        assert_eq!(
            schedule.next_due_unix,
            local(2024, 6, 10, 9, 45).timestamp() + 45 * 60
        );
    }

    #[test]
    fn test_roll_forward_drops_expired_once() {
        let mut schedule =
            ScheduleConfig::at(hm(9, 30), Recurrence::Once, local(2024, 6, 10, 8, 0));

        assert!(!schedule.roll_forward(local(2024, 6, 11, 0, 0)));
    }

    #[test]
    fn test_roll_forward_keeps_future_schedule_untouched() {
        let now = local(2024, 6, 10, 8, 0);
        let mut schedule = ScheduleConfig::at(hm(9, 30), Recurrence::Daily, now);
        let due = schedule.next_due_unix;

        assert!(schedule.roll_forward(now));
        assert_eq!(schedule.next_due_unix, due);
    }

    #[test]
    fn test_collect_due_fires_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScheduleStore::load(dir.path().join("schedules.json")).unwrap();

        let created = local(2024, 6, 10, 8, 0);
        store.set(1, ScheduleConfig::at(hm(9, 30), Recurrence::Daily, created));
        store.set(2, ScheduleConfig::at(hm(18, 0), Recurrence::Daily, created));

        let fire_time = local(2024, 6, 10, 9, 30);
        assert_eq!(store.collect_due(fire_time), vec![1]);
        // Same instant again: the fire time was consumed.
        assert!(store.collect_due(fire_time).is_empty());
    }

    #[test]
    fn test_collect_due_removes_exhausted_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScheduleStore::load(dir.path().join("schedules.json")).unwrap();

        store.set(
            1,
            ScheduleConfig::at(hm(9, 30), Recurrence::Once, local(2024, 6, 10, 8, 0)),
        );

        assert_eq!(store.collect_due(local(2024, 6, 10, 9, 30)), vec![1]);
        assert!(store.get(1).is_none());
    }

    #[test]
    fn test_one_schedule_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScheduleStore::load(dir.path().join("schedules.json")).unwrap();

        let now = local(2024, 6, 10, 8, 0);
        store.set(1, ScheduleConfig::at(hm(9, 30), Recurrence::Daily, now));
        store.set(1, ScheduleConfig::every(45, now));

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(1).map(|s| s.recurrence),
            Some(Recurrence::Every { minutes: 45 })
        );
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.json");

        let mut store = ScheduleStore::load(&path).unwrap();
        let now = local(2024, 6, 10, 8, 0);
        store.set(1, ScheduleConfig::at(hm(9, 30), Recurrence::Weekly, now));
        store.set(2, ScheduleConfig::every(120, now));
        store.save().unwrap();

        let reloaded = ScheduleStore::load(&path).unwrap();
        assert_eq!(reloaded.get(1), store.get(1));
        assert_eq!(reloaded.get(2), store.get(2));
    }
}

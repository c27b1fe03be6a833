use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{info, instrument};

use crate::{
    common::{iso_timestamp, with_deadline, Timestamp},
    config::AppConfig,
    errors::ServiceError,
    models::AppointmentStatus,
    store::{decode_rows, Filter, ListQuery, RecordStore, Table},
};

const DEFAULT_ACTIVE_WINDOW_DAYS: i64 = 90;
const DEFAULT_DEADLINE_SECS: u64 = 15;
const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
/// Widest UTC offset a stored timestamp can carry, either side.
const MAX_UTC_OFFSET_HOURS: i64 = 14;

/// Customer totals split by recent activity.
///
/// Customers that never recorded activity count toward `total` only, so
/// `active + inactive <= total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBucket {
    pub label: String,
    pub count: u64,
}

/// New customers per weekday of one Monday-start week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyDistribution {
    pub week_start: NaiveDate,
    /// Monday first, Sunday last
    pub buckets: Vec<DayBucket>,
}

impl WeeklyDistribution {
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn count_for(&self, label: &str) -> Option<u64> {
        self.buckets.iter().find(|b| b.label == label).map(|b| b.count)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    /// Morning is [05:00, 12:00), afternoon [12:00, 17:00), evening the rest.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=16 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDayDistribution {
    pub morning: u64,
    pub afternoon: u64,
    pub evening: u64,
}

impl TimeOfDayDistribution {
    pub fn total(&self) -> u64 {
        self.morning + self.afternoon + self.evening
    }

    pub fn get(&self, part: DayPart) -> u64 {
        match part {
            DayPart::Morning => self.morning,
            DayPart::Afternoon => self.afternoon,
            DayPart::Evening => self.evening,
        }
    }

    fn record(&mut self, part: DayPart) {
        match part {
            DayPart::Morning => self.morning += 1,
            DayPart::Afternoon => self.afternoon += 1,
            DayPart::Evening => self.evening += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentStatusCounts {
    pub total: u64,
    pub confirmed: u64,
    pub pending: u64,
    pub cancelled: u64,
    pub done: u64,
    /// Rows flagged `is_cancelled`, whatever their status column says
    pub flagged_cancelled: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub summary: SummaryCounts,
    pub weekly: WeeklyDistribution,
    pub time_of_day: TimeOfDayDistribution,
    pub generated_at: DateTime<Utc>,
}

/// Only the column the distributions read.
#[derive(Debug, Clone, Deserialize)]
struct CreatedAtRow {
    created_at: Timestamp,
}

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// Buckets creation times by weekday, Monday first.
pub fn weekday_buckets<'a>(created: impl IntoIterator<Item = &'a Timestamp>) -> [u64; 7] {
    let mut counts = [0u64; 7];
    for ts in created {
        counts[ts.local().weekday().num_days_from_monday() as usize] += 1;
    }
    counts
}

/// Buckets creation times into morning, afternoon and evening by the stored
/// wall-clock hour.
pub fn time_of_day_distribution<'a>(
    created: impl IntoIterator<Item = &'a Timestamp>,
) -> TimeOfDayDistribution {
    created
        .into_iter()
        .fold(TimeOfDayDistribution::default(), |mut dist, ts| {
            dist.record(DayPart::from_hour(ts.local().hour()));
            dist
        })
}

/// Analytics service for the salon dashboard
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn RecordStore>,
    active_window: Duration,
    deadline: std::time::Duration,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            active_window: Duration::days(DEFAULT_ACTIVE_WINDOW_DAYS),
            deadline: std::time::Duration::from_secs(DEFAULT_DEADLINE_SECS),
        }
    }

    pub fn from_config(store: Arc<dyn RecordStore>, config: &AppConfig) -> Self {
        Self {
            store,
            active_window: config.active_window(),
            deadline: config.query_timeout(),
        }
    }

    pub fn with_active_window(mut self, window: Duration) -> Self {
        self.active_window = window;
        self
    }

    pub fn with_deadline(mut self, deadline: std::time::Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Total, active and inactive customer counts as of `as_of`.
    #[instrument(skip(self))]
    pub async fn summary_counts(&self, as_of: DateTime<Utc>) -> Result<SummaryCounts, ServiceError> {
        with_deadline(self.deadline, self.fetch_summary_counts(as_of)).await
    }

    async fn fetch_summary_counts(&self, as_of: DateTime<Utc>) -> Result<SummaryCounts, ServiceError> {
        let cutoff = iso_timestamp(as_of - self.active_window);
        let everyone = Filter::new();
        let active = Filter::new().gte("last_activity_at", cutoff.as_str());
        let inactive = Filter::new().lt("last_activity_at", cutoff.as_str());

        let (total, active, inactive) = tokio::try_join!(
            self.store.count(Table::Customers, &everyone),
            self.store.count(Table::Customers, &active),
            self.store.count(Table::Customers, &inactive),
        )?;

        Ok(SummaryCounts {
            total,
            active,
            inactive,
        })
    }

    /// Customers created in the Monday-start week containing `as_of`, per weekday.
    #[instrument(skip(self))]
    pub async fn weekly_distribution(&self, as_of: NaiveDate) -> Result<WeeklyDistribution, ServiceError> {
        with_deadline(self.deadline, self.fetch_weekly_distribution(as_of)).await
    }

    async fn fetch_weekly_distribution(&self, as_of: NaiveDate) -> Result<WeeklyDistribution, ServiceError> {
        let start = week_start(as_of);
        let end = start + Duration::days(7);
        // Rows are bucketed by their stored wall-clock date, so the store
        // query is padded by the widest offset and trimmed locally.
        let slack = Duration::hours(MAX_UTC_OFFSET_HOURS);
        let filter = Filter::new()
            .gte("created_at", iso_timestamp(start.and_time(Default::default()).and_utc() - slack))
            .lt("created_at", iso_timestamp(end.and_time(Default::default()).and_utc() + slack));

        let rows = self.store.list(Table::Customers, &ListQuery::new(filter)).await?;
        let rows: Vec<CreatedAtRow> = decode_rows(Table::Customers, rows)?;
        let in_week = rows
            .iter()
            .map(|r| &r.created_at)
            .filter(|ts| (start..end).contains(&ts.local().date()));
        let counts = weekday_buckets(in_week);

        Ok(WeeklyDistribution {
            week_start: start,
            buckets: WEEKDAY_LABELS
                .iter()
                .zip(counts)
                .map(|(label, count)| DayBucket {
                    label: label.to_string(),
                    count,
                })
                .collect(),
        })
    }

    /// Morning, afternoon and evening split of every customer's creation time.
    #[instrument(skip(self))]
    pub async fn time_of_day_distribution(&self) -> Result<TimeOfDayDistribution, ServiceError> {
        with_deadline(self.deadline, self.fetch_time_of_day_distribution()).await
    }

    async fn fetch_time_of_day_distribution(&self) -> Result<TimeOfDayDistribution, ServiceError> {
        let rows = self.store.list(Table::Customers, &ListQuery::all()).await?;
        let rows: Vec<CreatedAtRow> = decode_rows(Table::Customers, rows)?;
        Ok(time_of_day_distribution(rows.iter().map(|r| &r.created_at)))
    }

    /// Appointment counts per status, plus done and cancelled flags.
    #[instrument(skip(self))]
    pub async fn appointment_status_counts(&self) -> Result<AppointmentStatusCounts, ServiceError> {
        with_deadline(self.deadline, self.fetch_appointment_status_counts()).await
    }

    async fn fetch_appointment_status_counts(&self) -> Result<AppointmentStatusCounts, ServiceError> {
        let by_status = futures::future::try_join_all(AppointmentStatus::iter().map(|status| {
            let filter = Filter::new().eq("status", status.as_ref());
            async move { self.store.count(Table::Appointments, &filter).await }
        }));
        let all = Filter::new();
        let done = Filter::new().eq("is_done", true);
        let cancelled = Filter::new().eq("is_cancelled", true);

        let (by_status, total, done, flagged_cancelled) = tokio::try_join!(
            by_status,
            self.store.count(Table::Appointments, &all),
            self.store.count(Table::Appointments, &done),
            self.store.count(Table::Appointments, &cancelled),
        )?;

        let mut counts = AppointmentStatusCounts {
            total,
            done,
            flagged_cancelled,
            ..Default::default()
        };
        for (status, count) in AppointmentStatus::iter().zip(by_status) {
            match status {
                AppointmentStatus::Confirmed => counts.confirmed = count,
                AppointmentStatus::Pending => counts.pending = count,
                AppointmentStatus::Cancelled => counts.cancelled = count,
            }
        }
        Ok(counts)
    }

    /// Summary counts and both distributions, fetched concurrently.
    #[instrument(skip(self))]
    pub async fn dashboard(&self, as_of: DateTime<Utc>) -> Result<DashboardSnapshot, ServiceError> {
        info!("Generating dashboard snapshot");

        let (summary, weekly, time_of_day) = with_deadline(self.deadline, async {
            tokio::try_join!(
                self.fetch_summary_counts(as_of),
                self.fetch_weekly_distribution(as_of.date_naive()),
                self.fetch_time_of_day_distribution(),
            )
        })
        .await?;

        Ok(DashboardSnapshot {
            summary,
            weekly,
            time_of_day,
            generated_at: Utc::now(),
        })
    }
}

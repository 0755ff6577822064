use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static! {
    /// Moderation decisions by content kind (text, image) and outcome
    /// (approved, rejected, fail_open).
    pub static ref MODERATION_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_decisions_total",
        "Moderation decisions segmented by content kind and outcome",
        &["kind", "outcome"]
    )
    .expect("failed to register moderation_decisions_total");

    /// Latency of the classifier call, including image download.
    pub static ref MODERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "moderation_duration_seconds",
        "Moderation call duration segmented by content kind",
        &["kind"]
    )
    .expect("failed to register moderation_duration_seconds");

    /// Accepted post reports.
    pub static ref POST_REPORTS_TOTAL: IntCounter = register_int_counter!(
        "post_reports_total",
        "Total accepted post reports"
    )
    .expect("failed to register post_reports_total");

    /// Posts removed after crossing the report threshold.
    pub static ref POST_AUTO_REMOVALS_TOTAL: IntCounter = register_int_counter!(
        "post_auto_removals_total",
        "Total posts removed automatically after reports"
    )
    .expect("failed to register post_auto_removals_total");

    /// Webhook deliveries segmented by kind and result (sent, failed, skipped).
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discord_notifications_total",
        "Discord webhook deliveries segmented by kind and result",
        &["kind", "result"]
    )
    .expect("failed to register discord_notifications_total");
}

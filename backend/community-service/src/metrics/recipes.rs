use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Recipe cache events (hit/miss/error).
    pub static ref RECIPE_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "recipe_cache_events_total",
        "Recipe cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register recipe_cache_events_total");

    /// Where a recipe answer came from (provider name or fallback).
    pub static ref RECIPE_RESPONSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "recipe_responses_total",
        "Recipe responses segmented by source",
        &["source"]
    )
    .expect("failed to register recipe_responses_total");
}

use std::sync::Arc;

use chrono_tz::Tz;
use eu_core::{Summarizer, DEFAULT_TIMEZONE};
use eu_fetch::FetchManager;
use eu_inference::Annotator;

/// Rows requested when a call does not say how many
pub const DEFAULT_LIMIT: usize = 10;

pub struct AppState {
    pub manager: Arc<FetchManager>,
    pub annotator: Arc<Annotator>,
    pub summarizer: Option<Arc<dyn Summarizer>>,
    pub timezone: Tz,
}

impl AppState {
    pub fn new(manager: Arc<FetchManager>, annotator: Arc<Annotator>) -> Self {
        Self {
            manager,
            annotator,
            summarizer: None,
            timezone: DEFAULT_TIMEZONE,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

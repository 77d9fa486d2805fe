// Shared test fixture for brew payloads.

use chrono::{DateTime, Utc};

use crate::core::brew::BrewPayload;

pub struct BrewPayloadBuilder {
    inner: BrewPayload,
}

impl Default for BrewPayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl BrewPayloadBuilder {
    pub fn new() -> Self {
        Self {
            inner: BrewPayload {
                name: "morning espresso".to_string(),
                machine_id: 1,
                bag_id: 2,
                grinder_id: 3,
                barista_id: 4,
                brew_time: Some(27.5),
                timestamp: None,
                dose: Some(18.0),
                yield_grams: None,
                rating: Some(4),
                tasting_notes: Some("cherry, cacao".to_string()),
                reflections: None,
            },
        }
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = v.into();
        self
    }

    pub fn bag_id(mut self, v: i64) -> Self {
        self.inner.bag_id = v;
        self
    }

    pub fn dose(mut self, v: f64) -> Self {
        self.inner.dose = Some(v);
        self
    }

    pub fn yield_grams(mut self, v: f64) -> Self {
        self.inner.yield_grams = Some(v);
        self
    }

    pub fn rating(mut self, v: i32) -> Self {
        self.inner.rating = Some(v);
        self
    }

    pub fn timestamp(mut self, v: DateTime<Utc>) -> Self {
        self.inner.timestamp = Some(v);
        self
    }

    pub fn build(self) -> BrewPayload {
        self.inner
    }
}

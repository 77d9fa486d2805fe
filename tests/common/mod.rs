// Shared helpers for the integration suites.

use brew_drafts::core::brew::BrewPayload;

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
                yield_grams: Some(36.0),
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

    pub fn build(self) -> BrewPayload {
        self.inner
    }
}

//! Deterministic demo interactions
//!
//! The same seed always yields the same records, so demo deployments and
//! tests are reproducible.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    db::EventStore,
    error::AppResult,
    models::{EventType, InteractionRecord},
};

pub const DEMO_USERS: [&str; 5] = ["alice", "bob", "charlie", "diana", "eve"];

pub const DEMO_ITEMS: [&str; 5] = [
    "tech_ai_news",
    "science_space",
    "business_trends",
    "health_wellness",
    "entertainment_pop",
];

/// Seedable generator of view/click interactions over the demo catalogue
pub struct DemoDataGenerator {
    rng: StdRng,
    epoch: DateTime<Utc>,
}

impl DemoDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            // 2024-01-01T00:00:00Z, fixed so timestamps are reproducible too
            epoch: DateTime::UNIX_EPOCH + Duration::seconds(1_704_067_200),
        }
    }

    /// Between 3 and 7 interactions per demo user, in chronological order
    pub fn generate(&mut self) -> Vec<InteractionRecord> {
        let mut records = Vec::new();
        let mut offset = 0i64;

        for user in DEMO_USERS {
            let interactions = self.rng.gen_range(3..8);
            for _ in 0..interactions {
                let item = DEMO_ITEMS[self.rng.gen_range(0..DEMO_ITEMS.len())];
                let event_type = if self.rng.gen_bool(0.8) {
                    EventType::View
                } else {
                    EventType::Click
                };
                let duration = match event_type {
                    EventType::View => Some(self.rng.gen_range(10..300)),
                    _ => None,
                };

                offset += self.rng.gen_range(1..60);
                records.push(InteractionRecord {
                    user_id: user.to_string(),
                    item_id: item.to_string(),
                    event_type,
                    duration_seconds: duration,
                    created_at: self.epoch + Duration::seconds(offset),
                });
            }
        }

        records
    }
}

/// Appends the generated interactions for `seed` and returns how many were written
pub async fn seed_store(store: &dyn EventStore, seed: u64) -> AppResult<usize> {
    let records = DemoDataGenerator::new(seed).generate();
    for record in &records {
        store.append(record).await?;
    }

    tracing::info!(seed, records = records.len(), "Seeded demo interactions");
    Ok(records.len())
}

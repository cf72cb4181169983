//! Synthetic in-process feed
//!
//! Produces a random-walk order book for any well-formed pair. Useful for
//! running the relay without exchange connectivity and in integration tests.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relay_core::{BookDelta, ExchangeId, PairId, Side};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::time::Duration;

use crate::domain::{DeltaSink, FeedConnector, FeedError, FeedHandle};

use super::ws_session::{self, TaskFeedHandle};

/// Price step between generated levels, as a fraction of mid
const LEVEL_STEP: f64 = 0.0005;

#[derive(Debug, Clone)]
pub struct SimulatorConnector {
    exchange: ExchangeId,
    tick_interval: Duration,
    seed_price: f64,
    depth: u32,
    seed: Option<u64>,
}

impl SimulatorConnector {
    pub fn new(exchange: impl Into<ExchangeId>, tick_interval: Duration, seed_price: f64, depth: u32) -> Self {
        SimulatorConnector {
            exchange: exchange.into(),
            tick_interval,
            seed_price,
            depth: depth.max(1),
            seed: None,
        }
    }

    /// Fix the RNG seed for reproducible output
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[async_trait]
impl FeedConnector for SimulatorConnector {
    async fn open(&self, pair: &PairId, sink: DeltaSink) -> Result<Box<dyn FeedHandle>, FeedError> {
        if pair.assets().is_none() {
            return Err(FeedError::unknown_pair(&self.exchange, pair));
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let walk = RandomWalk {
            exchange: self.exchange.clone(),
            pair: pair.clone(),
            mid: self.seed_price,
            depth: self.depth,
            rng,
        };

        tracing::info!("Simulating {} on {} every {:?}", pair, self.exchange, self.tick_interval);
        let task = tokio::spawn(walk.run(self.tick_interval, sink));
        Ok(Box::new(TaskFeedHandle::new(task)))
    }
}

struct RandomWalk {
    exchange: ExchangeId,
    pair: PairId,
    mid: f64,
    depth: u32,
    rng: StdRng,
}

impl RandomWalk {
    async fn run(mut self, tick_interval: Duration, sink: DeltaSink) {
        let mut ticker = tokio::time::interval(tick_interval);
        loop {
            ticker.tick().await;
            if sink.is_closed() || !sink.deliver(self.step()) {
                tracing::debug!("Relay gone, stopping simulated {} feed", self.pair);
                return;
            }
        }
    }

    /// Move the mid and emit changes for a few levels on each side
    fn step(&mut self) -> BookDelta {
        self.mid = (self.mid * (1.0 + self.rng.gen_range(-0.001..0.001))).max(0.01);

        let mut delta = BookDelta::new(self.exchange.clone(), self.pair.clone(), ws_session::now_seconds());
        for side in [Side::Bid, Side::Ask] {
            let changes = self.rng.gen_range(1..=self.depth.min(3));
            for _ in 0..changes {
                let level = self.rng.gen_range(1..=self.depth) as f64;
                let offset = self.mid * LEVEL_STEP * level;
                let price = match side {
                    Side::Bid => self.mid - offset,
                    Side::Ask => self.mid + offset,
                };
                // Roughly one change in five removes the level
                let size = if self.rng.gen_range(0..5) == 0 {
                    0.0
                } else {
                    self.rng.gen_range(0.01..5.0)
                };

                if let (Some(price), Some(size)) = (Decimal::from_f64(price), Decimal::from_f64(size)) {
                    delta.push(side, price.round_dp(2), size.round_dp(4));
                }
            }
        }
        delta
    }
}

//! Stochastic component-failure models.
//!
//! A risk model is a seeded stochastic process that decides, from a module's
//! cumulative operating time, whether the module malfunctions this step. The
//! trait is deliberately narrow — it sees only the operating time, never the
//! module or robot graph — which keeps the failure model decoupled from the
//! entities it judges.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{SimError, SimResult};

/// Operating-time-dependent failure evaluation.
///
/// Implementations draw exactly one uniform(0,1) value per `malfunction`
/// call; the step protocol relies on that fixed draw count for
/// reproducibility.
pub trait RiskModel {
    fn name(&self) -> &str;

    /// Seed the private RNG. Must be called exactly once per run, before
    /// the first `malfunction` call.
    fn initialize(&mut self) -> SimResult<()>;

    /// Decide malfunction for a module with the given cumulative operating
    /// time. Fails if `initialize` has not run.
    fn malfunction(&mut self, operating_time: f64) -> SimResult<bool>;
}

/// Failure probability grows with operating time as
/// `p(t) = 1 − exp(−failure_rate · t)`.
///
/// At `t = 0` the probability is exactly zero; it increases strictly and
/// monotonically in `t` for any positive failure rate.
#[derive(Debug)]
pub struct ExponentialFailure {
    name: String,
    failure_rate: f64,
    seed: u64,
    rng: Option<StdRng>,
}

impl ExponentialFailure {
    pub fn new(name: impl Into<String>, failure_rate: f64, seed: u64) -> Self {
        Self {
            name: name.into(),
            failure_rate,
            seed,
            rng: None,
        }
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Malfunction probability at the given operating time.
    pub fn failure_probability(&self, operating_time: f64) -> f64 {
        1.0 - (-self.failure_rate * operating_time).exp()
    }
}

impl RiskModel for ExponentialFailure {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) -> SimResult<()> {
        if self.rng.is_some() {
            return Err(SimError::illegal_state(format!(
                "RNG of scenario '{}' is already initialized; initialize() must be called once",
                self.name
            )));
        }
        self.rng = Some(StdRng::seed_from_u64(self.seed));
        Ok(())
    }

    fn malfunction(&mut self, operating_time: f64) -> SimResult<bool> {
        let p = self.failure_probability(operating_time);
        let rng = self.rng.as_mut().ok_or_else(|| {
            SimError::uninitialized(format!(
                "scenario '{}' evaluated before initialize()",
                self.name
            ))
        })?;
        Ok(rng.gen::<f64>() < p)
    }
}

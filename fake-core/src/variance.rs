//! Memory variance models.
//!
//! A variance model maps the current [`PhaseState`] to a signed byte delta that
//! is added to the baseline allocation for one tick. Models are stateless: the
//! delta depends only on the phase (and, for [`VarianceModel::Random`], one
//! fresh draw), never on earlier deltas.

use rand::Rng;

use crate::phase::PhaseState;

/// Shape of the memory variance over one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarianceModel {
    /// No variance; the baseline is allocated on every tick.
    Zero,
    /// Sawtooth ramp from `-max` on the first tick to `+max` on the last.
    Linear,
    /// Independent uniform draw in `[-max, +max)` on every tick.
    Random,
    /// One sine wave per period, starting at zero.
    Sine,
}

impl VarianceModel {
    /// Every model that can be selected by name.
    pub const NAMED: [VarianceModel; 3] = [Self::Linear, Self::Random, Self::Sine];

    /// Resolve a model from its configured name.
    ///
    /// Unknown names (including the empty string) and a variance of zero
    /// percent both resolve to [`VarianceModel::Zero`].
    pub fn from_name(name: &str, variance_percent: u32) -> Self {
        if variance_percent == 0 {
            return Self::Zero;
        }
        Self::NAMED
            .into_iter()
            .find(|model| model.name() == name)
            .unwrap_or(Self::Zero)
    }

    /// Configuration name of the model.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zero => "none",
            Self::Linear => "linear",
            Self::Random => "random",
            Self::Sine => "sine",
        }
    }

    /// Signed byte delta for the given phase.
    pub fn delta<R: Rng>(&self, phase: &PhaseState, rng: &mut R) -> i64 {
        let max = phase.max_variance_bytes();
        let scale = match self {
            Self::Zero => return 0,
            Self::Linear => 2.0 * phase.linear_x() - 1.0,
            Self::Random => rng.gen_range(-1.0..1.0),
            Self::Sine => phase.radians().sin(),
        };
        // Truncation toward zero keeps the random model strictly below +max
        (scale * max) as i64
    }
}

impl std::fmt::Display for VarianceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

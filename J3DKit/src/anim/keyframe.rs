//! Keyframes, channels and tangent synthesis
//!
//! Every keyed animation format stores its curves the same way: a channel is
//! a `(count, offset, tangent type)` triple pointing into a flat value pool.
//! A single-key channel occupies one pool slot holding just the value; longer
//! channels store `time, value, tangent_in` and, for [`TangentType::InOut`],
//! `tangent_out` per key.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Value substituted for pool slots that lie past the end of the pool.
pub const MISSING_VALUE: f32 = 1.0;

/// Per-key pool layout of a keyed channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TangentType {
    /// `time, value, tangent` with the outgoing tangent equal to the incoming one.
    #[default]
    In = 0,
    /// `time, value, tangent_in, tangent_out`.
    InOut = 1,
}

impl TangentType {
    /// Number of pool slots one key occupies.
    #[must_use]
    pub fn slots(self) -> usize {
        match self {
            TangentType::In => 3,
            TangentType::InOut => 4,
        }
    }
}

impl TryFrom<u16> for TangentType {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(TangentType::In),
            1 => Ok(TangentType::InOut),
            _ => Err(Error::UnsupportedTangentType { value }),
        }
    }
}

/// How tangents are synthesized and how a channel is resampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    /// Tangents follow the slope between neighbouring keys.
    #[default]
    Linear,
    /// All tangents are flat.
    Smooth,
}

/// One key of an animation curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    pub tangent_in: f32,
    pub tangent_out: f32,
}

impl Keyframe {
    /// A key with flat tangents.
    #[must_use]
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            tangent_in: 0.0,
            tangent_out: 0.0,
        }
    }

    #[must_use]
    pub fn with_tangents(time: f32, value: f32, tangent_in: f32, tangent_out: f32) -> Self {
        Self {
            time,
            value,
            tangent_in,
            tangent_out,
        }
    }

    /// Decode key `index` of a channel with `count` keys starting at `offset`.
    ///
    /// Slots past the end of the pool are replaced rather than rejected: a
    /// missing value becomes [`MISSING_VALUE`], a missing time or tangent
    /// becomes zero. Each substitution of a time or value is logged.
    #[must_use]
    pub fn from_pool(
        pool: &[f32],
        offset: usize,
        index: usize,
        count: usize,
        tangent_type: TangentType,
    ) -> Self {
        if count == 1 {
            return Self::new(0.0, pool_value(pool, offset + index));
        }

        let base = offset + index * tangent_type.slots();
        let time = pool_slot(pool, base).unwrap_or(0.0);
        let value = pool_value(pool, base + 1);
        let tangent_in = pool.get(base + 2).copied().unwrap_or(0.0);
        let tangent_out = match tangent_type {
            TangentType::In => tangent_in,
            TangentType::InOut => pool.get(base + 3).copied().unwrap_or(0.0),
        };
        Self::with_tangents(time, value, tangent_in, tangent_out)
    }

    /// Multiply value and tangents by `factor`, leaving time untouched.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            time: self.time,
            value: self.value * factor,
            tangent_in: self.tangent_in * factor,
            tangent_out: self.tangent_out * factor,
        }
    }
}

fn pool_slot(pool: &[f32], slot: usize) -> Option<f32> {
    let value = pool.get(slot).copied();
    if value.is_none() {
        let err = Error::OutOfRangePoolAccess {
            offset: slot,
            len: pool.len(),
        };
        warn!("{err}, substituting default");
    }
    value
}

/// Read one pool slot, substituting [`MISSING_VALUE`] when out of range.
pub(crate) fn pool_value(pool: &[f32], slot: usize) -> f32 {
    pool_slot(pool, slot).unwrap_or(MISSING_VALUE)
}

/// An animated property: an ordered list of keys plus its interpolation tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub keys: Vec<Keyframe>,
    pub interpolation: Interpolation,
}

impl Channel {
    #[must_use]
    pub fn new(keys: Vec<Keyframe>, interpolation: Interpolation) -> Self {
        Self { keys, interpolation }
    }

    /// A channel holding a single value for the whole animation.
    #[must_use]
    pub fn constant(value: f32) -> Self {
        Self::new(vec![Keyframe::new(0.0, value)], Interpolation::Linear)
    }

    /// Wrap decoded keys, tagging them [`Interpolation::Smooth`] when every
    /// tangent of a multi-key channel is flat.
    #[must_use]
    pub fn from_decoded(keys: Vec<Keyframe>) -> Self {
        let flat = keys.len() > 1
            && keys
                .iter()
                .all(|k| k.tangent_in == 0.0 && k.tangent_out == 0.0);
        let interpolation = if flat {
            Interpolation::Smooth
        } else {
            Interpolation::Linear
        };
        Self::new(keys, interpolation)
    }

    /// Build a channel from `(time, value)` pairs and synthesize its tangents.
    #[must_use]
    pub fn from_points(points: &[(f32, f32)], interpolation: Interpolation) -> Self {
        let mut channel = Self::new(
            points.iter().map(|&(t, v)| Keyframe::new(t, v)).collect(),
            interpolation,
        );
        channel.synthesize_tangents();
        channel
    }

    /// Recompute tangents from the keys according to the interpolation tag.
    pub fn synthesize_tangents(&mut self) {
        make_tangents(&mut self.keys, self.interpolation);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn slope(from: &Keyframe, to: &Keyframe) -> f32 {
    let dt = to.time - from.time;
    if dt == 0.0 {
        0.0
    } else {
        (to.value - from.value) / dt
    }
}

/// Synthesize tangents for a key sequence.
///
/// [`Interpolation::Smooth`] flattens every tangent. [`Interpolation::Linear`]
/// gives each segment its slope as the outgoing tangent of its start key and
/// the incoming tangent of its end key, then wraps around: the last key leaves
/// with the first segment's slope and the first key enters with that same
/// slope. Sequences of fewer than two keys are left untouched.
pub fn make_tangents(keys: &mut [Keyframe], interpolation: Interpolation) {
    if keys.len() < 2 {
        return;
    }

    match interpolation {
        Interpolation::Smooth => {
            for key in keys.iter_mut() {
                key.tangent_in = 0.0;
                key.tangent_out = 0.0;
            }
        }
        Interpolation::Linear => {
            for i in 0..keys.len() - 1 {
                let s = slope(&keys[i], &keys[i + 1]);
                keys[i].tangent_out = s;
                keys[i + 1].tangent_in = s;
            }
            let last = keys.len() - 1;
            keys[last].tangent_out = keys[0].tangent_out;
            keys[0].tangent_in = keys[last].tangent_out;
        }
    }
}

/// Degrees per stored rotation unit for an angle scale exponent.
#[must_use]
pub fn rotation_scale(angle_scale: i8) -> f32 {
    2f32.powi(i32::from(angle_scale)) * 180.0 / 32768.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_linear_tangents_wrap() {
        let channel = Channel::from_points(&[(0.0, 0.0), (5.0, 10.0), (10.0, 0.0)], Interpolation::Linear);
        let tangents: Vec<(f32, f32)> = channel
            .keys
            .iter()
            .map(|k| (k.tangent_in, k.tangent_out))
            .collect();
        assert_eq!(tangents, vec![(2.0, 2.0), (2.0, -2.0), (-2.0, 2.0)]);
    }

    #[test]
    fn test_smooth_tangents_are_flat() {
        let mut keys = vec![
            Keyframe::with_tangents(0.0, 0.0, 3.0, 3.0),
            Keyframe::with_tangents(4.0, 1.0, 3.0, 3.0),
        ];
        make_tangents(&mut keys, Interpolation::Smooth);
        assert!(keys.iter().all(|k| k.tangent_in == 0.0 && k.tangent_out == 0.0));
    }

    #[test]
    fn test_single_key_untouched() {
        let mut keys = vec![Keyframe::with_tangents(0.0, 5.0, 1.0, 2.0)];
        make_tangents(&mut keys, Interpolation::Linear);
        assert_eq!(keys[0], Keyframe::with_tangents(0.0, 5.0, 1.0, 2.0));
    }

    #[test]
    fn test_equal_times_give_zero_slope() {
        let channel = Channel::from_points(&[(3.0, 0.0), (3.0, 8.0)], Interpolation::Linear);
        assert_eq!(channel.keys[0].tangent_out, 0.0);
    }

    #[test]
    fn test_from_pool_single_key() {
        let pool = [9.0, 4.5];
        let key = Keyframe::from_pool(&pool, 1, 0, 1, TangentType::In);
        assert_eq!(key, Keyframe::new(0.0, 4.5));
    }

    #[test]
    fn test_from_pool_tangent_types() {
        let pool = [0.0, 1.0, 2.0, 10.0, 3.0, 4.0];
        let key = Keyframe::from_pool(&pool, 0, 1, 2, TangentType::In);
        assert_eq!(key, Keyframe::with_tangents(10.0, 3.0, 4.0, 4.0));

        let pool = [0.0, 1.0, 2.0, -2.0, 10.0, 3.0, 4.0, 5.0];
        let key = Keyframe::from_pool(&pool, 0, 1, 2, TangentType::InOut);
        assert_eq!(key, Keyframe::with_tangents(10.0, 3.0, 4.0, 5.0));
    }

    #[test]
    fn test_from_pool_out_of_range() {
        let pool = [7.0];
        assert_eq!(Keyframe::from_pool(&pool, 3, 0, 1, TangentType::In).value, MISSING_VALUE);

        let pool = [5.0];
        let key = Keyframe::from_pool(&pool, 0, 0, 2, TangentType::In);
        assert_eq!(key, Keyframe::with_tangents(5.0, MISSING_VALUE, 0.0, 0.0));
    }

    #[test]
    fn test_decoded_interpolation_tag() {
        let flat = Channel::from_decoded(vec![Keyframe::new(0.0, 1.0), Keyframe::new(5.0, 2.0)]);
        assert_eq!(flat.interpolation, Interpolation::Smooth);
        let single = Channel::from_decoded(vec![Keyframe::new(0.0, 1.0)]);
        assert_eq!(single.interpolation, Interpolation::Linear);
    }

    #[test]
    fn test_rotation_scale() {
        assert_eq!(rotation_scale(0), 180.0 / 32768.0);
        assert_eq!(rotation_scale(1), 360.0 / 32768.0);
        assert_eq!(rotation_scale(-1), 90.0 / 32768.0);
    }

    #[test]
    fn test_tangent_type_from_raw() {
        assert_eq!(TangentType::try_from(1).unwrap(), TangentType::InOut);
        assert!(matches!(
            TangentType::try_from(2),
            Err(Error::UnsupportedTangentType { value: 2 })
        ));
    }
}

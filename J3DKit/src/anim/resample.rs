//! Conversions from keyed animations to their per-frame siblings
//!
//! `bck -> bca` and `blk -> bla`. Every channel with fewer keys than the
//! animation's duration is expanded to one value per integer frame; channels
//! that already have a key per frame keep their values.

use tracing::debug;

use super::keyframe::{Channel, Interpolation, Keyframe};
use super::{
    Animation, AnimationKind, ClusterAnimation, JointAnimation, SampledClusterAnimation,
    SampledJointAnimation,
};
use crate::error::{Error, Result};

/// The sampled sibling of a keyed kind, if it has one.
#[must_use]
pub fn sampled_kind(kind: AnimationKind) -> Option<AnimationKind> {
    match kind {
        AnimationKind::Bck => Some(AnimationKind::Bca),
        AnimationKind::Blk => Some(AnimationKind::Bla),
        _ => None,
    }
}

/// Convert a keyed animation to its sampled sibling.
///
/// # Errors
///
/// Returns [`Error::UnsupportedConversion`] for every kind other than `bck`
/// and `blk`.
pub fn resample(animation: &Animation) -> Result<Animation> {
    match animation {
        Animation::Joint(anim) => Ok(Animation::SampledJoint(resample_joints(anim))),
        Animation::Cluster(anim) => Ok(Animation::SampledCluster(resample_clusters(anim))),
        other => Err(Error::UnsupportedConversion {
            from: other.kind().extension(),
            to: "sampled",
        }),
    }
}

/// Resample a `bck` joint animation into a `bca`.
#[must_use]
pub fn resample_joints(anim: &JointAnimation) -> SampledJointAnimation {
    let mut sampled = SampledJointAnimation::new(anim.loop_mode, anim.duration);
    sampled.joints = anim
        .joints
        .iter()
        .map(|joint| joint.map(|channel| sample_channel(channel, anim.duration)))
        .collect();
    debug!(joints = sampled.joints.len(), duration = anim.duration, "resampled joint animation");
    sampled
}

/// Resample a `blk` cluster animation into a `bla`.
#[must_use]
pub fn resample_clusters(anim: &ClusterAnimation) -> SampledClusterAnimation {
    let mut sampled = SampledClusterAnimation::new(anim.loop_mode, anim.duration);
    sampled.filler = anim.filler;
    sampled.clusters = anim
        .clusters
        .iter()
        .map(|channel| sample_channel(channel, anim.duration))
        .collect();
    debug!(clusters = sampled.clusters.len(), duration = anim.duration, "resampled cluster animation");
    sampled
}

/// Values of a channel for a sampled animation of `duration` frames.
#[must_use]
pub fn sample_channel(channel: &Channel, duration: u16) -> Vec<f32> {
    if channel.len() >= usize::from(duration) {
        channel.keys.iter().map(|k| k.value).collect()
    } else {
        resample_channel(channel)
    }
}

/// Expand a channel to one value per integer frame from its first key to its
/// last, ending with the last key's value.
#[must_use]
pub fn resample_channel(channel: &Channel) -> Vec<f32> {
    let Some(last) = channel.keys.last() else {
        return Vec::new();
    };

    let mut values = Vec::new();
    for pair in channel.keys.windows(2) {
        let (start, end) = (&pair[0], &pair[1]);
        let span = (end.time - start.time).round();
        if span <= 0.0 {
            continue;
        }
        for frame in 0..span as u32 {
            let x = frame as f32 / span;
            values.push(match channel.interpolation {
                Interpolation::Linear => lerp(start, end, x),
                Interpolation::Smooth => hermite(start, end, x, span),
            });
        }
    }
    values.push(last.value);
    values
}

fn lerp(start: &Keyframe, end: &Keyframe, x: f32) -> f32 {
    start.value + x * (end.value - start.value)
}

fn hermite(start: &Keyframe, end: &Keyframe, x: f32, span: f32) -> f32 {
    let x2 = x * x;
    let x3 = x2 * x;
    let h00 = 2.0 * x3 - 3.0 * x2 + 1.0;
    let h10 = x3 - 2.0 * x2 + x;
    let h01 = -2.0 * x3 + 3.0 * x2;
    let h11 = x3 - x2;
    h00 * start.value
        + h10 * span * start.tangent_out
        + h01 * end.value
        + h11 * span * end.tangent_in
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{LoopMode, Transform};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_linear_channel_lerps_per_frame() {
        let channel = Channel::from_points(&[(0.0, 0.0), (4.0, 8.0), (6.0, 4.0)], Interpolation::Linear);
        assert_eq!(resample_channel(&channel), vec![0.0, 2.0, 4.0, 6.0, 8.0, 6.0, 4.0]);
    }

    #[test]
    fn test_smooth_channel_hits_end_points() {
        let channel = Channel::from_points(&[(0.0, 10.0), (8.0, -6.0)], Interpolation::Smooth);
        let values = resample_channel(&channel);
        assert_eq!(values.len(), 9);
        assert_eq!(values[0], 10.0);
        assert_eq!(values[8], -6.0);
        // flat tangents ease out of the first key
        assert!(values[1] > lerp(&channel.keys[0], &channel.keys[1], 0.125));
        assert_eq!(values[4], 2.0);
    }

    #[test]
    fn test_dense_channel_kept() {
        let channel = Channel::from_points(&[(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)], Interpolation::Smooth);
        assert_eq!(sample_channel(&channel, 3), vec![1.0, 3.0, 2.0]);
        assert_eq!(sample_channel(&Channel::constant(5.0), 10), vec![5.0]);
    }

    #[test]
    fn test_joint_conversion() {
        let mut anim = JointAnimation::new(LoopMode::Loop, 0, 4);
        let mut joint = Transform::from_components(std::array::from_fn(|_| Channel::constant(0.0)));
        joint.translation[1] = Channel::from_points(&[(0.0, 0.0), (4.0, 2.0)], Interpolation::Linear);
        anim.joints = vec![joint];

        let Animation::SampledJoint(sampled) = resample(&Animation::Joint(anim)).unwrap() else {
            panic!("expected a bca");
        };
        assert_eq!(sampled.loop_mode, LoopMode::Loop);
        assert_eq!(sampled.joints[0].translation[1], vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(sampled.joints[0].scale[0], vec![0.0]);
    }

    #[test]
    fn test_unsupported_conversion() {
        let anim = Animation::Visibility(crate::anim::VisibilityAnimation::default());
        let err = resample(&anim).unwrap_err();
        assert!(matches!(err, Error::UnsupportedConversion { from: "bva", .. }));
        assert_eq!(sampled_kind(AnimationKind::Blk), Some(AnimationKind::Bla));
    }
}

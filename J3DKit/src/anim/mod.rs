//! J3D animation formats
//!
//! Nine single-section J3D files share one keyframe model:
//!
//! | Extension | Section | Animates |
//! |-----------|---------|----------|
//! | `bck` | `ANK1` | joint scale/rotation/translation, keyed |
//! | `bca` | `ANF1` | joint scale/rotation/translation, one value per frame |
//! | `blk` | `CLK1` | cluster (shape) weights, keyed |
//! | `bla` | `CLF1` | cluster (shape) weights, one value per frame |
//! | `brk` | `TRK1` | TEV register and constant colors, keyed |
//! | `bpk` | `PAK1` | material colors, keyed |
//! | `btk` | `TTK1` | texture matrices, keyed |
//! | `btp` | `TPT1` | texture index sequences |
//! | `bva` | `VAF1` | mesh visibility sequences |
//!
//! # Example
//!
//! ```no_run
//! use j3dkit::anim::{Animation, AnimationFormat, JointAnimation};
//!
//! let data = std::fs::read("wait.bck")?;
//! let anim = JointAnimation::from_bytes(&data)?;
//! println!("{} joints over {} frames", anim.joints.len(), anim.duration);
//!
//! let table = Animation::Joint(anim).to_table();
//! println!("{}", serde_json::to_string_pretty(&table)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bca;
pub mod bck;
pub mod bla;
pub mod blk;
pub mod bpk;
pub mod brk;
pub mod btk;
pub mod btp;
pub mod bva;
pub mod codec;
pub mod keyframe;
pub mod pool;
pub mod resample;
pub mod table;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use bca::SampledJointAnimation;
pub use bck::{JointAnimation, SoundEntry};
pub use bla::SampledClusterAnimation;
pub use blk::ClusterAnimation;
pub use bpk::ColorAnimation;
pub use brk::{ColorTrack, TevColorAnimation};
pub use btk::{TexMatrixTrack, TextureMatrixAnimation};
pub use btp::{TexturePatternAnimation, TexturePatternTrack};
pub use bva::VisibilityAnimation;
pub use codec::{AnimationFormat, HeaderTag};
pub use keyframe::{Channel, Interpolation, Keyframe, TangentType, make_tangents, rotation_scale};
pub use pool::find_sequence;
pub use table::{AnimationTable, TableEntity, TableRow};

/// Playback behaviour once the last frame is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopMode {
    #[default]
    Once = 0,
    OnceReset = 1,
    Loop = 2,
    MirrorOnce = 3,
    MirrorLoop = 4,
}

impl TryFrom<u8> for LoopMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LoopMode::Once),
            1 => Ok(LoopMode::OnceReset),
            2 => Ok(LoopMode::Loop),
            3 => Ok(LoopMode::MirrorOnce),
            4 => Ok(LoopMode::MirrorLoop),
            _ => Err(Error::InvalidLoopMode { value }),
        }
    }
}

/// Scale, rotation and translation channels of one joint or texture matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform<C> {
    pub scale: [C; 3],
    pub rotation: [C; 3],
    pub translation: [C; 3],
}

impl<C> Transform<C> {
    /// Channels in file order: scale, rotation, translation for each axis.
    pub fn slots(&self) -> [&C; 9] {
        let [sx, sy, sz] = &self.scale;
        let [rx, ry, rz] = &self.rotation;
        let [tx, ty, tz] = &self.translation;
        [sx, rx, tx, sy, ry, ty, sz, rz, tz]
    }

    /// Inverse of [`Transform::slots`].
    pub fn from_slots(slots: [C; 9]) -> Self {
        let [sx, rx, tx, sy, ry, ty, sz, rz, tz] = slots;
        Self {
            scale: [sx, sy, sz],
            rotation: [rx, ry, rz],
            translation: [tx, ty, tz],
        }
    }

    /// Channels grouped by component: all scales, then rotations, then translations.
    pub fn components(&self) -> [&C; 9] {
        let [sx, sy, sz] = &self.scale;
        let [rx, ry, rz] = &self.rotation;
        let [tx, ty, tz] = &self.translation;
        [sx, sy, sz, rx, ry, rz, tx, ty, tz]
    }

    /// Inverse of [`Transform::components`].
    pub fn from_components(components: [C; 9]) -> Self {
        let [sx, sy, sz, rx, ry, rz, tx, ty, tz] = components;
        Self {
            scale: [sx, sy, sz],
            rotation: [rx, ry, rz],
            translation: [tx, ty, tz],
        }
    }

    /// Apply `f` to every channel.
    pub fn map<D>(&self, mut f: impl FnMut(&C) -> D) -> Transform<D> {
        Transform {
            scale: self.scale.each_ref().map(&mut f),
            rotation: self.rotation.each_ref().map(&mut f),
            translation: self.translation.each_ref().map(&mut f),
        }
    }
}

/// Row labels of a joint transform, in [`Transform::components`] order.
pub const XYZ_LABELS: [&str; 9] = [
    "Scale X",
    "Scale Y",
    "Scale Z",
    "Rotation X",
    "Rotation Y",
    "Rotation Z",
    "Translation X",
    "Translation Y",
    "Translation Z",
];

/// Row labels of a texture matrix transform, in [`Transform::components`] order.
pub const UVW_LABELS: [&str; 9] = [
    "Scale U",
    "Scale V",
    "Scale W",
    "Rotation U",
    "Rotation V",
    "Rotation W",
    "Translation U",
    "Translation V",
    "Translation W",
];

/// Row labels of an RGBA channel group.
pub const RGBA_LABELS: [&str; 4] = ["Red", "Green", "Blue", "Alpha"];

/// Any decoded animation.
#[derive(Debug, Clone, PartialEq)]
pub enum Animation {
    Joint(JointAnimation),
    SampledJoint(SampledJointAnimation),
    Cluster(ClusterAnimation),
    SampledCluster(SampledClusterAnimation),
    TevColor(TevColorAnimation),
    Color(ColorAnimation),
    TextureMatrix(TextureMatrixAnimation),
    TexturePattern(TexturePatternAnimation),
    Visibility(VisibilityAnimation),
}

/// Animation format identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    Bck,
    Bca,
    Blk,
    Bla,
    Brk,
    Bpk,
    Btk,
    Btp,
    Bva,
}

impl AnimationKind {
    pub const ALL: [AnimationKind; 9] = [
        AnimationKind::Bck,
        AnimationKind::Bca,
        AnimationKind::Blk,
        AnimationKind::Bla,
        AnimationKind::Brk,
        AnimationKind::Bpk,
        AnimationKind::Btk,
        AnimationKind::Btp,
        AnimationKind::Bva,
    ];

    /// The 8-byte file magic.
    #[must_use]
    pub fn magic(self) -> [u8; 8] {
        match self {
            AnimationKind::Bck => JointAnimation::FILE_MAGIC,
            AnimationKind::Bca => SampledJointAnimation::FILE_MAGIC,
            AnimationKind::Blk => ClusterAnimation::FILE_MAGIC,
            AnimationKind::Bla => SampledClusterAnimation::FILE_MAGIC,
            AnimationKind::Brk => TevColorAnimation::FILE_MAGIC,
            AnimationKind::Bpk => ColorAnimation::FILE_MAGIC,
            AnimationKind::Btk => TextureMatrixAnimation::FILE_MAGIC,
            AnimationKind::Btp => TexturePatternAnimation::FILE_MAGIC,
            AnimationKind::Bva => VisibilityAnimation::FILE_MAGIC,
        }
    }

    /// Identify an animation from the first 8 bytes of a file.
    #[must_use]
    pub fn from_magic(data: &[u8]) -> Option<Self> {
        let magic = data.get(..8)?;
        Self::ALL.into_iter().find(|kind| kind.magic() == magic)
    }

    /// Lowercase file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            AnimationKind::Bck => "bck",
            AnimationKind::Bca => "bca",
            AnimationKind::Blk => "blk",
            AnimationKind::Bla => "bla",
            AnimationKind::Brk => "brk",
            AnimationKind::Bpk => "bpk",
            AnimationKind::Btk => "btk",
            AnimationKind::Btp => "btp",
            AnimationKind::Bva => "bva",
        }
    }

    /// Identify an animation from a file extension (case-insensitive).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }
}

impl std::fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl Animation {
    #[must_use]
    pub fn kind(&self) -> AnimationKind {
        match self {
            Animation::Joint(_) => AnimationKind::Bck,
            Animation::SampledJoint(_) => AnimationKind::Bca,
            Animation::Cluster(_) => AnimationKind::Blk,
            Animation::SampledCluster(_) => AnimationKind::Bla,
            Animation::TevColor(_) => AnimationKind::Brk,
            Animation::Color(_) => AnimationKind::Bpk,
            Animation::TextureMatrix(_) => AnimationKind::Btk,
            Animation::TexturePattern(_) => AnimationKind::Btp,
            Animation::Visibility(_) => AnimationKind::Bva,
        }
    }

    /// Decode any animation file, selecting the format by its magic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedMagic`] if no animation format matches.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let Some(kind) = AnimationKind::from_magic(data) else {
            return Err(Error::unrecognized_magic(data));
        };

        Ok(match kind {
            AnimationKind::Bck => Animation::Joint(codec::decode(data)?),
            AnimationKind::Bca => Animation::SampledJoint(codec::decode(data)?),
            AnimationKind::Blk => Animation::Cluster(codec::decode(data)?),
            AnimationKind::Bla => Animation::SampledCluster(codec::decode(data)?),
            AnimationKind::Brk => Animation::TevColor(codec::decode(data)?),
            AnimationKind::Bpk => Animation::Color(codec::decode(data)?),
            AnimationKind::Btk => Animation::TextureMatrix(codec::decode(data)?),
            AnimationKind::Btp => Animation::TexturePattern(codec::decode(data)?),
            AnimationKind::Bva => Animation::Visibility(codec::decode(data)?),
        })
    }

    /// Encode to the file format matching the variant.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Animation::Joint(a) => codec::encode(a),
            Animation::SampledJoint(a) => codec::encode(a),
            Animation::Cluster(a) => codec::encode(a),
            Animation::SampledCluster(a) => codec::encode(a),
            Animation::TevColor(a) => codec::encode(a),
            Animation::Color(a) => codec::encode(a),
            Animation::TextureMatrix(a) => codec::encode(a),
            Animation::TexturePattern(a) => codec::encode(a),
            Animation::Visibility(a) => codec::encode(a),
        }
    }

    /// Loop mode shared by every variant.
    #[must_use]
    pub fn loop_mode(&self) -> LoopMode {
        match self {
            Animation::Joint(a) => a.loop_mode,
            Animation::SampledJoint(a) => a.loop_mode,
            Animation::Cluster(a) => a.loop_mode,
            Animation::SampledCluster(a) => a.loop_mode,
            Animation::TevColor(a) => a.loop_mode,
            Animation::Color(a) => a.loop_mode,
            Animation::TextureMatrix(a) => a.loop_mode,
            Animation::TexturePattern(a) => a.loop_mode,
            Animation::Visibility(a) => a.loop_mode,
        }
    }

    /// Length in frames.
    #[must_use]
    pub fn duration(&self) -> u16 {
        match self {
            Animation::Joint(a) => a.duration,
            Animation::SampledJoint(a) => a.duration,
            Animation::Cluster(a) => a.duration,
            Animation::SampledCluster(a) => a.duration,
            Animation::TevColor(a) => a.duration,
            Animation::Color(a) => a.duration,
            Animation::TextureMatrix(a) => a.duration,
            Animation::TexturePattern(a) => a.duration,
            Animation::Visibility(a) => a.duration,
        }
    }

    /// Number of animated entities (joints, clusters, materials, meshes).
    #[must_use]
    pub fn entity_count(&self) -> usize {
        match self {
            Animation::Joint(a) => a.joints.len(),
            Animation::SampledJoint(a) => a.joints.len(),
            Animation::Cluster(a) => a.clusters.len(),
            Animation::SampledCluster(a) => a.clusters.len(),
            Animation::TevColor(a) => a.register.len() + a.constant.len(),
            Animation::Color(a) => a.materials.len(),
            Animation::TextureMatrix(a) => a.matrices.len(),
            Animation::TexturePattern(a) => a.materials.len(),
            Animation::Visibility(a) => a.meshes.len(),
        }
    }

    /// The header tag of the wrapped animation.
    #[must_use]
    pub fn tag(&self) -> HeaderTag {
        match self {
            Animation::Joint(a) => a.tag,
            Animation::SampledJoint(a) => a.tag,
            Animation::Cluster(a) => a.tag,
            Animation::SampledCluster(a) => a.tag,
            Animation::TevColor(a) => a.tag,
            Animation::Color(a) => a.tag,
            Animation::TextureMatrix(a) => a.tag,
            Animation::TexturePattern(a) => a.tag,
            Animation::Visibility(a) => a.tag,
        }
    }
}

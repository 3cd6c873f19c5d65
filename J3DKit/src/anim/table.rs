//! Editable grid projection of animations
//!
//! An [`AnimationTable`] lays every animation out as rows of cells against a
//! shared frame axis, which serializes to JSON for hand editing. Keyed
//! formats place a cell wherever a channel has a key; sampled formats fill
//! one cell per frame.
//!
//! Converting back rebuilds keys from the filled cells and resynthesizes
//! tangents from each row's interpolation, so a keyed animation survives
//! the round trip up to its tangents.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::bck::SoundEntry;
use super::brk::ColorTrack;
use super::btk::TexMatrixTrack;
use super::btp::TexturePatternTrack;
use super::codec::HeaderTag;
use super::keyframe::{Channel, Interpolation, Keyframe, TangentType};
use super::{
    Animation, AnimationKind, ClusterAnimation, ColorAnimation, JointAnimation, LoopMode, RGBA_LABELS,
    SampledClusterAnimation, SampledJointAnimation, TevColorAnimation, TextureMatrixAnimation,
    TexturePatternAnimation, Transform, UVW_LABELS, VisibilityAnimation, XYZ_LABELS,
};
use crate::error::{Error, Result};

const REGISTER_GROUP: &str = "register";
const CONSTANT_GROUP: &str = "constant";

/// An animation as a grid of rows against a shared frame axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationTable {
    pub kind: AnimationKind,
    pub loop_mode: LoopMode,
    pub duration: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_scale: Option<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangent_type: Option<TangentType>,
    pub tag: HeaderTag,
    /// Animation-level header words (filler bytes, calc mode).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extras: IndexMap<String, u32>,
    /// Column times. Every row has one cell per frame. A time repeats when
    /// a channel holds several keys at it.
    pub frames: Vec<f32>,
    pub entities: Vec<TableEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sounds: Vec<SoundEntry>,
}

/// One animated joint, cluster, material, matrix or mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableEntity {
    pub name: String,
    /// Bank of a TEV color track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, f32>,
    pub rows: Vec<TableRow>,
}

/// One channel of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub channel: String,
    #[serde(default)]
    pub interpolation: Interpolation,
    pub cells: Vec<Option<f32>>,
}

impl TableEntity {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn with_property(mut self, key: &str, value: f32) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    fn property(&self, key: &str) -> f32 {
        self.properties.get(key).copied().unwrap_or_default()
    }
}

impl AnimationTable {
    fn new(kind: AnimationKind, loop_mode: LoopMode, duration: u16, tag: HeaderTag) -> Self {
        Self {
            kind,
            loop_mode,
            duration,
            angle_scale: None,
            tangent_type: None,
            tag,
            extras: IndexMap::new(),
            frames: Vec::new(),
            entities: Vec::new(),
            sounds: Vec::new(),
        }
    }

    fn extra(&self, key: &str, default: u32) -> u32 {
        self.extras.get(key).copied().unwrap_or(default)
    }
}

// ==================== Projection ====================

/// Rows of one entity before the frame axis is known.
struct Pending<'a, C> {
    entity: TableEntity,
    channels: Vec<(&'static str, &'a C)>,
}

impl<'a, C> Pending<'a, C> {
    fn new(entity: TableEntity, labels: &[&'static str], channels: impl IntoIterator<Item = &'a C>) -> Self {
        Self {
            entity,
            channels: labels.iter().copied().zip(channels).collect(),
        }
    }
}

/// `(time, n)` for every key, where `n` counts earlier keys at the same time.
fn key_columns(channel: &Channel) -> impl Iterator<Item = (f32, usize)> + '_ {
    channel.keys.iter().enumerate().map(|(i, key)| {
        let earlier = channel.keys[..i].iter().filter(|k| k.time == key.time).count();
        (key.time, earlier)
    })
}

fn keyed_grid(table: &mut AnimationTable, pending: Vec<Pending<'_, Channel>>) {
    let mut columns: Vec<(f32, usize)> = pending
        .iter()
        .flat_map(|p| p.channels.iter().flat_map(|(_, c)| key_columns(c)))
        .collect();
    columns.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    columns.dedup();

    table.entities = pending
        .into_iter()
        .map(|Pending { mut entity, channels }| {
            entity.rows = channels
                .into_iter()
                .map(|(label, channel)| TableRow {
                    channel: label.to_string(),
                    interpolation: channel.interpolation,
                    cells: columns
                        .iter()
                        .map(|&(t, n)| channel.keys.iter().filter(|k| k.time == t).nth(n).map(|k| k.value))
                        .collect(),
                })
                .collect();
            entity
        })
        .collect();
    table.frames = columns.into_iter().map(|(t, _)| t).collect();
}

fn sampled_grid(table: &mut AnimationTable, pending: Vec<Pending<'_, Vec<f32>>>) {
    let width = pending
        .iter()
        .flat_map(|p| p.channels.iter().map(|(_, values)| values.len()))
        .max()
        .unwrap_or(0)
        .max(usize::from(table.duration));

    table.entities = pending
        .into_iter()
        .map(|Pending { mut entity, channels }| {
            entity.rows = channels
                .into_iter()
                .map(|(label, values)| TableRow {
                    channel: label.to_string(),
                    interpolation: Interpolation::Linear,
                    cells: (0..width).map(|i| values.get(i).copied()).collect(),
                })
                .collect();
            entity
        })
        .collect();
    table.frames = (0..width).map(|i| i as f32).collect();
}

fn color_entity(track: &ColorTrack, group: Option<&str>) -> TableEntity {
    let mut entity = TableEntity::new(&track.name);
    if let Some(group) = group {
        entity.group = Some(group.to_string());
        entity = entity.with_property("register_index", f32::from(track.register_index));
    }
    entity
}

fn matrix_entity(track: &TexMatrixTrack) -> TableEntity {
    let [x, y, z] = track.center;
    TableEntity::new(&track.name)
        .with_property("texmtx_index", f32::from(track.texmtx_index))
        .with_property("center_x", x)
        .with_property("center_y", y)
        .with_property("center_z", z)
}

impl Animation {
    /// Project the animation onto an editable grid.
    #[must_use]
    pub fn to_table(&self) -> AnimationTable {
        let mut table = AnimationTable::new(self.kind(), self.loop_mode(), self.duration(), self.tag());
        match self {
            Animation::Joint(a) => {
                table.angle_scale = Some(a.angle_scale);
                table.tangent_type = Some(a.tangent_type);
                table.sounds.clone_from(&a.sounds);
                let pending = a
                    .joints
                    .iter()
                    .enumerate()
                    .map(|(i, joint)| Pending::new(TableEntity::new(format!("Joint {i}")), &XYZ_LABELS, joint.components()))
                    .collect();
                keyed_grid(&mut table, pending);
            }
            Animation::SampledJoint(a) => {
                table.extras.insert("filler".into(), u32::from(a.filler));
                let pending = a
                    .joints
                    .iter()
                    .enumerate()
                    .map(|(i, joint)| Pending::new(TableEntity::new(format!("Joint {i}")), &XYZ_LABELS, joint.components()))
                    .collect();
                sampled_grid(&mut table, pending);
            }
            Animation::Cluster(a) => {
                table.tangent_type = Some(a.tangent_type);
                table.extras.insert("filler".into(), u32::from(a.filler));
                let pending = a
                    .clusters
                    .iter()
                    .enumerate()
                    .map(|(i, c)| Pending::new(TableEntity::new(format!("Cluster {i}")), &["Weight"], [c]))
                    .collect();
                keyed_grid(&mut table, pending);
            }
            Animation::SampledCluster(a) => {
                table.extras.insert("filler".into(), u32::from(a.filler));
                let pending = a
                    .clusters
                    .iter()
                    .enumerate()
                    .map(|(i, c)| Pending::new(TableEntity::new(format!("Cluster {i}")), &["Weight"], [c]))
                    .collect();
                sampled_grid(&mut table, pending);
            }
            Animation::TevColor(a) => {
                table.tangent_type = Some(a.tangent_type);
                let banks = [(REGISTER_GROUP, &a.register), (CONSTANT_GROUP, &a.constant)];
                let pending = banks
                    .into_iter()
                    .flat_map(|(group, tracks)| {
                        tracks
                            .iter()
                            .map(move |t| Pending::new(color_entity(t, Some(group)), &RGBA_LABELS, &t.channels))
                    })
                    .collect();
                keyed_grid(&mut table, pending);
            }
            Animation::Color(a) => {
                table.tangent_type = Some(a.tangent_type);
                let pending = a
                    .materials
                    .iter()
                    .map(|t| Pending::new(color_entity(t, None), &RGBA_LABELS, &t.channels))
                    .collect();
                keyed_grid(&mut table, pending);
            }
            Animation::TextureMatrix(a) => {
                table.angle_scale = Some(a.angle_scale);
                table.tangent_type = Some(a.tangent_type);
                table.extras.insert("calc_mode".into(), a.calc_mode);
                let pending = a
                    .matrices
                    .iter()
                    .map(|m| Pending::new(matrix_entity(m), &UVW_LABELS, m.transform.components()))
                    .collect();
                keyed_grid(&mut table, pending);
            }
            Animation::TexturePattern(a) => {
                table.extras.insert("unknown".into(), u32::from(a.unknown));
                let frames: Vec<Vec<f32>> = a
                    .materials
                    .iter()
                    .map(|m| m.frames.iter().map(|&f| f32::from(f)).collect())
                    .collect();
                let pending = a
                    .materials
                    .iter()
                    .zip(&frames)
                    .map(|(m, values)| {
                        let entity = TableEntity::new(&m.name)
                            .with_property("texmap_index", f32::from(m.texmap_index))
                            .with_property("material_index", f32::from(m.material_index));
                        Pending::new(entity, &["Texture"], [values])
                    })
                    .collect();
                sampled_grid(&mut table, pending);
            }
            Animation::Visibility(a) => {
                let meshes: Vec<Vec<f32>> = a
                    .meshes
                    .iter()
                    .map(|m| m.iter().map(|&shown| if shown { 1.0 } else { 0.0 }).collect())
                    .collect();
                let pending = meshes
                    .iter()
                    .enumerate()
                    .map(|(i, values)| Pending::new(TableEntity::new(format!("Mesh {i}")), &["Visible"], [values]))
                    .collect();
                sampled_grid(&mut table, pending);
            }
        }
        table
    }

    /// Rebuild an animation from its grid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTable`] if an entity has the wrong number of
    /// rows, a row's length differs from the frame axis, a keyed row has no
    /// filled cell or a sampled row has a gap.
    pub fn from_table(table: &AnimationTable) -> Result<Self> {
        let rebuilt = match table.kind {
            AnimationKind::Bck => Animation::Joint(JointAnimation {
                loop_mode: table.loop_mode,
                angle_scale: table.angle_scale.unwrap_or(0),
                duration: table.duration,
                tangent_type: table.tangent_type.unwrap_or_default(),
                joints: table
                    .entities
                    .iter()
                    .map(|e| keyed_rows::<9>(table, e).map(Transform::from_components))
                    .collect::<Result<_>>()?,
                sounds: table.sounds.clone(),
                tag: table.tag,
            }),
            AnimationKind::Bca => Animation::SampledJoint(SampledJointAnimation {
                loop_mode: table.loop_mode,
                filler: table.extra("filler", u32::from(super::bca::DEFAULT_FILLER)) as u8,
                duration: table.duration,
                joints: table
                    .entities
                    .iter()
                    .map(|e| sampled_rows::<9>(e).map(Transform::from_components))
                    .collect::<Result<_>>()?,
                tag: table.tag,
            }),
            AnimationKind::Blk => Animation::Cluster(ClusterAnimation {
                loop_mode: table.loop_mode,
                filler: table.extra("filler", 0) as u8,
                duration: table.duration,
                tangent_type: table.tangent_type.unwrap_or_default(),
                clusters: table
                    .entities
                    .iter()
                    .map(|e| keyed_rows::<1>(table, e).map(|[c]| c))
                    .collect::<Result<_>>()?,
                tag: table.tag,
            }),
            AnimationKind::Bla => Animation::SampledCluster(SampledClusterAnimation {
                loop_mode: table.loop_mode,
                filler: table.extra("filler", 0) as u8,
                duration: table.duration,
                clusters: table
                    .entities
                    .iter()
                    .map(|e| sampled_rows::<1>(e).map(|[c]| c))
                    .collect::<Result<_>>()?,
                tag: table.tag,
            }),
            AnimationKind::Brk => {
                let mut anim = TevColorAnimation::new(table.loop_mode, table.duration);
                anim.tangent_type = table.tangent_type.unwrap_or_default();
                anim.tag = table.tag;
                for entity in &table.entities {
                    let mut track = ColorTrack::new(&entity.name, keyed_rows::<4>(table, entity)?);
                    track.register_index = entity.property("register_index") as u8;
                    match entity.group.as_deref() {
                        Some(CONSTANT_GROUP) => anim.constant.push(track),
                        Some(REGISTER_GROUP) | None => anim.register.push(track),
                        Some(other) => {
                            return Err(Error::InvalidTable(format!(
                                "entity {} has unknown group {other}",
                                entity.name
                            )));
                        }
                    }
                }
                Animation::TevColor(anim)
            }
            AnimationKind::Bpk => {
                let mut anim = ColorAnimation::new(table.loop_mode, table.duration);
                anim.tangent_type = table.tangent_type.unwrap_or_default();
                anim.tag = table.tag;
                anim.materials = table
                    .entities
                    .iter()
                    .map(|e| Ok(ColorTrack::new(&e.name, keyed_rows::<4>(table, e)?)))
                    .collect::<Result<_>>()?;
                Animation::Color(anim)
            }
            AnimationKind::Btk => {
                let mut anim =
                    TextureMatrixAnimation::new(table.loop_mode, table.angle_scale.unwrap_or(0), table.duration);
                anim.tangent_type = table.tangent_type.unwrap_or_default();
                anim.calc_mode = table.extra("calc_mode", 0);
                anim.tag = table.tag;
                anim.matrices = table
                    .entities
                    .iter()
                    .map(|e| {
                        let transform = Transform::from_components(keyed_rows::<9>(table, e)?);
                        let mut track = TexMatrixTrack::new(&e.name, e.property("texmtx_index") as u8, transform);
                        track.center = [e.property("center_x"), e.property("center_y"), e.property("center_z")];
                        Ok(track)
                    })
                    .collect::<Result<_>>()?;
                Animation::TextureMatrix(anim)
            }
            AnimationKind::Btp => {
                let mut anim = TexturePatternAnimation::new(table.loop_mode, table.duration);
                anim.unknown = table.extra("unknown", 0) as u16;
                anim.tag = table.tag;
                anim.materials = table
                    .entities
                    .iter()
                    .map(|e| {
                        let [values] = sampled_rows::<1>(e)?;
                        let mut track =
                            TexturePatternTrack::new(&e.name, values.iter().map(|&v| v as u16).collect());
                        track.texmap_index = e.property("texmap_index") as u8;
                        track.material_index = e.property("material_index") as u16;
                        Ok(track)
                    })
                    .collect::<Result<_>>()?;
                Animation::TexturePattern(anim)
            }
            AnimationKind::Bva => {
                let mut anim = VisibilityAnimation::new(table.loop_mode, table.duration);
                anim.tag = table.tag;
                anim.meshes = table
                    .entities
                    .iter()
                    .map(|e| sampled_rows::<1>(e).map(|[values]| values.iter().map(|&v| v != 0.0).collect()))
                    .collect::<Result<_>>()?;
                Animation::Visibility(anim)
            }
        };
        Ok(rebuilt)
    }
}

// ==================== Reconstruction ====================

fn checked_rows<'a, const N: usize>(entity: &'a TableEntity) -> Result<[&'a TableRow; N]> {
    let rows: Vec<&TableRow> = entity.rows.iter().collect();
    rows.try_into().map_err(|rows: Vec<&TableRow>| {
        Error::InvalidTable(format!(
            "entity {} has {} rows, expected {N}",
            entity.name,
            rows.len()
        ))
    })
}

fn keyed_rows<const N: usize>(table: &AnimationTable, entity: &TableEntity) -> Result<[Channel; N]> {
    let rows = checked_rows::<N>(entity)?;
    let mut channels: [Channel; N] = std::array::from_fn(|_| Channel::default());
    for (channel, row) in channels.iter_mut().zip(rows) {
        if row.cells.len() != table.frames.len() {
            return Err(Error::InvalidTable(format!(
                "{} of {} has {} cells for {} frames",
                row.channel,
                entity.name,
                row.cells.len(),
                table.frames.len()
            )));
        }
        let keys: Vec<Keyframe> = table
            .frames
            .iter()
            .zip(&row.cells)
            .filter_map(|(&time, cell)| cell.map(|value| Keyframe::new(time, value)))
            .collect();
        if keys.is_empty() {
            return Err(Error::InvalidTable(format!("{} of {} has no keys", row.channel, entity.name)));
        }
        let mut rebuilt = Channel::new(keys, row.interpolation);
        if let [key] = rebuilt.keys.as_mut_slice() {
            key.time = 0.0;
        }
        rebuilt.synthesize_tangents();
        *channel = rebuilt;
    }
    Ok(channels)
}

fn sampled_rows<const N: usize>(entity: &TableEntity) -> Result<[Vec<f32>; N]> {
    let rows = checked_rows::<N>(entity)?;
    let mut channels: [Vec<f32>; N] = std::array::from_fn(|_| Vec::new());
    for (values, row) in channels.iter_mut().zip(rows) {
        let filled = row.cells.iter().take_while(|cell| cell.is_some()).count();
        if row.cells[filled..].iter().any(Option::is_some) {
            return Err(Error::InvalidTable(format!("{} of {} has a gap", row.channel, entity.name)));
        }
        *values = row.cells.iter().map_while(|cell| *cell).collect();
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn joint_animation() -> JointAnimation {
        let mut anim = JointAnimation::new(LoopMode::Loop, 1, 20);
        let mut joint = Transform::from_components(std::array::from_fn(|_| Channel::constant(0.0)));
        joint.translation[0] = Channel::from_points(&[(0.0, 0.0), (10.0, 5.0), (20.0, 0.0)], Interpolation::Linear);
        joint.rotation[1] = Channel::from_points(&[(0.0, 0.0), (5.0, 45.0)], Interpolation::Smooth);
        anim.joints = vec![joint];
        anim
    }

    #[test]
    fn test_keyed_projection() {
        let table = Animation::Joint(joint_animation()).to_table();
        assert_eq!(table.frames, vec![0.0, 5.0, 10.0, 20.0]);
        assert_eq!(table.angle_scale, Some(1));
        let rows = &table.entities[0].rows;
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[6].channel, "Translation X");
        assert_eq!(rows[6].cells, vec![Some(0.0), None, Some(5.0), Some(0.0)]);
        assert_eq!(rows[4].interpolation, Interpolation::Smooth);
        assert_eq!(rows[0].cells, vec![Some(0.0), None, None, None]);
    }

    #[test]
    fn test_keyed_round_trip() {
        let anim = Animation::Joint(joint_animation());
        let table = anim.to_table();
        let json = serde_json::to_string(&table).unwrap();
        let parsed: AnimationTable = serde_json::from_str(&json).unwrap();
        assert_eq!(Animation::from_table(&parsed).unwrap(), anim);
    }

    #[test]
    fn test_repeated_key_times() {
        let mut anim = ClusterAnimation::new(LoopMode::Once, 10);
        anim.clusters = vec![
            Channel::from_points(&[(0.0, 1.0), (5.0, 2.0), (5.0, 7.0), (10.0, 3.0)], Interpolation::Linear),
            Channel::from_points(&[(0.0, 0.0), (5.0, 4.0)], Interpolation::Linear),
        ];
        let anim = Animation::Cluster(anim);

        let table = anim.to_table();
        assert_eq!(table.frames, vec![0.0, 5.0, 5.0, 10.0]);
        assert_eq!(table.entities[0].rows[0].cells, vec![Some(1.0), Some(2.0), Some(7.0), Some(3.0)]);
        assert_eq!(table.entities[1].rows[0].cells, vec![Some(0.0), Some(4.0), None, None]);

        let rebuilt = Animation::from_table(&table).unwrap();
        assert_eq!(rebuilt, anim);
    }

    #[test]
    fn test_tev_color_groups() {
        let mut anim = TevColorAnimation::new(LoopMode::Once, 10);
        let mut reg = ColorTrack::new("mat_a", std::array::from_fn(|_| Channel::constant(10.0)));
        reg.register_index = 2;
        anim.register = vec![reg];
        anim.constant = vec![ColorTrack::new("mat_b", std::array::from_fn(|_| Channel::constant(20.0)))];
        let anim = Animation::TevColor(anim);

        let table = anim.to_table();
        assert_eq!(table.entities[0].group.as_deref(), Some("register"));
        assert_eq!(table.entities[0].properties["register_index"], 2.0);
        assert_eq!(table.entities[1].group.as_deref(), Some("constant"));
        assert_eq!(Animation::from_table(&table).unwrap(), anim);
    }

    #[test]
    fn test_sampled_round_trip() {
        let mut anim = TexturePatternAnimation::new(LoopMode::Loop, 4);
        anim.materials = vec![TexturePatternTrack::new("mat_eye", vec![0, 1, 1, 2]), {
            let mut t = TexturePatternTrack::new("mat_mouth", vec![3, 4]);
            t.texmap_index = 1;
            t
        }];
        let anim = Animation::TexturePattern(anim);
        let table = anim.to_table();
        assert_eq!(table.frames.len(), 4);
        assert_eq!(table.entities[1].rows[0].cells, vec![Some(3.0), Some(4.0), None, None]);
        assert_eq!(Animation::from_table(&table).unwrap(), anim);
    }

    #[test]
    fn test_visibility_round_trip() {
        let mut anim = VisibilityAnimation::new(LoopMode::Once, 3);
        anim.meshes = vec![vec![true, false, true]];
        let anim = Animation::Visibility(anim);
        assert_eq!(Animation::from_table(&anim.to_table()).unwrap(), anim);
    }

    #[test]
    fn test_invalid_tables() {
        let mut table = Animation::Joint(joint_animation()).to_table();
        table.entities[0].rows.pop();
        assert!(matches!(Animation::from_table(&table), Err(Error::InvalidTable(_))));

        let mut table = Animation::Joint(joint_animation()).to_table();
        table.entities[0].rows[0].cells = vec![None; 4];
        assert!(matches!(Animation::from_table(&table), Err(Error::InvalidTable(_))));

        let mut anim = VisibilityAnimation::new(LoopMode::Once, 3);
        anim.meshes = vec![vec![true, false, true]];
        let mut table = Animation::Visibility(anim).to_table();
        table.entities[0].rows[0].cells[1] = None;
        assert!(matches!(Animation::from_table(&table), Err(Error::InvalidTable(_))));
    }
}

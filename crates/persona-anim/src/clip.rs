//! Animation clips and keyframe tracks

use persona_core::NodeId;
use persona_scene::{Axis, NodeData};

/// What a track drives on its target node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    Position(Axis),
    Rotation(Axis),
    Scale(Axis),
    /// All three scale components at once
    UniformScale,
    /// Influence of one blend shape
    MorphWeight(usize),
}

impl TrackProperty {
    /// Current value of this property on a node
    pub fn read(&self, node: &NodeData) -> Option<f32> {
        let t = &node.transform;
        match *self {
            TrackProperty::Position(axis) => Some(t.position.get(axis)),
            TrackProperty::Rotation(axis) => Some(t.rotation.get(axis)),
            TrackProperty::Scale(axis) => Some(t.scale.get(axis)),
            TrackProperty::UniformScale => Some(t.scale.y),
            TrackProperty::MorphWeight(i) => node.morph().and_then(|m| m.influence_at(i)),
        }
    }

    /// Write a value onto a node. Silently ignored when the node cannot
    /// carry the property.
    pub fn write(&self, node: &mut NodeData, value: f32) {
        let t = &mut node.transform;
        match *self {
            TrackProperty::Position(axis) => t.position.set(axis, value),
            TrackProperty::Rotation(axis) => t.rotation.set(axis, value),
            TrackProperty::Scale(axis) => t.scale.set(axis, value),
            TrackProperty::UniformScale => {
                t.scale.x = value;
                t.scale.y = value;
                t.scale.z = value;
            }
            TrackProperty::MorphWeight(i) => {
                if let Some(m) = node.morph_mut() {
                    m.set_at(i, value);
                }
            }
        }
    }
}

/// Node a track is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackTarget {
    /// Index into the asset's detached node tree, before attachment
    Local(usize),
    /// Live scene node
    Node(NodeId),
}

/// Keyframe interpolation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
}

/// Scalar keyframe track
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub target: TrackTarget,
    pub property: TrackProperty,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
    pub interpolation: Interpolation,
}

impl Track {
    /// Create a linear track. Keys beyond the shorter of the two arrays are
    /// dropped.
    pub fn new(target: TrackTarget, property: TrackProperty, times: Vec<f32>, values: Vec<f32>) -> Self {
        let n = times.len().min(values.len());
        let mut times = times;
        let mut values = values;
        times.truncate(n);
        values.truncate(n);
        Self {
            target,
            property,
            times,
            values,
            interpolation: Interpolation::Linear,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Value at time `t`, clamped to the first and last keys
    pub fn sample(&self, t: f32) -> Option<f32> {
        let (first, last) = (self.times.first()?, self.times.last()?);
        if t <= *first {
            return self.values.first().copied();
        }
        if t >= *last {
            return self.values.last().copied();
        }

        // First key strictly after t; t is inside (first, last)
        let next = self.times.partition_point(|k| *k <= t);
        let prev = next - 1;
        let (t0, t1) = (self.times[prev], self.times[next]);
        let (v0, v1) = (self.values[prev], self.values[next]);

        match self.interpolation {
            Interpolation::Step => Some(v0),
            Interpolation::Linear => {
                let span = t1 - t0;
                if span <= f32::EPSILON {
                    Some(v1)
                } else {
                    Some(v0 + (v1 - v0) * (t - t0) / span)
                }
            }
        }
    }
}

/// Named, reusable animation timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl Clip {
    /// Create a clip. A non-positive duration is derived from the tracks.
    pub fn new(name: impl Into<String>, duration: f32, tracks: Vec<Track>) -> Self {
        let derived = tracks.iter().map(Track::end_time).fold(0.0_f32, f32::max);
        let duration = if duration > 0.0 && duration.is_finite() {
            duration
        } else {
            derived
        };
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Replace local tree targets with live scene handles.
    ///
    /// Tracks whose local index has no handle are dropped.
    pub fn bind(mut self, ids: &[NodeId]) -> Self {
        self.tracks = self
            .tracks
            .into_iter()
            .filter_map(|mut track| {
                if let TrackTarget::Local(i) = track.target {
                    track.target = TrackTarget::Node(*ids.get(i)?);
                }
                Some(track)
            })
            .collect();
        self
    }

    pub fn is_bound(&self) -> bool {
        self.tracks
            .iter()
            .all(|t| matches!(t.target, TrackTarget::Node(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breathing() -> Track {
        Track::new(
            TrackTarget::Local(0),
            TrackProperty::UniformScale,
            vec![0.0, 2.0, 4.0],
            vec![1.0, 1.015, 1.0],
        )
    }

    #[test]
    fn test_track_sampling() {
        let t = breathing();
        assert_eq!(t.sample(-1.0), Some(1.0));
        assert_eq!(t.sample(2.0), Some(1.015));
        assert!((t.sample(1.0).unwrap() - 1.0075).abs() < 1e-6);
        assert_eq!(t.sample(10.0), Some(1.0));
    }

    #[test]
    fn test_step_sampling() {
        let t = breathing().with_interpolation(Interpolation::Step);
        assert_eq!(t.sample(1.9), Some(1.0));
        assert_eq!(t.sample(2.1), Some(1.015));
    }

    #[test]
    fn test_empty_track() {
        let t = Track::new(TrackTarget::Local(0), TrackProperty::UniformScale, vec![], vec![1.0]);
        assert_eq!(t.sample(0.0), None);
        assert_eq!(t.end_time(), 0.0);
    }

    #[test]
    fn test_clip_duration_derived() {
        let clip = Clip::new("professional", 0.0, vec![breathing()]);
        assert_eq!(clip.duration, 4.0);
        let clip = Clip::new("professional", 6.0, vec![breathing()]);
        assert_eq!(clip.duration, 6.0);
    }

    #[test]
    fn test_clip_bind() {
        let mut tracks = vec![breathing()];
        tracks.push(Track::new(
            TrackTarget::Local(5),
            TrackProperty::Rotation(Axis::Z),
            vec![0.0],
            vec![0.0],
        ));
        let ids = [NodeId::new(3, 0)];
        let clip = Clip::new("c", 0.0, tracks).bind(&ids);
        assert_eq!(clip.tracks.len(), 1);
        assert_eq!(clip.tracks[0].target, TrackTarget::Node(NodeId::new(3, 0)));
        assert!(clip.is_bound());
    }
}

use cgmath::{Matrix3, Matrix4, One, Quaternion as CgQuaternion, Vector3, Zero};
use std::fmt;

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type Quaternion = CgQuaternion<f64>;
pub type Position = Vector3<f64>;
pub type Depth = usize;

/// Maximum number of channels a single joint can declare (3 translations + 3 rotations).
pub const MAX_CHANNELS: usize = 6;

const CHANNEL_BITS: u32 = 3;
const CHANNEL_MASK: u32 = 0x7;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// One animated degree of freedom of a joint.
///
/// The discriminants are the 3-bit codes used by [`ChannelLayout`]; `0` marks an empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Xposition = 1,
    Yposition = 2,
    Zposition = 3,
    Xrotation = 4,
    Yrotation = 5,
    Zrotation = 6,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Xposition,
        Channel::Yposition,
        Channel::Zposition,
        Channel::Xrotation,
        Channel::Yrotation,
        Channel::Zrotation,
    ];

    /// Look up a channel by the keyword used in `CHANNELS` lines.
    pub fn from_name(name: &str) -> Option<Channel> {
        Channel::ALL.iter().copied().find(|c| c.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Xposition => "Xposition",
            Channel::Yposition => "Yposition",
            Channel::Zposition => "Zposition",
            Channel::Xrotation => "Xrotation",
            Channel::Yrotation => "Yrotation",
            Channel::Zrotation => "Zrotation",
        }
    }

    pub fn is_rotation(self) -> bool {
        matches!(
            self,
            Channel::Xrotation | Channel::Yrotation | Channel::Zrotation
        )
    }

    fn code(self) -> u32 {
        self as u32
    }

    fn from_code(code: u32) -> Option<Channel> {
        match code {
            1 => Some(Channel::Xposition),
            2 => Some(Channel::Yposition),
            3 => Some(Channel::Zposition),
            4 => Some(Channel::Xrotation),
            5 => Some(Channel::Yrotation),
            6 => Some(Channel::Zrotation),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Ordered list of up to [`MAX_CHANNELS`] channels, packed 3 bits per slot.
///
/// Slot 0 lives in the lowest bits. Iteration order is declaration order, which is also the
/// order motion values are consumed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelLayout {
    packed: u32,
    len: u8,
}

impl ChannelLayout {
    pub fn new() -> Self {
        ChannelLayout::default()
    }

    /// Append a channel. Returns `false` (and leaves the layout untouched) when full.
    pub fn push(&mut self, channel: Channel) -> bool {
        if self.is_full() {
            return false;
        }
        self.packed |= channel.code() << (self.len as u32 * CHANNEL_BITS);
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == MAX_CHANNELS
    }

    pub fn get(&self, slot: usize) -> Option<Channel> {
        if slot >= self.len() {
            return None;
        }
        Channel::from_code((self.packed >> (slot as u32 * CHANNEL_BITS)) & CHANNEL_MASK)
    }

    pub fn iter(&self) -> ChannelIter {
        ChannelIter {
            packed: self.packed,
            remaining: self.len,
        }
    }

    pub fn has_rotation(&self) -> bool {
        self.iter().any(Channel::is_rotation)
    }
}

impl<'a> IntoIterator for &'a ChannelLayout {
    type Item = Channel;
    type IntoIter = ChannelIter;

    fn into_iter(self) -> ChannelIter {
        self.iter()
    }
}

impl FromIterator<Channel> for ChannelLayout {
    /// Collects at most [`MAX_CHANNELS`] channels, the rest are dropped.
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut layout = ChannelLayout::new();
        for channel in iter {
            if !layout.push(channel) {
                break;
            }
        }
        layout
    }
}

/// Decodes a [`ChannelLayout`] one slot at a time by shifting the packed word.
#[derive(Debug, Clone)]
pub struct ChannelIter {
    packed: u32,
    remaining: u8,
}

impl Iterator for ChannelIter {
    type Item = Channel;

    fn next(&mut self) -> Option<Channel> {
        if self.remaining == 0 {
            return None;
        }
        let channel = Channel::from_code(self.packed & CHANNEL_MASK);
        self.packed >>= CHANNEL_BITS;
        self.remaining -= 1;
        channel
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for ChannelIter {}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A rigid transform: translation plus rotation, no scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub offset: Position,
    pub rotation: Quaternion,
}

impl Transform {
    pub fn new(offset: Position, rotation: Quaternion) -> Self {
        Transform { offset, rotation }
    }

    pub fn identity() -> Self {
        Transform {
            offset: Position::zero(),
            rotation: Quaternion::one(),
        }
    }

    /// Express `local` (given relative to `parent`) in the parent's frame.
    pub fn compose(parent: &Transform, local: &Transform) -> Transform {
        Transform {
            offset: parent.offset + parent.rotation * local.offset,
            rotation: parent.rotation * local.rotation,
        }
    }

    /// Column-major 4x4 matrix, rotation in the upper-left 3x3 and translation in the last column.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut matrix = Matrix4::from(Matrix3::from(self.rotation));
        matrix.w = self.offset.extend(1.0);
        matrix
    }

    pub fn to_cols_array(&self) -> [f64; 16] {
        let m = self.to_matrix();
        [
            m.x.x, m.x.y, m.x.z, m.x.w, //
            m.y.x, m.y.y, m.y.z, m.y.w, //
            m.z.x, m.z.y, m.z.z, m.z.w, //
            m.w.x, m.w.y, m.w.z, m.w.w,
        ]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct Joint {
    /// Empty for nameless joints.
    pub name: String,
    pub index: Index,
    pub parent: Option<Index>,
    pub depth: Depth,
    pub children: Vec<Index>,
    pub channels: ChannelLayout,
    /// Rest pose translation from the parent joint.
    pub offset: Position,
    /// Vector to the end of this joint's bone: the explicit End Site, otherwise the mean of
    /// the children's offsets, otherwise zero.
    pub end: Position,
    pub end_site: Option<Position>,
    /// Local sample per frame, `frame_count` long once motion has been read.
    pub motion: Vec<Transform>,
}

impl Joint {
    pub(crate) fn new(name: String, index: Index, depth: Depth) -> Self {
        Joint {
            name,
            index,
            parent: None,
            depth,
            children: Vec::new(),
            channels: ChannelLayout::new(),
            offset: Position::zero(),
            end: Position::zero(),
            end_site: None,
            motion: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A loaded .bvh file: the joint arena plus the frame timeline.
///
/// Joints are stored in the order they were opened in the file, so a parent always comes
/// before its children and the root is at index 0.
#[derive(Debug, Clone)]
pub struct Clip {
    pub(crate) root: Index,
    pub(crate) joints: Vec<Joint>,
    pub(crate) frame_count: usize,
    pub(crate) frame_time: f64,
}

impl Clip {
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, index: Index) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn root(&self) -> &Joint {
        &self.joints[self.root]
    }

    pub fn find_joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|joint| joint.name == name)
    }

    /// Number of frames declared by the file (not necessarily all decoded).
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Seconds per frame.
    pub fn frame_time(&self) -> f64 {
        self.frame_time
    }

    /// Frames per second, rounded. Zero when the frame time is not positive.
    pub fn fps(&self) -> u32 {
        if self.frame_time > 0.0 {
            (1.0 / self.frame_time).round() as u32
        } else {
            0
        }
    }

    pub fn duration(&self) -> f64 {
        self.frame_count as f64 * self.frame_time
    }

    /// Continuous frame coordinate for a point in time, the unit [`Clip::evaluate`] takes.
    pub fn frame_at_time(&self, seconds: f64) -> f64 {
        if self.frame_time > 0.0 {
            seconds / self.frame_time
        } else {
            0.0
        }
    }

    /// Indices from `index` up to and including the root.
    pub fn parent_chain(&self, index: Index) -> Vec<Index> {
        let mut chain = Vec::new();
        let mut current = self.joints.get(index).map(|joint| joint.index);
        while let Some(i) = current {
            chain.push(i);
            current = self.joints[i].parent;
        }
        chain
    }

    /// Returns the kinematic chains like \[\[0,1,2,3\],\[4,5,6,7,8\],\[9,10,11\]\].
    /// A chain breaks whenever the next joint is not one level deeper than the previous one,
    /// so each chain can be drawn as a single line strip starting at its first joint's parent.
    pub fn kinematic_chains(&self) -> Vec<Vec<Index>> {
        let mut chains: Vec<Vec<Index>> = Vec::new();
        let mut chain: Vec<Index> = Vec::new();
        let mut last_depth: Option<Depth> = None;
        for joint in &self.joints {
            if last_depth.map_or(false, |depth| depth + 1 != joint.depth) {
                chains.push(std::mem::take(&mut chain));
            }
            last_depth = Some(joint.depth);
            chain.push(joint.index);
        }
        if !chain.is_empty() {
            chains.push(chain);
        }
        chains
    }
}

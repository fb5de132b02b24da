//! Forward kinematics: local motion samples to world space transforms.

use crate::error::PoseError;
use crate::types::{Clip, Quaternion, Transform};
use crate::utils::{lerp, slerp};
use cgmath::One;

impl Clip {
    /// Evaluate the pose at a continuous frame coordinate `frame` into `pose`, one world
    /// transform per joint index.
    ///
    /// Between two frames the local samples are blended (lerp for translation, slerp for
    /// rotation). Past the last frame the last pose is held; negative coordinates hold the first.
    ///
    /// Only the root takes its translation from the motion data. Every other joint is placed
    /// at its rest offset, whatever its position channels say.
    pub fn evaluate(&self, frame: f64, pose: &mut [Transform]) -> Result<(), PoseError> {
        if pose.len() != self.joints.len() {
            return Err(PoseError::BufferSize {
                expected: self.joints.len(),
                actual: pose.len(),
            });
        }
        self.write_pose(frame, pose);
        Ok(())
    }

    /// Allocating version of [`Clip::evaluate`].
    pub fn pose_at(&self, frame: f64) -> Vec<Transform> {
        let mut pose = vec![Transform::identity(); self.joints.len()];
        self.write_pose(frame, &mut pose);
        pose
    }

    /// `pose` must hold exactly one transform per joint.
    fn write_pose(&self, frame: f64, pose: &mut [Transform]) {
        if self.frame_count == 0 {
            return;
        }

        let last = self.frame_count - 1;
        let floor = frame.floor();
        let (f, t) = if floor.is_nan() || floor < 0.0 {
            (0, 0.0)
        } else if floor >= last as f64 {
            (last, 0.0)
        } else {
            (floor as usize, frame - floor)
        };

        // parents are registered before their children, so one forward pass is enough
        for (i, joint) in self.joints.iter().enumerate() {
            let mut local = if t > 0.0 {
                let a = &joint.motion[f];
                let b = &joint.motion[f + 1];
                Transform::new(lerp(a.offset, b.offset, t), slerp(a.rotation, b.rotation, t))
            } else {
                joint.motion[f]
            };

            pose[i] = match joint.parent {
                Some(parent) => {
                    local.offset = joint.offset;
                    Transform::compose(&pose[parent], &local)
                }
                None => local,
            };
        }
    }

    /// Bind pose: no rotations, every joint at its rest offset from its parent.
    pub fn rest_pose(&self, pose: &mut [Transform]) -> Result<(), PoseError> {
        if pose.len() != self.joints.len() {
            return Err(PoseError::BufferSize {
                expected: self.joints.len(),
                actual: pose.len(),
            });
        }
        for (i, joint) in self.joints.iter().enumerate() {
            let local = Transform::new(joint.offset, Quaternion::one());
            pose[i] = match joint.parent {
                Some(parent) => Transform::compose(&pose[parent], &local),
                None => local,
            };
        }
        Ok(())
    }
}

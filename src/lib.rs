//! Loader and pose evaluator for BioVision Hierarchy (.bvh) motion capture files.
//!
//! A .bvh file has two sections. `HIERARCHY` declares a tree of joints, each with a rest
//! offset from its parent and a list of animated channels. `MOTION` declares the frame count,
//! the frame time and then one line of channel values per frame.
//!
//! ```
//! use bvh_pose::{load_bvh_from_string, Transform};
//!
//! let clip = load_bvh_from_string(
//!     "HIERARCHY
//! ROOT Hips
//! {
//!   OFFSET 0 0 0
//!   CHANNELS 3 Xposition Yposition Zposition
//!   JOINT Spine
//!   {
//!     OFFSET 0 1 0
//!     CHANNELS 1 Yrotation
//!     End Site { OFFSET 0 1 0 }
//!   }
//! }
//! MOTION
//! Frames: 2
//! Frame Time: 0.033333
//! 0 0 0 0
//! 0 0 0 90
//! ",
//! )
//! .unwrap();
//!
//! let mut pose = vec![Transform::identity(); clip.joint_count()];
//! clip.evaluate(0.5, &mut pose).unwrap();
//! let matrix = pose[1].to_cols_array();
//! assert_eq!(matrix[15], 1.0);
//! ```

pub mod error;
mod lexer;
pub mod parse;
mod pose;
pub mod types;
pub mod utils;

pub use error::{LoadError, PoseError};
pub use parse::{load_bvh_from_file, load_bvh_from_string, load_bvh_with_options, LoadOptions};
pub use types::{Channel, ChannelLayout, Clip, Joint, Position, Quaternion, Transform};

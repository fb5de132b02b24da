use crate::error::{LoadError, Result};
use crate::lexer::Lexer;
use crate::types::*;
use crate::utils;
use cgmath::{One, Zero};
use std::path::Path;
use tracing::{debug, trace, warn};

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Knobs for [`load_bvh_with_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fail on an unknown channel name (or a seventh channel) instead of logging a warning and
    /// dropping the rest of that `CHANNELS` line.
    pub strict_channels: bool,
    /// Deepest joint nesting accepted; the root is at depth 0.
    pub max_depth: usize,
    /// Largest `Frames:` value accepted. Every joint stores one sample per declared frame, so
    /// this bounds the allocation made before any motion value is read.
    pub max_frames: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            strict_channels: false,
            max_depth: 256,
            // ten hours at 30 fps
            max_frames: 1 << 20,
        }
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////

struct Parser<'a, 'o> {
    lexer: Lexer<'a>,
    options: &'o LoadOptions,
    joints: Vec<Joint>,
    frame_count: usize,
    frame_time: f64,
}

impl<'a, 'o> Parser<'a, 'o> {
    fn new(src: &'a str, options: &'o LoadOptions) -> Self {
        Parser {
            lexer: Lexer::new(src),
            options,
            joints: Vec::new(),
            frame_count: 0,
            frame_time: 0.0,
        }
    }

    /// Up to three floats; components that fail to parse keep their value from `prev`.
    fn read_vector(&mut self, prev: Position) -> Position {
        let mut v = prev;
        if let Some(x) = self.lexer.float() {
            v.x = x;
        }
        if let Some(y) = self.lexer.float() {
            v.y = y;
        }
        if let Some(z) = self.lexer.float() {
            v.z = z;
        }
        v
    }

    /// Parse one `ROOT`/`JOINT` block, the keyword having been consumed already.
    /// The joint is registered before its children, so indices come out in depth-first pre-order.
    fn parse_joint(&mut self, depth: Depth) -> Result<Index> {
        if depth >= self.options.max_depth {
            return Err(LoadError::TooDeep {
                limit: self.options.max_depth,
                line: self.lexer.line(),
            });
        }

        let name = self.lexer.name().to_string();
        self.lexer.skip_whitespace();
        if !self.lexer.keyword("{") {
            return Err(LoadError::MissingBrace {
                joint: name,
                line: self.lexer.line(),
            });
        }

        let index = self.joints.len();
        trace!(index, depth, name = %name, "joint");
        self.joints.push(Joint::new(name, index, depth));

        let mut child_sum = Position::zero();
        let mut child_count = 0usize;

        loop {
            self.lexer.skip_whitespace();
            if self.lexer.is_eof() {
                return Err(LoadError::UnterminatedJoint {
                    joint: self.joints[index].name.clone(),
                });
            }

            if self.lexer.keyword("OFFSET") {
                let offset = self.read_vector(self.joints[index].offset);
                self.joints[index].offset = offset;
            } else if self.lexer.keyword("CHANNELS") {
                self.parse_channels(index)?;
            } else if self.lexer.keyword("JOINT") {
                let child = self.parse_joint(depth + 1)?;
                self.joints[child].parent = Some(index);
                child_sum += self.joints[child].offset;
                child_count += 1;
                self.joints[index].children.push(child);
            } else if self.lexer.keyword("End Site") {
                self.parse_end_site(index);
            } else if self.lexer.keyword("}") {
                let joint = &mut self.joints[index];
                joint.end = match joint.end_site {
                    Some(end) => end,
                    None if child_count > 0 => child_sum / child_count as f64,
                    None => Position::zero(),
                };
                return Ok(index);
            } else {
                debug!(
                    line = self.lexer.line(),
                    token = self.lexer.peek_token(),
                    "skipping unknown hierarchy line"
                );
                self.lexer.next_line();
            }
        }
    }

    fn parse_channels(&mut self, index: Index) -> Result<()> {
        let declared = self.lexer.integer().unwrap_or(0).max(0) as usize;
        let mut layout = ChannelLayout::new();

        for _ in 0..declared {
            self.lexer.skip_whitespace();
            let token = self.lexer.peek_token();
            let lexer = &mut self.lexer;
            let channel = Channel::ALL
                .iter()
                .copied()
                .find(|channel| lexer.keyword(channel.name()));

            let accepted = match channel {
                Some(channel) => layout.push(channel),
                None => false,
            };
            if accepted {
                continue;
            }

            let joint = &self.joints[index].name;
            if self.options.strict_channels {
                return Err(LoadError::InvalidChannel {
                    name: token.to_string(),
                    joint: joint.clone(),
                    line: self.lexer.line(),
                });
            }
            warn!(
                joint = %joint,
                channel = token,
                line = self.lexer.line(),
                "invalid channel, ignoring the rest of the channel list"
            );
            break;
        }

        self.joints[index].channels = layout;
        Ok(())
    }

    /// `End Site { OFFSET x y z }`, stored on the joint that owns it.
    fn parse_end_site(&mut self, index: Index) {
        self.lexer.skip_whitespace();
        self.lexer.keyword("{");

        let mut end = self.joints[index].end_site.unwrap_or_else(Position::zero);
        loop {
            self.lexer.skip_whitespace();
            if self.lexer.is_eof() || self.lexer.keyword("}") {
                break;
            }
            if self.lexer.keyword("OFFSET") {
                end = self.read_vector(end);
            } else {
                self.lexer.next_line();
            }
        }
        self.joints[index].end_site = Some(end);
    }

    /// `MOTION` section, the keyword having been consumed already.
    fn parse_motion(&mut self) -> Result<()> {
        self.lexer.skip_whitespace();
        if self.lexer.keyword("Frames:") {
            if let Some(frames) = self.lexer.integer() {
                let declared = frames.max(0) as u64;
                let limit = self.options.max_frames;
                self.frame_count = usize::try_from(declared)
                    .ok()
                    .filter(|&frames| frames <= limit)
                    .ok_or(LoadError::TooManyFrames { declared, limit })?;
            }
            self.lexer.skip_whitespace();
        }
        if self.lexer.keyword("Frame Time:") {
            if let Some(frame_time) = self.lexer.float() {
                self.frame_time = frame_time;
            }
            self.lexer.skip_whitespace();
        }

        for joint in self.joints.iter_mut() {
            let mut motion = Vec::new();
            motion
                .try_reserve_exact(self.frame_count)
                .map_err(|_| LoadError::TooManyFrames {
                    declared: self.frame_count as u64,
                    limit: self.options.max_frames,
                })?;
            motion.resize(self.frame_count, Transform::identity());
            joint.motion = motion;
        }

        // a value that fails to parse repeats the previous one, and position channels a joint
        // does not declare keep whatever the previous joint left there
        let mut value = 0.0;
        let mut offset = Position::zero();
        let mut decoded = 0;

        'frames: for frame in 0..self.frame_count {
            for joint in self.joints.iter_mut() {
                let mut rotation = Quaternion::one();

                for channel in joint.channels.iter() {
                    if self.lexer.at_end() {
                        break 'frames;
                    }
                    if let Some(v) = self.lexer.float() {
                        value = v;
                    }
                    match channel {
                        Channel::Xposition => offset.x = value,
                        Channel::Yposition => offset.y = value,
                        Channel::Zposition => offset.z = value,
                        _ => rotation = rotation * utils::axis_rotation(channel, value),
                    }
                }

                joint.motion[frame] = Transform::new(offset, rotation);
            }
            decoded += 1;
            self.lexer.next_line();
        }

        if decoded < self.frame_count {
            warn!(
                declared = self.frame_count,
                decoded, "motion data ends early, remaining frames stay at identity"
            );
        }
        Ok(())
    }

    fn parse_file(mut self) -> Result<Clip> {
        let mut root = None;

        loop {
            self.lexer.skip_whitespace();
            if self.lexer.is_eof() {
                break;
            }

            if root.is_none() && self.lexer.keyword("HIERARCHY") {
                self.lexer.next_line();
                if !self.lexer.keyword("ROOT") {
                    return Err(LoadError::MissingRoot {
                        line: self.lexer.line(),
                    });
                }
                root = Some(self.parse_joint(0)?);
            } else if self.lexer.keyword("MOTION") {
                if root.is_none() {
                    return Err(LoadError::MotionBeforeHierarchy {
                        line: self.lexer.line(),
                    });
                }
                self.parse_motion()?;
            } else {
                debug!(
                    line = self.lexer.line(),
                    token = self.lexer.peek_token(),
                    "skipping unexpected line"
                );
                self.lexer.next_line();
            }
        }

        let root = root.ok_or(LoadError::MissingRoot {
            line: self.lexer.line(),
        })?;
        if self.frame_count == 0 {
            return Err(LoadError::NoFrames);
        }

        debug!(
            joints = self.joints.len(),
            frames = self.frame_count,
            frame_time = self.frame_time,
            "loaded bvh clip"
        );

        Ok(Clip {
            root,
            joints: self.joints,
            frame_count: self.frame_count,
            frame_time: self.frame_time,
        })
    }
}

//////////////////////////////////////////////////////////////// PUBLIC ////////////////////////////////////////////////////////////////

/// load a bvh file from a file path
pub fn load_bvh_from_file<P: AsRef<Path>>(file_path: P) -> Result<Clip> {
    let contents = std::fs::read_to_string(file_path)?;
    load_bvh_from_string(&contents)
}

/// load a bvh file from a string
pub fn load_bvh_from_string(bvh_string: &str) -> Result<Clip> {
    load_bvh_with_options(bvh_string, &LoadOptions::default())
}

/// load a bvh file from a string with non-default parsing options
pub fn load_bvh_with_options(bvh_string: &str, options: &LoadOptions) -> Result<Clip> {
    Parser::new(bvh_string, options).parse_file()
}

///////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ARMS: &str = "HIERARCHY
ROOT Chest
{
  OFFSET 0 10 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT LeftArm
  {
    OFFSET 2 0 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET 3 0 0
    }
  }
  JOINT RightArm
  {
    OFFSET 0 2 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET -3 0 0
    }
  }
}
MOTION
Frames: 1
Frame Time: 0.0083333
1 2 3 0 0 0 0 0 0 0 0 0
";

    fn parse_hierarchy(src: &str) -> Result<Vec<Joint>> {
        let options = LoadOptions::default();
        let mut parser = Parser::new(src, &options);
        parser.parse_joint(0)?;
        Ok(parser.joints)
    }

    #[test]
    fn end_is_mean_of_children() {
        let clip = load_bvh_from_string(ARMS).unwrap();
        let chest = clip.root();

        assert_eq!(chest.children, vec![1, 2]);
        assert!(chest.end_site.is_none());
        assert_relative_eq!(chest.end, Position::new(1.0, 1.0, 0.0));
        assert_relative_eq!(clip.joints()[2].end, Position::new(-3.0, 0.0, 0.0));
    }

    #[test]
    fn channels_keep_declared_order() {
        let clip = load_bvh_from_string(ARMS).unwrap();
        assert_eq!(
            clip.root().channels.iter().collect::<Vec<_>>(),
            vec![
                Channel::Xposition,
                Channel::Yposition,
                Channel::Zposition,
                Channel::Zrotation,
                Channel::Xrotation,
                Channel::Yrotation,
            ]
        );
    }

    #[test]
    fn unknown_channel_truncates_layout() {
        let joints = parse_hierarchy(
            "Hips {\n  CHANNELS 3 Xrotation Wrotation Zrotation\n  OFFSET 1 2 3\n}",
        )
        .unwrap();

        assert_eq!(
            joints[0].channels.iter().collect::<Vec<_>>(),
            vec![Channel::Xrotation]
        );
        // the rest of the CHANNELS line is skipped, parsing carries on
        assert_relative_eq!(joints[0].offset, Position::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn unknown_channel_is_an_error_when_strict() {
        let options = LoadOptions {
            strict_channels: true,
            ..LoadOptions::default()
        };
        let src = ARMS.replace("Zrotation Xrotation Yrotation\n    End", "Zrotation Qrotation Yrotation\n    End");
        let err = load_bvh_with_options(&src, &options).unwrap_err();

        match err {
            LoadError::InvalidChannel { name, joint, .. } => {
                assert_eq!(name, "Qrotation");
                assert_eq!(joint, "LeftArm");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn seventh_channel_is_dropped() {
        let joints = parse_hierarchy(
            "Hips {\n  CHANNELS 7 Xposition Yposition Zposition Xrotation Yrotation Zrotation Xrotation\n}",
        )
        .unwrap();
        assert_eq!(joints[0].channels.len(), MAX_CHANNELS);
    }

    #[test]
    fn unknown_directives_are_skipped() {
        let joints = parse_hierarchy("Hips {\n  SCALE 2 2 2\n  OFFSET 0 1 0\n}").unwrap();
        assert_relative_eq!(joints[0].offset, Position::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn missing_brace_fails() {
        let err = parse_hierarchy("Hips\n  OFFSET 0 0 0\n}").unwrap_err();
        assert!(matches!(err, LoadError::MissingBrace { ref joint, line: 2 } if joint == "Hips"));
    }

    #[test]
    fn child_failure_fails_parent() {
        let err = parse_hierarchy("Hips {\n  JOINT Spine\n  OFFSET 0 1 0\n}\n}").unwrap_err();
        assert!(matches!(err, LoadError::MissingBrace { ref joint, .. } if joint == "Spine"));
    }

    #[test]
    fn unterminated_joint_fails() {
        let err = parse_hierarchy("Hips {\n  OFFSET 0 1 0\n").unwrap_err();
        assert!(matches!(err, LoadError::UnterminatedJoint { ref joint } if joint == "Hips"));
    }

    #[test]
    fn nesting_limit() {
        let options = LoadOptions {
            max_depth: 2,
            ..LoadOptions::default()
        };
        let src = "HIERARCHY\nROOT A\n{\n JOINT B\n {\n  JOINT C\n  {\n  }\n }\n}\nMOTION\nFrames: 1\nFrame Time: 1\n\n";
        let err = load_bvh_with_options(src, &options).unwrap_err();
        assert!(matches!(err, LoadError::TooDeep { limit: 2, .. }));
    }

    #[test]
    fn empty_name_is_allowed() {
        let joints = parse_hierarchy(" {\n}").unwrap();
        assert_eq!(joints[0].name, "");
    }

    #[test]
    fn end_site_wins_over_children() {
        let joints = parse_hierarchy(
            "Hips {\n  End Site { OFFSET 0 0 5 }\n  JOINT A { OFFSET 4 0 0 }\n}",
        )
        .unwrap();
        assert_relative_eq!(joints[0].end, Position::new(0.0, 0.0, 5.0));
        assert_eq!(joints[0].children, vec![1]);
    }

    #[test]
    fn motion_reads_values_across_line_breaks() {
        let src = ARMS.replace("1 2 3 0 0 0 0 0 0 0 0 0\n", "1 2 3\n0 0 90 0 0 0 0 0 0\n");
        let clip = load_bvh_from_string(&src).unwrap();
        let root = &clip.root().motion[0];
        assert_relative_eq!(root.offset, Position::new(1.0, 2.0, 3.0));
        assert_relative_eq!(
            root.rotation,
            utils::axis_rotation(Channel::Yrotation, 90.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn truncated_motion_leaves_identity_frames() {
        let src = ARMS.replace("Frames: 1", "Frames: 3");
        let clip = load_bvh_from_string(&src).unwrap();
        assert_eq!(clip.frame_count(), 3);
        for joint in clip.joints() {
            assert_eq!(joint.motion.len(), 3);
            assert_eq!(joint.motion[2], Transform::identity());
        }
        assert_relative_eq!(clip.root().motion[0].offset, Position::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn zero_frames_is_a_failure() {
        let src = ARMS.replace("Frames: 1", "Frames: 0");
        assert!(matches!(load_bvh_from_string(&src), Err(LoadError::NoFrames)));
    }

    #[test]
    fn missing_root_is_a_failure() {
        let src = "HIERARCHY\nJOINT Hips\n{\n}\nMOTION\nFrames: 1\nFrame Time: 1\n0\n";
        assert!(matches!(
            load_bvh_from_string(src),
            Err(LoadError::MissingRoot { .. })
        ));
        assert!(matches!(
            load_bvh_from_string(""),
            Err(LoadError::MissingRoot { .. })
        ));
    }

    fn two_joints(root_channels: &str, child_channels: &str, motion: &str) -> String {
        format!(
            "HIERARCHY\nROOT A\n{{\n  OFFSET 0 0 0\n  CHANNELS {root_channels}\n  JOINT B\n  {{\n    OFFSET 0 1 0\n    CHANNELS {child_channels}\n  }}\n}}\nMOTION\n{motion}"
        )
    }

    #[test]
    fn undeclared_position_channels_carry_over() {
        let src = two_joints(
            "3 Xposition Yposition Zposition",
            "1 Xposition",
            "Frames: 1\nFrame Time: 0.1\n1 2 3 4\n",
        );
        let clip = load_bvh_from_string(&src).unwrap();
        assert_relative_eq!(clip.root().motion[0].offset, Position::new(1.0, 2.0, 3.0));
        assert_relative_eq!(clip.joints()[1].motion[0].offset, Position::new(4.0, 2.0, 3.0));
    }

    #[test]
    fn bad_motion_value_repeats_previous_and_ends_frame() {
        let src = two_joints(
            "3 Xposition Yposition Zposition",
            "1 Xrotation",
            "Frames: 2\nFrame Time: 0.1\n1 2 x 4\n5 6 7 8\n",
        );
        let clip = load_bvh_from_string(&src).unwrap();
        let (a, b) = (&clip.joints()[0], &clip.joints()[1]);

        // the cursor stays on `x`, so every remaining slot of the frame reuses 2
        assert_relative_eq!(a.motion[0].offset, Position::new(1.0, 2.0, 2.0));
        assert_relative_eq!(
            b.motion[0].rotation,
            utils::axis_rotation(Channel::Xrotation, 2.0),
            epsilon = 1e-12
        );

        assert_relative_eq!(a.motion[1].offset, Position::new(5.0, 6.0, 7.0));
        assert_relative_eq!(
            b.motion[1].rotation,
            utils::axis_rotation(Channel::Xrotation, 8.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn truncated_layout_shifts_values_onto_next_joint() {
        let src = two_joints(
            "3 Xrotation Wrotation Zrotation",
            "1 Yrotation",
            "Frames: 1\nFrame Time: 0.1\n10 20 30\n",
        );
        let clip = load_bvh_from_string(&src).unwrap();

        assert_relative_eq!(
            clip.root().motion[0].rotation,
            utils::axis_rotation(Channel::Xrotation, 10.0),
            epsilon = 1e-12
        );
        // the value written for the dropped Wrotation lands on B
        assert_relative_eq!(
            clip.joints()[1].motion[0].rotation,
            utils::axis_rotation(Channel::Yrotation, 20.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn motion_before_hierarchy_is_a_failure() {
        let src = "MOTION\nFrames: 1\nFrame Time: 0.1\njunk\nHIERARCHY\nROOT A\n{\n  CHANNELS 1 Xrotation\n}\n";
        assert!(matches!(
            load_bvh_from_string(src),
            Err(LoadError::MotionBeforeHierarchy { line: 1 })
        ));
    }

    #[test]
    fn frame_count_is_capped() {
        let huge = ARMS.replace("Frames: 1", "Frames: 4000000000000000000");
        match load_bvh_from_string(&huge) {
            Err(LoadError::TooManyFrames { declared, limit }) => {
                assert_eq!(declared, 4_000_000_000_000_000_000);
                assert_eq!(limit, LoadOptions::default().max_frames);
            }
            other => panic!("expected a frame count error, got {other:?}"),
        }

        let options = LoadOptions {
            max_frames: 2,
            ..LoadOptions::default()
        };
        let three = ARMS.replace("Frames: 1", "Frames: 3");
        assert!(matches!(
            load_bvh_with_options(&three, &options),
            Err(LoadError::TooManyFrames { declared: 3, limit: 2 })
        ));
        let two = ARMS.replace("Frames: 1", "Frames: 2");
        assert_eq!(load_bvh_with_options(&two, &options).unwrap().frame_count(), 2);
    }
}

//! Error types for loading and evaluating .bvh clips.

use thiserror::Error;

/// Reasons a .bvh file could not be turned into a [`Clip`](crate::Clip).
///
/// Any of these discards the whole clip; nothing partially parsed is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No `ROOT` joint after `HIERARCHY`, or no hierarchy at all.
    #[error("no ROOT joint found (line {line})")]
    MissingRoot { line: usize },

    /// A joint name was not followed by an opening brace.
    #[error("expected '{{' after joint '{joint}' (line {line})")]
    MissingBrace { joint: String, line: usize },

    /// Input ended before the joint block was closed.
    #[error("joint '{joint}' is not closed before end of input")]
    UnterminatedJoint { joint: String },

    /// Joint nesting exceeded [`LoadOptions::max_depth`](crate::LoadOptions::max_depth).
    #[error("joint hierarchy deeper than {limit} (line {line})")]
    TooDeep { limit: usize, line: usize },

    /// Unknown or excess channel, reported only with strict channel parsing.
    #[error("invalid channel '{name}' on joint '{joint}' (line {line})")]
    InvalidChannel {
        name: String,
        joint: String,
        line: usize,
    },

    /// The skeleton parsed but the motion section declared no frames.
    #[error("motion section declares no frames")]
    NoFrames,

    /// A `MOTION` section appeared before the joints it animates.
    #[error("MOTION section before HIERARCHY (line {line})")]
    MotionBeforeHierarchy { line: usize },

    /// The declared frame count is above [`LoadOptions::max_frames`](crate::LoadOptions::max_frames)
    /// or could not be allocated.
    #[error("motion section declares {declared} frames, at most {limit} are accepted")]
    TooManyFrames { declared: u64, limit: usize },

    #[error("failed to read bvh file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from [`Clip::evaluate`](crate::Clip::evaluate).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoseError {
    #[error("pose buffer holds {actual} transforms but the clip has {expected} joints")]
    BufferSize { expected: usize, actual: usize },
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;

//! Multi-frame control messages

use std::collections::VecDeque;

/// A message on the control pipe: an ordered list of string frames
///
/// The first frame is the command name, the rest are positional arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlMessage {
    frames: VecDeque<String>,
}

impl ControlMessage {
    /// Create a message with no frames
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a message from its frames
    pub fn from_frames<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        frames.into_iter().collect()
    }

    /// Append a frame
    pub fn push_str(&mut self, frame: impl Into<String>) {
        self.frames.push_back(frame.into());
    }

    /// Remove and return the first frame
    ///
    /// `None` means the frame is absent, which is not the same as `Some("")`.
    pub fn pop_str(&mut self) -> Option<String> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ControlMessage {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().map(Into::into).collect(),
        }
    }
}

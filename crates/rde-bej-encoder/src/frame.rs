//! Explicit stream stack for nested BEJ containers.
//!
//! The original reference encoder threads a single mutable global stack of
//! in-progress byte buffers through its recursive encode functions. Here the
//! stack is an explicit, owned value passed by `&mut` reference instead, but
//! the push/pop discipline is the same: open a fresh buffer before
//! recursing into a `Set`/`Array`/`PropertyAnnotation`, then fold it back
//! into its parent, length-prefixed, once the children are encoded.

use rde_nnint as nnint;
use rde_sflv::{BejFormat, Seq, ValueFlags, pack_sflv};

/// One level of in-progress container body.
struct Frame {
    bytes: Vec<u8>,
    /// Whether the body is prefixed with an `nnint` child count before being
    /// folded into its parent (`Set`/`Array`) or emitted bare
    /// (`PropertyAnnotation`'s inner value stream).
    counted: bool,
}

/// Stack of in-progress container bodies, innermost last.
pub struct FrameBuilder {
    stack: Vec<Frame>,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![Frame {
                bytes: Vec::new(),
                counted: false,
            }],
        }
    }

    /// Opens a new `Set`/`Array` body that will be prefixed with
    /// `child_count` once closed.
    pub fn open_container(&mut self, child_count: u64) {
        let mut bytes = Vec::new();
        nnint::pack(&mut bytes, child_count);
        self.stack.push(Frame {
            bytes,
            counted: true,
        });
    }

    /// Opens a `PropertyAnnotation` inner value stream: no count prefix.
    pub fn open_raw(&mut self) {
        self.stack.push(Frame {
            bytes: Vec::new(),
            counted: false,
        });
    }

    /// Returns the byte buffer for the currently open frame, for direct
    /// `pack_sflv` writes of scalar values.
    pub fn current(&mut self) -> &mut Vec<u8> {
        &mut self.stack.last_mut().expect("frame stack is never empty").bytes
    }

    /// Closes the innermost frame and appends it to its parent as one SFLV
    /// element with the given `seq`/`format`/`flags`.
    pub fn close_container(&mut self, seq: Seq, format: BejFormat, flags: ValueFlags) {
        let frame = self.stack.pop().expect("close without matching open");
        debug_assert!(
            !frame.counted || format.is_container(),
            "counted frame closed with a non-container format"
        );
        let parent = self.current();
        pack_sflv(parent, seq, format, flags, &frame.bytes);
    }

    /// Consumes the builder, returning the root frame's bytes.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.stack.pop().expect("frame stack is never empty").bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_container_folds_into_parent() {
        let mut frame = FrameBuilder::new();
        frame.open_container(1);
        frame.open_container(0);
        frame.close_container(Seq::major(0), BejFormat::Set, ValueFlags::default());
        frame.close_container(Seq::major(0), BejFormat::Set, ValueFlags::default());
        let bytes = frame.finish();
        assert!(!bytes.is_empty());
    }
}

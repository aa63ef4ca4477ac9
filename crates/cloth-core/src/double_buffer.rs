/// Start/target pair for data that is interpolated across one frame.
///
/// The start values describe the state at the beginning of the frame and the
/// target values the state at its end. An empty target means "no change this
/// frame" and readers fall back to the start values. At the end of each frame
/// [`DoubleBuffer::pop`] promotes the target to the new start.
#[derive(Clone, Debug, Default)]
pub struct DoubleBuffer<T> {
    start: Vec<T>,
    target: Vec<T>,
}

impl<T: Copy + Default> DoubleBuffer<T> {
    pub fn new() -> Self {
        Self {
            start: Vec::new(),
            target: Vec::new(),
        }
    }

    pub fn start(&self) -> &[T] {
        &self.start
    }

    pub fn target(&self) -> &[T] {
        &self.target
    }

    /// Number of elements in the start buffer.
    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    pub fn has_target(&self) -> bool {
        !self.target.is_empty()
    }

    /// Values at the end of the frame: the target, or the start if unset.
    pub fn end_values(&self) -> &[T] {
        if self.target.is_empty() {
            &self.start
        } else {
            &self.target
        }
    }

    /// Writable target of `n` elements.
    ///
    /// The first push after a clear writes directly into the start buffer so
    /// that a freshly enabled constraint does not interpolate from nothing.
    pub fn push(&mut self, n: usize) -> &mut [T] {
        self.target.resize(n, T::default());
        if self.start.is_empty() {
            std::mem::swap(&mut self.start, &mut self.target);
            return &mut self.start;
        }
        &mut self.target
    }

    pub fn clear(&mut self) {
        self.start.clear();
        self.target.clear();
    }

    /// Promote the target to the start. Does nothing if there is no target.
    pub fn pop(&mut self) {
        if !self.target.is_empty() {
            std::mem::swap(&mut self.start, &mut self.target);
            self.target.clear();
        }
    }

    /// Replace both buffers at once.
    pub fn assign(&mut self, start: &[T], target: &[T]) {
        self.start.clear();
        self.start.extend_from_slice(start);
        self.target.clear();
        self.target.extend_from_slice(target);
    }

    /// Replace `[first, last)` with `items`, returning the change in length.
    ///
    /// If the buffer was empty the items become the start values. Otherwise
    /// the target is materialised from the start, the replaced range is
    /// written to the target so it interpolates, and elements that are
    /// inserted or removed are applied to both buffers.
    pub(crate) fn replace_range(&mut self, items: &[T], first: usize, last: usize) -> isize {
        let old_len = self.start.len();
        debug_assert!(first <= last && last <= old_len);
        let new_len = items.len() + old_len - (last - first);
        if old_len == 0 {
            self.start.clear();
            self.start.extend_from_slice(items);
            self.target.clear();
            return new_len as isize;
        }

        if self.target.len() < old_len {
            let from = self.target.len();
            self.target.extend_from_slice(&self.start[from..old_len]);
        }

        let delta = new_len as isize - old_len as isize;
        if delta > 0 {
            let inserted = &items[last - first..];
            self.start.splice(last..last, inserted.iter().copied());
            self.target.splice(last..last, inserted.iter().copied());
        } else if delta < 0 {
            let from = (last as isize + delta) as usize;
            self.start.drain(from..last);
            self.target.drain(from..last);
        }

        self.target[first..first + items.len()].copy_from_slice(items);
        delta
    }
}

//! The small slice of run-length machinery this crate needs: appending an item to a
//! list while merging it into the tail whenever the two can be represented as one.
//!
//! Operation component lists must stay in normalized form (no two adjacent
//! components which could be merged), and routing every push through here is what
//! maintains that.

use smallvec::{Array, SmallVec};

pub(crate) trait MergableSpan {
    /// Can `other` be appended to the end of self, yielding a single combined span?
    fn can_append(&self, other: &Self) -> bool;
    fn append(&mut self, other: Self);
}

pub(crate) trait AppendRle<T: MergableSpan> {
    /// Push an item, merging it into the last element when possible. Returns true
    /// if the item was merged rather than pushed.
    fn push_rle(&mut self, item: T) -> bool;
}

impl<T: MergableSpan, A: Array<Item = T>> AppendRle<T> for SmallVec<A> {
    fn push_rle(&mut self, item: T) -> bool {
        if let Some(last) = self.last_mut() {
            if last.can_append(&item) {
                last.append(item);
                return true;
            }
        }
        self.push(item);
        false
    }
}

impl<T: MergableSpan> AppendRle<T> for Vec<T> {
    fn push_rle(&mut self, item: T) -> bool {
        if let Some(last) = self.last_mut() {
            if last.can_append(&item) {
                last.append(item);
                return true;
            }
        }
        self.push(item);
        false
    }
}

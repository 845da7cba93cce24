//! Cursor metadata that rides along with operations on the undo stacks.
//!
//! Everything here is an immutable value: transforming or composing returns a new
//! object. That's what breaks the would-be cycle between metadata holding cursors
//! and cursors transforming through the operations that carry the metadata.

use crate::cursor::Cursor;
use crate::error::OtError;
use crate::operation::TextOperation;

/// Where the cursor was before an operation ran, and where it ended up after.
/// Undo uses `cursor_after` of the stored inverse to put the cursor back.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct OpMeta {
    pub cursor_before: Option<Cursor>,
    pub cursor_after: Option<Cursor>,
}

impl OpMeta {
    pub fn new(cursor_before: Option<Cursor>, cursor_after: Option<Cursor>) -> Self {
        OpMeta { cursor_before, cursor_after }
    }

    pub fn invert(&self) -> OpMeta {
        OpMeta { cursor_before: self.cursor_after, cursor_after: self.cursor_before }
    }

    pub fn compose(&self, other: &OpMeta) -> OpMeta {
        OpMeta { cursor_before: self.cursor_before, cursor_after: other.cursor_after }
    }

    pub fn transform(&self, op: &TextOperation) -> OpMeta {
        OpMeta {
            cursor_before: self.cursor_before.map(|c| c.transform(op)),
            cursor_after: self.cursor_after.map(|c| c.transform(op)),
        }
    }
}

/// An operation bundled with optional metadata. The algebra delegates to the inner
/// operation while keeping the metadata consistent through every rewrite.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WrappedOp {
    pub op: TextOperation,
    pub meta: Option<OpMeta>,
}

impl WrappedOp {
    pub fn new(op: TextOperation, meta: Option<OpMeta>) -> Self {
        WrappedOp { op, meta }
    }

    pub fn apply(&self, doc: &str) -> Result<String, OtError> {
        self.op.apply(doc)
    }

    pub fn invert(&self, doc: &str) -> Result<WrappedOp, OtError> {
        Ok(WrappedOp {
            op: self.op.invert(doc)?,
            meta: self.meta.as_ref().map(OpMeta::invert),
        })
    }

    pub fn compose(&self, other: &WrappedOp) -> Result<WrappedOp, OtError> {
        let meta = match (&self.meta, &other.meta) {
            (None, None) => None,
            (a, b) => Some(OpMeta {
                cursor_before: a.and_then(|m| m.cursor_before),
                cursor_after: b.and_then(|m| m.cursor_after),
            }),
        };
        Ok(WrappedOp { op: self.op.compose(&other.op)?, meta })
    }

    /// Transform against a concurrent plain operation. Returns the rewritten
    /// wrapped operation and the rewritten other side, so stacks of wrapped ops can
    /// thread the remote operation through entry by entry.
    pub fn transform(&self, other: &TextOperation) -> Result<(WrappedOp, TextOperation), OtError> {
        let (op_prime, other_prime) = self.op.transform(other)?;
        let meta = self.meta.as_ref().map(|m| m.transform(other));
        Ok((WrappedOp { op: op_prime, meta }, other_prime))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn insert_at(pos: usize, s: &str, tail: usize) -> TextOperation {
        let mut op = TextOperation::new();
        op.retain(pos).insert(s).retain(tail);
        op
    }

    #[test]
    fn invert_swaps_cursors() {
        let meta = OpMeta::new(Some(Cursor::collapsed(0)), Some(Cursor::collapsed(5)));
        let inverted = meta.invert();
        assert_eq!(inverted.cursor_before, Some(Cursor::collapsed(5)));
        assert_eq!(inverted.cursor_after, Some(Cursor::collapsed(0)));
    }

    #[test]
    fn compose_spans_both_operations() {
        let a = OpMeta::new(Some(Cursor::collapsed(0)), Some(Cursor::collapsed(1)));
        let b = OpMeta::new(Some(Cursor::collapsed(1)), Some(Cursor::collapsed(2)));
        let c = a.compose(&b);
        assert_eq!(c.cursor_before, Some(Cursor::collapsed(0)));
        assert_eq!(c.cursor_after, Some(Cursor::collapsed(2)));
    }

    #[test]
    fn transform_moves_both_cursors() {
        let meta = OpMeta::new(Some(Cursor::collapsed(2)), Some(Cursor::collapsed(4)));
        let remote = insert_at(0, "zz", 5);
        let transformed = meta.transform(&remote);
        assert_eq!(transformed.cursor_before, Some(Cursor::collapsed(4)));
        assert_eq!(transformed.cursor_after, Some(Cursor::collapsed(6)));
    }

    #[test]
    fn wrapped_transform_threads_metadata() {
        let mut local = TextOperation::new();
        local.retain(2).insert("x").retain(3);
        let wrapped = WrappedOp::new(
            local,
            Some(OpMeta::new(Some(Cursor::collapsed(2)), Some(Cursor::collapsed(3)))),
        );
        let remote = insert_at(0, "ab", 5);
        let (wrapped_prime, remote_prime) = wrapped.transform(&remote).unwrap();
        assert_eq!(
            wrapped_prime.meta.unwrap().cursor_before,
            Some(Cursor::collapsed(4))
        );
        // The remote op now spans the locally inserted character too.
        assert_eq!(remote_prime.base_len(), 6);
    }

    #[test]
    fn wrapped_compose_merges_metadata() {
        let mut a = TextOperation::new();
        a.insert("a");
        let mut b = TextOperation::new();
        b.retain(1).insert("b");
        let wa = WrappedOp::new(a, Some(OpMeta::new(Some(Cursor::collapsed(0)), Some(Cursor::collapsed(1)))));
        let wb = WrappedOp::new(b, Some(OpMeta::new(Some(Cursor::collapsed(1)), Some(Cursor::collapsed(2)))));
        let composed = wa.compose(&wb).unwrap();
        assert_eq!(composed.apply("").unwrap(), "ab");
        let meta = composed.meta.unwrap();
        assert_eq!(meta.cursor_before, Some(Cursor::collapsed(0)));
        assert_eq!(meta.cursor_after, Some(Cursor::collapsed(2)));
    }
}

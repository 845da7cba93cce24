//! The text operation algebra.
//!
//! An edit is a walk over the document: retain some characters, insert new ones,
//! delete some. A [`TextOperation`] is the normalized sequence of those components,
//! and the functions here (`apply`, `invert`, `compose`, `transform`) are total over
//! operations whose lengths line up — everything else is an error, never a panic.
//!
//! Transform is the interesting one: given two operations made concurrently against
//! the same document, it rewrites both so each can run after the other and the
//! results converge. See the note on `transform` for the tie-break rules.

use jumprope::JumpRope;
use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::attributes::{compose_attrs, opt_attrs, transform_attrs, AttrValue, Attrs};
use crate::error::OtError;
use crate::rle::{AppendRle, MergableSpan};
use crate::unicount::{chars_to_bytes, count_chars, take_chars};

/// One component of an operation. Lengths are in characters (unicode scalar values);
/// host editors which count in utf-16 units must convert at the adapter boundary.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OpComponent {
    /// Skip over the next n characters, optionally changing their attributes.
    Retain(usize, Option<Attrs>),
    /// Insert text at the current position.
    Insert(SmartString, Option<Attrs>),
    /// Remove the next n characters.
    Delete(usize),
}

use OpComponent::*;

impl OpComponent {
    /// How many positions this component spans. For inserts that's the length of the
    /// new text; for retain/delete it's the stretch of the base document consumed.
    pub fn len(&self) -> usize {
        match self {
            Retain(n, _) | Delete(n) => *n,
            Insert(s, _) => count_chars(s),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_retain(&self) -> bool {
        matches!(self, Retain(..))
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Insert(..))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Delete(_))
    }

    pub fn attributes(&self) -> Option<&Attrs> {
        match self {
            Retain(_, attrs) | Insert(_, attrs) => attrs.as_ref(),
            Delete(_) => None,
        }
    }

    pub fn has_empty_attributes(&self) -> bool {
        self.attributes().is_none()
    }

    pub fn attributes_equal(&self, other: &OpComponent) -> bool {
        self.attributes() == other.attributes()
    }

    /// Truncate self to `at` characters, returning the cut-off remainder.
    pub(crate) fn truncate(&mut self, at: usize) -> OpComponent {
        debug_assert!(at > 0 && at < self.len());
        match self {
            Retain(n, attrs) => {
                let remainder = Retain(*n - at, attrs.clone());
                *n = at;
                remainder
            }
            Delete(n) => {
                let remainder = Delete(*n - at);
                *n = at;
                remainder
            }
            Insert(s, attrs) => {
                let byte_pos = chars_to_bytes(s, at);
                Insert(s.split_off(byte_pos), attrs.clone())
            }
        }
    }
}

impl MergableSpan for OpComponent {
    fn can_append(&self, other: &Self) -> bool {
        match (self, other) {
            (Retain(_, a), Retain(_, b)) => a == b,
            (Insert(_, a), Insert(_, b)) => a == b,
            (Delete(_), Delete(_)) => true,
            _ => false,
        }
    }

    fn append(&mut self, other: Self) {
        match (self, other) {
            (Retain(n, _), Retain(m, _)) | (Delete(n), Delete(m)) => *n += m,
            (Insert(s, _), Insert(t, _)) => s.push_str(&t),
            _ => unreachable!("can_append checked"),
        }
    }
}

/// A normalized sequence of edit components plus the two derived lengths:
/// `base_len` is the length of a document this operation applies to, `target_len`
/// the length of the document it produces.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct TextOperation {
    ops: SmallVec<[OpComponent; 2]>,
    base_len: usize,
    target_len: usize,
}

impl TextOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn components(&self) -> &[OpComponent] {
        &self.ops
    }

    pub fn base_len(&self) -> usize {
        self.base_len
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// True when applying this operation changes nothing.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(|c| matches!(c, Retain(_, None)))
    }

    /// Skip `n` characters.
    pub fn retain(&mut self, n: usize) -> &mut Self {
        self.retain_with(n, None)
    }

    /// Skip `n` characters, applying an attribute change to them.
    pub fn retain_with(&mut self, n: usize, attrs: Option<Attrs>) -> &mut Self {
        if n == 0 {
            return self;
        }
        self.base_len += n;
        self.target_len += n;
        let attrs = attrs.and_then(opt_attrs);
        self.ops.push_rle(Retain(n, attrs));
        self
    }

    /// Insert text at the current position.
    pub fn insert(&mut self, s: &str) -> &mut Self {
        self.insert_with(s, None)
    }

    /// Insert attributed text at the current position.
    ///
    /// When the previous component is a delete, the insert is placed in front of it.
    /// Insert-then-delete and delete-then-insert at one position are the same edit,
    /// and pinning one order keeps equal operations structurally equal.
    pub fn insert_with(&mut self, s: &str, attrs: Option<Attrs>) -> &mut Self {
        if s.is_empty() {
            return self;
        }
        self.target_len += count_chars(s);
        let attrs = attrs.and_then(opt_attrs);
        let new_last = match self.ops.as_mut_slice() {
            [.., Insert(last, last_attrs)] if *last_attrs == attrs => {
                last.push_str(s);
                return self;
            }
            [.., Insert(prev, prev_attrs), Delete(_)] if *prev_attrs == attrs => {
                prev.push_str(s);
                return self;
            }
            [.., last @ Delete(_)] => {
                let deleted = last.clone();
                *last = Insert(s.into(), attrs);
                deleted
            }
            _ => Insert(s.into(), attrs),
        };
        self.ops.push(new_last);
        self
    }

    /// Remove the next `n` characters.
    pub fn delete(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        self.base_len += n;
        self.ops.push_rle(Delete(n));
        self
    }

    /// Append a component through the normalizing builders.
    pub fn add(&mut self, component: OpComponent) -> &mut Self {
        match component {
            Retain(n, attrs) => self.retain_with(n, attrs),
            Insert(s, attrs) => self.insert_with(&s, attrs),
            Delete(n) => self.delete(n),
        }
    }

    /// Apply this operation to a document, producing the new document.
    pub fn apply(&self, doc: &str) -> Result<String, OtError> {
        let doc_len = count_chars(doc);
        if doc_len != self.base_len {
            return Err(OtError::LengthMismatch { expected: self.base_len, actual: doc_len });
        }

        let mut result = String::with_capacity(doc.len());
        let mut rest = doc;
        let mut remaining = doc_len;
        for c in &self.ops {
            match c {
                Retain(n, _) => {
                    if *n > remaining {
                        return Err(OtError::DocumentTooShort);
                    }
                    result.push_str(take_chars(&mut rest, *n));
                    remaining -= n;
                }
                Insert(s, _) => result.push_str(s),
                Delete(n) => {
                    if *n > remaining {
                        return Err(OtError::DocumentTooShort);
                    }
                    take_chars(&mut rest, *n);
                    remaining -= n;
                }
            }
        }
        debug_assert!(rest.is_empty());
        Ok(result)
    }

    /// Apply this operation in place to a rope document.
    pub fn apply_to_rope(&self, rope: &mut JumpRope) -> Result<(), OtError> {
        let doc_len = rope.len_chars();
        if doc_len != self.base_len {
            return Err(OtError::LengthMismatch { expected: self.base_len, actual: doc_len });
        }

        let mut pos = 0;
        for c in &self.ops {
            match c {
                Retain(n, _) => pos += n,
                Insert(s, _) => {
                    rope.insert(pos, s.as_str());
                    pos += count_chars(s);
                }
                Delete(n) => rope.remove(pos..pos + n),
            }
        }
        Ok(())
    }

    /// Apply to a document which carries a per-character attribute map, producing the
    /// new document and the new attribute maps.
    pub fn apply_with_attrs(
        &self,
        doc: &str,
        old_attrs: &[Attrs],
    ) -> Result<(String, Vec<Attrs>), OtError> {
        let doc_len = count_chars(doc);
        if doc_len != self.base_len {
            return Err(OtError::LengthMismatch { expected: self.base_len, actual: doc_len });
        }
        if old_attrs.len() != doc_len {
            return Err(OtError::LengthMismatch { expected: doc_len, actual: old_attrs.len() });
        }

        let mut result = String::with_capacity(doc.len());
        let mut attrs_out = Vec::with_capacity(self.target_len);
        let mut rest = doc;
        let mut pos = 0;
        for c in &self.ops {
            match c {
                Retain(n, op_attrs) => {
                    result.push_str(take_chars(&mut rest, *n));
                    for old in &old_attrs[pos..pos + n] {
                        attrs_out.push(merge_into(old.clone(), op_attrs.as_ref()));
                    }
                    pos += n;
                }
                Insert(s, op_attrs) => {
                    result.push_str(s);
                    let inserted = merge_into(Attrs::new(), op_attrs.as_ref());
                    for _ in 0..count_chars(s) {
                        attrs_out.push(inserted.clone());
                    }
                }
                Delete(n) => {
                    take_chars(&mut rest, *n);
                    pos += n;
                }
            }
        }
        Ok((result, attrs_out))
    }

    /// Compute the operation that undoes this one: applying `invert(doc)` to
    /// `apply(doc)` gives back `doc`. Attribute changes on retained spans need the
    /// old attribute maps to restore; see [`TextOperation::invert_with_attrs`].
    pub fn invert(&self, doc: &str) -> Result<TextOperation, OtError> {
        let doc_len = count_chars(doc);
        if doc_len != self.base_len {
            return Err(OtError::LengthMismatch { expected: self.base_len, actual: doc_len });
        }

        let mut inverse = TextOperation::new();
        let mut rest = doc;
        for c in &self.ops {
            match c {
                Retain(n, _) => {
                    inverse.retain(*n);
                    take_chars(&mut rest, *n);
                }
                Insert(s, _) => {
                    inverse.delete(count_chars(s));
                }
                Delete(n) => {
                    inverse.insert(take_chars(&mut rest, *n));
                }
            }
        }
        Ok(inverse)
    }

    /// Like [`TextOperation::invert`], but restores the attribute values this
    /// operation overwrote (on retained spans) or removed (with deleted text).
    pub fn invert_with_attrs(
        &self,
        doc: &str,
        old_attrs: &[Attrs],
    ) -> Result<TextOperation, OtError> {
        let doc_len = count_chars(doc);
        if doc_len != self.base_len {
            return Err(OtError::LengthMismatch { expected: self.base_len, actual: doc_len });
        }
        if old_attrs.len() != doc_len {
            return Err(OtError::LengthMismatch { expected: doc_len, actual: old_attrs.len() });
        }

        let mut inverse = TextOperation::new();
        let mut rest = doc;
        let mut pos = 0;
        for c in &self.ops {
            match c {
                Retain(n, None) => {
                    inverse.retain(*n);
                    take_chars(&mut rest, *n);
                    pos += n;
                }
                Retain(n, Some(op_attrs)) => {
                    take_chars(&mut rest, *n);
                    for old in &old_attrs[pos..pos + n] {
                        let mut restore = Attrs::new();
                        for key in op_attrs.keys() {
                            let value = old.get(key.as_str()).cloned().unwrap_or(AttrValue::Unset);
                            restore.insert(key.clone(), value);
                        }
                        inverse.retain_with(1, Some(restore));
                    }
                    pos += n;
                }
                Insert(s, _) => {
                    inverse.delete(count_chars(s));
                }
                Delete(n) => {
                    let deleted = take_chars(&mut rest, *n);
                    for (offset, ch) in deleted.chars().enumerate() {
                        let mut buf = [0u8; 4];
                        let attrs = old_attrs[pos + offset].clone();
                        inverse.insert_with(ch.encode_utf8(&mut buf), opt_attrs(attrs));
                    }
                    pos += n;
                }
            }
        }
        Ok(inverse)
    }

    /// Fold two sequential operations into one: `a.compose(b)?.apply(doc)` equals
    /// `b.apply(a.apply(doc))` whenever `b` applies to what `a` produced.
    pub fn compose(&self, other: &TextOperation) -> Result<TextOperation, OtError> {
        if self.target_len != other.base_len {
            return Err(OtError::CannotCompose);
        }

        let mut result = TextOperation::new();
        let mut a_iter = self.ops.iter().cloned();
        let mut b_iter = other.ops.iter().cloned();
        let mut a_cur = a_iter.next();
        let mut b_cur = b_iter.next();

        loop {
            match (a_cur.take(), b_cur.take()) {
                (None, None) => break,
                // Our deletes happen first; the other operation never saw that text.
                (Some(Delete(n)), b) => {
                    result.delete(n);
                    b_cur = b;
                    a_cur = a_iter.next();
                }
                // Their inserts land unchanged in the composition.
                (a, Some(Insert(s, attrs))) => {
                    result.insert_with(&s, attrs);
                    a_cur = a;
                    b_cur = b_iter.next();
                }
                (None, Some(_)) | (Some(_), None) => return Err(OtError::CannotCompose),
                (Some(mut a), Some(mut b)) => {
                    // a is Retain or Insert, b is Retain or Delete. Consume the
                    // overlap and push any remainder back for the next round.
                    let n = a.len().min(b.len());
                    let a_rem = (a.len() > n).then(|| a.truncate(n));
                    let b_rem = (b.len() > n).then(|| b.truncate(n));
                    match (a, b) {
                        (Retain(_, aa), Retain(_, ba)) => {
                            result.retain_with(n, compose_attrs(aa.as_ref(), ba.as_ref(), false));
                        }
                        (Retain(..), Delete(_)) => {
                            result.delete(n);
                        }
                        (Insert(s, aa), Retain(_, ba)) => {
                            result.insert_with(&s, compose_attrs(aa.as_ref(), ba.as_ref(), true));
                        }
                        // The second operation deleted text the first inserted.
                        (Insert(..), Delete(_)) => {}
                        _ => unreachable!(),
                    }
                    a_cur = a_rem.or_else(|| a_iter.next());
                    b_cur = b_rem.or_else(|| b_iter.next());
                }
            }
        }
        Ok(result)
    }

    /// The OT diamond: rewrite two concurrent operations over the same base document
    /// so that each can be applied after the other, converging on the same result.
    ///
    /// Tie-breaks are asymmetric and every participant must designate sides the same
    /// way (the coordinator's total order provides this): when both sides insert at
    /// one position, `self`'s insert goes first; when both sides change attributes
    /// on the same retained span, `other`'s values win.
    pub fn transform(
        &self,
        other: &TextOperation,
    ) -> Result<(TextOperation, TextOperation), OtError> {
        if self.base_len != other.base_len {
            return Err(OtError::CannotTransform);
        }

        let mut a_prime = TextOperation::new();
        let mut b_prime = TextOperation::new();
        let mut a_iter = self.ops.iter().cloned();
        let mut b_iter = other.ops.iter().cloned();
        let mut a_cur = a_iter.next();
        let mut b_cur = b_iter.next();

        loop {
            match (a_cur.take(), b_cur.take()) {
                (None, None) => break,
                // Concurrent inserts at one position: ours goes first.
                (Some(Insert(s, attrs)), b) => {
                    let n = count_chars(&s);
                    a_prime.insert_with(&s, attrs);
                    b_prime.retain(n);
                    b_cur = b;
                    a_cur = a_iter.next();
                }
                (a, Some(Insert(s, attrs))) => {
                    let n = count_chars(&s);
                    a_prime.retain(n);
                    b_prime.insert_with(&s, attrs);
                    a_cur = a;
                    b_cur = b_iter.next();
                }
                (None, Some(_)) | (Some(_), None) => return Err(OtError::CannotTransform),
                (Some(mut a), Some(mut b)) => {
                    // Both walk the base document here: retains and deletes only.
                    let n = a.len().min(b.len());
                    let a_rem = (a.len() > n).then(|| a.truncate(n));
                    let b_rem = (b.len() > n).then(|| b.truncate(n));
                    match (a, b) {
                        (Retain(_, aa), Retain(_, ba)) => {
                            let (ap, bp) = transform_attrs(aa.as_ref(), ba.as_ref());
                            a_prime.retain_with(n, ap);
                            b_prime.retain_with(n, bp);
                        }
                        // Both deleted the same text; neither needs to again.
                        (Delete(_), Delete(_)) => {}
                        (Delete(_), Retain(..)) => {
                            a_prime.delete(n);
                        }
                        (Retain(..), Delete(_)) => {
                            b_prime.delete(n);
                        }
                        _ => unreachable!(),
                    }
                    a_cur = a_rem.or_else(|| a_iter.next());
                    b_cur = b_rem.or_else(|| b_iter.next());
                }
            }
        }
        Ok((a_prime, b_prime))
    }

    /// Operations chain when `other` applies to exactly what this one produced.
    /// Undo coalescing checks this before composing two history entries into one.
    pub fn can_merge_with(&self, other: &TextOperation) -> bool {
        self.target_len == other.base_len
    }

    /// When an operation is a single insert or delete (modulo surrounding retains),
    /// return it. Anything more complicated disqualifies undo coalescing.
    fn simple_op(&self) -> Option<&OpComponent> {
        match self.ops.as_slice() {
            [a] => Some(a),
            [a, b] => {
                if a.is_retain() {
                    Some(b)
                } else if b.is_retain() {
                    Some(a)
                } else {
                    None
                }
            }
            [a, b, c] if a.is_retain() && c.is_retain() => Some(b),
            _ => None,
        }
    }

    fn start_index(&self) -> usize {
        match self.ops.first() {
            Some(Retain(n, _)) => *n,
            _ => 0,
        }
    }

    /// Heuristic for undo coalescing: is `other` a natural continuation of this
    /// operation? True for consecutive single-spot inserts typed left to right, and
    /// for deletes taken from one spot (forward delete or backspace).
    pub fn should_be_composed_with(&self, other: &TextOperation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }
        let (Some(a), Some(b)) = (self.simple_op(), other.simple_op()) else {
            return false;
        };
        let (start_a, start_b) = (self.start_index(), other.start_index());
        match (a, b) {
            (Insert(s, _), Insert(..)) => start_a + count_chars(s) == start_b,
            (Delete(_), Delete(n_b)) => start_b + n_b == start_a || start_a == start_b,
            _ => false,
        }
    }

    /// The same check, but for the *inverses* of two sequential operations, whose
    /// positions read right to left (undoing a deletion moves the cursor backwards).
    pub fn should_be_composed_with_inverted(&self, other: &TextOperation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }
        let (Some(a), Some(b)) = (self.simple_op(), other.simple_op()) else {
            return false;
        };
        let (start_a, start_b) = (self.start_index(), other.start_index());
        match (a, b) {
            (Insert(s, _), Insert(..)) => {
                start_a + count_chars(s) == start_b || start_a == start_b
            }
            (Delete(_), Delete(n_b)) => start_b + n_b == start_a,
            _ => false,
        }
    }
}

impl FromIterator<OpComponent> for TextOperation {
    fn from_iter<I: IntoIterator<Item = OpComponent>>(iter: I) -> Self {
        let mut op = TextOperation::new();
        for c in iter {
            op.add(c);
        }
        op
    }
}

fn merge_into(mut base: Attrs, changes: Option<&Attrs>) -> Attrs {
    if let Some(changes) = changes {
        for (key, value) in changes {
            if value.is_unset() {
                base.remove(key.as_str());
            } else {
                base.insert(key.clone(), value.clone());
            }
        }
    }
    base
}

#[cfg(test)]
mod test {
    use rand::prelude::*;

    use super::*;
    use crate::fuzzer_tools::{random_operation, random_str};

    #[test]
    fn builder_tracks_lengths() {
        let mut o = TextOperation::new();
        assert_eq!((o.base_len(), o.target_len()), (0, 0));
        o.retain(5);
        assert_eq!((o.base_len(), o.target_len()), (5, 5));
        o.insert("abc");
        assert_eq!((o.base_len(), o.target_len()), (5, 8));
        o.retain(2);
        assert_eq!((o.base_len(), o.target_len()), (7, 10));
        o.delete(2);
        assert_eq!((o.base_len(), o.target_len()), (9, 10));
    }

    #[test]
    fn builder_merges_adjacent() {
        let mut o = TextOperation::new();
        o.retain(2).retain(3);
        assert_eq!(o.components(), &[Retain(5, None)]);
        o.insert("ab").insert("cd");
        o.delete(1).delete(1);
        assert_eq!(
            o.components(),
            &[Retain(5, None), Insert("abcd".into(), None), Delete(2)]
        );
    }

    #[test]
    fn builder_ignores_empty_operands() {
        let mut o = TextOperation::new();
        o.retain(0).insert("").delete(0);
        assert!(o.components().is_empty());
        assert!(o.is_noop());
    }

    #[test]
    fn insert_is_ordered_before_delete() {
        let mut a = TextOperation::new();
        a.delete(3).insert("xy");
        let mut b = TextOperation::new();
        b.insert("xy").delete(3);
        assert_eq!(a, b);
        assert_eq!(a.components(), &[Insert("xy".into(), None), Delete(3)]);
    }

    #[test]
    fn equal_edits_are_structurally_equal() {
        let mut a = TextOperation::new();
        a.delete(1).insert("lo").retain(2).retain(3);
        let mut b = TextOperation::new();
        b.delete(1).insert("l").insert("o").retain(5);
        assert_eq!(a, b);
    }

    #[test]
    fn apply_smoke() {
        let mut o = TextOperation::new();
        o.retain(2).insert("日本").delete(1).retain(2);
        assert_eq!(o.apply("abcde").unwrap(), "ab日本de");
    }

    #[test]
    fn apply_checks_length() {
        let mut o = TextOperation::new();
        o.retain(3);
        assert_eq!(
            o.apply("ab"),
            Err(OtError::LengthMismatch { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn apply_to_rope_matches_apply() {
        let mut rng = SmallRng::seed_from_u64(12);
        for _ in 0..100 {
            let doc = random_str(40, &mut rng);
            let op = random_operation(&doc, &mut rng);
            let mut rope = JumpRope::from(doc.as_str());
            op.apply_to_rope(&mut rope).unwrap();
            assert_eq!(rope.to_string(), op.apply(&doc).unwrap());
        }
    }

    #[test]
    fn invert_restores_document() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..200 {
            let doc = random_str(30, &mut rng);
            let op = random_operation(&doc, &mut rng);
            let inverse = op.invert(&doc).unwrap();
            assert_eq!(op.base_len(), inverse.target_len());
            assert_eq!(op.target_len(), inverse.base_len());
            assert_eq!(inverse.apply(&op.apply(&doc).unwrap()).unwrap(), doc);
        }
    }

    #[test]
    fn double_invert_is_identity() {
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..100 {
            let doc = random_str(25, &mut rng);
            let op = random_operation(&doc, &mut rng);
            let applied = op.apply(&doc).unwrap();
            let inverse = op.invert(&doc).unwrap();
            assert_eq!(inverse.invert(&applied).unwrap(), op);
        }
    }

    #[test]
    fn compose_matches_sequential_apply() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..200 {
            let doc = random_str(20, &mut rng);
            let a = random_operation(&doc, &mut rng);
            let after_a = a.apply(&doc).unwrap();
            let b = random_operation(&after_a, &mut rng);
            let ab = a.compose(&b).unwrap();
            assert_eq!(ab.apply(&doc).unwrap(), b.apply(&after_a).unwrap());
        }
    }

    #[test]
    fn compose_is_associative() {
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..200 {
            let doc = random_str(20, &mut rng);
            let a = random_operation(&doc, &mut rng);
            let doc_a = a.apply(&doc).unwrap();
            let b = random_operation(&doc_a, &mut rng);
            let doc_b = b.apply(&doc_a).unwrap();
            let c = random_operation(&doc_b, &mut rng);
            let left = a.compose(&b).unwrap().compose(&c).unwrap();
            let right = a.compose(&b.compose(&c).unwrap()).unwrap();
            assert_eq!(left, right);
        }
    }

    #[test]
    fn compose_rejects_mismatched_lengths() {
        let mut a = TextOperation::new();
        a.insert("abc");
        let mut b = TextOperation::new();
        b.retain(2);
        assert_eq!(a.compose(&b), Err(OtError::CannotCompose));
    }

    #[test]
    fn compose_with_noop_is_identity() {
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..50 {
            let doc = random_str(15, &mut rng);
            let op = random_operation(&doc, &mut rng);
            let mut pre = TextOperation::new();
            pre.retain(op.base_len());
            let mut post = TextOperation::new();
            post.retain(op.target_len());
            assert_eq!(pre.compose(&op).unwrap(), op);
            assert_eq!(op.compose(&post).unwrap(), op);
        }
    }

    #[test]
    fn transform_diamond_converges() {
        let mut rng = SmallRng::seed_from_u64(6);
        for _ in 0..200 {
            let doc = random_str(20, &mut rng);
            let a = random_operation(&doc, &mut rng);
            let b = random_operation(&doc, &mut rng);
            let (a_prime, b_prime) = a.transform(&b).unwrap();
            let ab = b_prime.apply(&a.apply(&doc).unwrap()).unwrap();
            let ba = a_prime.apply(&b.apply(&doc).unwrap()).unwrap();
            assert_eq!(ab, ba);
        }
    }

    #[test]
    fn transform_with_noop() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            let doc = random_str(15, &mut rng);
            let op = random_operation(&doc, &mut rng);
            let mut noop = TextOperation::new();
            noop.retain(op.base_len());
            let (op_prime, noop_prime) = op.transform(&noop).unwrap();
            assert_eq!(op_prime, op);
            assert!(noop_prime.is_noop());
        }
    }

    #[test]
    fn transform_ties_break_toward_self() {
        // Both clients insert at position 1 of "AB"; self's insert lands first.
        let mut a = TextOperation::new();
        a.retain(1).insert("X").retain(1);
        let mut b = TextOperation::new();
        b.retain(1).insert("Y").retain(1);
        let (a_prime, b_prime) = a.transform(&b).unwrap();
        assert_eq!(b_prime.apply(&a.apply("AB").unwrap()).unwrap(), "AXYB");
        assert_eq!(a_prime.apply(&b.apply("AB").unwrap()).unwrap(), "AXYB");
    }

    #[test]
    fn transform_concurrent_attribute_edits() {
        let ours: Attrs = [("color".into(), "red".into())].into_iter().collect();
        let theirs: Attrs = [("color".into(), "blue".into())].into_iter().collect();
        let mut a = TextOperation::new();
        a.retain_with(2, Some(ours));
        let mut b = TextOperation::new();
        b.retain_with(2, Some(theirs.clone()));
        let (a_prime, b_prime) = a.transform(&b).unwrap();
        // The other side's color wins; ours is dropped entirely.
        assert_eq!(a_prime.components(), &[Retain(2, None)]);
        assert_eq!(b_prime.components(), &[Retain(2, Some(theirs))]);
    }

    #[test]
    fn compose_overlays_attributes() {
        let bold: Attrs = [("bold".into(), "true".into())].into_iter().collect();
        let unbold: Attrs = [("bold".into(), AttrValue::Unset)].into_iter().collect();
        let mut a = TextOperation::new();
        a.insert_with("hi", Some(bold));
        let mut b = TextOperation::new();
        b.retain_with(2, Some(unbold));
        let composed = a.compose(&b).unwrap();
        // Unsetting an attribute on freshly inserted text leaves plain text behind.
        assert_eq!(composed.components(), &[Insert("hi".into(), None)]);
    }

    #[test]
    fn typed_characters_should_compose() {
        // "a" typed into an empty doc, then "b" right after it.
        let mut first = TextOperation::new();
        first.insert("a");
        let mut second = TextOperation::new();
        second.retain(1).insert("b");
        assert!(first.should_be_composed_with(&second));

        // Their inverses, pushed onto the undo stack newest-first.
        let inv_first = first.invert("").unwrap();
        let inv_second = second.invert("a").unwrap();
        assert!(inv_second.should_be_composed_with_inverted(&inv_first));
    }

    #[test]
    fn backspaces_should_compose() {
        // Deleting "c" then "b" from "abc" via backspace.
        let mut first = TextOperation::new();
        first.retain(2).delete(1);
        let mut second = TextOperation::new();
        second.retain(1).delete(1);
        assert!(first.should_be_composed_with(&second));
    }

    #[test]
    fn can_merge_with_checks_chaining() {
        let mut a = TextOperation::new();
        a.insert("ab"); // "" -> "ab"
        let mut b = TextOperation::new();
        b.retain(1).delete(1); // "ab" -> "a"
        assert!(a.can_merge_with(&b));
        assert!(a.compose(&b).is_ok());
        // The other way around the lengths don't chain.
        assert!(!b.can_merge_with(&a));
        assert!(b.compose(&a).is_err());
    }

    #[test]
    fn distant_edits_should_not_compose() {
        let mut first = TextOperation::new();
        first.insert("a").retain(10);
        let mut second = TextOperation::new();
        second.retain(8).insert("b").retain(3);
        assert!(!first.should_be_composed_with(&second));
    }

    #[test]
    fn invert_with_attrs_restores_old_values() {
        let doc = "ab";
        let old: Vec<Attrs> = vec![
            [("color".into(), "red".into())].into_iter().collect(),
            Attrs::new(),
        ];
        let recolor: Attrs = [("color".into(), "blue".into())].into_iter().collect();
        let mut op = TextOperation::new();
        op.retain_with(2, Some(recolor));

        let (applied, new_attrs) = op.apply_with_attrs(doc, &old).unwrap();
        assert_eq!(applied, "ab");
        assert_eq!(new_attrs[0].get("color"), Some(&"blue".into()));

        let inverse = op.invert_with_attrs(doc, &old).unwrap();
        let (_, restored) = inverse.apply_with_attrs(&applied, &new_attrs).unwrap();
        assert_eq!(restored, old);
    }
}

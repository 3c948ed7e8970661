//! Conflict detection: the predicate a Merit Removal must satisfy.

use crate::element::Element;

/// Whether `a` and `b` are contradictory statements by the same holder.
///
/// They conflict iff they are the same kind, share holder and nonce, and say
/// different things. Different nonces, holders or kinds never conflict.
pub fn conflicts(a: &Element, b: &Element) -> bool {
    a.kind() == b.kind()
        && a.holder() == b.holder()
        && a.nonce() == b.nonce()
        && a.content() != b.content()
}

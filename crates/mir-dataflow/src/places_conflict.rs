//! Overlap test between a borrowed place and an accessed place.

use mir::{Body, Place, PlaceElem};

/// How to resolve projections whose runtime overlap is unknown, such as two
/// distinct index locals into the same array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceConflictBias {
    /// Assume they overlap: the right bias when a conflict would be an
    /// error to report.
    Overlap,
    /// Assume they do not: the right bias when a conflict would kill a
    /// borrow in a may-analysis, where killing too much is unsound.
    NoOverlap,
}

/// Whether an access to `access_place` touches memory covered by the
/// borrow of `borrow_place`.
///
/// Places rooted at different locals never conflict. Otherwise the
/// projection lists are compared element-wise; if the comparison survives
/// to the end of either list, one place is a prefix of the other and they
/// overlap.
pub fn places_conflict(
    _body: &Body,
    borrow_place: &Place,
    access_place: &Place,
    bias: PlaceConflictBias,
) -> bool {
    if borrow_place.local != access_place.local {
        return false;
    }
    for (borrow_elem, access_elem) in
        borrow_place.projection.iter().zip(&access_place.projection)
    {
        match (borrow_elem, access_elem) {
            (PlaceElem::Deref, PlaceElem::Deref) => {}
            (PlaceElem::Field(f1, _), PlaceElem::Field(f2, _)) => {
                if f1 != f2 {
                    // Distinct fields are disjoint memory.
                    return false;
                }
            }
            (PlaceElem::Index(i1), PlaceElem::Index(i2)) => {
                if i1 != i2 {
                    match bias {
                        PlaceConflictBias::Overlap => {}
                        PlaceConflictBias::NoOverlap => return false,
                    }
                }
            }
            // Projections of different shapes at the same depth cannot name
            // the same memory in a well-typed body.
            _ => return false,
        }
    }
    true
}

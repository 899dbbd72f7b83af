use expect_test::{expect, Expect};
use mir::ty::{IntTy, Ty};
use mir::{
    AggregateKind, Body, BodyBuilder, BorrowKind, Constant, FakeReadCause, Location, Mutability,
    Operand, Place, Rvalue, Statement, SwitchTargets, Terminator,
};
use rustc_hash::FxHashMap;

use crate::borrow_set::BorrowSet;
use crate::framework::bitset::Idx;
use crate::framework::fmt::dump_dataflow_results;
use crate::impls::{Borrows, MaybeUninitializedPlaces};
use crate::move_paths::{LookupResult, MoveData};
use crate::{Cancelled, CancellationToken, Engine};

fn int() -> Ty {
    Ty::Int(IntTy::I32)
}

fn const_int(value: i128) -> Operand {
    Operand::Constant(Constant::scalar(int(), value))
}

fn const_unit() -> Operand {
    Operand::Constant(Constant::unit())
}

fn use_op(operand: Operand) -> Rvalue {
    Rvalue::Use(operand)
}

fn check_uninit(body: &Body, expect: Expect) {
    let token = CancellationToken::new();
    let move_data = MoveData::gather_moves(body, &token).unwrap();
    let analysis = MaybeUninitializedPlaces::new(&move_data);
    let mut results = Engine::new(body, analysis).iterate_to_fixpoint(&token).unwrap();
    expect.assert_eq(&dump_dataflow_results(body, &mut results));
}

fn check_borrows(body: &Body, expect: Expect) {
    let token = CancellationToken::new();
    let move_data = MoveData::gather_moves(body, &token).unwrap();
    let borrow_set = BorrowSet::build(body, true, &move_data);
    let analysis = Borrows::new(body, &borrow_set, FxHashMap::default());
    let mut results = Engine::new(body, analysis).iterate_to_fixpoint(&token).unwrap();
    expect.assert_eq(&dump_dataflow_results(body, &mut results));
}

/// let x = 1;
#[test]
fn uninit_initialized_variable() {
    let mut b = BodyBuilder::new("main", 0);
    let ret = b.local(Ty::Unit, Mutability::Mut);
    let x = b.local(int(), Mutability::Not);
    let bb0 = b.new_block();
    b.push(bb0, Statement::StorageLive(x));
    b.push_assign(bb0, Place::from(x), use_op(const_int(1)));
    b.push(bb0, Statement::FakeRead(FakeReadCause::ForLet, Place::from(x)));
    b.push_assign(bb0, Place::from(ret), use_op(const_unit()));
    b.push(bb0, Statement::StorageDead(x));
    b.terminate(bb0, Terminator::Return);
    let body = b.finish();

    check_uninit(
        &body,
        expect![[r#"
            fn main() -> () {
                let mut _0: ();
                let _1: i32;

                bb0: {                               // {_0, _1}
                    StorageLive(_1);
                    _1 = const 1_i32;                // -_1
                    FakeRead(ForLet, _1);
                    _0 = const ();                   // -_0
                    StorageDead(_1);                 // +_1
                    return;
                }                                    // {_1}
            }
        "#]],
    );
}

/// let x = foo(); the destination is initialized only on the return edge,
/// so the cleanup block still sees `_1` as maybe-uninit.
#[test]
fn uninit_call_return_edge() {
    let mut b = BodyBuilder::new("main", 0);
    let ret = b.local(Ty::Unit, Mutability::Mut);
    let x = b.local(int(), Mutability::Not);
    let bb0 = b.new_block();
    let bb1 = b.new_block();
    let bb2 = b.new_cleanup_block();
    b.push(bb0, Statement::StorageLive(x));
    b.terminate(
        bb0,
        Terminator::Call {
            func: Operand::Constant(Constant::zero_sized(Ty::fn_def("foo"))),
            args: vec![],
            destination: Place::from(x),
            target: Some(bb1),
            unwind: Some(bb2),
        },
    );
    b.push_assign(bb1, Place::from(ret), use_op(const_unit()));
    b.push(bb1, Statement::StorageDead(x));
    b.terminate(bb1, Terminator::Return);
    b.terminate(bb2, Terminator::Resume);
    let body = b.finish();

    check_uninit(
        &body,
        expect![[r#"
            fn main() -> () {
                let mut _0: ();
                let _1: i32;

                bb0: {                               // {_0, _1}
                    StorageLive(_1);
                    _1 = foo() -> [return: bb1, unwind: bb2];
                }                                    // {_0, _1}

                bb1: {                               // {_0}
                    _0 = const ();                   // -_0
                    StorageDead(_1);                 // +_1
                    return;
                }                                    // {_1}

                bb2 (cleanup): {                     // {_0, _1}
                    resume;
                }                                    // {_0, _1}
            }
        "#]],
    );
}

/// let x; if c { x = 1; } -- the merge keeps `x` maybe-uninit.
#[test]
fn uninit_conditional_initialization() {
    let mut b = BodyBuilder::new("main", 0);
    let ret = b.local(Ty::Unit, Mutability::Mut);
    let x = b.local(int(), Mutability::Not);
    let cond = b.local(Ty::Bool, Mutability::Not);
    let bb0 = b.new_block();
    let bb1 = b.new_block();
    let bb2 = b.new_block();
    let bb3 = b.new_block();
    b.push(bb0, Statement::StorageLive(x));
    b.push(bb0, Statement::StorageLive(cond));
    b.push_assign(bb0, Place::from(cond), use_op(Operand::Constant(Constant::bool(true))));
    b.terminate(
        bb0,
        Terminator::SwitchInt {
            discr: Operand::Move(Place::from(cond)),
            targets: SwitchTargets::static_if(0, bb2, bb1),
        },
    );
    b.push_assign(bb1, Place::from(x), use_op(const_int(1)));
    b.terminate(bb1, Terminator::Goto { target: bb3 });
    b.terminate(bb2, Terminator::Goto { target: bb3 });
    b.push_assign(bb3, Place::from(ret), use_op(const_unit()));
    b.push(bb3, Statement::StorageDead(cond));
    b.push(bb3, Statement::StorageDead(x));
    b.terminate(bb3, Terminator::Return);
    let body = b.finish();

    check_uninit(
        &body,
        expect![[r#"
            fn main() -> () {
                let mut _0: ();
                let _1: i32;
                let _2: bool;

                bb0: {                               // {_0, _1, _2}
                    StorageLive(_1);
                    StorageLive(_2);
                    _2 = const true;                 // -_2
                    switchInt(move _2) -> [0: bb2, otherwise: bb1]; // +_2
                }                                    // {_0, _1, _2}

                bb1: {                               // {_0, _1, _2}
                    _1 = const 1_i32;                // -_1
                    goto -> bb3;
                }                                    // {_0, _2}

                bb2: {                               // {_0, _1, _2}
                    goto -> bb3;
                }                                    // {_0, _1, _2}

                bb3: {                               // {_0, _1, _2}
                    _0 = const ();                   // -_0
                    StorageDead(_2);
                    StorageDead(_1);
                    return;
                }                                    // {_1, _2}
            }
        "#]],
    );
}

#[test]
fn uninit_arguments_start_initialized() {
    let mut b = BodyBuilder::new("foo", 2);
    let ret = b.local(int(), Mutability::Mut);
    let a = b.local(int(), Mutability::Not);
    let _b = b.local(int(), Mutability::Not);
    let bb0 = b.new_block();
    b.push_assign(bb0, Place::from(ret), use_op(Operand::Copy(Place::from(a))));
    b.terminate(bb0, Terminator::Return);
    let body = b.finish();

    let token = CancellationToken::new();
    let move_data = MoveData::gather_moves(&body, &token).unwrap();
    let analysis = MaybeUninitializedPlaces::new(&move_data);
    let results = Engine::new(&body, analysis).iterate_to_fixpoint(&token).unwrap();
    let entry = results.entry_set_for_block(body.start_block());
    assert_eq!(entry.iter().map(Idx::index).collect::<Vec<_>>(), vec![0]);
}

/// Moving both fields out of a tuple and then reassigning the whole tuple
/// reinitializes the root path and every field path below it.
#[test]
fn uninit_full_overwrite_reinitializes_fields() {
    let pair = Ty::tuple(vec![int(), int()]);
    let mut b = BodyBuilder::new("main", 0);
    let ret = b.local(Ty::Unit, Mutability::Mut);
    let x = b.local(pair, Mutability::Mut);
    let a = b.local(int(), Mutability::Not);
    let c = b.local(int(), Mutability::Not);
    let bb0 = b.new_block();
    let pair_of = |value: i128| {
        Rvalue::Aggregate(AggregateKind::Tuple, vec![const_int(value), const_int(value + 1)])
    };
    b.push(bb0, Statement::StorageLive(x));
    b.push_assign(bb0, Place::from(x), pair_of(1));
    b.push(bb0, Statement::StorageLive(a));
    b.push_assign(bb0, Place::from(a), use_op(Operand::Move(Place::from(x).field(0, int()))));
    b.push(bb0, Statement::StorageLive(c));
    b.push_assign(bb0, Place::from(c), use_op(Operand::Move(Place::from(x).field(1, int()))));
    b.push_assign(bb0, Place::from(x), pair_of(3));
    b.push_assign(bb0, Place::from(ret), use_op(const_unit()));
    b.push(bb0, Statement::StorageDead(c));
    b.push(bb0, Statement::StorageDead(a));
    b.push(bb0, Statement::StorageDead(x));
    b.terminate(bb0, Terminator::Return);
    let body = b.finish();

    let token = CancellationToken::new();
    let move_data = MoveData::gather_moves(&body, &token).unwrap();
    let x_path = move_data.rev_lookup.find_local(x);
    let LookupResult::Exact(x0_path) = move_data.rev_lookup.find(&Place::from(x).field(0, int()))
    else {
        panic!("field 0 path should be tracked");
    };
    let LookupResult::Exact(x1_path) = move_data.rev_lookup.find(&Place::from(x).field(1, int()))
    else {
        panic!("field 1 path should be tracked");
    };
    let analysis = MaybeUninitializedPlaces::new(&move_data);
    let mut results = Engine::new(&body, analysis).iterate_to_fixpoint(&token).unwrap();
    let mut cursor = results.as_results_cursor(&body);

    // Both field moves leave the fields maybe-uninit; the root stays whole.
    cursor.seek_after_primary_effect(Location { block: bb0, statement_index: 5 });
    assert!(cursor.contains(x0_path));
    assert!(cursor.contains(x1_path));
    assert!(!cursor.contains(x_path));
    // The whole-tuple reassignment reinitializes root and fields alike.
    cursor.seek_after_primary_effect(Location { block: bb0, statement_index: 6 });
    assert!(!cursor.contains(x_path));
    assert!(!cursor.contains(x0_path));
    assert!(!cursor.contains(x1_path));
}

/// let s = S; let r = &s; let t = s; let u = r;
#[test]
fn borrows_until_storage_dead() {
    let s_ty = Ty::adt("S");
    let ref_ty = Ty::reference(s_ty.clone(), Mutability::Not);
    let mut b = BodyBuilder::new("main", 0);
    let ret = b.local(Ty::Unit, Mutability::Mut);
    let s = b.local(s_ty.clone(), Mutability::Not);
    let r = b.local(ref_ty.clone(), Mutability::Not);
    let t = b.local(s_ty.clone(), Mutability::Not);
    let u = b.local(ref_ty, Mutability::Not);
    let bb0 = b.new_block();
    b.push(bb0, Statement::StorageLive(s));
    b.push_assign(bb0, Place::from(s), Rvalue::Aggregate(AggregateKind::Adt(s_ty), vec![]));
    b.push(bb0, Statement::FakeRead(FakeReadCause::ForLet, Place::from(s)));
    b.push(bb0, Statement::StorageLive(r));
    b.push_assign(bb0, Place::from(r), Rvalue::Ref(BorrowKind::Shared, Place::from(s)));
    b.push(bb0, Statement::FakeRead(FakeReadCause::ForLet, Place::from(r)));
    b.push(bb0, Statement::StorageLive(t));
    b.push_assign(bb0, Place::from(t), use_op(Operand::Move(Place::from(s))));
    b.push(bb0, Statement::FakeRead(FakeReadCause::ForLet, Place::from(t)));
    b.push(bb0, Statement::StorageLive(u));
    b.push_assign(bb0, Place::from(u), use_op(Operand::Copy(Place::from(r))));
    b.push(bb0, Statement::FakeRead(FakeReadCause::ForLet, Place::from(u)));
    b.push_assign(bb0, Place::from(ret), use_op(const_unit()));
    b.push(bb0, Statement::StorageDead(u));
    b.push(bb0, Statement::StorageDead(t));
    b.push(bb0, Statement::StorageDead(r));
    b.push(bb0, Statement::StorageDead(s));
    b.terminate(bb0, Terminator::Return);
    let body = b.finish();

    check_borrows(
        &body,
        expect![[r#"
            fn main() -> () {
                let mut _0: ();
                let _1: S;
                let _2: &S;
                let _3: S;
                let _4: &S;

                bb0: {                               // {}
                    StorageLive(_1);
                    _1 = S;
                    FakeRead(ForLet, _1);
                    StorageLive(_2);
                    _2 = &_1;                        // +_0
                    FakeRead(ForLet, _2);
                    StorageLive(_3);
                    _3 = move _1;
                    FakeRead(ForLet, _3);
                    StorageLive(_4);
                    _4 = _2;
                    FakeRead(ForLet, _4);
                    _0 = const ();
                    StorageDead(_4);
                    StorageDead(_3);
                    StorageDead(_2);
                    StorageDead(_1);                 // -_0
                    return;
                }                                    // {}
            }
        "#]],
    );
}

/// let mut x = 1; let r = &x; x = 2; -- overwriting the borrowed local ends
/// the loan.
#[test]
fn borrows_killed_by_overwrite() {
    let mut b = BodyBuilder::new("main", 0);
    let ret = b.local(Ty::Unit, Mutability::Mut);
    let x = b.local(int(), Mutability::Mut);
    let r = b.local(Ty::reference(int(), Mutability::Not), Mutability::Not);
    let bb0 = b.new_block();
    b.push(bb0, Statement::StorageLive(x));
    b.push_assign(bb0, Place::from(x), use_op(const_int(1)));
    b.push(bb0, Statement::StorageLive(r));
    b.push_assign(bb0, Place::from(r), Rvalue::Ref(BorrowKind::Shared, Place::from(x)));
    b.push_assign(bb0, Place::from(x), use_op(const_int(2)));
    b.push_assign(bb0, Place::from(ret), use_op(const_unit()));
    b.push(bb0, Statement::StorageDead(r));
    b.push(bb0, Statement::StorageDead(x));
    b.terminate(bb0, Terminator::Return);
    let body = b.finish();

    check_borrows(
        &body,
        expect![[r#"
            fn main() -> () {
                let mut _0: ();
                let mut _1: i32;
                let _2: &i32;

                bb0: {                               // {}
                    StorageLive(_1);
                    _1 = const 1_i32;
                    StorageLive(_2);
                    _2 = &_1;                        // +_0
                    _1 = const 2_i32;                // -_0
                    _0 = const ();
                    StorageDead(_2);
                    StorageDead(_1);
                    return;
                }                                    // {}
            }
        "#]],
    );
}

/// A borrow of `x.0` survives a write to `x.1` but not a write to all of
/// `x`.
#[test]
fn borrows_field_precision() {
    let pair = Ty::tuple(vec![int(), int()]);
    let mut b = BodyBuilder::new("main", 0);
    let ret = b.local(Ty::Unit, Mutability::Mut);
    let x = b.local(pair, Mutability::Mut);
    let r = b.local(Ty::reference(int(), Mutability::Not), Mutability::Not);
    let bb0 = b.new_block();
    let pair_of = |value: i128| {
        Rvalue::Aggregate(AggregateKind::Tuple, vec![const_int(value), const_int(value + 1)])
    };
    b.push(bb0, Statement::StorageLive(x));
    b.push_assign(bb0, Place::from(x), pair_of(1));
    b.push(bb0, Statement::StorageLive(r));
    b.push_assign(
        bb0,
        Place::from(r),
        Rvalue::Ref(BorrowKind::Shared, Place::from(x).field(0, int())),
    );
    b.push_assign(bb0, Place::from(x).field(1, int()), use_op(const_int(9)));
    b.push_assign(bb0, Place::from(x), pair_of(4));
    b.push_assign(bb0, Place::from(ret), use_op(const_unit()));
    b.push(bb0, Statement::StorageDead(r));
    b.push(bb0, Statement::StorageDead(x));
    b.terminate(bb0, Terminator::Return);
    let body = b.finish();

    let token = CancellationToken::new();
    let move_data = MoveData::gather_moves(&body, &token).unwrap();
    let borrow_set = BorrowSet::build(&body, true, &move_data);
    assert_eq!(borrow_set.len(), 1);
    let borrow = borrow_set.indices().next().unwrap();
    let analysis = Borrows::new(&body, &borrow_set, FxHashMap::default());
    let mut results = Engine::new(&body, analysis).iterate_to_fixpoint(&token).unwrap();
    let mut cursor = results.as_results_cursor(&body);

    // After the write to the sibling field the loan is still in scope.
    cursor.seek_after_primary_effect(Location { block: bb0, statement_index: 4 });
    assert!(cursor.contains(borrow));
    // Overwriting the whole tuple kills it.
    cursor.seek_after_primary_effect(Location { block: bb0, statement_index: 5 });
    assert!(!cursor.contains(borrow));
}

/// Scope kills from the out-of-scope map land strictly before the gen of a
/// borrow reserved at the same location.
#[test]
fn borrows_scope_kill_ordered_before_gen() {
    let mut b = BodyBuilder::new("main", 0);
    let ret = b.local(Ty::Unit, Mutability::Mut);
    let x = b.local(int(), Mutability::Mut);
    let r = b.local(Ty::reference(int(), Mutability::Not), Mutability::Not);
    let bb0 = b.new_block();
    b.push(bb0, Statement::StorageLive(x));
    b.push_assign(bb0, Place::from(x), use_op(const_int(1)));
    b.push(bb0, Statement::StorageLive(r));
    b.push_assign(bb0, Place::from(r), Rvalue::Ref(BorrowKind::Shared, Place::from(x)));
    b.push_assign(bb0, Place::from(ret), use_op(const_unit()));
    b.push(bb0, Statement::StorageDead(r));
    b.push(bb0, Statement::StorageDead(x));
    b.terminate(bb0, Terminator::Return);
    let body = b.finish();

    let token = CancellationToken::new();
    let move_data = MoveData::gather_moves(&body, &token).unwrap();
    let borrow_set = BorrowSet::build(&body, true, &move_data);
    let borrow = borrow_set.indices().next().unwrap();
    let reserve_location = Location { block: bb0, statement_index: 3 };
    let after_location = Location { block: bb0, statement_index: 4 };
    let mut out_of_scope = FxHashMap::default();
    out_of_scope.insert(reserve_location, vec![borrow]);
    out_of_scope.insert(after_location, vec![borrow]);

    let analysis = Borrows::new(&body, &borrow_set, out_of_scope);
    let mut results = Engine::new(&body, analysis).iterate_to_fixpoint(&token).unwrap();
    let mut cursor = results.as_results_cursor(&body);

    cursor.seek_before_primary_effect(reserve_location);
    assert!(!cursor.contains(borrow));
    // The gen at the reserve location wins over the same-location kill.
    cursor.seek_after_primary_effect(reserve_location);
    assert!(cursor.contains(borrow));
    // One statement later the scope kill takes the borrow out again.
    cursor.seek_before_primary_effect(after_location);
    assert!(!cursor.contains(borrow));
}

#[test]
fn engine_honors_cancellation() {
    let mut b = BodyBuilder::new("main", 0);
    b.local(Ty::Unit, Mutability::Mut);
    let bb0 = b.new_block();
    b.terminate(bb0, Terminator::Return);
    let body = b.finish();

    let token = CancellationToken::new();
    let move_data = MoveData::gather_moves(&body, &token).unwrap();
    token.cancel();
    let analysis = MaybeUninitializedPlaces::new(&move_data);
    let result = Engine::new(&body, analysis).iterate_to_fixpoint(&token);
    assert!(matches!(result, Err(Cancelled)));
}

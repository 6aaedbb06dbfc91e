#![cfg(test)]

use super::*;

use std::any::{TypeId, type_name};

fn add(a: i32, b: i32) -> i32 {
    a + b
}

fn negate(x: i32) -> i32 {
    -x
}

fn double(x: i32) -> i32 {
    x * 2
}

fn poke(target: &mut i32, flag: bool, amount: i32) {
    if flag {
        *target += amount;
    }
}

struct Counter {
    count: u32,
}

impl Counter {
    fn get(&self) -> u32 {
        self.count
    }

    fn bump(&mut self, by: u32) -> u32 {
        self.count += by;
        self.count
    }
}

// === Signature identity === //

#[test]
fn horner_hash_matches_model() {
    assert_eq!(sig_hash(""), 0);
    assert_eq!(sig_hash("A"), 65);
    assert_eq!(sig_hash("ab"), 97 * SIG_HASH_PRIME + 98);
}

#[test]
fn signature_identity_is_deterministic() {
    let a = SigId::of::<fn(i32) -> i32>();
    let b = SigId::of::<fn(i32) -> i32>();

    assert_eq!(a.text(), b.text());
    assert_eq!(a.hash(), b.hash());
    assert!(a.accepts(b));

    let c = SigId::of::<fn(i64) -> i32>();
    assert!(!a.accepts(c));
    assert!(!c.accepts(a));
}

#[test]
fn unknown_signatures_never_match() {
    assert!(SigId::UNKNOWN.is_unknown());
    assert!(!SigId::UNKNOWN.accepts(SigId::UNKNOWN));
    assert!(!SigId::UNKNOWN.accepts(SigId::of::<fn()>()));
    assert!(!SigId::of::<fn()>().accepts(SigId::UNKNOWN));
}

#[test]
fn caller_side_composition_matches_the_bound_shape() {
    // A caller-side tuple of concrete types composes the exact fn type the
    // bound side carries, identity and `TypeId` alike.
    let bound = SigId::of::<fn(i32, i32) -> i32>();
    let supplied = SigId::of::<<(i32, i32) as CallArgs>::Sig<i32>>();
    assert!(bound.accepts(supplied));

    assert_eq!(
        TypeId::of::<fn(i32, i32) -> i32>(),
        TypeId::of::<<(i32, i32) as CallArgs>::Sig<i32>>()
    );
}

// === Fixed-signature delegate === //

#[test]
fn calls_free_function() {
    let del = Delegate::<fn(i32, i32) -> i32>::from_fn(add);

    assert_eq!(del.call(3, 4), 7);
    assert_eq!(del.try_call((3, 4)), Ok(7));
    assert!(del.has_target());
    assert!(del.targets_fn(add));
    assert!(!del.targets_fn(|a, b| a - b));
}

#[test]
fn calls_non_capturing_closure_as_function() {
    let del = Delegate::<fn(i32) -> i32>::from_fn(|x| x * x);
    assert_eq!(del.call(5), 25);
}

#[test]
fn calls_stateless_callable_without_storage() {
    let del = Delegate::<fn(i32) -> i32>::from_stateless(|x: i32| x * x);
    assert_eq!(del.call(5), 25);
    assert!(del.has_target());
}

#[test]
fn capturing_closure_observes_its_state() {
    let state = 10;
    let del = Delegate::<fn(i32) -> i32>::from_closure(move |y: i32| state + y);
    let copy = del;

    assert_eq!(del.call(5), 15);
    assert_eq!(copy.call(5), 15);
}

#[test]
fn recovers_inline_closure() {
    fn roundtrip<F>(f: F) -> i32
    where
        F: Callable<fn(i32) -> i32> + Copy + 'static,
    {
        let del = Delegate::<fn(i32) -> i32>::from_closure(f);
        del.bound_closure::<F>().unwrap().invoke((4,))
    }

    let base = 30;
    assert_eq!(roundtrip(move |x: i32| base + x), 34);

    let del = Delegate::<fn(i32) -> i32>::from_fn(negate);
    assert!(del.bound_closure::<fn(i32) -> i32>().is_none());
}

#[test]
fn larger_slots_admit_larger_captures() {
    let big = [7i64; 4];
    let del = Delegate::<fn() -> i64, 32>::from_closure(move || big.iter().sum::<i64>());
    assert_eq!(del.call(), 28);
}

#[test]
fn views_borrow_without_owning() {
    let text = String::from("abc");
    let target = move |x: i32| x + text.len() as i32;
    let del = Delegate::<fn(i32) -> i32>::from_view(&target);

    assert_eq!(del.call(1), 4);
    assert!(del.targets_view(&target));

    let other = |x: i32| x;
    assert!(!del.targets_view(&other));
}

#[test]
fn methods_bind_with_their_receiver() {
    let counter = Counter { count: 9 };
    let del = Delegate::<fn() -> u32>::from_method_ref(&counter, Counter::get);

    assert_eq!(del.call(), 9);
    assert!(del.targets_instance(&counter));
}

#[test]
fn mut_methods_mutate_their_receiver() {
    let mut counter = Counter { count: 3 };
    let mut del = Delegate::<fn(u32) -> u32>::new();
    del.bind_method_mut(&mut counter, Counter::bump);

    // Repeated calls accumulate exactly like direct calls would.
    assert_eq!(del.call(2), 5);
    assert_eq!(del.call(1), 6);
    assert_eq!(del.call(0), 6);

    assert_eq!(counter.count, 6);
}

#[test]
fn rebinding_replaces_the_target() {
    let mut del = Delegate::<fn(i32) -> i32>::from_fn(negate);
    assert_eq!(del.call(4), -4);

    del.bind_fn(double);
    assert_eq!(del.call(4), 8);
    assert!(del.targets_fn(double));
    assert!(!del.targets_fn(negate));
}

#[test]
fn reset_unbinds() {
    let mut del = Delegate::<fn(i32, i32) -> i32>::from_fn(add);
    assert!(del.has_target());

    del.reset();
    assert!(!del.has_target());
    assert_eq!(del.try_call((1, 2)), Err(CallError::Unbound));
}

#[test]
fn unbound_try_call_reports_unbound() {
    let del = Delegate::<fn(i32) -> i32>::new();
    assert_eq!(del.try_call((1,)), Err(CallError::Unbound));
}

#[test]
#[should_panic(expected = "without a bound target")]
fn unbound_call_panics() {
    Delegate::<fn()>::new().call();
}

#[test]
fn converts_from_function_pointers() {
    let del: Delegate<'_, fn(i32) -> i32> = (negate as fn(i32) -> i32).into();
    assert_eq!(del.call(6), -6);
}

#[test]
fn layout_is_fixed_and_small() {
    assert_eq!(
        size_of::<Delegate<'_, fn()>>(),
        size_of::<Delegate<'_, fn(i32, i32) -> i32>>()
    );
    assert_eq!(
        size_of::<DynDelegate<'_, i32>>(),
        size_of::<DynDelegate<'_, String>>()
    );
    assert!(size_of::<Delegate<'_, fn()>>() <= 64);
}

// === Dynamic-signature delegate === //

#[test]
fn dynamic_round_trip() {
    let mut del = DynDelegate::<i32>::new();
    del.bind_fn(negate as fn(i32) -> i32);

    assert_eq!(del.call((4,)), Ok(-4));
    assert!(del.targets_fn(negate as fn(i32) -> i32));
    assert_eq!(
        del.signature().unwrap().text(),
        type_name::<fn(i32) -> i32>()
    );
}

#[test]
fn dynamic_checks_signatures_and_forwards_borrows() {
    // Borrowing targets ride the method binding: the delegate holds the
    // `&mut` receiver while per-call tuples stay plain values.
    let mut value = 5;

    {
        let mut del = DynDelegate::<()>::new();
        del.bind_method_mut::<fn(bool, i32), _, _>(&mut value, poke);

        assert_eq!(del.call((true, 10)), Ok(()));
        assert_eq!(del.call((false, 10)), Ok(()));

        assert!(matches!(
            del.call((1i32, 2i32)),
            Err(CallError::SignatureMismatch { .. })
        ));

        assert!(del.is_invokable::<(bool, i32)>());
        assert!(!del.is_invokable::<(i32, i32)>());
    }

    assert_eq!(value, 15);
}

#[test]
fn dynamic_static_borrows_stay_honest() {
    fn first(s: &'static str) -> &'static str {
        &s[..1]
    }

    // Borrowed arguments pass the gate only under their honest `'static`
    // shape; a shorter borrow is a compile error at the call site.
    let mut del = DynDelegate::<&'static str>::new();
    del.bind_fn(first as fn(&'static str) -> &'static str);

    assert_eq!(del.call(("delegate",)), Ok("d"));
}

#[test]
fn dynamic_mismatch_reports_both_signatures() {
    let mut del = DynDelegate::<i32>::new();
    del.bind_fn(negate as fn(i32) -> i32);

    let Err(CallError::SignatureMismatch { accepted, supplied }) = del.call((1i64,)) else {
        panic!("expected a signature mismatch");
    };

    assert_eq!(accepted, type_name::<fn(i32) -> i32>());
    assert_eq!(supplied, type_name::<fn(i64) -> i32>());
}

#[test]
fn dynamic_unbound_calls_report_unbound() {
    let del = DynDelegate::<i32>::new();
    assert_eq!(del.call((1,)), Err(CallError::Unbound));
    assert!(!del.is_invokable::<(i32,)>());
    assert!(del.signature().is_none());
}

#[test]
fn dynamic_commits_to_the_first_signature() {
    let mut del = DynDelegate::<i32>::new();
    del.bind_fn(negate as fn(i32) -> i32);

    // A disagreeing rebind is dropped; the original target stays live.
    del.bind_fn(add as fn(i32, i32) -> i32);
    assert_eq!(del.call((4,)), Ok(-4));
    assert!(matches!(
        del.call((1, 2)),
        Err(CallError::SignatureMismatch { .. })
    ));

    // Same-signature rebinds swap the target.
    del.bind_fn(double as fn(i32) -> i32);
    assert_eq!(del.call((4,)), Ok(8));

    // Resetting clears the commitment along with the target.
    del.reset();
    assert!(!del.has_target());
    del.bind_fn(add as fn(i32, i32) -> i32);
    assert_eq!(del.call((1, 2)), Ok(3));
}

#[test]
fn dynamic_binds_closures_and_views() {
    let base = 100;
    let mut del = DynDelegate::<i32>::new();
    del.bind_closure::<fn(i32) -> i32, _>(move |x: i32| base + x);
    assert_eq!(del.call((5,)), Ok(105));
    assert_eq!(
        del.bound_closure::<fn(i32) -> i32>().map(|_| ()),
        None,
        "recovery under the wrong type must fail"
    );

    let text = String::from("xyz");
    let target = move |x: i32| x + text.len() as i32;
    let mut view = DynDelegate::<i32>::new();
    view.bind_view::<fn(i32) -> i32, _>(&target);
    assert_eq!(view.call((1,)), Ok(4));
}

#[test]
fn dynamic_binds_stateless_and_methods() {
    let mut square = DynDelegate::<i32>::new();
    square.bind_stateless::<fn(i32) -> i32, _>(|x: i32| x * x);
    assert_eq!(square.call((5,)), Ok(25));

    let mut counter = Counter { count: 1 };
    let mut del = DynDelegate::<u32>::new();
    del.bind_method_mut::<fn(u32) -> u32, _, _>(&mut counter, Counter::bump);
    assert_eq!(del.call((4u32,)), Ok(5));

    let counter = Counter { count: 8 };
    let mut del = DynDelegate::<u32>::new();
    del.bind_method_ref::<fn() -> u32, _, _>(&counter, Counter::get);
    assert_eq!(del.call(()), Ok(8));
    assert!(del.targets_instance(&counter));
}

#[test]
fn dynamic_equality_compares_committed_signatures() {
    let mut a = DynDelegate::<i32>::new();
    a.bind_fn(negate as fn(i32) -> i32);

    let mut b = DynDelegate::<i32>::new();
    b.bind_fn(double as fn(i32) -> i32);

    // Same shape, different targets: call-compatible, hence equal.
    assert_eq!(a, b);

    let unbound = DynDelegate::<i32>::new();
    assert_ne!(a, unbound);
    // Uncommitted identities never match, themselves included.
    assert_ne!(unbound, unbound);
}

#[test]
fn debug_output_names_the_signature() {
    let del = Delegate::<fn(i32) -> i32>::from_fn(negate);
    let rendered = format!("{del:?}");
    assert!(rendered.contains("bound: true"), "got: {rendered}");

    let dyn_del = DynDelegate::<i32>::from_fn(negate as fn(i32) -> i32);
    let rendered = format!("{dyn_del:?}");
    assert!(rendered.contains("fn(i32) -> i32"), "got: {rendered}");
}

//! One stub generator per binding kind. A stub knows how to pull the real
//! target back out of a [`Slot`] and invoke it; delegates store a pointer to
//! the monomorphized stub and nothing else about the binding.

use std::mem::MaybeUninit;

use crate::{
    sig::{Callable, Method, MethodMut, Signature},
    slot::Slot,
};

/// Reconstitutes a zero-sized callable out of thin air.
///
/// ## Safety
///
/// `F` must be inhabited. Binding paths prove this by taking an owned `F` at
/// bind time; combined with the zero-size and `Copy` checks, reconstructing
/// the value later is a no-op form of copying it.
pub(crate) unsafe fn conjure_zst<F: Copy>() -> F {
    const {
        assert!(
            size_of::<F>() == 0,
            "only zero-sized callables can be reconstituted without storage"
        );
    }

    unsafe { MaybeUninit::<F>::uninit().assume_init() }
}

// === Fixed-shape stubs === //

pub(crate) unsafe fn fn_stub<S: Signature, const N: usize>(
    slot: &Slot<N>,
    args: S::Args,
) -> S::Ret {
    let f = unsafe { S::from_addr(slot.func_addr()) };
    f.apply(args)
}

pub(crate) unsafe fn closure_stub<S, F, const N: usize>(slot: &Slot<N>, args: S::Args) -> S::Ret
where
    S: Signature,
    F: Callable<S> + Copy + 'static,
{
    unsafe { slot.as_inline::<F>() }.invoke(args)
}

pub(crate) unsafe fn stateless_stub<S, F, const N: usize>(_slot: &Slot<N>, args: S::Args) -> S::Ret
where
    S: Signature,
    F: Callable<S> + Copy,
{
    unsafe { conjure_zst::<F>() }.invoke(args)
}

pub(crate) unsafe fn view_stub<S, F, const N: usize>(slot: &Slot<N>, args: S::Args) -> S::Ret
where
    S: Signature,
    F: Callable<S>,
{
    let target = unsafe { &*slot.const_addr().cast::<F>() };
    target.invoke(args)
}

pub(crate) unsafe fn method_ref_stub<S, T, M, const N: usize>(
    slot: &Slot<N>,
    args: S::Args,
) -> S::Ret
where
    S: Signature,
    M: Method<T, S>,
{
    let recv = unsafe { &*slot.const_addr().cast::<T>() };
    unsafe { conjure_zst::<M>() }.invoke_on(recv, args)
}

pub(crate) unsafe fn method_mut_stub<S, T, M, const N: usize>(
    slot: &Slot<N>,
    args: S::Args,
) -> S::Ret
where
    S: Signature,
    M: MethodMut<T, S>,
{
    let recv = unsafe { &mut *slot.mut_addr().cast::<T>() };
    unsafe { conjure_zst::<M>() }.invoke_on_mut(recv, args)
}

// === Erased-argument stubs === //

// Dynamic delegates pass arguments as a pointer to the caller's tuple; the
// signature gate on the call path is what certifies that the tuple the stub
// reads is the tuple the caller wrote.

pub(crate) unsafe fn dyn_fn_stub<S: Signature, const N: usize>(
    slot: &Slot<N>,
    args: *mut (),
) -> S::Ret {
    let args = unsafe { args.cast::<S::Args>().read() };
    unsafe { fn_stub::<S, N>(slot, args) }
}

pub(crate) unsafe fn dyn_closure_stub<S, F, const N: usize>(
    slot: &Slot<N>,
    args: *mut (),
) -> S::Ret
where
    S: Signature,
    F: Callable<S> + Copy + 'static,
{
    let args = unsafe { args.cast::<S::Args>().read() };
    unsafe { closure_stub::<S, F, N>(slot, args) }
}

pub(crate) unsafe fn dyn_stateless_stub<S, F, const N: usize>(
    slot: &Slot<N>,
    args: *mut (),
) -> S::Ret
where
    S: Signature,
    F: Callable<S> + Copy,
{
    let args = unsafe { args.cast::<S::Args>().read() };
    unsafe { stateless_stub::<S, F, N>(slot, args) }
}

pub(crate) unsafe fn dyn_view_stub<S, F, const N: usize>(slot: &Slot<N>, args: *mut ()) -> S::Ret
where
    S: Signature,
    F: Callable<S>,
{
    let args = unsafe { args.cast::<S::Args>().read() };
    unsafe { view_stub::<S, F, N>(slot, args) }
}

pub(crate) unsafe fn dyn_method_ref_stub<S, T, M, const N: usize>(
    slot: &Slot<N>,
    args: *mut (),
) -> S::Ret
where
    S: Signature,
    M: Method<T, S>,
{
    let args = unsafe { args.cast::<S::Args>().read() };
    unsafe { method_ref_stub::<S, T, M, N>(slot, args) }
}

pub(crate) unsafe fn dyn_method_mut_stub<S, T, M, const N: usize>(
    slot: &Slot<N>,
    args: *mut (),
) -> S::Ret
where
    S: Signature,
    M: MethodMut<T, S>,
{
    let args = unsafe { args.cast::<S::Args>().read() };
    unsafe { method_mut_stub::<S, T, M, N>(slot, args) }
}

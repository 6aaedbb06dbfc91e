use std::{any::TypeId, fmt, marker::PhantomData};

use derive_where::derive_where;

use crate::{
    dispatch,
    error::CallError,
    sig::{Callable, Method, MethodMut, Signature},
    slot::{DEFAULT_SLOT_SIZE, Slot},
};

type Stub<S, const N: usize> =
    unsafe fn(&Slot<N>, <S as Signature>::Args) -> <S as Signature>::Ret;

// === Delegate === //

/// A fixed-size, non-allocating callable wrapper whose full call shape `S`
/// (a `fn(Args...) -> Ret` pointer type) is fixed at the type level.
///
/// Invocability is enforced entirely by the type system; the only run-time
/// failure is calling while unbound. `N` sizes the inline capture buffer and
/// defaults to one pointer width; `'a` bounds any borrowed binding (views and
/// method receivers).
///
/// The delegate is a plain `Copy` value: every payload it can hold is
/// trivially copyable and trivially destructible, so copies are independent
/// and destruction is a no-op.
#[derive_where(Copy, Clone)]
pub struct Delegate<'a, S: Signature, const N: usize = DEFAULT_SLOT_SIZE> {
    _borrow: PhantomData<&'a ()>,
    stub: Option<Stub<S, N>>,
    slot: Slot<N>,
}

impl<'a, S: Signature, const N: usize> Delegate<'a, S, N> {
    /// An unbound delegate. Calling it reports [`CallError::Unbound`].
    pub const fn new() -> Self {
        Self {
            _borrow: PhantomData,
            stub: None,
            slot: Slot::Empty,
        }
    }

    // === Construction === //

    /// Wraps a free function (or a non-capturing closure, which coerces to
    /// one at the call site).
    pub fn from_fn(f: S) -> Self {
        let mut del = Self::new();
        del.bind_fn(f);
        del
    }

    /// Wraps a capturing closure by copying it into the inline buffer.
    ///
    /// Captures larger than `N` bytes are rejected when the delegate is
    /// instantiated:
    ///
    /// ```compile_fail
    /// use fnslot::Delegate;
    ///
    /// let big = [0u8; 64];
    /// let del = Delegate::<fn() -> u8>::from_closure(move || big[0]);
    /// del.call();
    /// ```
    ///
    /// So are captures aligned more strictly than the slot's 16 bytes:
    ///
    /// ```compile_fail
    /// use fnslot::Delegate;
    ///
    /// #[derive(Copy, Clone)]
    /// #[repr(align(32))]
    /// struct Wide(u8);
    ///
    /// let wide = Wide(7);
    /// let del = Delegate::<fn() -> u8, 32>::from_closure(move || { let w = wide; w.0 });
    /// del.call();
    /// ```
    pub fn from_closure<F>(f: F) -> Self
    where
        F: Callable<S> + Copy + 'static,
    {
        let mut del = Self::new();
        del.bind_closure(f);
        del
    }

    /// Wraps a zero-sized callable. The value is reconstituted at call time;
    /// nothing is stored.
    pub fn from_stateless<F>(f: F) -> Self
    where
        F: Callable<S> + Copy,
    {
        let mut del = Self::new();
        del.bind_stateless(f);
        del
    }

    /// Wraps a borrowed callable without taking ownership of it.
    pub fn from_view<F>(target: &'a F) -> Self
    where
        F: Callable<S>,
    {
        let mut del = Self::new();
        del.bind_view(target);
        del
    }

    /// Wraps a method and its receiver. `method` must be a zero-sized `Copy`
    /// callable (a function item like `Counter::get` qualifies); it is baked
    /// into the stub rather than stored.
    pub fn from_method_ref<T, M>(instance: &'a T, method: M) -> Self
    where
        M: Method<T, S>,
    {
        let mut del = Self::new();
        del.bind_method_ref(instance, method);
        del
    }

    /// [`Self::from_method_ref`] for methods taking `&mut` receivers.
    pub fn from_method_mut<T, M>(instance: &'a mut T, method: M) -> Self
    where
        M: MethodMut<T, S>,
    {
        let mut del = Self::new();
        del.bind_method_mut(instance, method);
        del
    }

    // === Binding === //

    pub fn bind_fn(&mut self, f: S) {
        self.slot = Slot::Func(f.addr());
        self.stub = Some(dispatch::fn_stub::<S, N>);
    }

    pub fn bind_closure<F>(&mut self, f: F)
    where
        F: Callable<S> + Copy + 'static,
    {
        self.slot = Slot::inline(f);
        self.stub = Some(dispatch::closure_stub::<S, F, N>);
    }

    pub fn bind_stateless<F>(&mut self, witness: F)
    where
        F: Callable<S> + Copy,
    {
        const {
            assert!(
                size_of::<F>() == 0,
                "stateless bindings require a zero-sized callable"
            );
        }

        // The value itself is only needed as proof that `F` is inhabited.
        let _ = witness;

        self.slot = Slot::Stateless;
        self.stub = Some(dispatch::stateless_stub::<S, F, N>);
    }

    pub fn bind_view<F>(&mut self, target: &'a F)
    where
        F: Callable<S>,
    {
        self.slot = Slot::ConstPtr(target as *const F as *const ());
        self.stub = Some(dispatch::view_stub::<S, F, N>);
    }

    pub fn bind_method_ref<T, M>(&mut self, instance: &'a T, method: M)
    where
        M: Method<T, S>,
    {
        const {
            assert!(
                size_of::<M>() == 0,
                "method bindings require a zero-sized method token"
            );
        }

        let _ = method;

        self.slot = Slot::ConstPtr(instance as *const T as *const ());
        self.stub = Some(dispatch::method_ref_stub::<S, T, M, N>);
    }

    pub fn bind_method_mut<T, M>(&mut self, instance: &'a mut T, method: M)
    where
        M: MethodMut<T, S>,
    {
        const {
            assert!(
                size_of::<M>() == 0,
                "method bindings require a zero-sized method token"
            );
        }

        let _ = method;

        self.slot = Slot::Ptr(instance as *mut T as *mut ());
        self.stub = Some(dispatch::method_mut_stub::<S, T, M, N>);
    }

    /// Returns the delegate to the unbound state.
    pub fn reset(&mut self) {
        self.stub = None;
        self.slot = Slot::Empty;
    }

    // === Invocation === //

    /// Calls the bound target with a tuple-packed argument list, reporting
    /// [`CallError::Unbound`] instead of panicking when no target is bound.
    pub fn try_call(&self, args: S::Args) -> Result<S::Ret, CallError> {
        match self.stub {
            Some(stub) => Ok(unsafe { stub(&self.slot, args) }),
            None => Err(CallError::Unbound),
        }
    }

    // === Introspection === //

    pub fn has_target(&self) -> bool {
        self.stub.is_some()
    }

    /// Whether the delegate is bound to exactly this function pointer.
    pub fn targets_fn(&self, f: S) -> bool {
        matches!(self.slot, Slot::Func(addr) if addr == f.addr())
    }

    /// Whether the delegate is a view of exactly this callable.
    pub fn targets_view<F>(&self, probe: &F) -> bool
    where
        F: Callable<S>,
    {
        // Stub identity discriminates the binding kind. Monomorphized fn
        // pointers are not guaranteed unique across codegen units, but a
        // false match additionally requires the probe's exact address.
        self.stub == Some(dispatch::view_stub::<S, F, N> as Stub<S, N>)
            && matches!(self.slot, Slot::ConstPtr(addr) if addr == probe as *const F as *const ())
    }

    /// Whether the delegate is bound through exactly this instance, whatever
    /// the method.
    pub fn targets_instance<T>(&self, instance: &T) -> bool {
        let probe = instance as *const T as *const ();

        match self.slot {
            Slot::ConstPtr(addr) => addr == probe,
            Slot::Ptr(addr) => addr as *const () == probe,
            _ => false,
        }
    }

    /// Recovers the inline-stored closure, if the delegate holds one of
    /// exactly this type. Lets callers compare captured state with `==`.
    pub fn bound_closure<F: 'static>(&self) -> Option<&F> {
        if self.slot.inline_ty() == Some(TypeId::of::<F>()) {
            Some(unsafe { self.slot.as_inline::<F>() })
        } else {
            None
        }
    }
}

impl<S: Signature, const N: usize> Default for Delegate<'_, S, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, S: Signature, const N: usize> From<S> for Delegate<'a, S, N> {
    fn from(f: S) -> Self {
        Self::from_fn(f)
    }
}

impl<S: Signature, const N: usize> fmt::Debug for Delegate<'_, S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("signature", &S::id().text())
            .field("bound", &self.has_target())
            .finish()
    }
}

// Natural-arity call surface: `del.call(a, b)` rather than
// `del.try_call((a, b))`. Calling while unbound is a programming error and
// panics; use `try_call` to observe it as a value.
macro_rules! impl_fixed_call {
    ($( ($($arg:ident: $ty:ident),*) )*) => {$(
        impl<'a, R, $($ty,)* const N: usize> Delegate<'a, fn($($ty),*) -> R, N> {
            pub fn call(&self, $($arg: $ty),*) -> R {
                match self.try_call(($($arg,)*)) {
                    Ok(ret) => ret,
                    Err(err) => panic!("{err}"),
                }
            }
        }
    )*};
}

impl_fixed_call! {
    ()
    (a1: A1)
    (a1: A1, a2: A2)
    (a1: A1, a2: A2, a3: A3)
    (a1: A1, a2: A2, a3: A3, a4: A4)
    (a1: A1, a2: A2, a3: A3, a4: A4, a5: A5)
    (a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6)
    (a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7)
    (a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7, a8: A8)
}

use std::{any::TypeId, fmt, marker::PhantomData, mem::ManuallyDrop};

use derive_where::derive_where;

use crate::{
    dispatch,
    error::CallError,
    sig::{CallArgs, Callable, Method, MethodMut, SigId, Signature},
    slot::{DEFAULT_SLOT_SIZE, Slot},
};

type DynStub<R, const N: usize> = unsafe fn(&Slot<N>, *mut ()) -> R;

// === DynDelegate === //

/// The dynamic-signature counterpart of [`Delegate`](crate::Delegate): only
/// the return type `R` is fixed at the type level, and every call is gated
/// on the signature committed at bind time. The gate advertises the hashed
/// rendering but certifies the match by `TypeId`, so signatures on this path
/// are fully concrete (`'static`) shapes; targets that need to borrow per
/// call ride the view and method bindings, whose borrows the delegate itself
/// holds for `'a`.
///
/// A delegate commits to the first signature bound into it. Rebinding under
/// the same signature swaps the target; rebinding under a different signature
/// is a silent no-op, so a committed slot never reinterprets its storage
/// under another layout. [`DynDelegate::reset`] discards both the target and
/// the commitment.
#[derive_where(Copy, Clone)]
pub struct DynDelegate<'a, R = (), const N: usize = DEFAULT_SLOT_SIZE> {
    _borrow: PhantomData<&'a ()>,
    stub: Option<DynStub<R, N>>,
    accepted: SigId,
    accepted_ty: Option<TypeId>,
    slot: Slot<N>,
}

impl<'a, R, const N: usize> DynDelegate<'a, R, N> {
    /// An unbound, uncommitted delegate.
    pub const fn new() -> Self {
        Self {
            _borrow: PhantomData,
            stub: None,
            accepted: SigId::UNKNOWN,
            accepted_ty: None,
            slot: Slot::Empty,
        }
    }

    /// Single-signature commit: the first bound signature wins and later
    /// disagreeing binds are dropped on the floor.
    fn admit(&mut self, id: SigId, ty: TypeId) -> bool {
        if self.accepted_ty.is_some_and(|committed| committed != ty) {
            return false;
        }

        self.accepted = id;
        self.accepted_ty = Some(ty);
        true
    }

    // === Construction === //

    pub fn from_fn<S>(f: S) -> Self
    where
        S: Signature<Ret = R> + 'static,
    {
        let mut del = Self::new();
        del.bind_fn(f);
        del
    }

    pub fn from_closure<S, F>(f: F) -> Self
    where
        S: Signature<Ret = R> + 'static,
        F: Callable<S> + Copy + 'static,
    {
        let mut del = Self::new();
        del.bind_closure::<S, F>(f);
        del
    }

    pub fn from_view<S, F>(target: &'a F) -> Self
    where
        S: Signature<Ret = R> + 'static,
        F: Callable<S>,
    {
        let mut del = Self::new();
        del.bind_view::<S, F>(target);
        del
    }

    // === Binding === //

    /// Binds a free function under the signature `S`, committing the
    /// delegate to `S`'s identity if it has not committed yet.
    pub fn bind_fn<S>(&mut self, f: S)
    where
        S: Signature<Ret = R> + 'static,
    {
        if !self.admit(S::id(), TypeId::of::<S>()) {
            return;
        }

        self.slot = Slot::Func(f.addr());
        self.stub = Some(dispatch::dyn_fn_stub::<S, N>);
    }

    /// Binds a capturing closure. The signature cannot be deduced from the
    /// closure alone, so `S` must be named:
    /// `del.bind_closure::<fn(i32) -> i32, _>(move |x| base + x)`.
    pub fn bind_closure<S, F>(&mut self, f: F)
    where
        S: Signature<Ret = R> + 'static,
        F: Callable<S> + Copy + 'static,
    {
        if !self.admit(S::id(), TypeId::of::<S>()) {
            return;
        }

        self.slot = Slot::inline(f);
        self.stub = Some(dispatch::dyn_closure_stub::<S, F, N>);
    }

    pub fn bind_stateless<S, F>(&mut self, witness: F)
    where
        S: Signature<Ret = R> + 'static,
        F: Callable<S> + Copy,
    {
        const {
            assert!(
                size_of::<F>() == 0,
                "stateless bindings require a zero-sized callable"
            );
        }

        let _ = witness;

        if !self.admit(S::id(), TypeId::of::<S>()) {
            return;
        }

        self.slot = Slot::Stateless;
        self.stub = Some(dispatch::dyn_stateless_stub::<S, F, N>);
    }

    pub fn bind_view<S, F>(&mut self, target: &'a F)
    where
        S: Signature<Ret = R> + 'static,
        F: Callable<S>,
    {
        if !self.admit(S::id(), TypeId::of::<S>()) {
            return;
        }

        self.slot = Slot::ConstPtr(target as *const F as *const ());
        self.stub = Some(dispatch::dyn_view_stub::<S, F, N>);
    }

    pub fn bind_method_ref<S, T, M>(&mut self, instance: &'a T, method: M)
    where
        S: Signature<Ret = R> + 'static,
        M: Method<T, S>,
    {
        const {
            assert!(
                size_of::<M>() == 0,
                "method bindings require a zero-sized method token"
            );
        }

        let _ = method;

        if !self.admit(S::id(), TypeId::of::<S>()) {
            return;
        }

        self.slot = Slot::ConstPtr(instance as *const T as *const ());
        self.stub = Some(dispatch::dyn_method_ref_stub::<S, T, M, N>);
    }

    pub fn bind_method_mut<S, T, M>(&mut self, instance: &'a mut T, method: M)
    where
        S: Signature<Ret = R> + 'static,
        M: MethodMut<T, S>,
    {
        const {
            assert!(
                size_of::<M>() == 0,
                "method bindings require a zero-sized method token"
            );
        }

        let _ = method;

        if !self.admit(S::id(), TypeId::of::<S>()) {
            return;
        }

        self.slot = Slot::Ptr(instance as *mut T as *mut ());
        self.stub = Some(dispatch::dyn_method_mut_stub::<S, T, M, N>);
    }

    /// Returns the delegate to the unbound state and clears the signature
    /// commitment; the next bind may choose a fresh signature.
    pub fn reset(&mut self) {
        self.stub = None;
        self.accepted = SigId::UNKNOWN;
        self.accepted_ty = None;
        self.slot = Slot::Empty;
    }

    // === Invocation === //

    /// Calls the bound target with a tuple-packed argument list.
    ///
    /// The caller-side signature `fn(A...) -> R` is composed from the tuple's
    /// element types and compared against the committed identity before any
    /// dispatch happens. On mismatch nothing is invoked and both signature
    /// renderings are reported.
    ///
    /// Argument tuples must be `'static` shapes; a call can never launder a
    /// short-lived borrow into a longer-lived result:
    ///
    /// ```compile_fail
    /// use fnslot::DynDelegate;
    ///
    /// fn first(s: &'static str) -> &'static str {
    ///     &s[..1]
    /// }
    ///
    /// let del =
    ///     DynDelegate::<&'static str>::from_fn(first as fn(&'static str) -> &'static str);
    /// let temp = String::from("transient");
    /// del.call((temp.as_str(),)).unwrap();
    /// ```
    pub fn call<A: CallArgs>(&self, args: A) -> Result<R, CallError>
    where
        A::Sig<R>: 'static,
    {
        let Some(stub) = self.stub else {
            return Err(CallError::Unbound);
        };

        let supplied = <A::Sig<R> as Signature>::id();

        // The hash is the advertised identity; the `TypeId` comparison backs
        // it so dispatch never rests on a 32-bit hash or a textual rendering.
        if !self.accepted.accepts(supplied)
            || self.accepted_ty != Some(TypeId::of::<A::Sig<R>>())
        {
            return Err(CallError::SignatureMismatch {
                accepted: self.accepted.text(),
                supplied: supplied.text(),
            });
        }

        // The gate above certifies that the stub reads the tuple back as
        // exactly `A`; `ManuallyDrop` hands ownership to the stub.
        let mut args = ManuallyDrop::new(args);
        Ok(unsafe { stub(&self.slot, (&raw mut args).cast::<()>()) })
    }

    /// Non-erroring probe: would [`DynDelegate::call`] with these argument
    /// types dispatch?
    pub fn is_invokable<A: CallArgs>(&self) -> bool
    where
        A::Sig<R>: 'static,
    {
        self.stub.is_some() && self.accepted_ty == Some(TypeId::of::<A::Sig<R>>())
    }

    // === Introspection === //

    pub fn has_target(&self) -> bool {
        self.stub.is_some()
    }

    /// The committed signature identity, if any bind has succeeded since the
    /// last reset.
    pub fn signature(&self) -> Option<SigId> {
        (!self.accepted.is_unknown()).then_some(self.accepted)
    }

    /// Whether the delegate is bound to exactly this function pointer.
    pub fn targets_fn<S>(&self, f: S) -> bool
    where
        S: Signature<Ret = R>,
    {
        matches!(self.slot, Slot::Func(addr) if addr == f.addr())
    }

    /// Whether the delegate is bound through exactly this instance.
    pub fn targets_instance<T>(&self, instance: &T) -> bool {
        let probe = instance as *const T as *const ();

        match self.slot {
            Slot::ConstPtr(addr) => addr == probe,
            Slot::Ptr(addr) => addr as *const () == probe,
            _ => false,
        }
    }

    /// Recovers the inline-stored closure, if the delegate holds one of
    /// exactly this type.
    pub fn bound_closure<F: 'static>(&self) -> Option<&F> {
        if self.slot.inline_ty() == Some(TypeId::of::<F>()) {
            Some(unsafe { self.slot.as_inline::<F>() })
        } else {
            None
        }
    }
}

impl<R, const N: usize> Default for DynDelegate<'_, R, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Delegates compare by committed signature, mirroring call-site
/// compatibility rather than target identity. Uncommitted delegates compare
/// unequal to everything, themselves included.
impl<R, const N: usize> PartialEq for DynDelegate<'_, R, N> {
    fn eq(&self, other: &Self) -> bool {
        self.accepted_ty.is_some() && self.accepted_ty == other.accepted_ty
    }
}

impl<R, const N: usize> fmt::Debug for DynDelegate<'_, R, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynDelegate")
            .field("signature", &self.accepted.text())
            .field("bound", &self.has_target())
            .finish()
    }
}

use std::{any::type_name, mem, ptr};

use static_assertions::assert_eq_size;

// === SigId === //

/// Prime used by the Horner signature hash. Changing it changes every
/// signature identity, so treat it like an ABI constant.
pub const SIG_HASH_PRIME: u32 = 31;

/// Horner's-rule hash over the bytes of a signature rendering.
///
/// `const` so that identities of known texts fold to their hashes at
/// compile time.
pub const fn sig_hash(text: &str) -> u32 {
    let bytes = text.as_bytes();
    let mut hash = 0u32;
    let mut i = 0;

    while i < bytes.len() {
        hash = hash.wrapping_mul(SIG_HASH_PRIME).wrapping_add(bytes[i] as u32);
        i += 1;
    }

    hash
}

/// The canonical identity of a function shape: the compiler's rendering of a
/// `fn(Args...) -> Ret` pointer type plus its 32-bit hash.
///
/// The text comes from [`type_name`], which is deterministic for a fixed
/// compiler and type but not stable across compilers. The hash is the
/// advertised comparison; dynamic dispatch additionally certifies matches
/// by `TypeId`, so the text only ever decides diagnostics.
#[derive(Debug, Copy, Clone)]
pub struct SigId {
    text: &'static str,
    hash: u32,
}

impl SigId {
    /// The identity of a delegate that has never committed to a signature.
    /// Unknown identities never compare equal to anything, themselves
    /// included.
    pub const UNKNOWN: Self = Self { text: "", hash: 0 };

    // Not `const`: `type_name` is not const-callable on stable.
    pub fn of<S: ?Sized>() -> Self {
        Self::from_text(type_name::<S>())
    }

    pub const fn from_text(text: &'static str) -> Self {
        Self {
            text,
            hash: sig_hash(text),
        }
    }

    pub const fn text(self) -> &'static str {
        self.text
    }

    pub const fn hash(self) -> u32 {
        self.hash
    }

    pub const fn is_unknown(self) -> bool {
        self.text.is_empty()
    }

    /// Whether a call shaped like `other` may dispatch into a target shaped
    /// like `self`.
    ///
    /// The hash is the comparison; the text check only runs on hash equality
    /// and exists to demote a 32-bit collision between structurally different
    /// shapes from type confusion to an ordinary mismatch. In the common case
    /// both sides hold the same `&'static str` and the guard is a pointer
    /// compare.
    pub fn accepts(self, other: SigId) -> bool {
        if self.is_unknown() || other.is_unknown() {
            return false;
        }

        self.hash == other.hash
            && (ptr::eq(self.text, other.text) || self.text == other.text)
    }
}

// === Signature === //

// Stubs round-trip erased function pointers on the strength of this.
assert_eq_size!(fn(), *const ());

/// A statically known call shape, implemented for `fn(Args...) -> Ret`
/// pointer types up to eight parameters.
///
/// Parameter types are plain types, never late-bound borrows: a shape like
/// `fn(&mut i32, bool, i32)` with an elided lifetime is higher-ranked and
/// does not implement this trait. Targets that need to borrow per call ride
/// the view and method bindings instead, where the delegate itself holds the
/// borrow for its lifetime parameter.
///
/// ## Safety
///
/// Implementations must be function pointer types: [`Signature::from_addr`]
/// reconstitutes `Self` from a raw address previously produced by
/// [`Signature::addr`], which is only sound when `Self` is pointer-sized and
/// pointer-shaped.
pub unsafe trait Signature: Copy {
    type Ret;
    type Args;

    /// Identity of this shape. Cheap enough to compute per call; the hash
    /// folds to a constant under optimization.
    fn id() -> SigId;

    fn addr(self) -> *const ();

    /// ## Safety
    ///
    /// `addr` must have been produced by [`Signature::addr`] on a value of
    /// exactly this type.
    unsafe fn from_addr(addr: *const ()) -> Self;

    fn apply(self, args: Self::Args) -> Self::Ret;
}

/// A callable invocable under the shape `S` through tuple-packed arguments.
/// Blanket-implemented for every `Fn` of the matching arity.
pub trait Callable<S: Signature> {
    fn invoke(&self, args: S::Args) -> S::Ret;
}

/// A zero-state method token callable on a `&T` receiver under the shape `S`.
/// Function items like `Counter::get` implement this for free.
pub trait Method<T: ?Sized, S: Signature>: Copy {
    fn invoke_on(&self, recv: &T, args: S::Args) -> S::Ret;
}

/// [`Method`], but for methods taking the receiver by `&mut T`.
pub trait MethodMut<T: ?Sized, S: Signature>: Copy {
    fn invoke_on_mut(&self, recv: &mut T, args: S::Args) -> S::Ret;
}

/// An argument tuple as supplied at a dynamic call site; composes the
/// caller-side signature for any return type.
pub trait CallArgs: Sized {
    type Sig<R>: Signature<Ret = R, Args = Self>;
}

macro_rules! impl_signature {
    ($( ($($arg:ident: $ty:ident),*) )*) => {$(
        unsafe impl<R, $($ty,)*> Signature for fn($($ty),*) -> R {
            type Ret = R;
            type Args = ($($ty,)*);

            fn id() -> SigId {
                SigId::of::<Self>()
            }

            fn addr(self) -> *const () {
                self as *const ()
            }

            unsafe fn from_addr(addr: *const ()) -> Self {
                unsafe { mem::transmute::<*const (), Self>(addr) }
            }

            fn apply(self, ($($arg,)*): Self::Args) -> R {
                self($($arg),*)
            }
        }

        impl<F, R, $($ty,)*> Callable<fn($($ty),*) -> R> for F
        where
            F: Fn($($ty),*) -> R,
        {
            fn invoke(&self, ($($arg,)*): ($($ty,)*)) -> R {
                self($($arg),*)
            }
        }

        impl<F, T, R, $($ty,)*> Method<T, fn($($ty),*) -> R> for F
        where
            T: ?Sized,
            F: Copy + Fn(&T, $($ty),*) -> R,
        {
            fn invoke_on(&self, recv: &T, ($($arg,)*): ($($ty,)*)) -> R {
                self(recv, $($arg),*)
            }
        }

        impl<F, T, R, $($ty,)*> MethodMut<T, fn($($ty),*) -> R> for F
        where
            T: ?Sized,
            F: Copy + Fn(&mut T, $($ty),*) -> R,
        {
            fn invoke_on_mut(&self, recv: &mut T, ($($arg,)*): ($($ty,)*)) -> R {
                self(recv, $($arg),*)
            }
        }

        impl<$($ty,)*> CallArgs for ($($ty,)*) {
            type Sig<R> = fn($($ty),*) -> R;
        }
    )*};
}

impl_signature! {
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

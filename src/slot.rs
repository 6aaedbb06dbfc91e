use std::{any::TypeId, mem::MaybeUninit};

use static_assertions::const_assert;

// === Configuration === //

/// Default inline capture capacity: one pointer width, the cheapest slot
/// that still fits every non-closure binding payload.
pub const DEFAULT_SLOT_SIZE: usize = size_of::<*const ()>();

/// Upper bound on the alignment of inline captures. Captures with a stricter
/// alignment are rejected at compile time.
pub const MAX_INLINE_ALIGN: usize = 16;

const_assert!(DEFAULT_SLOT_SIZE >= size_of::<fn()>());

// === InlineBuf === //

/// Raw byte storage for an inline capture. Alignment is fixed at
/// [`MAX_INLINE_ALIGN`] so that any admitted capture type can be recovered
/// by a plain typed reborrow of the first `size_of::<F>()` bytes.
#[derive(Copy, Clone)]
#[repr(C, align(16))]
pub(crate) struct InlineBuf<const N: usize> {
    bytes: [MaybeUninit<u8>; N],
}

// === Slot === //

/// What a delegate currently holds. The installed stub determines how the
/// payload is interpreted; the tag exists so that interpretation is checkable
/// rather than asserted.
///
/// Everything in here is trivially copyable and trivially destructible, which
/// is what lets delegates be `Copy` with no `Drop` glue.
#[derive(Copy, Clone)]
pub(crate) enum Slot<const N: usize> {
    /// No target.
    Empty,
    /// A borrowed instance invoked through a `&mut` receiver.
    Ptr(*mut ()),
    /// A borrowed instance or callable invoked through a `&` receiver.
    ConstPtr(*const ()),
    /// An erased function pointer.
    Func(*const ()),
    /// A zero-sized callable, reconstituted at call time; nothing stored.
    Stateless,
    /// A capturing closure copied into the inline buffer.
    Inline { ty: TypeId, buf: InlineBuf<N> },
}

impl<const N: usize> Slot<N> {
    pub fn inline<F: Copy + 'static>(value: F) -> Self {
        const {
            assert!(
                size_of::<F>() <= N,
                "closure capture does not fit the delegate's inline slot; \
                 raise the delegate's size parameter"
            );
            assert!(
                align_of::<F>() <= MAX_INLINE_ALIGN,
                "closure capture is aligned more strictly than the inline slot"
            );
        }

        let mut buf = InlineBuf {
            bytes: [MaybeUninit::uninit(); N],
        };

        unsafe { buf.bytes.as_mut_ptr().cast::<F>().write(value) };

        Slot::Inline {
            ty: TypeId::of::<F>(),
            buf,
        }
    }

    /// ## Safety
    ///
    /// The slot must hold an inline capture written as an `F`. Stubs uphold
    /// this because the stub and the slot are always installed as a pair.
    pub unsafe fn as_inline<F: 'static>(&self) -> &F {
        match self {
            Slot::Inline { ty, buf } => {
                debug_assert!(*ty == TypeId::of::<F>());
                unsafe { &*buf.bytes.as_ptr().cast::<F>() }
            }
            _ => unreachable!("inline stub installed over a non-inline slot"),
        }
    }

    pub fn func_addr(&self) -> *const () {
        match *self {
            Slot::Func(addr) => addr,
            _ => unreachable!("function stub installed over a non-function slot"),
        }
    }

    pub fn const_addr(&self) -> *const () {
        match *self {
            Slot::ConstPtr(addr) => addr,
            _ => unreachable!("borrowing stub installed over a non-pointer slot"),
        }
    }

    pub fn mut_addr(&self) -> *mut () {
        match *self {
            Slot::Ptr(addr) => addr,
            _ => unreachable!("mutating stub installed over a non-pointer slot"),
        }
    }

    pub fn inline_ty(&self) -> Option<TypeId> {
        match self {
            Slot::Inline { ty, .. } => Some(*ty),
            _ => None,
        }
    }
}

//! Fixed-size, non-heap-allocating callable wrappers ("delegates").
//!
//! [`Delegate`] fixes the full call shape at the type level and checks
//! invocability at compile time; [`DynDelegate`] fixes only the return type
//! and gates every call on the signature committed at bind time. Both store
//! their target inline (a function pointer, a borrowed instance, or a copied
//! closure) and dispatch through a single stored stub pointer.

#![allow(clippy::missing_safety_doc)]

mod dispatch;

mod dynamic;
pub use self::dynamic::*;

mod error;
pub use self::error::*;

mod fixed;
pub use self::fixed::*;

mod sig;
pub use self::sig::*;

mod slot;
pub use self::slot::*;

mod tests;

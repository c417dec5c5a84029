//! Atom Bindings
//!
//! The consumer-facing side of the store:
//!
//! - [`use_atom`] / [`use_atom_in`] bind one consumer to one atom and return
//!   a [`Binding`] that follows the atom and writes through to it.
//! - [`AtomView`] wraps a binding and a render function, rerendering on
//!   every change.
//! - [`Update`] is the argument of [`Binding::set_value`]: a value, or a
//!   function of the previous value.

mod binding;
mod update;
mod view;

pub use binding::{use_atom, use_atom_in, Binding};
pub use update::Update;
pub use view::AtomView;

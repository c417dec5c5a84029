//! Atom View
//!
//! An AtomView is the declarative face of a binding: it owns a
//! [`Binding`] and a render function, and runs the render function with the
//! live binding whenever the atom changes.
//!
//! # How Views Work
//!
//! 1. When created, the view binds to its atom and renders once.
//!
//! 2. Every write to the atom renders again, after the binding's snapshot
//!    has been updated.
//!
//! 3. The latest render output is kept and can be read back.
//!
//! 4. Unmounting (or dropping) the view stops rendering and unmounts the
//!    binding.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::binding::{use_atom_in, Binding};
use crate::bridge::Bridge;
use crate::store::{AtomKey, AtomResult, AtomValue, Unsubscribe};

type RenderFn<T, R> = Box<dyn Fn(&Binding<T>) -> R + Send + Sync>;

/// Output of the latest-started render that has finished.
struct LatestOutput<R> {
    ticket: u64,
    value: Option<Arc<R>>,
}

struct ViewInner<T, R>
where
    T: AtomValue,
{
    binding: Binding<T>,
    render: RenderFn<T, R>,
    output: Mutex<LatestOutput<R>>,
    tickets: AtomicU64,
    render_count: AtomicUsize,
}

impl<T, R> ViewInner<T, R>
where
    T: AtomValue,
{
    fn render(&self) {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;

        // No lock is held while the render function runs; it may write,
        // which renders again (nested) with a later ticket.
        let output = Arc::new((self.render)(&self.binding));

        {
            let mut latest = self.output.lock();
            if ticket > latest.ticket {
                latest.ticket = ticket;
                latest.value = Some(output);
            }
        }
        self.render_count.fetch_add(1, Ordering::SeqCst);
    }

    fn latest(&self) -> Option<Arc<R>> {
        self.output.lock().value.clone()
    }
}

/// Renders a function of an atom's binding, again on every change.
///
/// # Example
///
/// ```rust,ignore
/// let label = AtomView::new("count", 0, |count| format!("clicked {} times", count.value()))?;
/// label.binding().update(|n| n + 1);
/// assert_eq!(label.output().as_deref(), Some("clicked 1 times"));
/// ```
pub struct AtomView<T, R>
where
    T: AtomValue,
{
    inner: Arc<ViewInner<T, R>>,
    subscription: Mutex<Option<Unsubscribe>>,
}

impl<T, R> AtomView<T, R>
where
    T: AtomValue,
    R: Send + Sync + 'static,
{
    /// Bind through the ambient bridge and render once.
    pub fn new<F>(key: impl Into<AtomKey<T>>, initial: T, render: F) -> AtomResult<Self>
    where
        F: Fn(&Binding<T>) -> R + Send + Sync + 'static,
    {
        Self::with_bridge(Bridge::current(), key, initial, render)
    }

    /// Bind through an explicit bridge or store and render once.
    pub fn with_bridge<F>(
        bridge: impl Into<Bridge>,
        key: impl Into<AtomKey<T>>,
        initial: T,
        render: F,
    ) -> AtomResult<Self>
    where
        F: Fn(&Binding<T>) -> R + Send + Sync + 'static,
    {
        let binding = use_atom_in(bridge, key, initial)?;
        let inner = Arc::new(ViewInner {
            binding,
            render: Box::new(render),
            output: Mutex::new(LatestOutput {
                ticket: 0,
                value: None,
            }),
            tickets: AtomicU64::new(0),
            render_count: AtomicUsize::new(0),
        });

        // Subscribed after the binding itself, so the snapshot is current
        // by the time this runs.
        let weak = Arc::downgrade(&inner);
        let subscription = inner.binding.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.render();
            }
        });

        inner.render();

        Ok(Self {
            inner,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    /// The live binding passed to the render function.
    pub fn binding(&self) -> &Binding<T> {
        &self.inner.binding
    }

    /// The output of the most recent render.
    pub fn output(&self) -> Option<R>
    where
        R: Clone,
    {
        self.inner.latest().map(|output| R::clone(&output))
    }

    /// Borrow the output of the most recent render.
    ///
    /// No lock is held while `f` runs, so `f` may write or rerender.
    pub fn with_output<U>(&self, f: impl FnOnce(Option<&R>) -> U) -> U {
        let output = self.inner.latest();
        f(output.as_deref())
    }

    /// Number of times the render function has run.
    pub fn render_count(&self) -> usize {
        self.inner.render_count.load(Ordering::SeqCst)
    }

    /// Render now, without waiting for a change. Does nothing once unmounted.
    pub fn rerender(&self) {
        if self.is_mounted() {
            self.inner.render();
        }
    }

    pub fn unmount(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self.inner.binding.unmount();
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.lock().is_some()
    }
}

impl<T, R> std::fmt::Debug for AtomView<T, R>
where
    T: AtomValue,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomView")
            .field("key", &self.inner.binding.key().name())
            .field("render_count", &self.inner.render_count.load(Ordering::SeqCst))
            .field("mounted", &self.subscription.lock().is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AtomStore;

    #[test]
    fn view_renders_on_creation() {
        let store = AtomStore::new();
        let view = AtomView::with_bridge(&store, "count", 3, |b| b.value() * 2).unwrap();

        assert_eq!(view.render_count(), 1);
        assert_eq!(view.output(), Some(6));
    }

    #[test]
    fn view_rerenders_on_every_write() {
        let store = AtomStore::new();
        let view = AtomView::with_bridge(&store, "count", 0, |b| b.value()).unwrap();

        view.binding().set_value(1);
        view.binding().update(|n| n + 1);
        assert_eq!(view.render_count(), 3);
        assert_eq!(view.output(), Some(2));

        // Writes from elsewhere reach the view too.
        store.write(&AtomKey::new("count"), 7);
        assert_eq!(view.output(), Some(7));
    }

    #[test]
    fn view_sees_updated_snapshot() {
        let store = AtomStore::new();
        let view = AtomView::with_bridge(&store, "title", String::from("a"), |b| {
            format!("<h1>{}</h1>", b.value())
        })
        .unwrap();

        view.binding().set_value(String::from("b"));
        assert_eq!(view.output().as_deref(), Some("<h1>b</h1>"));
    }

    #[test]
    fn unmounted_view_stops_rendering() {
        let store = AtomStore::new();
        let view = AtomView::with_bridge(&store, "count", 0, |b| b.value()).unwrap();

        view.unmount();
        assert!(!view.is_mounted());
        assert!(!view.binding().is_mounted());
        assert_eq!(store.subscriber_count("count"), 0);

        store.write(&AtomKey::new("count"), 9);
        view.rerender();
        assert_eq!(view.render_count(), 1);
        assert_eq!(view.output(), Some(0));
    }

    #[test]
    fn dropped_view_releases_subscriptions() {
        let store = AtomStore::new();
        let view = AtomView::with_bridge(&store, "count", 0, |b| b.value()).unwrap();
        assert_eq!(store.subscriber_count("count"), 2);

        drop(view);
        assert_eq!(store.subscriber_count("count"), 0);
    }

    #[test]
    fn with_output_borrows() {
        let store = AtomStore::new();
        let view =
            AtomView::with_bridge(&store, "items", vec![1, 2, 3], |b| b.value()).unwrap();
        assert_eq!(view.with_output(|out| out.map(|v| v.len())), Some(3));
    }

    #[test]
    fn with_output_closure_may_write_and_rerender() {
        let store = AtomStore::new();
        let view = AtomView::with_bridge(&store, "count", 1, |b| b.value()).unwrap();

        view.with_output(|out| {
            if let Some(n) = out {
                view.binding().set_value(n + 1);
            }
            view.rerender();
        });
        assert_eq!(view.output(), Some(2));
        assert_eq!(view.render_count(), 3);
    }

    #[test]
    fn render_that_writes_keeps_newest_output() {
        let store = AtomStore::new();
        let view = AtomView::with_bridge(&store, "level", 0, |b| {
            let v = b.value();
            if v > 10 {
                b.set_value(10);
            }
            v
        })
        .unwrap();

        view.binding().set_value(11);
        assert_eq!(view.binding().value(), 10);
        assert_eq!(view.output(), Some(view.binding().value()));
        // The write itself, then the clamp from inside the render.
        assert_eq!(view.render_count(), 3);
    }
}

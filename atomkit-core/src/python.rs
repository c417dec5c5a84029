//! Python Bindings
//!
//! Exposes the store to Python hosts. Atoms created from Python hold
//! arbitrary Python objects; the GIL is acquired whenever a Python
//! subscriber has to run.

use std::sync::Arc;

use parking_lot::Mutex;
use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;

use crate::atom::{use_atom_in, Binding};
use crate::store::{AtomError, AtomKey, AtomStore, StoreConfig, Unsubscribe};

/// A Python object held in an atom.
///
/// `Py<PyAny>` can only be cloned with the GIL held; the `Arc` lets the
/// store clone values without it.
#[derive(Clone)]
struct PyValue(Arc<PyObject>);

impl PyValue {
    fn new(object: PyObject) -> Self {
        Self(Arc::new(object))
    }

    fn to_object(&self, py: Python<'_>) -> PyObject {
        self.0.clone_ref(py)
    }

    fn repr(&self, py: Python<'_>) -> String {
        self.0
            .bind(py)
            .repr()
            .map(|r| r.to_string())
            .unwrap_or_else(|_| "?".to_string())
    }
}

fn to_py_err(err: AtomError) -> PyErr {
    match err {
        AtomError::Config(_) => PyValueError::new_err(err.to_string()),
        _ => PyTypeError::new_err(err.to_string()),
    }
}

/// Python-exposed store.
#[pyclass(name = "AtomStore")]
pub struct PyAtomStore {
    store: AtomStore,
}

#[pymethods]
impl PyAtomStore {
    /// Create a store, optionally from a JSON configuration string.
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(json) => StoreConfig::from_json(json).map_err(to_py_err)?,
            None => StoreConfig::default(),
        };
        Ok(Self {
            store: AtomStore::with_config(config),
        })
    }

    /// Bind to an atom, creating it with `initial` if absent.
    fn bind(&self, key: String, initial: PyObject) -> PyResult<PyAtomBinding> {
        let binding = use_atom_in(&self.store, key, PyValue::new(initial)).map_err(to_py_err)?;
        Ok(PyAtomBinding { binding })
    }

    fn get(&self, py: Python<'_>, key: String) -> Option<PyObject> {
        self.store
            .get(&AtomKey::<PyValue>::new(key))
            .map(|value| value.to_object(py))
    }

    fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    fn clear_all(&self) {
        self.store.clear_all();
    }

    fn __len__(&self) -> usize {
        self.store.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "AtomStore(name={:?}, atoms={})",
            self.store.config().name,
            self.store.len()
        )
    }
}

/// Python-exposed binding.
#[pyclass(name = "AtomBinding")]
pub struct PyAtomBinding {
    binding: Binding<PyValue>,
}

#[pymethods]
impl PyAtomBinding {
    #[getter]
    fn key(&self) -> String {
        self.binding.key().name().to_string()
    }

    /// The local snapshot.
    #[getter]
    fn value(&self, py: Python<'_>) -> PyObject {
        self.binding.with_value(|value| value.to_object(py))
    }

    #[getter]
    fn mounted(&self) -> bool {
        self.binding.is_mounted()
    }

    /// Write a value, or call `value(previous)` if it is callable.
    fn set_value(&self, py: Python<'_>, value: PyObject) -> PyResult<()> {
        if !value.bind(py).is_callable() {
            self.binding.set_value(PyValue::new(value));
            return Ok(());
        }

        // Resolved here rather than through `Update::with` so that an
        // exception raised by the callable reaches the caller.
        let Some(current) = self.binding.current() else {
            return Ok(());
        };
        let next = value.call1(py, (current.to_object(py),))?;
        self.binding.set_value(PyValue::new(next));
        Ok(())
    }

    fn reset(&self) {
        self.binding.reset();
    }

    /// Call `callback(value)` on every write until the subscription is
    /// cancelled or garbage collected.
    fn subscribe(&self, callback: PyObject) -> PySubscription {
        let handle = self.binding.subscribe(move |value: &PyValue| {
            Python::with_gil(|py| {
                if let Err(err) = callback.call1(py, (value.to_object(py),)) {
                    tracing::warn!(error = %err, "python atom subscriber raised");
                }
            });
        });

        PySubscription {
            handle: Mutex::new(Some(handle)),
        }
    }

    fn mount(&self) {
        self.binding.mount();
    }

    fn unmount(&self) {
        self.binding.unmount();
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        let value = self.binding.with_value(|value| value.repr(py));
        format!(
            "AtomBinding(key={:?}, value={}, mounted={})",
            self.binding.key().name(),
            value,
            self.binding.is_mounted()
        )
    }
}

/// Python-exposed subscription handle.
#[pyclass(name = "Subscription")]
pub struct PySubscription {
    handle: Mutex<Option<Unsubscribe>>,
}

#[pymethods]
impl PySubscription {
    fn cancel(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.unsubscribe();
        }
    }

    #[getter]
    fn active(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.is_active())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(all(test, feature = "python"))]
mod tests {
    use super::*;
    use pyo3::types::PyDict;

    const HELPERS: &str = "\
seen = []
def inc(v):
    return v + 1
def boom(v):
    raise ValueError('boom')
";

    fn helpers(py: Python<'_>) -> Bound<'_, PyDict> {
        let scope = PyDict::new_bound(py);
        py.run_bound(HELPERS, Some(&scope), None).unwrap();
        scope
    }

    fn helper(scope: &Bound<'_, PyDict>, name: &str) -> PyObject {
        scope.get_item(name).unwrap().unwrap().unbind()
    }

    #[test]
    fn callable_set_value_applies_to_current() {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(|py| {
            let scope = helpers(py);
            let store = PyAtomStore::new(None).unwrap();
            let count = store.bind("count".to_string(), 1_i32.into_py(py)).unwrap();

            count.set_value(py, helper(&scope, "inc")).unwrap();
            assert_eq!(count.value(py).extract::<i32>(py).unwrap(), 2);
            assert!(count.mounted());

            // An exception leaves the atom untouched.
            assert!(count.set_value(py, helper(&scope, "boom")).is_err());
            let stored = store.get(py, "count".to_string()).unwrap();
            assert_eq!(stored.extract::<i32>(py).unwrap(), 2);
        });
    }

    #[test]
    fn cancelled_subscription_stops_callbacks() {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(|py| {
            let scope = helpers(py);
            let store = PyAtomStore::new(None).unwrap();
            let count = store.bind("count".to_string(), 0_i32.into_py(py)).unwrap();

            let seen = scope.get_item("seen").unwrap().unwrap();
            let subscription = count.subscribe(seen.getattr("append").unwrap().unbind());
            assert!(subscription.active());

            count.set_value(py, 5_i32.into_py(py)).unwrap();
            subscription.cancel();
            assert!(!subscription.active());
            count.set_value(py, 6_i32.into_py(py)).unwrap();

            assert_eq!(seen.extract::<Vec<i32>>().unwrap(), vec![5]);
            assert_eq!(store.__len__(), 1);
        });
    }

    #[test]
    fn config_errors_surface_as_value_error() {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(|py| {
            let err = PyAtomStore::new(Some(r#"{"bogus": true}"#))
                .err()
                .unwrap();
            assert!(err.is_instance_of::<PyValueError>(py));
        });
    }
}

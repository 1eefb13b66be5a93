//! Single-element pull iteration over any supported source
//!
//! An [`Iter`] yields values until it signals [`Error::Eoi`]. The first
//! terminal signal (EOI or a real error) is sticky: every later pull
//! returns EOI, so an iteration error surfaces exactly once.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::container::Tuple;
use crate::error::{Error, StreamResult};
use crate::value::{IntoValue, Value};

/// The pull function behind an [`Iter`]. Returns [`Error::Eoi`] when done.
pub type Generator = Box<dyn FnMut() -> StreamResult<Value> + Send + 'static>;

/// Everything an [`Iter`] can be built from
pub enum Source {
    /// Yields nothing.
    Empty,
    /// Yields the elements in order.
    Seq(Vec<Value>),
    /// Yields one `Tuple(key, value)` per entry.
    Keyed(Vec<(Value, Value)>),
    /// Yields exactly this value.
    Scalar(Value),
    /// Yields received values until every sender is dropped.
    Receiver(std::sync::mpsc::Receiver<Value>),
    /// Like `Receiver`, for a tokio channel. Pulling from a multi-thread
    /// runtime waits with `block_in_place`; pulling from inside a
    /// current-thread runtime fails with an error instead of blocking it.
    AsyncReceiver(tokio::sync::mpsc::Receiver<Value>),
    /// Delegates every pull to the function.
    Generator(Generator),
    /// Passed through unchanged.
    Iter(Iter),
}

impl Source {
    pub fn empty() -> Self {
        Source::Empty
    }

    pub fn scalar(v: impl IntoValue) -> Self {
        Source::Scalar(v.into_value())
    }

    pub fn generator<V, F>(mut f: F) -> Self
    where
        V: IntoValue,
        F: FnMut() -> StreamResult<V> + Send + 'static,
    {
        Source::Generator(Box::new(move || f().map(IntoValue::into_value)))
    }

    /// Pull lazily from any std iterator.
    pub fn lazy<I>(iter: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoValue,
        I::IntoIter: Send + 'static,
    {
        let mut iter = iter.into_iter();
        Source::Generator(Box::new(move || {
            iter.next().map(IntoValue::into_value).ok_or(Error::Eoi)
        }))
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Empty => f.write_str("Empty"),
            Source::Seq(xs) => f.debug_tuple("Seq").field(&xs.len()).finish(),
            Source::Keyed(xs) => f.debug_tuple("Keyed").field(&xs.len()).finish(),
            Source::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            Source::Receiver(_) => f.write_str("Receiver"),
            Source::AsyncReceiver(_) => f.write_str("AsyncReceiver"),
            Source::Generator(_) => f.write_str("Generator"),
            Source::Iter(it) => f.debug_tuple("Iter").field(it).finish(),
        }
    }
}

impl From<()> for Source {
    fn from(_: ()) -> Self {
        Source::Empty
    }
}

impl From<Value> for Source {
    fn from(v: Value) -> Self {
        match v {
            Value::Unit => Source::Empty,
            Value::List(xs) => Source::Seq(xs),
            Value::Map(entries) => Source::Keyed(entries),
            other => Source::Scalar(other),
        }
    }
}

impl From<serde_json::Value> for Source {
    fn from(json: serde_json::Value) -> Self {
        Source::from(Value::from(json))
    }
}

impl<T: IntoValue> From<Vec<T>> for Source {
    fn from(xs: Vec<T>) -> Self {
        Source::Seq(xs.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue, const N: usize> From<[T; N]> for Source {
    fn from(xs: [T; N]) -> Self {
        Source::Seq(xs.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<K: IntoValue, V: IntoValue> From<HashMap<K, V>> for Source {
    fn from(m: HashMap<K, V>) -> Self {
        Source::Keyed(
            m.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K: IntoValue, V: IntoValue> From<BTreeMap<K, V>> for Source {
    fn from(m: BTreeMap<K, V>) -> Self {
        Source::Keyed(
            m.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl From<std::sync::mpsc::Receiver<Value>> for Source {
    fn from(rx: std::sync::mpsc::Receiver<Value>) -> Self {
        Source::Receiver(rx)
    }
}

impl From<tokio::sync::mpsc::Receiver<Value>> for Source {
    fn from(rx: tokio::sync::mpsc::Receiver<Value>) -> Self {
        Source::AsyncReceiver(rx)
    }
}

impl From<Iter> for Source {
    fn from(it: Iter) -> Self {
        Source::Iter(it)
    }
}

thread_local! {
    static MAY_BLOCK: Cell<bool> = const { Cell::new(false) };
}

/// Run `f` with tokio receivers allowed to block this thread. Used by
/// producers running on the blocking pool.
pub(crate) fn allow_blocking<R>(f: impl FnOnce() -> R) -> R {
    let prev = MAY_BLOCK.with(|b| b.replace(true));
    let r = f();
    MAY_BLOCK.with(|b| b.set(prev));
    r
}

/// Wait for the next value of a tokio channel from synchronous code.
fn recv_blocking(rx: &mut tokio::sync::mpsc::Receiver<Value>) -> StreamResult<Value> {
    let handle = match Handle::try_current() {
        Ok(handle) if !MAY_BLOCK.with(Cell::get) => handle,
        _ => return rx.blocking_recv().ok_or(Error::Eoi),
    };
    match handle.runtime_flavor() {
        RuntimeFlavor::CurrentThread => Err(Error::custom(
            "tokio receiver pulled inside a current-thread runtime",
        )),
        _ => tokio::task::block_in_place(|| rx.blocking_recv()).ok_or(Error::Eoi),
    }
}

/// A pull-based iterator over stream values
pub struct Iter {
    exhausted: bool,
    generator: Generator,
}

impl Iter {
    /// Build an iterator over `source`.
    pub fn new(source: impl Into<Source>) -> Self {
        match source.into() {
            Source::Empty => Iter::from_generator(Box::new(|| Err(Error::Eoi))),
            Source::Seq(xs) => {
                let mut xs = xs.into_iter();
                Iter::from_generator(Box::new(move || xs.next().ok_or(Error::Eoi)))
            }
            Source::Keyed(entries) => {
                let mut entries = entries.into_iter();
                Iter::from_generator(Box::new(move || {
                    entries
                        .next()
                        .map(|(k, v)| Value::Tuple(Tuple::new(vec![k, v])))
                        .ok_or(Error::Eoi)
                }))
            }
            Source::Scalar(v) => {
                let mut v = Some(v);
                Iter::from_generator(Box::new(move || v.take().ok_or(Error::Eoi)))
            }
            Source::Receiver(rx) => {
                Iter::from_generator(Box::new(move || rx.recv().map_err(|_| Error::Eoi)))
            }
            Source::AsyncReceiver(mut rx) => {
                Iter::from_generator(Box::new(move || recv_blocking(&mut rx)))
            }
            Source::Generator(g) => Iter::from_generator(g),
            Source::Iter(it) => it,
        }
    }

    /// An iterator yielding nothing.
    pub fn empty() -> Self {
        Iter::new(Source::Empty)
    }

    /// Build an iterator from a pull function.
    pub fn from_fn<V, F>(f: F) -> Self
    where
        V: IntoValue,
        F: FnMut() -> StreamResult<V> + Send + 'static,
    {
        Iter::new(Source::generator(f))
    }

    pub(crate) fn from_generator(generator: Generator) -> Self {
        Self {
            exhausted: false,
            generator,
        }
    }

    /// Yield the next element, [`Error::Eoi`] at the end, or the upstream error.
    ///
    /// Once this returns an error, it returns EOI forever.
    pub fn pull(&mut self) -> StreamResult<Value> {
        if self.exhausted {
            return Err(Error::Eoi);
        }
        match (self.generator)() {
            Ok(v) => Ok(v),
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Pull everything, stopping at the first iteration error.
    pub fn collect_values(self) -> StreamResult<Vec<Value>> {
        self.collect()
    }
}

impl fmt::Debug for Iter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl Iterator for Iter {
    type Item = StreamResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.pull() {
            Err(Error::Eoi) => None,
            other => Some(other),
        }
    }
}

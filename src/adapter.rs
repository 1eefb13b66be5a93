//! Function adapters
//!
//! Each adapter wraps a user function and invokes it over stream values.
//! Arguments are coerced with [`FromValue`], results converted with
//! [`IntoValue`], and any panic raised while doing so is contained and
//! reported as an [`Error::Apply`].
//!
//! Every adapter has a pure constructor (`new`), a fallible one (`try_new`,
//! for functions returning `Result`) and `from_func` for dynamically shaped
//! [`Func`]s, which is validated against the adapter's expected shape.

use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{ApplyError, BoxError, Error, StreamResult};
use crate::func::Func;
use crate::value::{FromValue, IntoValue, Value};

type MapFn = Arc<dyn Fn(Value) -> StreamResult<Value> + Send + Sync + 'static>;
type PredicateFn = Arc<dyn Fn(Value) -> StreamResult<bool> + Send + Sync + 'static>;
type BinaryFn = Arc<dyn Fn(Value, Value) -> StreamResult<Value> + Send + Sync + 'static>;
type CompareFn = Arc<dyn Fn(Value, Value) -> StreamResult<bool> + Send + Sync + 'static>;
type ConsumeFn = Box<dyn FnMut(Value) -> StreamResult<()> + Send + 'static>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f`, converting a panic into an apply error.
pub(crate) fn guard<T>(f: impl FnOnce() -> StreamResult<T>) -> StreamResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            log::warn!("user function panicked: {}", msg);
            Err(ApplyError::Panic(msg).into())
        }
    }
}

/// Converts a typed function of shape `(A) -> B`
#[derive(Clone)]
pub struct Mapper {
    f: MapFn,
}

impl Mapper {
    pub fn new<A, B, F>(f: F) -> Self
    where
        A: FromValue + 'static,
        B: IntoValue + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Self::from_raw(move |v| Ok(f(A::from_value(v)?).into_value()))
    }

    /// A mapper whose function may fail. The failure is returned as is.
    pub fn try_new<A, B, E, F>(f: F) -> Self
    where
        A: FromValue + 'static,
        B: IntoValue + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(A) -> Result<B, E> + Send + Sync + 'static,
    {
        Self::from_raw(move |v| {
            f(A::from_value(v)?)
                .map(IntoValue::into_value)
                .map_err(Error::failed)
        })
    }

    /// Fails with [`Error::InvalidMapper`] unless `func` takes one argument
    /// and returns a value.
    pub fn from_func(func: Func) -> StreamResult<Self> {
        if !func.signature().is_mapper() {
            return Err(Error::InvalidMapper);
        }
        Ok(Self::from_raw(move |v| func.call(vec![v])))
    }

    pub(crate) fn from_raw<F>(f: F) -> Self
    where
        F: Fn(Value) -> StreamResult<Value> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub fn apply(&self, v: Value) -> StreamResult<Value> {
        guard(|| (self.f)(v))
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mapper")
    }
}

/// Selects elements with a typed predicate of shape `(A) -> bool`
#[derive(Clone)]
pub struct Filter {
    f: PredicateFn,
}

impl Filter {
    pub fn new<A, F>(f: F) -> Self
    where
        A: FromValue + 'static,
        F: Fn(A) -> bool + Send + Sync + 'static,
    {
        Self::from_raw(move |v| Ok(f(A::from_value(v)?)))
    }

    pub fn try_new<A, E, F>(f: F) -> Self
    where
        A: FromValue + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(A) -> Result<bool, E> + Send + Sync + 'static,
    {
        Self::from_raw(move |v| f(A::from_value(v)?).map_err(Error::failed))
    }

    /// Fails with [`Error::InvalidFilter`] unless `func` takes one argument
    /// and returns a bool.
    pub fn from_func(func: Func) -> StreamResult<Self> {
        if !func.signature().is_filter() {
            return Err(Error::InvalidFilter);
        }
        Ok(Self::from_raw(move |v| func.call(vec![v])?.cast::<bool>().map_err(Error::from)))
    }

    pub(crate) fn from_raw<F>(f: F) -> Self
    where
        F: Fn(Value) -> StreamResult<bool> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Test `v`. The element itself is left untouched.
    pub fn apply(&self, v: &Value) -> StreamResult<bool> {
        guard(|| (self.f)(v.clone()))
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter")
    }
}

/// Classification of an aggregator by its parameter and output types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorType {
    /// `(A, B) -> B`, folds from the right.
    Right,
    /// `(B, A) -> B`, folds from the left.
    Left,
    /// `(A, A) -> A`, folds either way.
    Perfect,
}

impl AggregatorType {
    /// `right`: second parameter matches the output; `left`: first does.
    pub(crate) fn classify(right: bool, left: bool) -> Option<Self> {
        match (right, left) {
            (true, true) => Some(AggregatorType::Perfect),
            (true, false) => Some(AggregatorType::Right),
            (false, true) => Some(AggregatorType::Left),
            (false, false) => None,
        }
    }
}

/// Combines two values with a function of shape `(A, B) -> B` or `(B, A) -> B`
#[derive(Clone)]
pub struct Aggregator {
    f: BinaryFn,
    kind: AggregatorType,
}

impl Aggregator {
    /// Fails with [`Error::InvalidAggregator`] when neither parameter has
    /// the output type.
    pub fn new<X, Y, Z, F>(f: F) -> StreamResult<Self>
    where
        X: FromValue + 'static,
        Y: FromValue + 'static,
        Z: IntoValue + 'static,
        F: Fn(X, Y) -> Z + Send + Sync + 'static,
    {
        let kind = Self::classify::<X, Y, Z>()?;
        Ok(Self::from_raw(kind, move |x, y| {
            Ok(f(X::from_value(x)?, Y::from_value(y)?).into_value())
        }))
    }

    pub fn try_new<X, Y, Z, E, F>(f: F) -> StreamResult<Self>
    where
        X: FromValue + 'static,
        Y: FromValue + 'static,
        Z: IntoValue + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(X, Y) -> Result<Z, E> + Send + Sync + 'static,
    {
        let kind = Self::classify::<X, Y, Z>()?;
        Ok(Self::from_raw(kind, move |x, y| {
            f(X::from_value(x)?, Y::from_value(y)?)
                .map(IntoValue::into_value)
                .map_err(Error::failed)
        }))
    }

    pub fn from_func(func: Func) -> StreamResult<Self> {
        let kind = func
            .signature()
            .aggregator_type()
            .ok_or(Error::InvalidAggregator)?;
        Ok(Self::from_raw(kind, move |x, y| func.call(vec![x, y])))
    }

    fn classify<X: 'static, Y: 'static, Z: 'static>() -> StreamResult<AggregatorType> {
        AggregatorType::classify(
            TypeId::of::<Y>() == TypeId::of::<Z>(),
            TypeId::of::<X>() == TypeId::of::<Z>(),
        )
        .ok_or(Error::InvalidAggregator)
    }

    fn from_raw<F>(kind: AggregatorType, f: F) -> Self
    where
        F: Fn(Value, Value) -> StreamResult<Value> + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(f),
            kind,
        }
    }

    pub fn aggregator_type(&self) -> AggregatorType {
        self.kind
    }

    /// Invoke with `x` and `y` in the function's own parameter order.
    pub fn apply(&self, x: Value, y: Value) -> StreamResult<Value> {
        guard(|| (self.f)(x, y))
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator").field("kind", &self.kind).finish()
    }
}

/// A strict less-than relation of shape `(A, A) -> bool`
#[derive(Clone)]
pub struct Comparator {
    f: CompareFn,
}

impl Comparator {
    pub fn new<A, F>(f: F) -> Self
    where
        A: FromValue + 'static,
        F: Fn(A, A) -> bool + Send + Sync + 'static,
    {
        Self::from_raw(move |x, y| Ok(f(A::from_value(x)?, A::from_value(y)?)))
    }

    pub fn try_new<A, E, F>(f: F) -> Self
    where
        A: FromValue + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(A, A) -> Result<bool, E> + Send + Sync + 'static,
    {
        Self::from_raw(move |x, y| f(A::from_value(x)?, A::from_value(y)?).map_err(Error::failed))
    }

    pub fn from_func(func: Func) -> StreamResult<Self> {
        if !func.signature().is_comparator() {
            return Err(Error::InvalidComparator);
        }
        Ok(Self::from_raw(move |x, y| {
            func.call(vec![x, y])?.cast::<bool>().map_err(Error::from)
        }))
    }

    fn from_raw<F>(f: F) -> Self
    where
        F: Fn(Value, Value) -> StreamResult<bool> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Whether `x` sorts strictly before `y`.
    pub fn apply(&self, x: &Value, y: &Value) -> StreamResult<bool> {
        guard(|| (self.f)(x.clone(), y.clone()))
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Comparator")
    }
}

/// Terminal side-effecting function of shape `(A) -> ()`
pub struct Consumer {
    f: ConsumeFn,
}

impl Consumer {
    pub fn new<A, F>(mut f: F) -> Self
    where
        A: FromValue + 'static,
        F: FnMut(A) + Send + 'static,
    {
        Self::from_raw(move |v| {
            f(A::from_value(v)?);
            Ok(())
        })
    }

    pub fn try_new<A, E, F>(mut f: F) -> Self
    where
        A: FromValue + 'static,
        E: Into<BoxError> + 'static,
        F: FnMut(A) -> Result<(), E> + Send + 'static,
    {
        Self::from_raw(move |v| f(A::from_value(v)?).map_err(Error::failed))
    }

    /// A consumer that ignores its argument.
    pub fn unit<F>(mut f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::from_raw(move |_| {
            f();
            Ok(())
        })
    }

    pub fn try_unit<E, F>(mut f: F) -> Self
    where
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<(), E> + Send + 'static,
    {
        Self::from_raw(move |_| f().map_err(Error::failed))
    }

    pub fn from_func(func: Func) -> StreamResult<Self> {
        if !func.signature().is_consumer() {
            return Err(Error::InvalidConsumer);
        }
        Ok(Self::from_raw(move |v| func.call(vec![v]).map(|_| ())))
    }

    pub(crate) fn from_raw<F>(f: F) -> Self
    where
        F: FnMut(Value) -> StreamResult<()> + Send + 'static,
    {
        Self { f: Box::new(f) }
    }

    pub fn apply(&mut self, v: Value) -> StreamResult<()> {
        guard(|| (self.f)(v))
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Consumer")
    }
}

/// Anything a builder stage can turn into an adapter, deferring failure
/// until the chain is connected.
pub trait Adapt<T> {
    fn adapt(self) -> StreamResult<T>;
}

macro_rules! impl_adapt {
    ($($t:ident),*) => {
        $(
            impl Adapt<$t> for $t {
                fn adapt(self) -> StreamResult<$t> {
                    Ok(self)
                }
            }

            impl Adapt<$t> for StreamResult<$t> {
                fn adapt(self) -> StreamResult<$t> {
                    self
                }
            }

            impl Adapt<$t> for Func {
                fn adapt(self) -> StreamResult<$t> {
                    $t::from_func(self)
                }
            }
        )*
    };
}

impl_adapt!(Mapper, Filter, Aggregator, Comparator, Consumer);

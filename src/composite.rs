//! Adapters over the Maybe, Either and Tuple containers
//!
//! Maybe/Either adapters delegate to the container's own `map`/`consume`.
//! Tuple adapters spread a tuple's elements into a single call of a
//! multi-parameter function; the tuple size must equal the arity.

use crate::adapter::{Consumer, Filter, Mapper};
use crate::error::{ApplyError, BoxError, Error, StreamResult};
use crate::func::Func;
use crate::value::{FromValue, IntoValue, Kind, Value};

/// A function of fixed arity callable with positional stream values
pub trait Callable<Args, Out>: Send + Sync + 'static {
    fn arity(&self) -> usize;
    fn invoke(&self, args: Vec<Value>) -> StreamResult<Out>;
}

macro_rules! impl_callable {
    ($n:expr; $($arg:ident),+) => {
        impl<Fun, Out, $($arg),+> Callable<($($arg,)+), Out> for Fun
        where
            Fun: Fn($($arg),+) -> Out + Send + Sync + 'static,
            $($arg: FromValue,)+
        {
            fn arity(&self) -> usize {
                $n
            }

            #[allow(non_snake_case)]
            fn invoke(&self, args: Vec<Value>) -> StreamResult<Out> {
                if args.len() != $n {
                    return Err(ApplyError::Arity { expected: $n, found: args.len() }.into());
                }
                let mut args = args.into_iter();
                $(
                    let $arg = $arg::from_value(args.next().unwrap_or_default())?;
                )+
                Ok(self($($arg),+))
            }
        }
    };
}

impl_callable!(1; T1);
impl_callable!(2; T1, T2);
impl_callable!(3; T1, T2, T3);
impl_callable!(4; T1, T2, T3, T4);
impl_callable!(5; T1, T2, T3, T4, T5);
impl_callable!(6; T1, T2, T3, T4, T5, T6);

fn container_mismatch(expected: Kind, found: &Value) -> Error {
    ApplyError::Container {
        expected,
        found: found.kind(),
    }
    .into()
}

/// The tuple's elements, if it has exactly `arity` of them.
fn spread(v: Value, arity: usize) -> StreamResult<Vec<Value>> {
    match v {
        Value::Tuple(t) if t.size() == arity => Ok(t.iter().cloned().collect()),
        Value::Tuple(t) => Err(ApplyError::Arity {
            expected: arity,
            found: t.size(),
        }
        .into()),
        other => Err(container_mismatch(Kind::Tuple, &other)),
    }
}

impl Mapper {
    /// Map the value inside a `Maybe`. Nothing stays nothing, and a failing
    /// `inner` demotes a just to nothing. Non-Maybe input is an apply error.
    pub fn maybe(inner: Mapper) -> Mapper {
        Mapper::from_raw(move |v| match v {
            Value::Maybe(m) => Ok(Value::Maybe(m.map(&inner))),
            other => Err(container_mismatch(Kind::Maybe, &other)),
        })
    }

    /// Map the right value of an `Either`. A failing `inner` demotes it to
    /// a left holding the error. Non-Either input is an apply error.
    pub fn either(inner: Mapper) -> Mapper {
        Mapper::from_raw(move |v| match v {
            Value::Either(e) => Ok(Value::Either(e.map(&inner))),
            other => Err(container_mismatch(Kind::Either, &other)),
        })
    }

    /// Map a tuple through a function taking its elements as parameters.
    pub fn tuple<Args, B, F>(f: F) -> Mapper
    where
        B: IntoValue + 'static,
        Args: 'static,
        F: Callable<Args, B>,
    {
        Mapper::from_raw(move |v| {
            let args = spread(v, f.arity())?;
            Ok(f.invoke(args)?.into_value())
        })
    }

    pub fn try_tuple<Args, B, E, F>(f: F) -> Mapper
    where
        B: IntoValue + 'static,
        E: Into<BoxError> + 'static,
        Args: 'static,
        F: Callable<Args, Result<B, E>>,
    {
        Mapper::from_raw(move |v| {
            let args = spread(v, f.arity())?;
            f.invoke(args)?
                .map(IntoValue::into_value)
                .map_err(Error::failed)
        })
    }

    pub fn tuple_func(func: Func) -> StreamResult<Mapper> {
        if func.arity() == 0 || func.signature().output == Kind::Unit {
            return Err(Error::InvalidMapper);
        }
        Ok(Mapper::from_raw(move |v| func.call(spread(v, func.arity())?)))
    }
}

impl Filter {
    /// Test a tuple with a predicate taking its elements as parameters.
    pub fn tuple<Args, F>(f: F) -> Filter
    where
        Args: 'static,
        F: Callable<Args, bool>,
    {
        Filter::from_raw(move |v| f.invoke(spread(v, f.arity())?))
    }

    pub fn try_tuple<Args, E, F>(f: F) -> Filter
    where
        E: Into<BoxError> + 'static,
        Args: 'static,
        F: Callable<Args, Result<bool, E>>,
    {
        Filter::from_raw(move |v| f.invoke(spread(v, f.arity())?)?.map_err(Error::failed))
    }

    pub fn tuple_func(func: Func) -> StreamResult<Filter> {
        if func.arity() == 0 || func.signature().output != Kind::Bool {
            return Err(Error::InvalidFilter);
        }
        Ok(Filter::from_raw(move |v| {
            func.call(spread(v, func.arity())?)?
                .cast::<bool>()
                .map_err(Error::from)
        }))
    }
}

impl Consumer {
    /// Consume a `Maybe`: `just` receives the contained value, `nothing`
    /// is called for an empty one.
    pub fn maybe(just: Consumer, nothing: Consumer) -> Consumer {
        let (mut just, mut nothing) = (just, nothing);
        Consumer::from_raw(move |v| match v {
            Value::Maybe(m) => m.consume(&mut just, &mut nothing),
            other => Err(container_mismatch(Kind::Maybe, &other)),
        })
    }

    /// Consume an `Either` with `left` or `right` depending on its variant.
    pub fn either(left: Consumer, right: Consumer) -> Consumer {
        let (mut left, mut right) = (left, right);
        Consumer::from_raw(move |v| match v {
            Value::Either(e) => e.consume(&mut left, &mut right),
            other => Err(container_mismatch(Kind::Either, &other)),
        })
    }

    pub fn tuple<Args, F>(f: F) -> Consumer
    where
        Args: 'static,
        F: Callable<Args, ()>,
    {
        Consumer::from_raw(move |v| f.invoke(spread(v, f.arity())?))
    }

    pub fn try_tuple<Args, E, F>(f: F) -> Consumer
    where
        E: Into<BoxError> + 'static,
        Args: 'static,
        F: Callable<Args, Result<(), E>>,
    {
        Consumer::from_raw(move |v| f.invoke(spread(v, f.arity())?)?.map_err(Error::failed))
    }

    pub fn tuple_func(func: Func) -> StreamResult<Consumer> {
        if func.arity() == 0 || func.signature().output != Kind::Unit {
            return Err(Error::InvalidConsumer);
        }
        Ok(Consumer::from_raw(move |v| {
            func.call(spread(v, func.arity())?).map(|_| ())
        }))
    }
}

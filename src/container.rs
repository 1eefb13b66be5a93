//! Maybe, Either and Tuple containers
//!
//! The containers are ordinary [`Value`]s. Their `map`/`filter`/`consume`
//! methods take adapters so that composite adapters can delegate to them.

use std::fmt;
use std::sync::Arc;

use crate::adapter::{Consumer, Filter, Mapper};
use crate::error::StreamResult;
use crate::value::{IntoValue, Value};

/// The shared empty [`Maybe`]. It carries no payload.
pub const NOTHING: Maybe = Maybe::Nothing;

/// An optional value
#[derive(Debug, Clone, PartialEq)]
pub enum Maybe {
    Just(Box<Value>),
    Nothing,
}

impl Maybe {
    pub fn just(v: impl IntoValue) -> Self {
        Maybe::Just(Box::new(v.into_value()))
    }

    pub fn nothing() -> Self {
        NOTHING
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Maybe::Nothing)
    }

    pub fn get(&self) -> Option<&Value> {
        match self {
            Maybe::Just(v) => Some(v),
            Maybe::Nothing => None,
        }
    }

    /// The contained value, or `v` if this is nothing.
    pub fn get_or_else(self, v: Value) -> Value {
        match self {
            Maybe::Just(x) => *x,
            Maybe::Nothing => v,
        }
    }

    /// This if it has a value, else `other`.
    pub fn or_else(self, other: Maybe) -> Maybe {
        match self {
            Maybe::Just(_) => self,
            Maybe::Nothing => other,
        }
    }

    /// Apply `f` to the contained value. A failing mapper yields nothing.
    pub fn map(self, f: &Mapper) -> Maybe {
        match self {
            Maybe::Just(v) => match f.apply(*v) {
                Ok(r) => Maybe::Just(Box::new(r)),
                Err(_) => NOTHING,
            },
            Maybe::Nothing => NOTHING,
        }
    }

    /// Keep the value only if `f` accepts it without error.
    pub fn filter(self, f: &Filter) -> Maybe {
        match &self {
            Maybe::Just(v) => match f.apply(v) {
                Ok(true) => self,
                _ => NOTHING,
            },
            Maybe::Nothing => NOTHING,
        }
    }

    /// Feed the value to `just`, or the empty container to `nothing`.
    pub fn consume(self, just: &mut Consumer, nothing: &mut Consumer) -> StreamResult<()> {
        match self {
            Maybe::Just(v) => just.apply(*v),
            Maybe::Nothing => nothing.apply(Value::Maybe(NOTHING)),
        }
    }
}

impl fmt::Display for Maybe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maybe::Just(v) => write!(f, "Just({})", v),
            Maybe::Nothing => f.write_str("Nothing"),
        }
    }
}

/// A successful `Right` or failed `Left` value
#[derive(Debug, Clone, PartialEq)]
pub enum Either {
    Left(Box<Value>),
    Right(Box<Value>),
}

impl Either {
    pub fn left(v: impl IntoValue) -> Self {
        Either::Left(Box::new(v.into_value()))
    }

    pub fn right(v: impl IntoValue) -> Self {
        Either::Right(Box::new(v.into_value()))
    }

    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    pub fn left_value(&self) -> Option<&Value> {
        match self {
            Either::Left(v) => Some(v),
            Either::Right(_) => None,
        }
    }

    pub fn right_value(&self) -> Option<&Value> {
        match self {
            Either::Right(v) => Some(v),
            Either::Left(_) => None,
        }
    }

    pub fn get_or_else(self, v: Value) -> Value {
        match self {
            Either::Right(x) => *x,
            Either::Left(_) => v,
        }
    }

    /// Apply `f` to a right value. A failing mapper yields a left holding the
    /// error itself; left values pass through unchanged.
    pub fn map(self, f: &Mapper) -> Either {
        match self {
            Either::Right(v) => match f.apply(*v) {
                Ok(r) => Either::Right(Box::new(r)),
                Err(e) => Either::Left(Box::new(Value::Error(e))),
            },
            left => left,
        }
    }

    pub fn to_maybe(self) -> Maybe {
        match self {
            Either::Right(v) => Maybe::Just(v),
            Either::Left(_) => NOTHING,
        }
    }

    /// Feed a left value to `left`, a right value to `right`.
    pub fn consume(self, left: &mut Consumer, right: &mut Consumer) -> StreamResult<()> {
        match self {
            Either::Left(v) => left.apply(*v),
            Either::Right(v) => right.apply(*v),
        }
    }
}

impl fmt::Display for Either {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Either::Left(v) => write!(f, "Left({})", v),
            Either::Right(v) => write!(f, "Right({})", v),
        }
    }
}

/// A fixed-size immutable sequence of heterogeneous values
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple(Arc<[Value]>);

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Tuple(values.into())
    }

    /// A (key, value) pair, as produced by keyed sources.
    pub fn pair(k: impl IntoValue, v: impl IntoValue) -> Self {
        Tuple::new(vec![k.into_value(), v.into_value()])
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// The element at `i`, or `None` when out of range.
    pub fn get(&self, i: usize) -> Option<&Value> {
        self.0.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tuple(")?;
        for (i, x) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", x)?;
        }
        f.write_str(")")
    }
}

//! Executors: one strategy per transformation
//!
//! An executor owns its upstream [`Iter`] and, when executed, returns a new
//! lazy `Iter`. Nothing is pulled at construction time.

use crate::adapter::{Aggregator, AggregatorType, Comparator, Consumer, Filter, Mapper};
use crate::config::FoldDirection;
use crate::container::Tuple;
use crate::error::{Error, StreamResult};
use crate::iter::Iter;
use crate::value::{IntoValue, Value};

/// Applies a transformation to an iterator
pub trait Executor: Send {
    fn execute(self) -> StreamResult<Iter>
    where
        Self: Sized;
}

/// Object-safe form of [`Executor`], used by stream nodes.
pub(crate) trait BoxedExecutor: Send {
    fn execute_boxed(self: Box<Self>) -> StreamResult<Iter>;
}

impl<E: Executor> BoxedExecutor for E {
    fn execute_boxed(self: Box<Self>) -> StreamResult<Iter> {
        (*self).execute()
    }
}

/// Pull the upstream to the end, stopping at the first error.
fn materialize(upstream: &mut Iter) -> StreamResult<Vec<Value>> {
    let mut xs = Vec::new();
    loop {
        match upstream.pull() {
            Ok(x) => xs.push(x),
            Err(Error::Eoi) => return Ok(xs),
            Err(e) => return Err(e),
        }
    }
}

/// Converts each element. Elements the mapper fails on are dropped.
pub struct MapExecutor {
    mapper: Mapper,
    upstream: Iter,
}

impl MapExecutor {
    pub fn new(mapper: Mapper, upstream: Iter) -> Self {
        Self { mapper, upstream }
    }
}

impl Executor for MapExecutor {
    fn execute(self) -> StreamResult<Iter> {
        let MapExecutor {
            mapper,
            mut upstream,
        } = self;
        Ok(Iter::from_generator(Box::new(move || loop {
            let x = upstream.pull()?;
            match mapper.apply(x) {
                Ok(v) => return Ok(v),
                Err(e) => log::trace!("map dropped an element: {}", e),
            }
        })))
    }
}

/// Selects elements. A filter error ends the iteration with that error.
pub struct FilterExecutor {
    filter: Filter,
    upstream: Iter,
}

impl FilterExecutor {
    pub fn new(filter: Filter, upstream: Iter) -> Self {
        Self { filter, upstream }
    }
}

impl Executor for FilterExecutor {
    fn execute(self) -> StreamResult<Iter> {
        let FilterExecutor {
            filter,
            mut upstream,
        } = self;
        Ok(Iter::from_generator(Box::new(move || loop {
            let x = upstream.pull()?;
            if filter.apply(&x)? {
                return Ok(x);
            }
        })))
    }
}

/// Folds the whole upstream into a single value
pub struct AggregateExecutor {
    aggregator: Aggregator,
    upstream: Iter,
    initial: Value,
    direction: FoldDirection,
}

impl AggregateExecutor {
    /// Fails with [`Error::InvalidAggregateExecutor`] when `direction` is
    /// incompatible with the aggregator. Without a direction, right
    /// aggregators fold right and the others fold left.
    pub fn new(
        aggregator: Aggregator,
        upstream: Iter,
        initial: impl IntoValue,
        direction: Option<FoldDirection>,
    ) -> StreamResult<Self> {
        let kind = aggregator.aggregator_type();
        let direction = match direction {
            Some(d) if is_compatible(d, kind) => d,
            Some(_) => return Err(Error::InvalidAggregateExecutor),
            None => match kind {
                AggregatorType::Right => FoldDirection::Right,
                AggregatorType::Left | AggregatorType::Perfect => FoldDirection::Left,
            },
        };
        Ok(Self {
            aggregator,
            upstream,
            initial: initial.into_value(),
            direction,
        })
    }

    pub fn direction(&self) -> FoldDirection {
        self.direction
    }
}

fn is_compatible(direction: FoldDirection, kind: AggregatorType) -> bool {
    matches!(
        (direction, kind),
        (_, AggregatorType::Perfect)
            | (FoldDirection::Right, AggregatorType::Right)
            | (FoldDirection::Left, AggregatorType::Left)
    )
}

/// `f(x1, f(x2, ... f(xn, iv)))`, folded over the materialized upstream so
/// that stack depth does not grow with its length.
fn fold_right(f: &Aggregator, upstream: &mut Iter, initial: Value) -> StreamResult<Value> {
    materialize(upstream)?
        .into_iter()
        .rev()
        .try_fold(initial, |acc, x| f.apply(x, acc))
}

/// `f(f(f(iv, x1), x2), ... xn)`
fn fold_left(f: &Aggregator, upstream: &mut Iter, initial: Value) -> StreamResult<Value> {
    let mut acc = initial;
    loop {
        match upstream.pull() {
            Ok(x) => acc = f.apply(acc, x)?,
            Err(Error::Eoi) => return Ok(acc),
            Err(e) => return Err(e),
        }
    }
}

impl Executor for AggregateExecutor {
    fn execute(self) -> StreamResult<Iter> {
        let AggregateExecutor {
            aggregator,
            mut upstream,
            initial,
            direction,
        } = self;
        let mut initial = Some(initial);
        Ok(Iter::from_generator(Box::new(move || {
            let Some(iv) = initial.take() else {
                return Err(Error::Eoi);
            };
            match direction {
                FoldDirection::Right => fold_right(&aggregator, &mut upstream, iv),
                FoldDirection::Left => fold_left(&aggregator, &mut upstream, iv),
            }
        })))
    }
}

/// Stable sort by a strict less-than comparator. The upstream is read to
/// the end before the first element is yielded.
pub struct SortExecutor {
    comparator: Comparator,
    upstream: Iter,
}

impl SortExecutor {
    pub fn new(comparator: Comparator, upstream: Iter) -> Self {
        Self {
            comparator,
            upstream,
        }
    }
}

/// Stable merge sort driven only by `less`. A comparator error counts as
/// "not less", which keeps the element behind its counterpart.
fn merge_sort(mut xs: Vec<Value>, cmp: &Comparator) -> Vec<Value> {
    if xs.len() <= 1 {
        return xs;
    }
    let right = xs.split_off(xs.len() / 2);
    let left = merge_sort(xs, cmp);
    let right = merge_sort(right, cmp);

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp.apply(r, l).unwrap_or(false),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        if take_right {
            out.extend(right.next());
        } else {
            out.extend(left.next());
        }
    }
    out
}

impl Executor for SortExecutor {
    fn execute(self) -> StreamResult<Iter> {
        let SortExecutor {
            comparator,
            mut upstream,
        } = self;
        let mut sorted: Option<std::vec::IntoIter<Value>> = None;
        Ok(Iter::from_generator(Box::new(move || {
            if sorted.is_none() {
                let xs = materialize(&mut upstream)?;
                sorted = Some(merge_sort(xs, &comparator).into_iter());
            }
            sorted
                .as_mut()
                .and_then(|xs| xs.next())
                .ok_or(Error::Eoi)
        })))
    }
}

/// Flattens one level: lists yield their members, maps one
/// `Tuple(key, value)` per entry, anything else passes through.
pub struct FlattenExecutor {
    upstream: Iter,
}

impl FlattenExecutor {
    pub fn new(upstream: Iter) -> Self {
        Self { upstream }
    }
}

impl Executor for FlattenExecutor {
    fn execute(self) -> StreamResult<Iter> {
        let mut upstream = self.upstream;
        let mut pending = Vec::new().into_iter();
        Ok(Iter::from_generator(Box::new(move || loop {
            if let Some(v) = pending.next() {
                return Ok(v);
            }
            match upstream.pull()? {
                Value::List(xs) => pending = xs.into_iter(),
                Value::Map(entries) => {
                    pending = entries
                        .into_iter()
                        .map(|(k, v)| Value::Tuple(Tuple::new(vec![k, v])))
                        .collect::<Vec<_>>()
                        .into_iter()
                }
                other => return Ok(other),
            }
        })))
    }
}

/// Terminal strategy feeding every element to a consumer
pub struct ConsumeExecutor {
    consumer: Consumer,
    upstream: Iter,
}

impl ConsumeExecutor {
    pub fn new(consumer: Consumer, upstream: Iter) -> Self {
        Self { consumer, upstream }
    }

    /// Pull until EOI. Returns the first upstream or consumer error.
    pub fn consume(self) -> StreamResult<()> {
        let ConsumeExecutor {
            mut consumer,
            mut upstream,
        } = self;
        loop {
            match upstream.pull() {
                Ok(x) => consumer.apply(x)?,
                Err(Error::Eoi) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

//! circle-stream - lazily evaluated, composable sequence processing
//!
//! A pipeline of stages (map, filter, aggregate, sort, flatten, consume)
//! pulls one element at a time from its source. Errors raised while
//! iterating are tagged with the ids of the stages they pass through, and
//! any iterator can be materialized into a cancellable channel.

pub mod error;
pub mod value;
pub mod container;
pub mod iter;
pub mod channel;
pub mod func;
pub mod adapter;
pub mod composite;
pub mod executor;
pub mod node;
pub mod config;
pub mod stream;
pub mod builder;

pub use adapter::{Adapt, Aggregator, AggregatorType, Comparator, Consumer, Filter, Mapper};
pub use builder::StreamBuilder;
pub use channel::IterChannel;
pub use composite::Callable;
pub use config::{FoldDirection, StageConfig};
pub use container::{Either, Maybe, Tuple, NOTHING};
pub use error::{ApplyError, BoxError, Error, StreamResult};
pub use executor::{
    AggregateExecutor, ConsumeExecutor, Executor, FilterExecutor, FlattenExecutor, MapExecutor,
    SortExecutor,
};
pub use func::{Func, Signature};
pub use iter::{Generator, Iter, Source};
pub use node::{NodeId, StreamNode};
pub use stream::{NodeFactory, Stream};
pub use value::{FromValue, IntoValue, Kind, Value};

// Cancellation tokens accepted by `Iter::channel_with_token`.
pub use tokio_util::sync::CancellationToken;

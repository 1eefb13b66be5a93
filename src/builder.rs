//! Convenience layer over [`Stream`]
//!
//! A [`StreamBuilder`] accepts anything that can become an adapter, so a
//! dynamically shaped [`Func`](crate::func::Func) can be passed where a
//! typed adapter is expected. Adapter construction failures are held back
//! until the chain is connected and then reported as
//! `cannot create stream <stage> <cause>`. A stage without an explicit id
//! is identified by its zero-based index.

use std::fmt;

use crate::adapter::{Adapt, Aggregator, Comparator, Consumer, Filter, Mapper};
use crate::composite::Callable;
use crate::config::StageConfig;
use crate::error::{Error, StreamResult};
use crate::executor::Executor;
use crate::iter::{Iter, Source};
use crate::stream::Stream;
use crate::value::{IntoValue, Value};

type StageFn = Box<dyn FnOnce(Stream) -> StreamResult<Stream> + Send + 'static>;

/// Builds a [`Stream`] stage by stage
pub struct StreamBuilder {
    stream: Stream,
    stages: Vec<StageFn>,
}

fn cannot_create(stage: String, err: Error) -> Error {
    log::debug!("stage {} could not be built: {}", stage, err);
    Error::CannotCreateStream {
        stage,
        source: Box::new(err),
    }
}

impl StreamBuilder {
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            stream: Stream::new(source),
            stages: Vec::new(),
        }
    }

    /// Number of stages added so far.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Fill in the index of the next stage as its id.
    fn resolve(&self, config: impl Into<StageConfig>) -> StageConfig {
        let mut config = config.into();
        if config.node_id.is_none() {
            config.node_id = Some(self.stages.len().to_string());
        }
        config
    }

    fn stage<T, F>(mut self, adapter: StreamResult<T>, config: StageConfig, f: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce(Stream, T, StageConfig) -> Stream + Send + 'static,
    {
        self.stages.push(Box::new(move |stream| {
            let stage = config.node_id.clone().unwrap_or_default();
            let adapter = adapter.map_err(|e| cannot_create(stage, e))?;
            Ok(f(stream, adapter, config))
        }));
        self
    }

    pub fn map(self, mapper: impl Adapt<Mapper>) -> Self {
        self.map_with(mapper, StageConfig::default())
    }

    /// Convert each element. Elements the mapper fails on are dropped.
    pub fn map_with(self, mapper: impl Adapt<Mapper>, config: impl Into<StageConfig>) -> Self {
        let config = self.resolve(config);
        self.stage(mapper.adapt(), config, |s, m, c| s.map_with(m, c))
    }

    pub fn maybe_map(self, mapper: impl Adapt<Mapper>) -> Self {
        self.maybe_map_with(mapper, StageConfig::default())
    }

    /// Map the value of each `Just`. A failing mapper yields `Nothing`;
    /// elements that are not a `Maybe` are dropped.
    pub fn maybe_map_with(self, mapper: impl Adapt<Mapper>, config: impl Into<StageConfig>) -> Self {
        let config = self.resolve(config);
        let mapper = mapper.adapt().map(Mapper::maybe);
        self.stage(mapper, config, |s, m, c| s.map_with(m, c))
    }

    pub fn either_map(self, mapper: impl Adapt<Mapper>) -> Self {
        self.either_map_with(mapper, StageConfig::default())
    }

    /// Map the value of each `Right`. A failing mapper yields a `Left`
    /// holding the error; elements that are not an `Either` are dropped.
    pub fn either_map_with(
        self,
        mapper: impl Adapt<Mapper>,
        config: impl Into<StageConfig>,
    ) -> Self {
        let config = self.resolve(config);
        let mapper = mapper.adapt().map(Mapper::either);
        self.stage(mapper, config, |s, m, c| s.map_with(m, c))
    }

    pub fn tuple_map<Args, B, F>(self, f: F) -> Self
    where
        Args: 'static,
        B: IntoValue + 'static,
        F: Callable<Args, B>,
    {
        self.tuple_map_with(f, StageConfig::default())
    }

    /// Map each tuple through `f`, which takes the tuple's elements as
    /// parameters. Tuples of the wrong size or element types are dropped.
    pub fn tuple_map_with<Args, B, F>(self, f: F, config: impl Into<StageConfig>) -> Self
    where
        Args: 'static,
        B: IntoValue + 'static,
        F: Callable<Args, B>,
    {
        self.map_with(Mapper::tuple(f), config)
    }

    pub fn filter(self, filter: impl Adapt<Filter>) -> Self {
        self.filter_with(filter, StageConfig::default())
    }

    /// Keep the elements `filter` accepts. A filter error stops the stream.
    pub fn filter_with(self, filter: impl Adapt<Filter>, config: impl Into<StageConfig>) -> Self {
        let config = self.resolve(config);
        self.stage(filter.adapt(), config, |s, x, c| s.filter_with(x, c))
    }

    pub fn tuple_filter<Args, F>(self, f: F) -> Self
    where
        Args: 'static,
        F: Callable<Args, bool>,
    {
        self.tuple_filter_with(f, StageConfig::default())
    }

    /// Filter tuples with a predicate taking their elements as parameters.
    /// A tuple of the wrong shape stops the stream.
    pub fn tuple_filter_with<Args, F>(self, f: F, config: impl Into<StageConfig>) -> Self
    where
        Args: 'static,
        F: Callable<Args, bool>,
    {
        self.filter_with(Filter::tuple(f), config)
    }

    pub fn aggregate(self, aggregator: impl Adapt<Aggregator>, initial: impl IntoValue) -> Self {
        self.aggregate_with(aggregator, initial, StageConfig::default())
    }

    pub fn aggregate_with(
        self,
        aggregator: impl Adapt<Aggregator>,
        initial: impl IntoValue,
        config: impl Into<StageConfig>,
    ) -> Self {
        let config = self.resolve(config);
        let initial: Value = initial.into_value();
        self.stage(aggregator.adapt(), config, move |s, a, c| {
            s.aggregate_with(a, initial, c)
        })
    }

    pub fn sort(self, comparator: impl Adapt<Comparator>) -> Self {
        self.sort_with(comparator, StageConfig::default())
    }

    pub fn sort_with(
        self,
        comparator: impl Adapt<Comparator>,
        config: impl Into<StageConfig>,
    ) -> Self {
        let config = self.resolve(config);
        self.stage(comparator.adapt(), config, |s, x, c| s.sort_with(x, c))
    }

    pub fn flat(self) -> Self {
        self.flat_with(StageConfig::default())
    }

    pub fn flat_with(self, config: impl Into<StageConfig>) -> Self {
        let config = self.resolve(config);
        self.stage(Ok(()), config, |s, (), c| s.flat_with(c))
    }

    fn connect(self) -> StreamResult<Stream> {
        let StreamBuilder { stream, stages } = self;
        stages.into_iter().try_fold(stream, |stream, stage| stage(stream))
    }

    /// Connect every stage and return the output iterator.
    pub fn execute(self) -> StreamResult<Iter> {
        self.connect()?.execute()
    }

    /// Feed every element to `consumer`, returning the first error.
    pub fn consume(self, consumer: impl Adapt<Consumer>) -> StreamResult<()> {
        self.consume_with(consumer, StageConfig::default())
    }

    /// Like [`StreamBuilder::consume`]. The config's id names the consumer
    /// when it cannot be built.
    pub fn consume_with(
        self,
        consumer: impl Adapt<Consumer>,
        config: impl Into<StageConfig>,
    ) -> StreamResult<()> {
        let config = self.resolve(config);
        let consumer = consumer
            .adapt()
            .map_err(|e| cannot_create(config.node_id.unwrap_or_default(), e))?;
        self.connect()?.consume(consumer)
    }

    /// Consume `Maybe`s: `just` receives the value of each `Just`, `nothing`
    /// is called for each `Nothing`. Any other element stops consumption.
    pub fn maybe_consume(
        self,
        just: impl Adapt<Consumer>,
        nothing: impl Adapt<Consumer>,
    ) -> StreamResult<()> {
        self.maybe_consume_with(just, nothing, StageConfig::default())
    }

    pub fn maybe_consume_with(
        self,
        just: impl Adapt<Consumer>,
        nothing: impl Adapt<Consumer>,
        config: impl Into<StageConfig>,
    ) -> StreamResult<()> {
        let consumer = just
            .adapt()
            .and_then(|just| Ok(Consumer::maybe(just, nothing.adapt()?)));
        self.consume_with(consumer, config)
    }

    /// Consume `Either`s with `left` or `right` depending on the variant.
    pub fn either_consume(
        self,
        left: impl Adapt<Consumer>,
        right: impl Adapt<Consumer>,
    ) -> StreamResult<()> {
        self.either_consume_with(left, right, StageConfig::default())
    }

    pub fn either_consume_with(
        self,
        left: impl Adapt<Consumer>,
        right: impl Adapt<Consumer>,
        config: impl Into<StageConfig>,
    ) -> StreamResult<()> {
        let consumer = left
            .adapt()
            .and_then(|left| Ok(Consumer::either(left, right.adapt()?)));
        self.consume_with(consumer, config)
    }

    /// Consume tuples with a function taking their elements as parameters.
    pub fn tuple_consume<Args, F>(self, f: F) -> StreamResult<()>
    where
        Args: 'static,
        F: Callable<Args, ()>,
    {
        self.tuple_consume_with(f, StageConfig::default())
    }

    pub fn tuple_consume_with<Args, F>(self, f: F, config: impl Into<StageConfig>) -> StreamResult<()>
    where
        Args: 'static,
        F: Callable<Args, ()>,
    {
        self.consume_with(Consumer::tuple(f), config)
    }
}

impl Executor for StreamBuilder {
    fn execute(self) -> StreamResult<Iter> {
        StreamBuilder::execute(self)
    }
}

impl fmt::Debug for StreamBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuilder")
            .field("stream", &self.stream)
            .field("stages", &self.stages.len())
            .finish()
    }
}

//! Lazily connected chains of stream stages
//!
//! A [`Stream`] records one node factory per stage. Nothing runs until
//! [`Stream::execute`] or [`Stream::consume`] connects the chain to its
//! source; connection stops at the first stage whose node could not be
//! built.

use std::fmt;
use std::sync::Arc;

use crate::adapter::{Aggregator, Comparator, Consumer, Filter, Mapper};
use crate::config::StageConfig;
use crate::error::{Error, StreamResult};
use crate::executor::{
    AggregateExecutor, ConsumeExecutor, Executor, FilterExecutor, FlattenExecutor, MapExecutor,
    SortExecutor,
};
use crate::iter::{Iter, Source};
use crate::node::StreamNode;
use crate::value::{IntoValue, Value};

/// Builds the node for one stage from its upstream iterator.
pub type NodeFactory = Arc<dyn Fn(Iter) -> StreamNode + Send + Sync + 'static>;

/// A source plus an ordered list of stages
pub struct Stream {
    source: Iter,
    nodes: Vec<NodeFactory>,
}

impl Stream {
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            source: Iter::new(source),
            nodes: Vec::new(),
        }
    }

    /// The same stages over a different source.
    pub fn with_source(&self, source: impl Into<Source>) -> Stream {
        Stream {
            source: Iter::new(source),
            nodes: self.nodes.clone(),
        }
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a stage built by `factory`.
    pub fn node<F>(mut self, factory: F) -> Self
    where
        F: Fn(Iter) -> StreamNode + Send + Sync + 'static,
    {
        self.nodes.push(Arc::new(factory));
        self
    }

    /// Convert each element. Elements the mapper fails on are dropped.
    pub fn map(self, mapper: Mapper) -> Self {
        self.map_with(mapper, StageConfig::default())
    }

    pub fn map_with(self, mapper: Mapper, config: impl Into<StageConfig>) -> Self {
        let id = config.into().node_id;
        self.node(move |it| StreamNode::new(MapExecutor::new(mapper.clone(), it), id.clone()))
    }

    /// Keep the elements `filter` accepts. A filter error stops the stream.
    pub fn filter(self, filter: Filter) -> Self {
        self.filter_with(filter, StageConfig::default())
    }

    pub fn filter_with(self, filter: Filter, config: impl Into<StageConfig>) -> Self {
        let id = config.into().node_id;
        self.node(move |it| StreamNode::new(FilterExecutor::new(filter.clone(), it), id.clone()))
    }

    /// Fold every element into one value starting from `initial`.
    pub fn aggregate(self, aggregator: Aggregator, initial: impl IntoValue) -> Self {
        self.aggregate_with(aggregator, initial, StageConfig::default())
    }

    /// Like [`Stream::aggregate`]. An explicit `fold` direction the aggregator
    /// cannot honour fails the stream at connection time.
    pub fn aggregate_with(
        self,
        aggregator: Aggregator,
        initial: impl IntoValue,
        config: impl Into<StageConfig>,
    ) -> Self {
        let StageConfig { node_id, fold } = config.into();
        let initial: Value = initial.into_value();
        self.node(move |it| {
            StreamNode::from_result(
                AggregateExecutor::new(aggregator.clone(), it, initial.clone(), fold),
                node_id.clone(),
            )
        })
    }

    /// Stable sort by a less-than comparator.
    pub fn sort(self, comparator: Comparator) -> Self {
        self.sort_with(comparator, StageConfig::default())
    }

    pub fn sort_with(self, comparator: Comparator, config: impl Into<StageConfig>) -> Self {
        let id = config.into().node_id;
        self.node(move |it| StreamNode::new(SortExecutor::new(comparator.clone(), it), id.clone()))
    }

    /// Flatten lists and maps by one level.
    pub fn flat(self) -> Self {
        self.flat_with(StageConfig::default())
    }

    pub fn flat_with(self, config: impl Into<StageConfig>) -> Self {
        let id = config.into().node_id;
        self.node(move |it| StreamNode::new(FlattenExecutor::new(it), id.clone()))
    }

    fn connect(self) -> StreamResult<Iter> {
        let mut it = self.source;
        for factory in &self.nodes {
            let node = factory(it);
            let stage = node.id().to_string();
            if let Some(err) = node.err() {
                log::debug!("stage {} could not be built: {}", stage, err);
                return Err(Error::CannotCreateStream {
                    stage,
                    source: Box::new(err.clone()),
                });
            }
            it = node.execute().map_err(|err| {
                log::debug!("stage {} could not be executed: {}", stage, err);
                Error::CannotCreateStream {
                    stage: stage.clone(),
                    source: Box::new(err),
                }
            })?;
        }
        Ok(it)
    }

    /// Connect the chain and return its output.
    pub fn execute(self) -> StreamResult<Iter> {
        self.connect()
    }

    /// Feed every element to `consumer`, returning the first error.
    pub fn consume(self, consumer: Consumer) -> StreamResult<()> {
        let it = self.connect()?;
        ConsumeExecutor::new(consumer, it).consume()
    }
}

impl Executor for Stream {
    fn execute(self) -> StreamResult<Iter> {
        Stream::execute(self)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("source", &self.source)
            .field("stages", &self.nodes.len())
            .finish()
    }
}

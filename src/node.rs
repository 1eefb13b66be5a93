//! Stream nodes: executors with an identity
//!
//! Errors yielded while iterating a node's output are prefixed with the
//! node id, so an error from an early stage accumulates the ids of every
//! later stage it passes through.

use std::fmt;

use uuid::Uuid;

use crate::error::{Error, StreamResult};
use crate::executor::{BoxedExecutor, Executor};
use crate::iter::Iter;

/// Identity of a stream stage, caller supplied or generated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    /// The given id, or a fresh UUID when absent or empty.
    pub fn new(id: Option<String>) -> Self {
        match id {
            Some(id) if !id.is_empty() => NodeId(id),
            _ => NodeId::generate(),
        }
    }

    pub fn generate() -> Self {
        NodeId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

enum NodeState {
    Ready(Box<dyn BoxedExecutor>),
    Failed(Error),
}

/// One stage of a stream
pub struct StreamNode {
    id: NodeId,
    state: NodeState,
}

impl StreamNode {
    pub fn new<E>(executor: E, id: Option<String>) -> Self
    where
        E: Executor + 'static,
    {
        Self {
            id: NodeId::new(id),
            state: NodeState::Ready(Box::new(executor)),
        }
    }

    /// A node whose executor could not be built. Executing it fails with
    /// [`Error::CannotCreateIterator`]; the cause is available from
    /// [`StreamNode::err`].
    pub fn failed(error: Error, id: Option<String>) -> Self {
        Self {
            id: NodeId::new(id),
            state: NodeState::Failed(error),
        }
    }

    pub fn from_result<E>(executor: StreamResult<E>, id: Option<String>) -> Self
    where
        E: Executor + 'static,
    {
        match executor {
            Ok(executor) => StreamNode::new(executor, id),
            Err(error) => StreamNode::failed(error, id),
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// The construction error of a failed node.
    pub fn err(&self) -> Option<&Error> {
        match &self.state {
            NodeState::Ready(_) => None,
            NodeState::Failed(e) => Some(e),
        }
    }
}

impl fmt::Debug for StreamNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamNode")
            .field("id", &self.id)
            .field("err", &self.err())
            .finish()
    }
}

impl Executor for StreamNode {
    fn execute(self) -> StreamResult<Iter> {
        let StreamNode { id, state } = self;
        let executor = match state {
            NodeState::Ready(executor) => executor,
            NodeState::Failed(_) => return Err(Error::CannotCreateIterator),
        };
        let mut it = executor.execute_boxed()?;
        Ok(Iter::from_generator(Box::new(move || {
            it.pull().map_err(|e| match e {
                Error::Eoi => Error::Eoi,
                e => e.tagged(id.as_str()),
            })
        })))
    }
}

//! Dynamically shaped user functions
//!
//! A [`Func`] is a function over [`Value`]s together with a declared
//! [`Signature`]. Typed closures are checked by the compiler; a `Func` is
//! checked when it is turned into an adapter, which is where the
//! `invalid mapper`/`invalid filter`/... construction errors come from.

use std::fmt;
use std::sync::Arc;

use crate::adapter::AggregatorType;
use crate::error::{ApplyError, StreamResult};
use crate::value::{Kind, Value};

/// The body of a [`Func`].
pub type FuncBody = Arc<dyn Fn(Vec<Value>) -> StreamResult<Value> + Send + Sync + 'static>;

/// Parameter and output kinds of a [`Func`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Kind>,
    pub output: Kind,
}

impl Signature {
    pub fn new(params: Vec<Kind>, output: Kind) -> Self {
        Self { params, output }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn is_mapper(&self) -> bool {
        self.arity() == 1 && self.output != Kind::Unit
    }

    pub(crate) fn is_filter(&self) -> bool {
        self.arity() == 1 && self.output == Kind::Bool
    }

    pub(crate) fn is_comparator(&self) -> bool {
        self.arity() == 2 && self.params[0] == self.params[1] && self.output == Kind::Bool
    }

    pub(crate) fn is_consumer(&self) -> bool {
        self.arity() == 1 && self.output == Kind::Unit
    }

    /// Classify a two-parameter signature as an aggregator.
    pub(crate) fn aggregator_type(&self) -> Option<AggregatorType> {
        if self.arity() != 2 {
            return None;
        }
        AggregatorType::classify(
            self.params[1] == self.output,
            self.params[0] == self.output,
        )
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (i, k) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", k)?;
        }
        write!(f, ") -> {}", self.output)
    }
}

/// A user function over dynamic values with a declared signature
#[derive(Clone)]
pub struct Func {
    signature: Signature,
    body: FuncBody,
}

impl Func {
    pub fn new<F>(params: Vec<Kind>, output: Kind, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> StreamResult<Value> + Send + Sync + 'static,
    {
        Self {
            signature: Signature::new(params, output),
            body: Arc::new(body),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn arity(&self) -> usize {
        self.signature.arity()
    }

    /// Check the arguments against the signature, invoke the body, and
    /// check its result against the declared output kind.
    pub fn call(&self, args: Vec<Value>) -> StreamResult<Value> {
        if args.len() != self.arity() {
            return Err(ApplyError::Arity {
                expected: self.arity(),
                found: args.len(),
            }
            .into());
        }
        for (kind, arg) in self.signature.params.iter().zip(&args) {
            if !kind.accepts(arg) {
                return Err(ApplyError::Convert {
                    expected: *kind,
                    found: arg.kind(),
                }
                .into());
            }
        }
        let out = (self.body)(args)?;
        if !self.signature.output.accepts(&out) {
            return Err(ApplyError::Convert {
                expected: self.signature.output,
                found: out.kind(),
            }
            .into());
        }
        Ok(out)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("signature", &self.signature)
            .finish()
    }
}

//! Dynamic values flowing through a stream and the coercion routine
//!
//! Every element of a pipeline is a [`Value`]. Typed user functions receive
//! their arguments through [`FromValue`], which performs a best-effort,
//! shape-directed conversion (lists into `Vec`, maps into `HashMap`, tuples
//! into Rust tuples, ...). Numbers are never converted across kinds: an
//! `Int` does not become an `f64`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::container::{Either, Maybe, Tuple};
use crate::error::{ApplyError, Error};

/// The shape of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Matches any value; used in function signatures.
    Any,
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Tuple,
    Maybe,
    Either,
    Error,
}

impl Kind {
    /// Whether a value of this kind may be passed where `self` is declared.
    pub fn accepts(&self, value: &Value) -> bool {
        *self == Kind::Any || *self == value.kind()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Any => "any",
            Kind::Unit => "unit",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Str => "str",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Tuple => "tuple",
            Kind::Maybe => "maybe",
            Kind::Either => "either",
            Kind::Error => "error",
        };
        f.write_str(name)
    }
}

/// An element of a stream
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Keyed collection. Entry order carries no meaning.
    Map(Vec<(Value, Value)>),
    Tuple(Tuple),
    Maybe(Maybe),
    Either(Either),
    /// A failure carried as data, e.g. the left side of a failed map.
    Error(Error),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Unit => Kind::Unit,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Tuple(_) => Kind::Tuple,
            Value::Maybe(_) => Kind::Maybe,
            Value::Either(_) => Kind::Either,
            Value::Error(_) => Kind::Error,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Coerce into a typed Rust value.
    pub fn cast<T: FromValue>(self) -> Result<T, ApplyError> {
        T::from_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::List(xs) => {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", x)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Tuple(t) => write!(f, "{}", t),
            Value::Maybe(m) => write!(f, "{}", m),
            Value::Either(e) => write!(f, "{}", e),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Unit => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(xs) => {
                let mut seq = serializer.serialize_seq(Some(xs.len()))?;
                for x in xs {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
            Value::Tuple(t) => {
                let mut seq = serializer.serialize_seq(Some(t.size()))?;
                for x in t.iter() {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Maybe(Maybe::Just(v)) => serializer.serialize_some(v.as_ref()),
            Value::Maybe(Maybe::Nothing) => serializer.serialize_none(),
            Value::Either(Either::Left(v)) => {
                serializer.serialize_newtype_variant("Either", 0, "Left", v.as_ref())
            }
            Value::Either(Either::Right(v)) => {
                serializer.serialize_newtype_variant("Either", 1, "Right", v.as_ref())
            }
            Value::Error(e) => serializer.serialize_str(&e.to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Unit,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(xs) => Value::List(xs.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    v.into_value()
                }
            }
        )*
    };
}

impl_from_for_value!(bool, i32, i64, f64, String, &str, Tuple, Maybe, Either, Error);

// ================================
// Coercion
// ================================

/// Conversion of a typed Rust value into a stream element
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Best-effort conversion of a stream element into a typed Rust value
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ApplyError>;
}

fn mismatch(expected: Kind, found: &Value) -> ApplyError {
    ApplyError::Convert {
        expected,
        found: found.kind(),
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        Ok(value)
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Unit
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Unit => Ok(()),
            other => Err(mismatch(Kind::Unit, &other)),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(Kind::Bool, &other)),
        }
    }
}

macro_rules! impl_int {
    (lossless: $($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::Int(i64::from(self))
                }
            }
            impl_int!(@from $t);
        )*
    };
    // Values beyond i64::MAX saturate.
    (saturating: $($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::Int(i64::try_from(self).unwrap_or(i64::MAX))
                }
            }
            impl_int!(@from $t);
        )*
    };
    (@from $t:ty) => {
        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, ApplyError> {
                match value {
                    Value::Int(i) => <$t>::try_from(i).map_err(|_| mismatch(Kind::Int, &Value::Int(i))),
                    other => Err(mismatch(Kind::Int, &other)),
                }
            }
        }
    };
}

impl_int!(lossless: i8, i16, i32, i64, u8, u16, u32);
impl_int!(saturating: u64, usize);

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Float(x) => Ok(x),
            other => Err(mismatch(Kind::Float, &other)),
        }
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Float(x) => Ok(x as f32),
            other => Err(mismatch(Kind::Float, &other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

/// An `Error` payload converts to its message.
impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Str(s) => Ok(s),
            Value::Error(e) => Ok(e.to_string()),
            other => Err(mismatch(Kind::Str, &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::List(xs) => xs.into_iter().map(T::from_value).collect(),
            Value::Tuple(t) => t.iter().cloned().map(T::from_value).collect(),
            other => Err(mismatch(Kind::List, &other)),
        }
    }
}

impl<T: IntoValue, const N: usize> IntoValue for [T; N] {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for HashMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K, V> FromValue for HashMap<K, V>
where
    K: FromValue + Eq + Hash,
    V: FromValue,
{
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(mismatch(Kind::Map, &other)),
        }
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K, V> FromValue for BTreeMap<K, V>
where
    K: FromValue + Ord,
    V: FromValue,
{
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(mismatch(Kind::Map, &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => Value::Maybe(Maybe::just(v)),
            None => Value::Maybe(Maybe::nothing()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Maybe(Maybe::Just(v)) => T::from_value(*v).map(Some),
            Value::Maybe(Maybe::Nothing) | Value::Unit => Ok(None),
            other => Err(mismatch(Kind::Maybe, &other)),
        }
    }
}

impl IntoValue for Tuple {
    fn into_value(self) -> Value {
        Value::Tuple(self)
    }
}

impl FromValue for Tuple {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Tuple(t) => Ok(t),
            other => Err(mismatch(Kind::Tuple, &other)),
        }
    }
}

impl IntoValue for Maybe {
    fn into_value(self) -> Value {
        Value::Maybe(self)
    }
}

impl FromValue for Maybe {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Maybe(m) => Ok(m),
            other => Err(mismatch(Kind::Maybe, &other)),
        }
    }
}

impl IntoValue for Either {
    fn into_value(self) -> Value {
        Value::Either(self)
    }
}

impl FromValue for Either {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Either(e) => Ok(e),
            other => Err(mismatch(Kind::Either, &other)),
        }
    }
}

impl IntoValue for Error {
    fn into_value(self) -> Value {
        Value::Error(self)
    }
}

impl FromValue for Error {
    fn from_value(value: Value) -> Result<Self, ApplyError> {
        match value {
            Value::Error(e) => Ok(e),
            other => Err(mismatch(Kind::Error, &other)),
        }
    }
}

/// Elements of a tuple or list, checked against the expected arity.
fn positional(value: Value, arity: usize) -> Result<Vec<Value>, ApplyError> {
    let items: Vec<Value> = match value {
        Value::Tuple(t) => t.iter().cloned().collect(),
        Value::List(xs) => xs,
        other => return Err(mismatch(Kind::Tuple, &other)),
    };
    if items.len() != arity {
        return Err(ApplyError::Arity {
            expected: arity,
            found: items.len(),
        });
    }
    Ok(items)
}

macro_rules! impl_rust_tuple {
    ($n:expr; $($t:ident),+) => {
        impl<$($t: IntoValue),+> IntoValue for ($($t,)+) {
            #[allow(non_snake_case)]
            fn into_value(self) -> Value {
                let ($($t,)+) = self;
                Value::Tuple(Tuple::new(vec![$($t.into_value()),+]))
            }
        }

        impl<$($t: FromValue),+> FromValue for ($($t,)+) {
            #[allow(non_snake_case)]
            fn from_value(value: Value) -> Result<Self, ApplyError> {
                let mut items = positional(value, $n)?.into_iter();
                $(
                    let $t = $t::from_value(items.next().unwrap_or_default())?;
                )+
                Ok(($($t,)+))
            }
        }
    };
}

impl_rust_tuple!(1; A);
impl_rust_tuple!(2; A, B);
impl_rust_tuple!(3; A, B, C);
impl_rust_tuple!(4; A, B, C, D);

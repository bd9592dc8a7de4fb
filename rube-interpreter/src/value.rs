use num_bigint::BigInt;

use crate::heap::ObjectId;
use crate::interner::Interned;

/// Represents a rube value.
///
/// Immediate values (`nil`, booleans, numbers and symbols) are stored inline,
/// everything else lives in the runtime's heap and is referred to by ID.
#[derive(Debug, Clone)]
pub enum Value {
    /// The **nil** value.
    Nil,
    /// A boolean value (**true** or **false**).
    Boolean(bool),
    /// An integer value.
    Integer(i64),
    /// A big integer value (only for values that do not fit in an `i64`).
    BigInteger(BigInt),
    /// A floating-point value.
    Float(f64),
    /// An interned symbol value.
    Symbol(Interned),
    /// A heap-allocated object.
    Object(ObjectId),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Boolean(false))
    }

    /// Whether this is the **nil** value.
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Get the heap ID of this value, if it is not an immediate.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Build an integer value, demoting big integers whenever they fit in 64 bits.
    pub fn from_big(value: BigInt) -> Self {
        use num_traits::ToPrimitive;
        match value.to_i64() {
            Some(value) => Self::Integer(value),
            None => Self::BigInteger(value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Self::Object(value)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a.eq(b),
            (Self::Integer(a), Self::Integer(b)) => a.eq(b),
            (Self::BigInteger(a), Self::BigInteger(b)) => a.eq(b),
            (Self::Float(a), Self::Float(b)) => a.eq(b),
            (Self::Symbol(a), Self::Symbol(b)) => a.eq(b),
            (Self::Object(a), Self::Object(b)) => a.eq(b),
            _ => false,
        }
    }
}

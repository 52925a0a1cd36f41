//! Scalar values at the boundary between the SQL type system and the key
//! codec.
//!
//! The engine never interprets column values beyond encoding them into
//! ordered key bytes and decoding them back; anything richer (coercion,
//! collation, arithmetic) belongs to the external type-system collaborator.

use std::fmt;

use crate::decimal::Decimal;

/// The scalar types the key codec can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ScalarType {
    /// 64-bit signed integer.
    Int,
    /// 32-bit signed integer. Shares the integer key encoding with [`Int`]
    /// so mixed-width comparisons order numerically.
    ///
    /// [`Int`]: ScalarType::Int
    Int32,
    /// 64-bit IEEE 754 float.
    Float,
    /// Exact decimal (scaled integer).
    Decimal,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Bytes,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Int32 => "int32",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Text => "text",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// A dynamically-typed column value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ScalarValue {
    /// SQL NULL. Sorts before every non-null value.
    Null,
    /// A 64-bit signed integer.
    Int(i64),
    /// A 32-bit signed integer.
    Int32(i32),
    /// A 64-bit IEEE 754 float.
    Float(f64),
    /// An exact decimal.
    Decimal(Decimal),
    /// A UTF-8 text string.
    Text(String),
    /// A binary value.
    Bytes(Vec<u8>),
}

impl ScalarValue {
    /// The declared type this value encodes as, or `None` for NULL (NULL is
    /// typeless in the key layout).
    pub const fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Self::Null => None,
            Self::Int(_) => Some(ScalarType::Int),
            Self::Int32(_) => Some(ScalarType::Int32),
            Self::Float(_) => Some(ScalarType::Float),
            Self::Decimal(_) => Some(ScalarType::Decimal),
            Self::Text(_) => Some(ScalarType::Text),
            Self::Bytes(_) => Some(ScalarType::Bytes),
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Int32(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Numeric view used by the spatial binder. Only the three source kinds
    /// the spatial contract admits convert; everything else returns `None`
    /// and the binder fails loudly.
    pub fn spatial_coordinate(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Bytes(b) => write!(f, "x'{}'", hex(b)),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spatial_coordinate_admits_three_kinds() {
        assert_eq!(ScalarValue::Int(3).spatial_coordinate(), Some(3.0));
        assert_eq!(ScalarValue::Int32(-4).spatial_coordinate(), Some(-4.0));
        let d = Decimal::new(315, 2).unwrap();
        assert_eq!(ScalarValue::Decimal(d).spatial_coordinate(), Some(3.15));

        assert_eq!(ScalarValue::Float(1.0).spatial_coordinate(), None);
        assert_eq!(ScalarValue::Text("x".into()).spatial_coordinate(), None);
        assert_eq!(ScalarValue::Null.spatial_coordinate(), None);
    }

    #[test]
    fn as_int_widens_int32() {
        assert_eq!(ScalarValue::Int32(-7).as_int(), Some(-7));
        assert_eq!(ScalarValue::Int(9).as_int(), Some(9));
        assert_eq!(ScalarValue::Float(9.0).as_int(), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(ScalarValue::Null.to_string(), "NULL");
        assert_eq!(ScalarValue::Text("ab".into()).to_string(), "'ab'");
        assert_eq!(ScalarValue::Bytes(vec![0xca, 0xfe]).to_string(), "x'cafe'");
    }
}

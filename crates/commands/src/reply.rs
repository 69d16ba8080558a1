use std::fmt;

/// Reply values produced by the command surface, mirroring the host
/// server's reply kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Integer(i64),
    Simple(&'static str),
    Bulk(Vec<u8>),
    Double(f64),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_simple(&self) -> Option<&str> {
        match self {
            Reply::Simple(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bulk(&self) -> Option<&[u8]> {
        match self {
            Reply::Bulk(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Reply::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Integer(value) => write!(f, "{value}"),
            Reply::Simple(value) => write!(f, "{value}"),
            Reply::Bulk(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Reply::Double(value) => write!(f, "{value}"),
            Reply::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

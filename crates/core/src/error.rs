use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// `pop` on a queue with no elements.
    EmptyQueue,
    /// A narrowing collection refused an element.
    InvalidElement(String),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQueue => write!(f, "queue is empty"),
            Self::InvalidElement(msg) => write!(f, "invalid element: {msg}"),
        }
    }
}

impl std::error::Error for KernelError {}

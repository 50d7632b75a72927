use std::fmt;
use std::time::Duration;

/// Reasons a non-blocking or bounded wait gave up without taking a permit.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Error {
    WouldBlock,
    Timeout(Duration),
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::WouldBlock => write!(f, "operation would block"),
            Error::Timeout(timeout) => write!(f, "timed out after {:?}", timeout),
            Error::Cancelled => write!(f, "wait cancelled"),
        }
    }
}

impl std::error::Error for Error {}

/// An item that could not be stored, handed back to the caller together with the reason.
#[derive(PartialEq, Eq, Debug)]
pub struct Rejected<T> {
    pub item: T,
    pub reason: Error,
}

impl<T> Rejected<T> {
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item rejected: {}", self.reason)
    }
}

impl<T: fmt::Debug> std::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

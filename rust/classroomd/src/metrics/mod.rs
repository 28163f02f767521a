//! Derived classroom metrics. Every function here is a pure transformation of
//! borrowed record collections; nothing touches the store or the IPC layer.

pub mod attendance;
pub mod grades;
pub mod records;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("series value at index {index} is not a finite number")]
    NonFiniteValue { index: usize },
}

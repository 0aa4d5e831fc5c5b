//! Skeleton cleaning policy definitions.

pub mod v1;

pub use v1::SkeletonPolicyV1;

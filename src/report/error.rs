// Copyright © 2025 Stephan Kunz

//! Report Aggregator errors.

use thiserror::Error;

use crate::ConstString;

/// `report` error type.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// No entry for `api` in a [`super::ReportDetail`]'s url map.
    #[error("no api entry [{0}] in report")]
    UnknownApi(ConstString),
}

use serde::{Deserialize, Serialize};

use crate::value::Parameters;

/// A client request, as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Run a query with named parameters.
    Query { text: String, parameters: Parameters },
    /// Fetch catalog metadata.
    Catalog,
    /// Cancel the query running on `worker_index`, authorized by `token`.
    Cancel { worker_index: u32, token: String },
}

impl Request {
    pub fn query(text: impl Into<String>, parameters: Parameters) -> Self {
        Request::Query {
            text: text.into(),
            parameters,
        }
    }

    pub fn cancel(worker_index: u32, token: impl Into<String>) -> Self {
        Request::Cancel {
            worker_index,
            token: token.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::Query { .. } => "Query",
            Request::Catalog => "Catalog",
            Request::Cancel { .. } => "Cancel",
        }
    }
}

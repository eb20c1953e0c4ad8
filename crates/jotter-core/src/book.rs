//! Books: the labelled containers notes live in.

use serde::{Deserialize, Serialize};

/// A book as held in the local store.
///
/// `uuid` starts out locally generated and is replaced by the server's
/// identifier during reconciliation. `label` is unique among books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
  pub uuid:  String,
  pub label: String,
}

/// A book as reported by the remote service's book listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBook {
  pub uuid:  String,
  pub label: String,
}

use cloud_store::Stored;
use serde::{Deserialize, Serialize};

const DEFAULT_LIST_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

/// A stored record flattened together with its document id.
#[derive(Debug, Serialize)]
pub struct ListedDocument<T> {
    pub uuid: String,
    #[serde(flatten)]
    pub record: T,
}

impl<T> From<Stored<T>> for ListedDocument<T> {
    fn from(stored: Stored<T>) -> Self {
        Self {
            uuid: stored.id,
            record: stored.record,
        }
    }
}

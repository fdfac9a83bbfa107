//! Customer contact data held by the store of record.

use serde::{Deserialize, Serialize};

use crate::order::CustomerId;

/// A customer known to the store, with the address notifications go to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub email: String,
}

impl CustomerProfile {
    pub fn new(id: CustomerId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

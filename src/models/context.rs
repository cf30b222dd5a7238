use serde::{Deserialize, Serialize};

/// Identity and branch of the caller, supplied per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: i64,
    pub branch_code: String,
}

impl RequestContext {
    pub fn new(user_id: i64, branch_code: impl Into<String>) -> Self {
        Self {
            user_id,
            branch_code: branch_code.into(),
        }
    }
}

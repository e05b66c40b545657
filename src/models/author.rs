//! Author profile model.

use serde::{Deserialize, Serialize};

/// Public profile of an academic author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub name: String,
    /// Provider-specific author identifier
    pub author_id: Option<String>,
    pub affiliation: Option<String>,
    /// Verified email domain, e.g. `mit.edu`
    pub email_domain: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub cited_by: Option<u64>,
    pub h_index: Option<u64>,
    pub i10_index: Option<u64>,
    pub url: Option<String>,
}

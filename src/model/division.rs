use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Division {
    #[schema(example = 10)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    /// Employee id of the division head, if one is assigned
    #[schema(example = 7, nullable = true)]
    pub head_id: Option<u64>,
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+8801712345678",
        "gender": "male",
        "division_id": 10,
        "supervisor_id": 5,
        "join_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "male", value_type = String)]
    pub gender: String,

    #[schema(example = 10)]
    pub division_id: u64,

    /// Direct supervisor (employee id); approvals start here when set
    #[schema(example = 5, nullable = true)]
    pub supervisor_id: Option<u64>,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub join_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}

impl Employee {
    pub fn gender(&self) -> Option<Gender> {
        self.gender.parse().ok()
    }
}

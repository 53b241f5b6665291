use sqlx::MySqlPool;

use crate::leave::error::LeaveError;
use crate::model::employee::Employee;

/// Head of the given division, if one is assigned.
pub async fn division_head<'e, E>(exec: E, division_id: u64) -> Result<Option<u64>, LeaveError>
where
    E: sqlx::Executor<'e, Database = sqlx::MySql>,
{
    let head = sqlx::query_scalar::<_, Option<u64>>(
        "SELECT head_id FROM divisions WHERE id = ?",
    )
    .bind(division_id)
    .fetch_optional(exec)
    .await?;
    Ok(head.flatten())
}

// First active HR-tier account, ordered for determinism.
async fn hr_fallback(pool: &MySqlPool) -> Result<Option<u64>, LeaveError> {
    let id = sqlx::query_scalar::<_, u64>(
        "SELECT e.id FROM employees e \
         JOIN users u ON u.employee_id = e.id \
         WHERE u.role_id <= 2 AND u.is_active = 1 AND e.status = 'active' \
         ORDER BY e.id LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// Initial approver for a fresh submission: direct supervisor, else division
/// head, else the HR/admin fallback. Re-evaluated per call, never cached.
pub async fn determine_initial_approver(
    pool: &MySqlPool,
    employee: &Employee,
) -> Result<u64, LeaveError> {
    if let Some(supervisor) = employee.supervisor_id {
        return Ok(supervisor);
    }
    if let Some(head) = division_head(pool, employee.division_id).await? {
        return Ok(head);
    }
    hr_fallback(pool).await?.ok_or_else(|| {
        LeaveError::validation(vec![
            "No approver could be resolved for this employee".to_string(),
        ])
    })
}

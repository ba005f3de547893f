use uuid::Uuid;

use crate::{
    auth::extractors::AdminCaller,
    error::{AppError, AppResult},
};

/// Admins may grant or revoke the flag on anyone but may not demote themselves.
pub fn check_admin_change(admin: &AdminCaller, target: Uuid, make_admin: bool) -> AppResult<()> {
    if !make_admin && admin.user_id() == target {
        return Err(AppError::Rule("Cannot remove admin access from yourself".into()));
    }
    Ok(())
}

use error_stack::Report;
use kernel::interface::gateway::{DependOnUserDirectory, UserDirectory};
use kernel::prelude::entity::{UserId, UserStanding};
use kernel::KernelError;

#[async_trait::async_trait]
pub trait AuthorizationService: 'static + Sync + Send + DependOnUserDirectory {
    async fn find_user_standing(
        &self,
        user_id: &UserId,
    ) -> error_stack::Result<UserStanding, KernelError> {
        self.user_directory()
            .find_standing(user_id)
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::NotFound)
                    .attach_printable(format!("User {} is not registered", user_id.as_ref()))
            })
    }

    async fn ensure_admin(&self, user_id: &UserId) -> error_stack::Result<UserStanding, KernelError> {
        let standing = self.find_user_standing(user_id).await.map_err(|report| {
            // Unknown callers are treated like members.
            if matches!(report.current_context(), KernelError::NotFound) {
                report.change_context(KernelError::Forbidden)
            } else {
                report
            }
        })?;
        if !standing.is_admin() {
            return Err(Report::new(KernelError::Forbidden)
                .attach_printable(format!("User {} is not an admin", user_id.as_ref())));
        }
        Ok(standing)
    }
}

impl<T> AuthorizationService for T where T: DependOnUserDirectory {}

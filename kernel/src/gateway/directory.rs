use crate::entity::{UserId, UserStanding};
use crate::KernelError;

#[async_trait::async_trait]
pub trait UserDirectory: 'static + Sync + Send {
    async fn find_standing(
        &self,
        user_id: &UserId,
    ) -> error_stack::Result<Option<UserStanding>, KernelError>;
}

pub trait DependOnUserDirectory: 'static + Sync + Send {
    type UserDirectory: UserDirectory;
    fn user_directory(&self) -> &Self::UserDirectory;
}

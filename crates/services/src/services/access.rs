use db::models::workspace::WorkspaceMember;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("You do not have access to this workspace")]
    NotMember,
    #[error("You must be an admin to perform this action")]
    AdminRequired,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Returns the caller's active membership in `workspace_id`.
///
/// Invited, removed and deleted memberships do not count. With
/// `require_admin`, the membership must also carry the admin role.
pub async fn assert_user_in_workspace(
    pool: &SqlitePool,
    user_id: Uuid,
    workspace_id: i64,
    require_admin: bool,
) -> Result<WorkspaceMember, AccessError> {
    let member = WorkspaceMember::find_active_for_user(pool, workspace_id, user_id)
        .await?
        .ok_or(AccessError::NotMember)?;

    if require_admin && !member.is_admin() {
        tracing::debug!(%user_id, workspace_id, "admin role required");
        return Err(AccessError::AdminRequired);
    }

    Ok(member)
}

#[cfg(test)]
mod tests {
    use db::{
        models::workspace::{MemberRole, WorkspaceMember},
        test_utils::{create_test_pool, create_test_user, create_test_workspace},
    };

    use super::*;

    #[tokio::test]
    async fn creator_passes_admin_check() {
        let (pool, _dir) = create_test_pool().await;
        let owner = create_test_user(&pool, "owner@example.com").await;
        let workspace = create_test_workspace(&pool, &owner, "acme").await;

        let member = assert_user_in_workspace(&pool, owner.id, workspace.id, true)
            .await
            .unwrap();
        assert!(member.is_admin());
    }

    #[tokio::test]
    async fn stranger_is_rejected() {
        let (pool, _dir) = create_test_pool().await;
        let owner = create_test_user(&pool, "owner@example.com").await;
        let stranger = create_test_user(&pool, "stranger@example.com").await;
        let workspace = create_test_workspace(&pool, &owner, "acme").await;

        let err = assert_user_in_workspace(&pool, stranger.id, workspace.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotMember));
    }

    #[tokio::test]
    async fn plain_member_fails_admin_check() {
        let (pool, _dir) = create_test_pool().await;
        let owner = create_test_user(&pool, "owner@example.com").await;
        let user = create_test_user(&pool, "member@example.com").await;
        let workspace = create_test_workspace(&pool, &owner, "acme").await;
        WorkspaceMember::add(
            &pool,
            workspace.id,
            &user.email,
            Some(user.id),
            MemberRole::Member,
            owner.id,
        )
        .await
        .unwrap();

        assert!(
            assert_user_in_workspace(&pool, user.id, workspace.id, false)
                .await
                .is_ok()
        );
        let err = assert_user_in_workspace(&pool, user.id, workspace.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AdminRequired));
    }

    #[tokio::test]
    async fn removed_member_loses_access() {
        let (pool, _dir) = create_test_pool().await;
        let owner = create_test_user(&pool, "owner@example.com").await;
        let user = create_test_user(&pool, "member@example.com").await;
        let workspace = create_test_workspace(&pool, &owner, "acme").await;
        let member = WorkspaceMember::add(
            &pool,
            workspace.id,
            &user.email,
            Some(user.id),
            MemberRole::Member,
            owner.id,
        )
        .await
        .unwrap();

        WorkspaceMember::soft_delete(&pool, member.id, owner.id)
            .await
            .unwrap();

        let err = assert_user_in_workspace(&pool, user.id, workspace.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotMember));
    }
}

// src/auth_tests.rs

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::auth::{
        has_any_role, has_role, AuthError, AuthService, CredentialStore, Role, SeededCredentials,
    };
    use crate::session::{MemorySessionStore, SessionManager, SessionStore};

    fn setup_auth() -> (AuthService, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let sessions = Arc::new(SessionManager::new(store.clone()));
        let auth = AuthService::new(
            Arc::new(SeededCredentials::new()),
            sessions,
            Duration::from_millis(5),
        );
        (auth, store)
    }

    // --- Role hierarchy ---

    #[test]
    fn admin_covers_manager_but_user_does_not() {
        assert!(has_role(Role::Admin, Role::Manager));
        assert!(has_role(Role::Manager, Role::User));
        assert!(has_role(Role::User, Role::User));
        assert!(!has_role(Role::User, Role::Manager));
        assert!(!has_role(Role::Manager, Role::Admin));
    }

    #[test]
    fn any_of_list_accepts_a_matching_role() {
        assert!(has_any_role(Role::Admin, &[Role::Manager, Role::Admin]));
        assert!(has_any_role(Role::Manager, &[Role::Manager, Role::Admin]));
        assert!(!has_any_role(Role::User, &[Role::Manager, Role::Admin]));
        assert!(!has_any_role(Role::User, &[]));
    }

    // --- Login ---

    #[tokio::test]
    async fn login_returns_the_matching_employee_and_persists_the_session() {
        let (auth, store) = setup_auth();

        let employee = auth.login("user1", "password1").await.unwrap();
        assert_eq!(employee.username, "user1");
        assert_eq!(employee.name, "Anna Nilsson");
        assert_eq!(employee.role, Role::User);

        let persisted = store.load().unwrap().expect("session should be written");
        assert_eq!(persisted, employee);
    }

    #[tokio::test]
    async fn wrong_password_fails_without_writing_a_session() {
        let (auth, store) = setup_auth();

        let result = auth.login("user1", "not-the-password").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_user_and_inactive_account_fail_with_the_same_message() {
        let (auth, _) = setup_auth();

        let unknown = auth.login("nobody", "password1").await.unwrap_err();
        let inactive = auth.login("former1", "password4").await.unwrap_err();
        let wrong = auth.login("user1", "wrong").await.unwrap_err();

        // One generic message; the caller cannot tell the cases apart.
        assert_eq!(unknown.to_string(), inactive.to_string());
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn logout_clears_the_persisted_session() {
        let (auth, store) = setup_auth();
        auth.login("manager1", "password2").await.unwrap();
        assert!(store.load().unwrap().is_some());

        auth.logout().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    // --- Password change ---

    #[tokio::test]
    async fn password_change_invalidates_the_old_password() {
        let credentials = SeededCredentials::new();
        assert!(credentials.verify("user1", "password1").await.is_some());

        assert!(credentials.set_password("user1", "password1", "fresh-secret").await);
        assert!(credentials.verify("user1", "password1").await.is_none());
        assert!(credentials.verify("user1", "fresh-secret").await.is_some());
    }

    #[tokio::test]
    async fn password_change_with_wrong_current_password_is_rejected() {
        let (auth, _) = setup_auth();
        let result = auth.change_password("user1", "wrong", "whatever").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
}

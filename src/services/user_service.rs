// ==================== USER STORE ====================
// Acesso à coleção `users`. Os handlers dependem apenas do trait,
// o que permite trocar o MongoDB por uma implementação em memória nos testes.

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::Collection;

use crate::{
    database::MongoDB,
    models::{User, USERS_COLLECTION},
    utils::error::AppError,
};

const DUPLICATE_KEY: i32 = 11000;

#[async_trait]
pub trait UserService: Send + Sync {
    /// Inserts a new user. `password_hash` must already be hashed.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError>;

    async fn find_user(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_all_users(&self) -> Result<Vec<User>, AppError>;
}

pub struct MongoUserService {
    users: Collection<User>,
}

impl MongoUserService {
    pub fn new(db: &MongoDB) -> Self {
        Self {
            users: db.collection::<User>(USERS_COLLECTION),
        }
    }
}

#[async_trait]
impl UserService for MongoUserService {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut user = User::new(email, password_hash);

        let result = self.users.insert_one(&user).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::UserExists
            } else {
                AppError::from(e)
            }
        })?;

        user.id = result.inserted_id.as_object_id();
        Ok(user)
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn find_all_users(&self) -> Result<Vec<User>, AppError> {
        let cursor = self
            .users
            .find(doc! {})
            .sort(doc! { "createdAt": 1 })
            .await?;

        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Failure {
        FindUser,
        CreateUser,
    }

    /// In-memory `UserService` with optional failure injection.
    #[derive(Default)]
    pub struct InMemoryUserService {
        users: Mutex<Vec<User>>,
        failure: Option<Failure>,
    }

    impl InMemoryUserService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(failure: Failure) -> Self {
            Self {
                failure: Some(failure),
                ..Self::default()
            }
        }

        pub fn with_user(self, user: User) -> Self {
            self.users.lock().unwrap().push(user);
            self
        }

        pub fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UserService for InMemoryUserService {
        async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
            if self.failure == Some(Failure::CreateUser) {
                return Err(AppError::DatabaseError("Database error".to_string()));
            }

            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == email) {
                return Err(AppError::UserExists);
            }

            let mut user = User::new(email, password_hash);
            user.id = Some(mongodb::bson::oid::ObjectId::new());
            users.push(user.clone());
            Ok(user)
        }

        async fn find_user(&self, email: &str) -> Result<Option<User>, AppError> {
            if self.failure == Some(Failure::FindUser) {
                return Err(AppError::DatabaseError("Database error".to_string()));
            }

            Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
        }

        async fn find_all_users(&self) -> Result<Vec<User>, AppError> {
            Ok(self.users.lock().unwrap().clone())
        }
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::err::{DbError, ServerError};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

/// A validated `name`/`age` pair, ready to be inserted or written over an
/// existing row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    name: String,
    age: i64,
}

impl NewUser {
    pub fn new(name: impl Into<String>, age: i64) -> Result<Self, ServerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServerError::validation("Name and age are required"));
        }
        if age <= 0 {
            return Err(ServerError::validation("Age must be a positive integer"));
        }
        Ok(NewUser { name, age })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> i64 {
        self.age
    }

    pub fn with_id(self, id: i64) -> User {
        User {
            id,
            name: self.name,
            age: self.age,
        }
    }
}

// the input to the `create_user` and `update_user` handlers
#[derive(Deserialize, Clone, Debug, Default)]
pub struct UserPayload {
    pub name: Option<String>,
    pub age: Option<i64>,
}

impl UserPayload {
    pub fn validate(self) -> Result<NewUser, ServerError> {
        match (self.name, self.age) {
            (Some(name), Some(age)) => NewUser::new(name, age),
            _ => Err(ServerError::validation("Name and age are required")),
        }
    }
}

/// Body of the single add route. `friend_id` stays untyped so a present but
/// non-integer value is reported separately from a missing one.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct FriendPayload {
    pub friend_id: Option<serde_json::Value>,
}

impl FriendPayload {
    /// Returns the friend id once it is present, non-zero and distinct from
    /// `user_id`.
    pub fn validate(self, user_id: i64) -> Result<i64, ServerError> {
        let friend_id = match self.friend_id {
            None | Some(serde_json::Value::Null) => {
                return Err(ServerError::validation("Friend ID is required"));
            }
            Some(value) => value
                .as_i64()
                .ok_or_else(|| ServerError::validation("Friend ID must be an integer"))?,
        };
        // ids start at 1; zero counts as absent
        if friend_id == 0 {
            return Err(ServerError::validation("Friend ID is required"));
        }
        if friend_id == user_id {
            return Err(ServerError::validation(
                "User cannot be friends with themselves",
            ));
        }
        Ok(friend_id)
    }
}

/// Body of the bulk replace route. `friends` stays untyped so a non-array
/// value can be reported with its own message instead of a decode failure.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct FriendsPayload {
    pub friends: Option<serde_json::Value>,
}

impl FriendsPayload {
    pub fn validate(self, user_id: i64) -> Result<Vec<i64>, ServerError> {
        let not_an_array = || ServerError::validation("Friends should be an array of user IDs");
        let items = match self.friends {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Err(not_an_array()),
        };
        let friend_ids = items
            .iter()
            .map(|item| item.as_i64().ok_or_else(not_an_array))
            .collect::<Result<Vec<_>, _>>()?;
        if friend_ids.contains(&user_id) {
            return Err(ServerError::validation(
                "User cannot be friends with themselves",
            ));
        }
        Ok(friend_ids)
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FriendAdded {
    pub message: &'static str,
    pub friendship_id: i64,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub message: &'static str,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, DbError>;
    async fn create_user(&self, user: NewUser) -> Result<User, DbError>;
    async fn get_user(&self, id: i64) -> Result<User, DbError>;
    async fn update_user(&self, id: i64, user: NewUser) -> Result<User, DbError>;
    async fn delete_user(&self, id: i64) -> Result<(), DbError>;
}

#[async_trait]
pub trait FriendRepository: Send + Sync {
    /// Inserts the edge `(user_id, friend_id)` and returns its id.
    async fn add_friend(&self, user_id: i64, friend_id: i64) -> Result<i64, DbError>;
    async fn list_friends(&self, user_id: i64) -> Result<Vec<User>, DbError>;
    /// Replaces every outgoing edge of `user_id` in a single transaction.
    /// Nothing changes if any insert fails.
    async fn replace_friends(&self, user_id: i64, friend_ids: Vec<i64>) -> Result<(), DbError>;
    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> Result<(), DbError>;
}

/// Everything the routes need from storage.
pub trait Database: UserRepository + FriendRepository {}

impl<T> Database for T where T: UserRepository + FriendRepository {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_payload_requires_both_fields() {
        let payload = UserPayload {
            name: Some("John Doe".to_string()),
            age: None,
        };
        assert_eq!(
            payload.validate(),
            Err(ServerError::validation("Name and age are required"))
        );
        let payload = UserPayload {
            name: None,
            age: Some(30),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_user_payload_rejects_blank_name_and_bad_age() {
        assert!(NewUser::new("   ", 30).is_err());
        assert_eq!(
            NewUser::new("John Doe", 0),
            Err(ServerError::validation("Age must be a positive integer"))
        );
        assert!(NewUser::new("John Doe", -4).is_err());
    }

    #[test]
    fn test_user_payload_accepts_valid_input() {
        let user = UserPayload {
            name: Some("John Doe".to_string()),
            age: Some(30),
        }
        .validate()
        .unwrap();
        assert_eq!(user.name(), "John Doe");
        assert_eq!(user.age(), 30);
        assert_eq!(
            user.with_id(7),
            User {
                id: 7,
                name: "John Doe".to_string(),
                age: 30
            }
        );
    }

    #[test]
    fn test_friend_payload_rejects_self() {
        let payload: FriendPayload = serde_json::from_value(json!({ "friendId": 3 })).unwrap();
        assert_eq!(
            payload.validate(3),
            Err(ServerError::validation("User cannot be friends with themselves"))
        );
        assert_eq!(
            FriendPayload::default().validate(3),
            Err(ServerError::validation("Friend ID is required"))
        );
        let payload: FriendPayload = serde_json::from_value(json!({ "friendId": 4 })).unwrap();
        assert_eq!(payload.validate(3), Ok(4));
    }

    #[test]
    fn test_friend_payload_zero_counts_as_missing() {
        for body in [json!({ "friendId": 0 }), json!({ "friendId": null })] {
            let payload: FriendPayload = serde_json::from_value(body).unwrap();
            assert_eq!(
                payload.validate(3),
                Err(ServerError::validation("Friend ID is required"))
            );
        }
    }

    #[test]
    fn test_friend_payload_wrong_type() {
        for body in [json!({ "friendId": "2" }), json!({ "friendId": 2.5 })] {
            let payload: FriendPayload = serde_json::from_value(body).unwrap();
            assert_eq!(
                payload.validate(3),
                Err(ServerError::validation("Friend ID must be an integer"))
            );
        }
    }

    #[test]
    fn test_friends_payload_requires_integer_array() {
        let not_an_array = Err(ServerError::validation("Friends should be an array of user IDs"));
        for body in [json!({}), json!({ "friends": 2 }), json!({ "friends": [1, "2"] })] {
            let payload: FriendsPayload = serde_json::from_value(body).unwrap();
            assert_eq!(payload.validate(1), not_an_array);
        }
    }

    #[test]
    fn test_friends_payload_keeps_order_and_duplicates() {
        let payload: FriendsPayload =
            serde_json::from_value(json!({ "friends": [5, 2, 5] })).unwrap();
        assert_eq!(payload.validate(1), Ok(vec![5, 2, 5]));

        let payload: FriendsPayload = serde_json::from_value(json!({ "friends": [] })).unwrap();
        assert_eq!(payload.validate(1), Ok(vec![]));

        let payload: FriendsPayload =
            serde_json::from_value(json!({ "friends": [2, 1] })).unwrap();
        assert!(payload.validate(1).is_err());
    }

    #[test]
    fn test_friend_added_serializes_camel_case() {
        let body = serde_json::to_value(FriendAdded {
            message: "Friend added successfully",
            friendship_id: 9,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({ "message": "Friend added successfully", "friendshipId": 9 })
        );
    }
}

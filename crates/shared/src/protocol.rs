use serde::{Deserialize, Serialize};

use crate::{
    domain::Item,
    error::{ApiException, ErrorCode},
};

pub const LIST_ITEMS_QUERY: &str = "query ListTodos($limit: Int, $nextToken: String) {
  listTodos(limit: $limit, nextToken: $nextToken) {
    items { id name description completed createdAt updatedAt }
    nextToken
  }
}";

pub const CREATE_ITEM_MUTATION: &str = "mutation CreateTodo($input: CreateTodoInput!) {
  createTodo(input: $input) { id name description completed createdAt updatedAt }
}";

pub const UPDATE_ITEM_MUTATION: &str = "mutation UpdateTodo($input: UpdateTodoInput!) {
  updateTodo(input: $input) { id name description completed createdAt updatedAt }
}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlRequest<V> {
    pub query: String,
    pub variables: V,
}

impl<V> GraphqlRequest<V> {
    pub fn new(query: &str, variables: V) -> Self {
        Self {
            query: query.to_string(),
            variables,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsVariables {
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputVariables<T> {
    pub input: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConnection {
    /// The list type allows `null` entries; they carry no item.
    pub items: Vec<Option<Item>>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsData {
    pub list_todos: ItemConnection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemData {
    pub create_todo: Item,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemData {
    pub update_todo: Item,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl<T> GraphqlResponse<T> {
    /// Any reported error wins over partial data.
    pub fn into_result(self) -> Result<T, ApiException> {
        if let Some(first) = self.errors.first() {
            let code = ErrorCode::from_error_type(first.error_type.as_deref());
            let message = self
                .errors
                .iter()
                .map(|err| err.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiException::new(code, message));
        }

        self.data
            .ok_or_else(|| ApiException::new(ErrorCode::Internal, "response carried no data"))
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Item, ItemPatch, NewItem},
    protocol::{
        CreateItemData, GraphqlRequest, GraphqlResponse, InputVariables, ListItemsData,
        ListItemsVariables, UpdateItemData, CREATE_ITEM_MUTATION, LIST_ITEMS_QUERY,
        UPDATE_ITEM_MUTATION,
    },
};
use tracing::debug;
use url::Url;

use crate::config::Settings;

const API_KEY_HEADER: &str = "x-api-key";
/// Guards against a backend that keeps handing out the same page token.
const MAX_LIST_PAGES: usize = 1_000;

/// The backend's query/mutation surface as seen by the store.
#[async_trait]
pub trait ItemGateway: Send + Sync {
    async fn list_items(&self) -> Result<Vec<Item>>;
    async fn create_item(&self, input: NewItem) -> Result<Item>;
    async fn update_item(&self, patch: ItemPatch) -> Result<Item>;
}

/// GraphQL-over-HTTP gateway speaking the generated `listTodos` /
/// `createTodo` / `updateTodo` operations.
pub struct GraphqlItemGateway {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
    auth_token: Option<String>,
    page_size: u32,
}

impl GraphqlItemGateway {
    pub fn new(settings: &Settings) -> Result<Self> {
        let endpoint = Url::parse(&settings.endpoint)
            .with_context(|| format!("invalid gateway endpoint '{}'", settings.endpoint))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            endpoint,
            api_key: settings.api_key.clone(),
            auth_token: settings.auth_token.clone(),
            page_size: settings.page_size.max(1),
        })
    }

    async fn execute<V, T>(&self, operation: &str, query: &str, variables: V) -> Result<T>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .json(&GraphqlRequest::new(query, variables));
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }
        if let Some(token) = &self.auth_token {
            request = request.header(AUTHORIZATION, token);
        }

        let response: GraphqlResponse<T> = request
            .send()
            .await
            .with_context(|| format!("{operation} request failed"))?
            .error_for_status()
            .with_context(|| format!("{operation} rejected by backend"))?
            .json()
            .await
            .with_context(|| format!("{operation} returned an unreadable body"))?;

        response
            .into_result()
            .with_context(|| format!("{operation} returned errors"))
    }
}

#[async_trait]
impl ItemGateway for GraphqlItemGateway {
    async fn list_items(&self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut next_token = None;

        for page in 1..=MAX_LIST_PAGES {
            let data: ListItemsData = self
                .execute(
                    "listTodos",
                    LIST_ITEMS_QUERY,
                    ListItemsVariables {
                        limit: self.page_size,
                        next_token: next_token.take(),
                    },
                )
                .await?;
            let connection = data.list_todos;
            debug!(
                page,
                count = connection.items.len(),
                "gateway: fetched item page"
            );
            items.extend(connection.items.into_iter().flatten());

            match connection.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(items),
            }
        }

        Err(anyhow!(
            "listTodos did not finish after {MAX_LIST_PAGES} pages"
        ))
    }

    async fn create_item(&self, input: NewItem) -> Result<Item> {
        let data: CreateItemData = self
            .execute("createTodo", CREATE_ITEM_MUTATION, InputVariables { input })
            .await?;
        let item = data.create_todo;
        if item.id.is_none() {
            return Err(anyhow!("createTodo returned an item without an id"));
        }
        Ok(item)
    }

    async fn update_item(&self, patch: ItemPatch) -> Result<Item> {
        let expected_id = patch.id.clone();
        let data: UpdateItemData = self
            .execute(
                "updateTodo",
                UPDATE_ITEM_MUTATION,
                InputVariables { input: patch },
            )
            .await?;
        let item = data.update_todo;
        if !item.has_id(&expected_id) {
            return Err(anyhow!(
                "updateTodo returned mismatched item for {expected_id}"
            ));
        }
        Ok(item)
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;

//! Supabase-backed remote store.
//!
//! Talks to PostgREST at `{supabase_url}/rest/v1` with the project's anon key
//! and the signed-in user's bearer token. Failures are split into `Network`
//! (retry later) and `Rejected` (the server said no).

mod rows;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::{
    is_transient_status, parse_api_error, AuthSession, SessionPersistence, SupabaseAuthClient,
};
use crate::config::SupabaseConfig;
use crate::error::{Error, Result};
use crate::models::{
    normalize_category_name, validate_pairs, Category, CategoryId, CategoryUpdate, LanguagePair,
    NewWordPair, WordId, WordPair,
};
use crate::store::FlashcardStore;
use rows::{category_update_body, new_category_body, new_word_body, CategoryRow, WordRow};

const HTTP_TIMEOUT_SECS: u64 = 20;
const PROBE_TIMEOUT_SECS: u64 = 5;
const CATEGORY_SELECT: &str = "*,words(count)";

/// Build the HTTP client shared by auth and data requests.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|error| Error::Network(format!("failed to build HTTP client: {error}")))
}

struct Remote<S: SessionPersistence> {
    rest_url: String,
    anon_key: String,
    client: Client,
    auth: SupabaseAuthClient<S>,
    session: Mutex<Option<AuthSession>>,
}

/// [`FlashcardStore`] over Supabase. Unconfigured stores never touch the network.
#[derive(Clone)]
pub struct SupabaseStore<S: SessionPersistence> {
    remote: Option<Arc<Remote<S>>>,
}

impl<S: SessionPersistence> SupabaseStore<S> {
    pub fn new(config: &SupabaseConfig, sessions: S) -> Result<Self> {
        let client = http_client()?;
        let auth = SupabaseAuthClient::new(config, client.clone(), sessions);
        Ok(Self {
            remote: Some(Arc::new(Remote {
                rest_url: config.rest_url(),
                anon_key: config.anon_key.clone(),
                client,
                auth,
                session: Mutex::new(None),
            })),
        })
    }

    /// A store with no Supabase project behind it
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self { remote: None }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.remote.is_some()
    }

    /// Auth client for sign-in flows, `None` when unconfigured
    pub fn auth(&self) -> Option<&SupabaseAuthClient<S>> {
        self.remote.as_deref().map(|remote| &remote.auth)
    }

    /// Cheap handle for connectivity checks that can move into another task
    #[must_use]
    pub fn probe(&self) -> Option<ReachabilityProbe> {
        self.remote.as_deref().map(|remote| ReachabilityProbe {
            rest_url: remote.rest_url.clone(),
            anon_key: remote.anon_key.clone(),
            client: remote.client.clone(),
        })
    }

    pub async fn is_reachable(&self) -> bool {
        match self.probe() {
            Some(probe) => probe.is_reachable().await,
            None => false,
        }
    }

    fn remote(&self) -> Result<&Remote<S>> {
        self.remote
            .as_deref()
            .ok_or_else(|| Error::Rejected("Supabase is not configured".to_string()))
    }

    /// Current session, restoring or refreshing it when needed.
    async fn session(&self) -> Result<AuthSession> {
        let remote = self.remote()?;
        let cached = remote
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(session) = cached.filter(|session| !session.is_expired()) {
            return Ok(session);
        }

        let restored = remote.auth.restore_session().await?;
        let session =
            restored.ok_or_else(|| Error::Rejected("not signed in to Supabase".to_string()))?;
        *remote
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(session)
    }

    async fn request(&self, method: Method, table: &str) -> Result<(RequestBuilder, AuthSession)> {
        let session = self.session().await?;
        let remote = self.remote()?;
        let request = remote
            .client
            .request(method, format!("{}/{table}", remote.rest_url))
            .header("apikey", &remote.anon_key)
            .bearer_auth(&session.access_token);
        Ok((request, session))
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|error| Error::Rejected(format!("unexpected response from Supabase: {error}")))
    }

    async fn fetch_one<T: DeserializeOwned>(request: RequestBuilder, what: String) -> Result<T> {
        let rows: Vec<T> = Self::fetch(request).await?;
        rows.into_iter().next().ok_or(Error::NotFound(what))
    }

    async fn fetch_categories(&self, filter: Option<&CategoryId>) -> Result<Vec<Category>> {
        let (request, _) = self.request(Method::GET, "categories").await?;
        let mut query = vec![
            ("select", CATEGORY_SELECT.to_string()),
            ("order", "created_at.asc".to_string()),
        ];
        if let Some(id) = filter {
            query.push(("id", format!("eq.{id}")));
        }
        let rows: Vec<CategoryRow> = Self::fetch(request.query(&query)).await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn delete_where(&self, table: &str, column: &str, value: &str) -> Result<()> {
        let (request, _) = self.request(Method::DELETE, table).await?;
        send(request.query(&[(column, format!("eq.{value}"))])).await?;
        Ok(())
    }
}

/// Map a finished request to the error taxonomy.
async fn send(request: RequestBuilder) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|error| Error::Network(format!("Supabase request failed: {error}")))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let message = parse_api_error(status, body);
    if is_transient_status(status.as_u16()) {
        Error::Network(message)
    } else {
        Error::Rejected(message)
    }
}

fn prefer_representation(request: RequestBuilder) -> RequestBuilder {
    request.header("Prefer", "return=representation")
}

impl<S: SessionPersistence> FlashcardStore for SupabaseStore<S> {
    async fn init(&self) -> Result<bool> {
        let Some(remote) = self.remote.as_deref() else {
            return Ok(false);
        };
        let restored = remote.auth.restore_session().await?;
        let signed_in = restored.is_some();
        *remote
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = restored;
        tracing::debug!("Supabase session present: {signed_in}");
        Ok(signed_in)
    }

    async fn add_category(
        &self,
        name: &str,
        description: &str,
        language_pair: &LanguagePair,
    ) -> Result<Category> {
        let name = normalize_category_name(name)?;
        let (request, session) = self.request(Method::POST, "categories").await?;
        let body = new_category_body(&session.user.id, &name, description.trim(), language_pair);
        let row: CategoryRow =
            Self::fetch_one(prefer_representation(request).json(&body), "inserted category".into())
                .await?;
        Ok(row.into())
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>> {
        self.fetch_categories(None).await
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Category> {
        self.fetch_categories(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("category {id}")))
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let update = update.normalized()?;
        let (request, _) = self.request(Method::PATCH, "categories").await?;
        let body = category_update_body(&update, &Utc::now().to_rfc3339());
        let request = prefer_representation(request)
            .query(&[("id", format!("eq.{id}"))])
            .json(&body);
        let row: CategoryRow = Self::fetch_one(request, format!("category {id}")).await?;
        let mut category = Category::from(row);
        // PATCH responses carry no aggregate.
        category.word_count = self.recompute_word_count(id).await?;
        Ok(category)
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        self.delete_where("categories", "id", id.as_str()).await
    }

    async fn add_word(&self, category_id: &CategoryId, pair: &NewWordPair) -> Result<WordPair> {
        let pair = pair.validate()?;
        let (request, session) = self.request(Method::POST, "words").await?;
        let body = new_word_body(&session.user.id, category_id, &pair);
        let row: WordRow =
            Self::fetch_one(prefer_representation(request).json(&body), "inserted word".into())
                .await?;
        Ok(row.into())
    }

    async fn get_word(&self, id: &WordId) -> Result<WordPair> {
        let (request, _) = self.request(Method::GET, "words").await?;
        let request = request.query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        let row: WordRow = Self::fetch_one(request, format!("word {id}")).await?;
        Ok(row.into())
    }

    async fn get_words_by_category(&self, category_id: &CategoryId) -> Result<Vec<WordPair>> {
        let (request, _) = self.request(Method::GET, "words").await?;
        let request = request.query(&[
            ("select", "*".to_string()),
            ("category_id", format!("eq.{category_id}")),
            ("order", "created_at.asc".to_string()),
        ]);
        let rows: Vec<WordRow> = Self::fetch(request).await?;
        Ok(rows.into_iter().map(WordPair::from).collect())
    }

    async fn import_words_to_category(
        &self,
        category_id: &CategoryId,
        pairs: &[NewWordPair],
    ) -> Result<usize> {
        let pairs = validate_pairs(pairs)?;
        if pairs.is_empty() {
            return Ok(0);
        }
        let (request, session) = self.request(Method::POST, "words").await?;
        let body: Vec<Value> = pairs
            .iter()
            .map(|pair| new_word_body(&session.user.id, category_id, pair))
            .collect();
        let rows: Vec<WordRow> = Self::fetch(prefer_representation(request).json(&body)).await?;
        Ok(rows.len())
    }

    async fn delete_word(&self, id: &WordId) -> Result<()> {
        self.delete_where("words", "id", id.as_str()).await
    }

    async fn delete_words_by_category(&self, category_id: &CategoryId) -> Result<()> {
        self.delete_where("words", "category_id", category_id.as_str())
            .await
    }

    /// Counts are aggregated server-side; this only reads the current total.
    async fn recompute_word_count(&self, category_id: &CategoryId) -> Result<usize> {
        let (request, _) = self.request(Method::GET, "words").await?;
        let request = request.query(&[
            ("select", "id".to_string()),
            ("category_id", format!("eq.{category_id}")),
        ]);
        let rows: Vec<Value> = Self::fetch(request).await?;
        Ok(rows.len())
    }

    async fn clear_all_data(&self) -> Result<()> {
        let session = self.session().await?;
        // Words follow through the foreign key cascade.
        self.delete_where("categories", "user_id", &session.user.id)
            .await
    }
}

/// Lightweight connectivity check against the REST endpoint.
#[derive(Clone)]
pub struct ReachabilityProbe {
    rest_url: String,
    anon_key: String,
    client: Client,
}

impl ReachabilityProbe {
    /// Whether the server answered at all. Any HTTP status counts as reachable.
    pub async fn is_reachable(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/", self.rest_url))
            .header("apikey", &self.anon_key)
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .send()
            .await;
        match result {
            Ok(response) => !is_transient_status(response.status().as_u16()),
            Err(error) => {
                tracing::debug!("Supabase unreachable: {error}");
                false
            }
        }
    }
}

use std::{sync::Arc, time::Duration};

use api_types::{
    Data, MonthKey,
    account::{Account, AccountCreate, AccountNew, BalanceQuery},
    budget::{BudgetCategoryGroup, BudgetMonth},
    category::{Category, CategoryGroup},
    payee::Payee,
    transaction::{Transaction, TransactionCreate, TransactionQuery, TransactionUpdate},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{
    Method, RequestBuilder, Url,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;

use crate::{
    BudgetApi, Settings,
    error::{ClientError, Result},
    log::DiagnosticLog,
};

const API_KEY_HEADER: &str = "x-api-key";
const ENCRYPTION_HEADER: &str = "budget-encryption-password";

/// Response bodies are cut to this many bytes before they are logged.
pub const BODY_LOG_LIMIT: usize = 4096;

/// Control flags sent alongside every created transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateFlags {
    pub learn_categories: bool,
    pub run_transfers: bool,
}

impl Default for CreateFlags {
    fn default() -> Self {
        Self {
            learn_categories: false,
            run_transfers: true,
        }
    }
}

/// [`BudgetApi`] over the budget server's REST API.
#[derive(Clone)]
pub struct LiveClient {
    base_url: Url,
    sync_id: String,
    http: reqwest::Client,
    log: Arc<DiagnosticLog>,
    create_flags: CreateFlags,
}

struct Reply {
    method: Method,
    path: String,
    body: String,
}

impl LiveClient {
    /// Validates the connection settings; nothing is sent until the first call.
    pub fn new(settings: &Settings, log: Arc<DiagnosticLog>) -> Result<Self> {
        let base_url = parse_base_url(&settings.base_url)?;

        let api_key = settings.api_key.trim();
        if api_key.is_empty() {
            return Err(ClientError::Configuration("API key is not set".to_string()));
        }
        let sync_id = settings.sync_id.trim();
        if sync_id.is_empty() {
            return Err(ClientError::Configuration("sync id is not set".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(API_KEY_HEADER), sensitive(api_key, "API key")?);
        if let Some(password) = settings.encryption_password() {
            headers.insert(
                HeaderName::from_static(ENCRYPTION_HEADER),
                sensitive(password, "encryption password")?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .map_err(ClientError::transport)?;

        Ok(Self {
            base_url,
            sync_id: sync_id.to_string(),
            http,
            log,
            create_flags: CreateFlags::default(),
        })
    }

    pub fn with_create_flags(mut self, flags: CreateFlags) -> Self {
        self.create_flags = flags;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Cannot fail: cannot-be-a-base URLs are rejected in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v1", "budgets", self.sync_id.as_str()])
                .extend(segments);
        }
        url
    }

    /// Request path relative to the configured server, query included.
    fn display_path(&self, url: &Url) -> String {
        let prefix = self.base_url.path().trim_end_matches('/');
        let path = url.path().strip_prefix(prefix).unwrap_or(url.path());
        match url.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Reply> {
        let request = builder.build().map_err(ClientError::transport)?;
        let method = request.method().clone();
        let path = self.display_path(request.url());

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(err) => return Err(self.transport_failure(&method, &path, err)),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return Err(self.transport_failure(&method, &path, err)),
        };

        if !status.is_success() {
            let body = truncate(&self.log.redactor().redact(&body), BODY_LOG_LIMIT);
            self.log.error(
                "live.http",
                &format!("{method} {path} returned {status}"),
                [
                    ("method", method.to_string()),
                    ("path", path),
                    ("status", status.as_u16().to_string()),
                    ("body", body.clone()),
                ],
            );
            return Err(ClientError::Http { status, body });
        }

        tracing::debug!(%method, %path, %status, "request completed");
        Ok(Reply { method, path, body })
    }

    fn transport_failure(&self, method: &Method, path: &str, err: reqwest::Error) -> ClientError {
        let err = ClientError::transport(err);
        self.log.error(
            "live.transport",
            &format!("{method} {path} failed"),
            [
                ("method", method.to_string()),
                ("path", path.to_string()),
                ("error", err.to_string()),
            ],
        );
        err
    }

    fn decode<T: DeserializeOwned>(&self, reply: Reply) -> Result<T> {
        match serde_json::from_str::<Data<T>>(&reply.body) {
            Ok(envelope) => Ok(envelope.data),
            Err(err) => {
                // serde quotes offending values, which may include the server URL.
                let redactor = self.log.redactor();
                let message = redactor.redact(&err.to_string());
                self.log.error(
                    "live.decode",
                    &format!("could not decode {} {}", reply.method, reply.path),
                    [
                        ("method", reply.method.to_string()),
                        ("path", reply.path.clone()),
                        ("error", message.clone()),
                        ("body", truncate(&redactor.redact(&reply.body), BODY_LOG_LIMIT)),
                    ],
                );
                Err(ClientError::Decode {
                    path: reply.path,
                    message,
                })
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let reply = self.dispatch(self.http.get(self.endpoint(segments))).await?;
        self.decode(reply)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<()> {
        self.dispatch(builder).await.map(drop)
    }
}

#[async_trait]
impl BudgetApi for LiveClient {
    async fn fetch_accounts(&self) -> Result<Vec<Account>> {
        self.get(&["accounts"]).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>> {
        self.get(&["categories"]).await
    }

    async fn fetch_category_groups(&self) -> Result<Vec<CategoryGroup>> {
        self.get(&["categorygroups"]).await
    }

    async fn fetch_payees(&self) -> Result<Vec<Payee>> {
        self.get(&["payees"]).await
    }

    async fn fetch_transactions(
        &self,
        account_id: &str,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>> {
        let url = self.endpoint(&["accounts", account_id, "transactions"]);
        let reply = self.dispatch(self.http.get(url).query(&query)).await?;
        self.decode(reply)
    }

    async fn fetch_account_balance(
        &self,
        account_id: &str,
        cutoff: Option<NaiveDate>,
    ) -> Result<i64> {
        let url = self.endpoint(&["accounts", account_id, "balance"]);
        let query = BalanceQuery {
            cutoff_date: cutoff,
        };
        let reply = self.dispatch(self.http.get(url).query(&query)).await?;
        self.decode(reply)
    }

    async fn create_transaction(&self, account_id: &str, transaction: &Transaction) -> Result<()> {
        let body = TransactionCreate {
            learn_categories: self.create_flags.learn_categories,
            run_transfers: self.create_flags.run_transfers,
            transaction: transaction.clone(),
        };
        let url = self.endpoint(&["accounts", account_id, "transactions"]);
        self.send(self.http.post(url).json(&body)).await
    }

    async fn update_transaction(&self, id: &str, transaction: &Transaction) -> Result<()> {
        let body = TransactionUpdate {
            transaction: transaction.clone(),
        };
        let url = self.endpoint(&["transactions", id]);
        self.send(self.http.patch(url).json(&body)).await
    }

    async fn delete_transaction(&self, id: &str) -> Result<()> {
        self.send(self.http.delete(self.endpoint(&["transactions", id])))
            .await
    }

    async fn fetch_budget_month(&self, month: MonthKey) -> Result<BudgetMonth> {
        self.get(&["months", &month.to_string()]).await
    }

    async fn fetch_budget_category_groups(
        &self,
        month: MonthKey,
    ) -> Result<Vec<BudgetCategoryGroup>> {
        self.get(&["months", &month.to_string(), "categorygroups"])
            .await
    }

    async fn create_account(&self, name: &str, offbudget: bool) -> Result<String> {
        let body = AccountCreate {
            account: AccountNew {
                name: name.to_string(),
                offbudget,
            },
        };
        let url = self.endpoint(&["accounts"]);
        let reply = self.dispatch(self.http.post(url).json(&body)).await?;
        self.decode(reply)
    }

    async fn close_account(&self, id: &str) -> Result<()> {
        self.send(self.http.put(self.endpoint(&["accounts", id, "close"])))
            .await
    }

    async fn reopen_account(&self, id: &str) -> Result<()> {
        self.send(self.http.put(self.endpoint(&["accounts", id, "reopen"])))
            .await
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        self.send(self.http.delete(self.endpoint(&["accounts", id])))
            .await
    }

    async fn bank_sync(&self, account_id: Option<&str>) -> Result<()> {
        let url = match account_id {
            Some(id) => self.endpoint(&["accounts", id, "banksync"]),
            None => self.endpoint(&["accounts", "banksync"]),
        };
        self.send(self.http.post(url)).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ClientError::Configuration(
            "server URL is not set".to_string(),
        ));
    }
    let mut url = Url::parse(raw)
        .map_err(|err| ClientError::Configuration(format!("invalid server URL: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Configuration(format!(
            "unsupported server URL scheme: {}",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() {
        return Err(ClientError::Configuration(
            "server URL cannot be used as a base".to_string(),
        ));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn sensitive(value: &str, what: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| ClientError::Configuration(format!("{what} is not a valid header value")))?;
    value.set_sensitive(true);
    Ok(value)
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

//! # Shared Template Blocks
//!
//! Source blocks every generated MongoDB module carries: the error enum, the connection
//! config, the connection manager and the query helpers. Each generated module is
//! self-contained, so these are rendered into every output rather than shared at runtime.

/// Imports for modules that implement the full CRUD surface.
pub const CRUD_IMPORTS: &str = r##"use std::future::Future;
use std::time::Duration;

use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::options::{
    ClientOptions, Credential, DatabaseOptions, FindOptions, ReadConcern, ReadPreference,
    SelectionCriteria, ServerAddress,
};
use mongodb::{Client, Collection, Database, IndexModel};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
"##;

/// Imports for the base module, which has no record type.
pub const BASE_IMPORTS: &str = r##"use std::future::Future;
use std::time::Duration;

use mongodb::bson::{doc, Document};
use mongodb::options::{
    ClientOptions, Credential, DatabaseOptions, ReadConcern, ReadPreference, SelectionCriteria,
    ServerAddress,
};
use mongodb::{Client, Collection, Database, IndexModel};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
"##;

/// Error enum of a generated module.
pub const ERRORS: &str = r##"
/// Errors returned by this module.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No record matched the query.
    #[error("record not found")]
    NotFound,
    /// The caller cancelled the operation before it started.
    #[error("context has expired")]
    ExpiredContext,
    /// The connection configuration is incomplete.
    #[error("invalid config: {0}")]
    Config(String),
    /// The record failed its own validation.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Error reported by the MongoDB driver.
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    /// A field could not be encoded as BSON.
    #[error(transparent)]
    Encode(#[from] mongodb::bson::ser::Error),
}
"##;

/// Connection settings of a generated module.
pub const CONFIG: &str = r##"
/// Settings used to reach MongoDB.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Database holding the collection.
    pub db: String,
    /// Database the credentials authenticate against.
    #[serde(rename = "authdb")]
    pub auth_db: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
    /// `host:port` of the server.
    pub host: String,
}

impl Config {
    /// Reads `{prefix}_DB`, `{prefix}_AUTHDB`, `{prefix}_USER`, `{prefix}_PASSWORD` and
    /// `{prefix}_HOST`. Unset variables stay empty.
    pub fn from_env(prefix: &str) -> Self {
        let var = |name: &str| std::env::var(format!("{}_{}", prefix, name)).unwrap_or_default();
        Self {
            db: var("DB"),
            auth_db: var("AUTHDB"),
            user: var("USER"),
            password: var("PASSWORD"),
            host: var("HOST"),
        }
    }

    /// Returns true if every value is unset.
    pub fn is_empty(&self) -> bool {
        self.auth_db.is_empty()
            && self.db.is_empty()
            && self.user.is_empty()
            && self.password.is_empty()
            && self.host.is_empty()
    }

    /// Returns an error naming the first missing value.
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("user", &self.user),
            ("password", &self.password),
            ("auth_db", &self.auth_db),
            ("host", &self.host),
            ("db", &self.db),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(Error::Config(format!("Config.{} is required", name)));
            }
        }
        Ok(())
    }
}
"##;

/// Connection manager of a generated module.
pub const CONNECTION: &str = r##"
/// Hands out database handles for read or write work.
#[allow(async_fn_in_trait)]
pub trait MongoDb {
    /// Returns a database handle.
    ///
    /// Read handles (`is_read`) carry their own read preference and read concern so large
    /// queries are independent of write settings. Write handles reuse the master client's
    /// pooled connection as is.
    async fn database(&self, is_read: bool) -> Result<Database, Error>;
}

/// Default [`MongoDb`] implementation over a single master client.
pub struct MongoConnection {
    config: Config,
    master: Mutex<Option<Client>>,
}

impl MongoConnection {
    /// Creates a connection manager. Nothing is dialled until the first handle is requested.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            master: Mutex::new(None),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl MongoDb for MongoConnection {
    async fn database(&self, is_read: bool) -> Result<Database, Error> {
        let mut master = self.master.lock().await;

        if let Some(client) = master.as_ref() {
            let ping = client
                .database("admin")
                .run_command(doc! { "ping": 1 }, None)
                .await;
            if let Err(err) = ping {
                tracing::warn!(host = %self.config.host, error = %err, "master session lost, redialling");
                *master = None;
            }
        }

        let client = match master.as_ref() {
            Some(client) => client.clone(),
            None => {
                let client = dial(&self.config)?;
                *master = Some(client.clone());
                client
            }
        };

        if is_read {
            let options = DatabaseOptions::builder()
                .selection_criteria(SelectionCriteria::ReadPreference(ReadPreference::Primary))
                .read_concern(ReadConcern::majority())
                .build();
            return Ok(client.database_with_options(&self.config.db, options));
        }

        Ok(client.database(&self.config.db))
    }
}

/// Builds a client for `config`. The driver connects lazily on first use.
fn dial(config: &Config) -> Result<Client, Error> {
    config.validate()?;

    let credential = Credential::builder()
        .username(config.user.clone())
        .password(config.password.clone())
        .source(config.auth_db.clone())
        .build();

    let options = ClientOptions::builder()
        .hosts(vec![ServerAddress::parse(&config.host)?])
        .credential(credential)
        .connect_timeout(Duration::from_secs(60))
        .build();

    Ok(Client::with_options(options)?)
}

/// Fails with [`Error::ExpiredContext`] once `cx` has been cancelled.
fn check_context(cx: &CancellationToken, collection: &str, op: &'static str) -> Result<(), Error> {
    if cx.is_cancelled() {
        tracing::error!(collection, op, error = %Error::ExpiredContext, "Failed to start operation");
        return Err(Error::ExpiredContext);
    }
    Ok(())
}
"##;

/// Count and exec, shared by the function and base modules.
pub const COUNT_AND_EXEC_FUNCS: &str = r##"
/// Applies `indexes` to collection `col`.
pub async fn add_index<M: MongoDb>(db: &M, col: &str, indexes: &[IndexModel]) -> Result<(), Error> {
    if indexes.is_empty() {
        return Ok(());
    }

    let database = db.database(false).await.map_err(|err| {
        tracing::error!(collection = col, error = %err, "Failed to create session for index");
        err
    })?;
    let collection = database.collection::<Document>(col);

    for index in indexes {
        if let Err(err) = collection.create_index(index.clone(), None).await {
            tracing::error!(collection = col, index = ?index.keys, error = %err, "Failed to ensure collection index");
            return Err(err.into());
        }
        tracing::info!(collection = col, index = ?index.keys, "Succeeded in ensuring collection index");
    }

    tracing::info!(collection = col, "Finished adding index");
    Ok(())
}

/// Returns the total number of records in collection `col`.
pub async fn count<M: MongoDb>(cx: &CancellationToken, db: &M, col: &str) -> Result<u64, Error> {
    let database = open(cx, db, col, "count", true).await?;
    let total = database
        .collection::<Document>(col)
        .count_documents(doc! {}, None)
        .await
        .map_err(|err| {
            tracing::error!(collection = col, error = %err, "Failed to get record count");
            Error::from(err)
        })?;
    tracing::debug!(collection = col, total, "Counted records");
    Ok(total)
}

/// Runs `fx` against collection `col` with a read or write handle.
pub async fn exec<M, F, Fut>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    is_read: bool,
    fx: F,
) -> Result<(), Error>
where
    M: MongoDb,
    F: FnOnce(Collection<Document>) -> Fut,
    Fut: Future<Output = Result<(), Error>>,
{
    let database = open(cx, db, col, "exec", is_read).await?;
    fx(database.collection::<Document>(col)).await.map_err(|err| {
        tracing::error!(collection = col, error = %err, "Failed to execute operation");
        err
    })?;
    tracing::info!(collection = col, "Operation executed");
    Ok(())
}

/// Checks cancellation and opens a handle.
async fn open<M: MongoDb>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    op: &'static str,
    is_read: bool,
) -> Result<Database, Error> {
    check_context(cx, col, op)?;
    db.database(is_read).await.map_err(|err| {
        tracing::error!(collection = col, op, error = %err, "Failed to create session");
        err
    })
}
"##;

/// Sorting and paging helpers of modules that list records.
pub const QUERY_HELPERS: &str = r##"
/// Builds the sort document: `desc`/`dsc` sorts descending on `order_by`, anything else
/// ascending. An empty `order_by` leaves the natural order.
fn sort_by(order: &str, order_by: &str) -> Document {
    let mut sort = Document::new();
    if order_by.is_empty() {
        return sort;
    }
    let direction = match order.to_lowercase().as_str() {
        "dsc" | "desc" => -1,
        _ => 1,
    };
    sort.insert(order_by, direction);
    sort
}

/// Returns `(skip, limit)` for a one-based `page` of `per_page` records. The skip
/// saturates instead of overflowing on huge page numbers.
fn page_window(page: i64, per_page: i64) -> (u64, i64) {
    let per_page = per_page.max(0);
    let skip = if page > 1 { (page - 1).saturating_mul(per_page) } else { 0 };
    (skip as u64, per_page)
}
"##;

/// Query helpers test module appended to generated test files.
pub const QUERY_HELPER_TESTS: &str = r##"
#[test]
fn test_sort_by_direction() {
    assert_eq!(sort_by("desc", "name"), mongodb::bson::doc! { "name": -1 });
    assert_eq!(sort_by("DSC", "name"), mongodb::bson::doc! { "name": -1 });
    assert_eq!(sort_by("asc", "name"), mongodb::bson::doc! { "name": 1 });
    assert!(sort_by("asc", "").is_empty());
}

#[test]
fn test_page_window() {
    assert_eq!(page_window(0, 10), (0, 10));
    assert_eq!(page_window(1, 10), (0, 10));
    assert_eq!(page_window(2, 10), (10, 10));
    assert_eq!(page_window(5, 25), (100, 25));
    assert_eq!(page_window(3, -4), (0, 0));
    assert_eq!(page_window(i64::MAX, 10), (i64::MAX as u64, 10));
    assert_eq!(page_window(i64::MAX / 2, 10).0, i64::MAX as u64);
}

#[test]
fn test_config_validation_order() {
    let mut config = Config::default();
    assert!(config.is_empty());
    match config.validate() {
        Err(Error::Config(msg)) => assert_eq!(msg, "Config.user is required"),
        other => panic!("unexpected result: {:?}", other),
    }

    config.user = "test".into();
    config.password = "test".into();
    match config.validate() {
        Err(Error::Config(msg)) => assert_eq!(msg, "Config.auth_db is required"),
        other => panic!("unexpected result: {:?}", other),
    }
}
"##;

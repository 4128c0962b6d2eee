#![deny(missing_docs)]

//! # Accessor Generator
//!
//! Handles `// @mongoapi`. Emits `<snake>_db/` holding an accessor type with lazy index
//! setup, its backend trait, live tests, JSON fixtures and the docker files the tests run
//! against.

use crate::codegen::{ensure_rendered, render};
use crate::error::AppResult;
use crate::generators::common::{
    CONFIG, CONNECTION, CRUD_IMPORTS, ERRORS, QUERY_HELPERS, QUERY_HELPER_TESTS,
};
use crate::generators::context::{as_pairs, StructContext};
use crate::generators::docs;
use crate::generators::traits::{GenerationInput, Generator};
use crate::writer::WriteDirective;

/// Generator for the `@mongoapi` annotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoApiGenerator;

impl Generator for MongoApiGenerator {
    fn annotation(&self) -> &'static str {
        "mongoapi"
    }

    fn generate(&self, input: &GenerationInput<'_>) -> AppResult<Vec<WriteDirective>> {
        let ctx = StructContext::resolve(input)?;
        let dir = ctx.names.api_dir.clone();

        let mut values = ctx.values();
        values.push(("Module", dir.clone()));
        values.push(("Errors", ERRORS.to_string()));
        values.push(("Config", CONFIG.to_string()));
        values.push(("Connection", CONNECTION.to_string()));
        values.push(("QueryHelpers", QUERY_HELPERS.to_string()));
        values.push(("QueryHelperTests", QUERY_HELPER_TESTS.to_string()));
        values.push(("CrudImports", CRUD_IMPORTS.to_string()));
        values.push((
            "CreateValidation",
            StructContext::validation(ctx.create, "%self.col"),
        ));
        values.push((
            "UpdateValidation",
            StructContext::validation(ctx.update, "%self.col"),
        ));
        let pairs = as_pairs(&values);

        let module = render(MODULE_TEMPLATE, &pairs);
        ensure_rendered("mod.rs", &module)?;
        let tests = render(TESTS_TEMPLATE, &pairs);
        ensure_rendered("tests.rs", &tests)?;
        let readme = render(&docs::readme(docs::API_README), &pairs);
        ensure_rendered("README.md", &readme)?;
        let makefile = render(docs::MAKEFILE, &pairs);
        ensure_rendered("Makefile", &makefile)?;

        tracing::debug!(record = %ctx.record.name, dir = %dir, "rendered accessor module");

        Ok(vec![
            WriteDirective::new(&dir, "mod.rs", module),
            WriteDirective::new(&dir, "tests.rs", tests),
            WriteDirective::new(&dir, "fixtures.rs", ctx.fixtures_file()?),
            WriteDirective::new(&dir, "README.md", readme),
            WriteDirective::new(&dir, "Makefile", makefile),
            WriteDirective::new(&dir, "Dockerfile", docs::DOCKERFILE.to_string()),
        ])
    }
}

const MODULE_TEMPLATE: &str = r##"//! MongoDB CRUD API for [`{{RecordPath}}`].
{{RecordDoc}}//!
//! Generated by mgokit. Edit the source struct and regenerate instead of changing this file.

{{CrudImports}}
{{Imports}}

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod tests;
{{Errors}}{{Config}}{{Connection}}
/// Progress of the one-time index setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexState {
    Pending,
    Ensured,
    Skipped,
}

/// Operations offered by [`{{Accessor}}`], for callers that want to swap in a fake.
#[allow(async_fn_in_trait)]
pub trait {{Backend}} {
    /// Returns the number of records.
    async fn count(&self, cx: &CancellationToken) -> Result<u64, Error>;
    /// Deletes the record with `public_id`.
    async fn delete(&self, cx: &CancellationToken, public_id: &str) -> Result<(), Error>;
    /// Inserts a record.
    async fn create(&self, cx: &CancellationToken, elem: &{{CreateType}}) -> Result<(), Error>;
    /// Fetches the record with `public_id`.
    async fn get(&self, cx: &CancellationToken, public_id: &str) -> Result<{{Record}}, Error>;
    /// Overwrites the stored fields of the record with `public_id`.
    async fn update(
        &self,
        cx: &CancellationToken,
        public_id: &str,
        elem: &{{UpdateType}},
    ) -> Result<(), Error>;
    /// Lists every record sorted on `order_by`.
    async fn get_all_by_order(
        &self,
        cx: &CancellationToken,
        order: &str,
        order_by: &str,
    ) -> Result<Vec<{{Record}}>, Error>;
    /// Fetches the first record whose `key` equals `value`.
    async fn get_by_field(
        &self,
        cx: &CancellationToken,
        key: &str,
        value: Bson,
    ) -> Result<{{Record}}, Error>;
    /// Lists one page of records with the collection total.
    async fn get_all(
        &self,
        cx: &CancellationToken,
        order: &str,
        order_by: &str,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<{{Record}}>, u64), Error>;
}

/// MongoDB backed storage for [`{{Record}}`] records.
pub struct {{Accessor}}<M = MongoConnection> {
    col: String,
    db: M,
    indexes: Vec<IndexModel>,
    index_state: Mutex<IndexState>,
}

impl<M: MongoDb> {{Accessor}}<M> {
    /// Returns an accessor for collection `col`. `indexes` are applied on first use.
    pub fn new(col: impl Into<String>, db: M, indexes: Vec<IndexModel>) -> Self {
        Self {
            col: col.into(),
            db,
            indexes,
            index_state: Mutex::new(IndexState::Pending),
        }
    }

    /// The collection name.
    pub fn collection(&self) -> &str {
        &self.col
    }

    /// Applies the configured indexes once.
    ///
    /// An index failure is returned to the caller that hit it. Later calls skip index
    /// setup so one bad index does not fail every operation.
    pub async fn ensure_index(&self) -> Result<(), Error> {
        let mut state = self.index_state.lock().await;
        if *state != IndexState::Pending || self.indexes.is_empty() {
            return Ok(());
        }

        let database = self.db.database(false).await.map_err(|err| {
            tracing::error!(collection = %self.col, error = %err, "Failed to create session for index");
            err
        })?;
        let collection = database.collection::<Document>(&self.col);

        for index in &self.indexes {
            if let Err(err) = collection.create_index(index.clone(), None).await {
                tracing::error!(collection = %self.col, index = ?index.keys, error = %err, "Failed to ensure collection index");
                *state = IndexState::Skipped;
                return Err(err.into());
            }
            tracing::info!(collection = %self.col, index = ?index.keys, "Succeeded in ensuring collection index");
        }

        *state = IndexState::Ensured;
        tracing::info!(collection = %self.col, "Finished adding index");
        Ok(())
    }

    /// Returns the number of records in the collection.
    pub async fn count(&self, cx: &CancellationToken) -> Result<u64, Error> {
        let database = self.open(cx, "{{Accessor}}.count", true).await?;
        let total = database
            .collection::<Document>(&self.col)
            .count_documents(doc! {}, None)
            .await
            .map_err(|err| {
                tracing::error!(collection = %self.col, error = %err, "Failed to get record count");
                Error::from(err)
            })?;
        tracing::debug!(collection = %self.col, total, "Counted records");
        Ok(total)
    }

    /// Deletes the record with `public_id`. Fails with [`Error::NotFound`] when nothing
    /// was removed.
    pub async fn delete(&self, cx: &CancellationToken, public_id: &str) -> Result<(), Error> {
        let database = self.open(cx, "{{Accessor}}.delete", false).await?;
        let query = doc! { {{PublicIdKey}}: public_id };
        let result = database
            .collection::<Document>(&self.col)
            .delete_one(query.clone(), None)
            .await
            .map_err(|err| {
                tracing::error!(collection = %self.col, query = %query, error = %err, "Failed to delete record");
                Error::from(err)
            })?;

        if result.deleted_count == 0 {
            tracing::error!(collection = %self.col, public_id, "Failed to delete record, not found");
            return Err(Error::NotFound);
        }

        tracing::info!(collection = %self.col, public_id, "Deleted record");
        Ok(())
    }

    /// Inserts `elem`.
    pub async fn create(&self, cx: &CancellationToken, elem: &{{CreateType}}) -> Result<(), Error> {
        check_context(cx, &self.col, "{{Accessor}}.create")?;
{{CreateValidation}}
        let database = self.open(cx, "{{Accessor}}.create", false).await?;
        let document = {{CreateDocument}}(elem)?;
        database
            .collection::<Document>(&self.col)
            .insert_one(document.clone(), None)
            .await
            .map_err(|err| {
                tracing::error!(collection = %self.col, document = %document, error = %err, "Failed to create {{Record}} record");
                Error::from(err)
            })?;

        tracing::info!(collection = %self.col, document = %document, "Created record");
        Ok(())
    }

    /// Fetches the record with `public_id`.
    pub async fn get(&self, cx: &CancellationToken, public_id: &str) -> Result<{{Record}}, Error> {
        let database = self.open(cx, "{{Accessor}}.get", true).await?;
        self.find_one(&database, doc! { {{PublicIdKey}}: public_id }).await
    }

    /// Fetches the first record whose `key` equals `value`.
    pub async fn get_by_field(
        &self,
        cx: &CancellationToken,
        key: &str,
        value: Bson,
    ) -> Result<{{Record}}, Error> {
        let database = self.open(cx, "{{Accessor}}.get_by_field", true).await?;
        let mut query = Document::new();
        query.insert(key, value);
        self.find_one(&database, query).await
    }

    /// Sets the stored fields of `elem` on the record with `public_id`.
    pub async fn update(
        &self,
        cx: &CancellationToken,
        public_id: &str,
        elem: &{{UpdateType}},
    ) -> Result<(), Error> {
        check_context(cx, &self.col, "{{Accessor}}.update")?;
{{UpdateValidation}}
        let database = self.open(cx, "{{Accessor}}.update", false).await?;
        let query = doc! { {{PublicIdKey}}: public_id };
        let data = {{UpdateDocument}}(elem)?;
        let result = database
            .collection::<Document>(&self.col)
            .update_one(query.clone(), doc! { "$set": data.clone() }, None)
            .await
            .map_err(|err| {
                tracing::error!(collection = %self.col, query = %query, data = %data, error = %err, "Failed to update {{Record}} record");
                Error::from(err)
            })?;

        if result.matched_count == 0 {
            tracing::error!(collection = %self.col, public_id, "Failed to update record, not found");
            return Err(Error::NotFound);
        }

        tracing::info!(collection = %self.col, public_id, "Updated record");
        Ok(())
    }

    /// Lists every record sorted on `order_by`; `order` is `asc` or `desc`.
    pub async fn get_all_by_order(
        &self,
        cx: &CancellationToken,
        order: &str,
        order_by: &str,
    ) -> Result<Vec<{{Record}}>, Error> {
        let database = self.open(cx, "{{Accessor}}.get_all_by_order", true).await?;
        let options = FindOptions::builder().sort(sort_by(order, order_by)).build();
        self.find_all(&database, options).await
    }

    /// Lists one page of records and the collection total.
    ///
    /// `page` is one-based. When both `page` and `per_page` are not positive every record
    /// is returned and the total is the number returned.
    pub async fn get_all(
        &self,
        cx: &CancellationToken,
        order: &str,
        order_by: &str,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<{{Record}}>, u64), Error> {
        if page <= 0 && per_page <= 0 {
            let records = self.get_all_by_order(cx, order, order_by).await?;
            let total = records.len() as u64;
            return Ok((records, total));
        }

        let total = self.count(cx).await?;
        let (skip, limit) = page_window(page, per_page);
        tracing::debug!(collection = %self.col, order, order_by, page, per_page, skip, limit, "Retrieving page");

        let database = self.open(cx, "{{Accessor}}.get_all", true).await?;
        let options = FindOptions::builder()
            .sort(sort_by(order, order_by))
            .skip(skip)
            .limit(limit)
            .build();
        let records = self.find_all(&database, options).await?;
        Ok((records, total))
    }

    /// Runs `fx` against the collection with a read or write handle.
    pub async fn exec<F, Fut>(&self, cx: &CancellationToken, is_read: bool, fx: F) -> Result<(), Error>
    where
        F: FnOnce(Collection<Document>) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        let database = self.open(cx, "{{Accessor}}.exec", is_read).await?;
        fx(database.collection::<Document>(&self.col)).await.map_err(|err| {
            tracing::error!(collection = %self.col, error = %err, "Failed to execute operation");
            err
        })?;
        tracing::info!(collection = %self.col, "Operation executed");
        Ok(())
    }

    async fn open(&self, cx: &CancellationToken, op: &'static str, is_read: bool) -> Result<Database, Error> {
        check_context(cx, &self.col, op)?;
        if let Err(err) = self.ensure_index().await {
            tracing::error!(collection = %self.col, op, error = %err, "Failed to apply index");
            return Err(err);
        }
        self.db.database(is_read).await.map_err(|err| {
            tracing::error!(collection = %self.col, op, error = %err, "Failed to create session");
            err
        })
    }

    async fn find_one(&self, database: &Database, query: Document) -> Result<{{Record}}, Error> {
        let found = database
            .collection::<{{Record}}>(&self.col)
            .find_one(query.clone(), None)
            .await
            .map_err(|err| {
                tracing::error!(collection = %self.col, query = %query, error = %err, "Failed to retrieve {{Record}} record");
                Error::from(err)
            })?;
        found.ok_or_else(|| {
            tracing::debug!(collection = %self.col, query = %query, "No {{Record}} record matched");
            Error::NotFound
        })
    }

    async fn find_all(&self, database: &Database, options: FindOptions) -> Result<Vec<{{Record}}>, Error> {
        let collection = database.collection::<{{Record}}>(&self.col);
        let records = match collection.find(doc! {}, options).await {
            Ok(cursor) => cursor.try_collect::<Vec<_>>().await,
            Err(err) => Err(err),
        };
        records.map_err(|err| {
            tracing::error!(collection = %self.col, error = %err, "Failed to retrieve {{Record}} records");
            Error::from(err)
        })
    }
}

impl<M: MongoDb> {{Backend}} for {{Accessor}}<M> {
    async fn count(&self, cx: &CancellationToken) -> Result<u64, Error> {
        {{Accessor}}::count(self, cx).await
    }

    async fn delete(&self, cx: &CancellationToken, public_id: &str) -> Result<(), Error> {
        {{Accessor}}::delete(self, cx, public_id).await
    }

    async fn create(&self, cx: &CancellationToken, elem: &{{CreateType}}) -> Result<(), Error> {
        {{Accessor}}::create(self, cx, elem).await
    }

    async fn get(&self, cx: &CancellationToken, public_id: &str) -> Result<{{Record}}, Error> {
        {{Accessor}}::get(self, cx, public_id).await
    }

    async fn update(
        &self,
        cx: &CancellationToken,
        public_id: &str,
        elem: &{{UpdateType}},
    ) -> Result<(), Error> {
        {{Accessor}}::update(self, cx, public_id, elem).await
    }

    async fn get_all_by_order(
        &self,
        cx: &CancellationToken,
        order: &str,
        order_by: &str,
    ) -> Result<Vec<{{Record}}>, Error> {
        {{Accessor}}::get_all_by_order(self, cx, order, order_by).await
    }

    async fn get_by_field(
        &self,
        cx: &CancellationToken,
        key: &str,
        value: Bson,
    ) -> Result<{{Record}}, Error> {
        {{Accessor}}::get_by_field(self, cx, key, value).await
    }

    async fn get_all(
        &self,
        cx: &CancellationToken,
        order: &str,
        order_by: &str,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<{{Record}}>, u64), Error> {
        {{Accessor}}::get_all(self, cx, order, order_by, page, per_page).await
    }
}
{{QueryHelpers}}{{DocumentBuilders}}"##;

const TESTS_TEMPLATE: &str = r##"//! Tests for [`super::{{Accessor}}`].
//!
//! Tests touching the database read `API_MONGO_TEST_HOST`, `API_MONGO_TEST_DB`,
//! `API_MONGO_TEST_AUTHDB`, `API_MONGO_TEST_USER` and `API_MONGO_TEST_PASSWORD`, and
//! return early when none is set.

use super::fixtures;
use super::*;

const TEST_COLLECTION: &str = "{{TestCollection}}";

fn test_api() -> Option<{{Accessor}}> {
    test_api_with(Vec::new())
}

fn test_api_with(indexes: Vec<IndexModel>) -> Option<{{Accessor}}> {
    let config = Config::from_env("API_MONGO_TEST");
    if config.is_empty() {
        eprintln!("API_MONGO_TEST_* is not set, skipping MongoDB test");
        return None;
    }
    Some({{Accessor}}::new(TEST_COLLECTION, MongoConnection::new(config), indexes))
}

fn public_id_index() -> IndexModel {
    IndexModel::builder().keys(doc! { {{PublicIdKey}}: 1 }).build()
}

/// Hands out handles on a port nobody listens on, giving up on server selection quickly.
struct Unreachable;

impl MongoDb for Unreachable {
    async fn database(&self, _is_read: bool) -> Result<Database, Error> {
        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::parse("127.0.0.1:1")?])
            .server_selection_timeout(Duration::from_millis(200))
            .build();
        Ok(Client::with_options(options)?.database("unreachable"))
    }
}

fn record() -> {{Record}} {
    fixtures::{{RecordLoader}}(fixtures::{{RecordConst}}).expect("decode {{Record}} fixture")
}

async fn seed(api: &{{Accessor}}, cx: &CancellationToken) -> {{Record}} {
    let record = record();
    let _ = api.delete(cx, &record.{{PublicIdField}}).await;
    let elem = fixtures::{{CreateLoader}}(fixtures::{{CreateConst}}).expect("decode {{CreateType}} fixture");
    api.create(cx, &elem).await.expect("create {{Record}} record");
    record
}

async fn count_through<B: {{Backend}}>(backend: &B, cx: &CancellationToken) -> Result<u64, Error> {
    backend.count(cx).await
}

#[tokio::test]
async fn test_get_{{Snake}}() {
    let Some(api) = test_api() else { return };
    let cx = CancellationToken::new();
    let record = seed(&api, &cx).await;

    let found = api.get(&cx, &record.{{PublicIdField}}).await.expect("get {{Record}} record");
    assert_eq!(found.{{PublicIdField}}, record.{{PublicIdField}});

    api.delete(&cx, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
}

#[tokio::test]
async fn test_get_all_{{Snake}}() {
    let Some(api) = test_api() else { return };
    let cx = CancellationToken::new();
    let record = seed(&api, &cx).await;

    let (records, total) = api.get_all(&cx, "asc", {{PublicIdKey}}, -1, -1).await.expect("get all {{Record}} records");
    assert!(!records.is_empty());
    assert_eq!(total, records.len() as u64);

    let (page, total) = api.get_all(&cx, "asc", {{PublicIdKey}}, 1, 1).await.expect("get {{Record}} page");
    assert_eq!(page.len(), 1);
    assert!(total >= 1);

    api.delete(&cx, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
}

#[tokio::test]
async fn test_get_all_{{Snake}}_by_order() {
    let Some(api) = test_api() else { return };
    let cx = CancellationToken::new();
    let record = seed(&api, &cx).await;

    let records = api.get_all_by_order(&cx, "desc", {{PublicIdKey}}).await.expect("get ordered {{Record}} records");
    assert!(records.iter().any(|r| r.{{PublicIdField}} == record.{{PublicIdField}}));

    api.delete(&cx, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
}

#[tokio::test]
async fn test_get_{{Snake}}_by_field() {
    let Some(api) = test_api() else { return };
    let cx = CancellationToken::new();
    let record = seed(&api, &cx).await;

    let found = api
        .get_by_field(&cx, {{PublicIdKey}}, Bson::String(record.{{PublicIdField}}.clone()))
        .await
        .expect("get {{Record}} record by field");
    assert_eq!(found.{{PublicIdField}}, record.{{PublicIdField}});

    api.delete(&cx, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
}

#[tokio::test]
async fn test_{{Snake}}_create() {
    let Some(api) = test_api() else { return };
    let cx = CancellationToken::new();
    let record = seed(&api, &cx).await;

    api.delete(&cx, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
}

#[tokio::test]
async fn test_{{Snake}}_count() {
    let Some(api) = test_api() else { return };
    let cx = CancellationToken::new();
    let record = seed(&api, &cx).await;

    let total = count_through(&api, &cx).await.expect("count {{Record}} records");
    assert!(total >= 1);

    api.delete(&cx, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
}

#[tokio::test]
async fn test_{{Snake}}_update() {
    let Some(api) = test_api() else { return };
    let cx = CancellationToken::new();
    let record = seed(&api, &cx).await;

    let elem = fixtures::{{UpdateLoader}}(fixtures::{{UpdateConst}}).expect("decode {{UpdateType}} fixture");
    api.update(&cx, &record.{{PublicIdField}}, &elem).await.expect("update {{Record}} record");

    api.delete(&cx, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
}

#[tokio::test]
async fn test_{{Snake}}_delete() {
    let Some(api) = test_api() else { return };
    let cx = CancellationToken::new();
    let record = seed(&api, &cx).await;

    api.delete(&cx, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
    assert!(matches!(api.get(&cx, &record.{{PublicIdField}}).await, Err(Error::NotFound)));
    assert!(matches!(api.delete(&cx, &record.{{PublicIdField}}).await, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_{{Snake}}_cancelled_context() {
    let api = {{Accessor}}::new(TEST_COLLECTION, MongoConnection::new(Config::default()), Vec::new());
    let cx = CancellationToken::new();
    cx.cancel();

    assert!(matches!(api.count(&cx).await, Err(Error::ExpiredContext)));
    assert!(matches!(api.get(&cx, "missing").await, Err(Error::ExpiredContext)));
}

#[tokio::test]
async fn test_{{Snake}}_index_failure_reported_once() {
    let api = {{Accessor}}::new(TEST_COLLECTION, Unreachable, vec![public_id_index()]);

    assert!(api.ensure_index().await.is_err());
    assert_eq!(*api.index_state.lock().await, IndexState::Skipped);
    assert!(api.ensure_index().await.is_ok());
}

#[tokio::test]
async fn test_{{Snake}}_index_ensured() {
    let Some(api) = test_api_with(vec![public_id_index()]) else { return };

    api.ensure_index().await.expect("ensure {{Record}} index");
    assert_eq!(*api.index_state.lock().await, IndexState::Ensured);
    api.ensure_index().await.expect("ensured index is not applied again");
}
{{QueryHelperTests}}"##;

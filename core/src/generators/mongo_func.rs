//! # Function Generator
//!
//! Handles `// @mongofunc`. Emits `<snake>_mgo/` with free functions taking the
//! connection and collection name per call, plus tests and fixtures.

use crate::codegen::{ensure_rendered, render};
use crate::error::AppResult;
use crate::generators::common::{
    CONFIG, CONNECTION, COUNT_AND_EXEC_FUNCS, CRUD_IMPORTS, ERRORS, QUERY_HELPERS,
    QUERY_HELPER_TESTS,
};
use crate::generators::context::{as_pairs, StructContext};
use crate::generators::docs;
use crate::generators::traits::{GenerationInput, Generator};
use crate::writer::WriteDirective;

/// Generator for the `@mongofunc` annotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoFuncGenerator;

impl Generator for MongoFuncGenerator {
    fn annotation(&self) -> &'static str {
        "mongofunc"
    }

    fn generate(&self, input: &GenerationInput<'_>) -> AppResult<Vec<WriteDirective>> {
        let ctx = StructContext::resolve(input)?;
        let dir = ctx.names.func_dir.clone();

        let mut values = ctx.values();
        values.push(("Module", dir.clone()));
        values.push(("CrudImports", CRUD_IMPORTS.to_string()));
        values.push(("Errors", ERRORS.to_string()));
        values.push(("Config", CONFIG.to_string()));
        values.push(("Connection", CONNECTION.to_string()));
        values.push(("CountAndExec", COUNT_AND_EXEC_FUNCS.to_string()));
        values.push(("QueryHelpers", QUERY_HELPERS.to_string()));
        values.push(("QueryHelperTests", QUERY_HELPER_TESTS.to_string()));
        values.push(("CreateValidation", StructContext::validation(ctx.create, "col")));
        values.push(("UpdateValidation", StructContext::validation(ctx.update, "col")));
        let pairs = as_pairs(&values);

        let module = render(MODULE_TEMPLATE, &pairs);
        ensure_rendered("mod.rs", &module)?;
        let tests = render(TESTS_TEMPLATE, &pairs);
        ensure_rendered("tests.rs", &tests)?;
        let readme = render(&docs::readme(docs::FUNC_README), &pairs);
        ensure_rendered("README.md", &readme)?;

        tracing::debug!(record = %ctx.record.name, dir = %dir, "rendered function module");

        Ok(vec![
            WriteDirective::new(&dir, "mod.rs", module),
            WriteDirective::new(&dir, "tests.rs", tests),
            WriteDirective::new(&dir, "fixtures.rs", ctx.fixtures_file()?),
            WriteDirective::new(&dir, "README.md", readme),
        ])
    }
}

const MODULE_TEMPLATE: &str = r##"//! MongoDB functions for [`{{RecordPath}}`].
{{RecordDoc}}//!
//! Generated by mgokit. Edit the source struct and regenerate instead of changing this file.

{{CrudImports}}
{{Imports}}

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod tests;
{{Errors}}{{Config}}{{Connection}}{{CountAndExec}}
/// Deletes the record with `public_id` from `col`.
pub async fn delete<M: MongoDb>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    public_id: &str,
) -> Result<(), Error> {
    let database = open(cx, db, col, "delete", false).await?;
    let query = doc! { {{PublicIdKey}}: public_id };
    let result = database
        .collection::<Document>(col)
        .delete_one(query.clone(), None)
        .await
        .map_err(|err| {
            tracing::error!(collection = col, query = %query, error = %err, "Failed to delete record");
            Error::from(err)
        })?;

    if result.deleted_count == 0 {
        tracing::error!(collection = col, public_id, "Failed to delete record, not found");
        return Err(Error::NotFound);
    }

    tracing::info!(collection = col, public_id, "Deleted record");
    Ok(())
}

/// Inserts `elem` into `col`.
pub async fn create<M: MongoDb>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    elem: &{{CreateType}},
) -> Result<(), Error> {
    check_context(cx, col, "create")?;
{{CreateValidation}}
    let database = open(cx, db, col, "create", false).await?;
    let document = {{CreateDocument}}(elem)?;
    database
        .collection::<Document>(col)
        .insert_one(document.clone(), None)
        .await
        .map_err(|err| {
            tracing::error!(collection = col, document = %document, error = %err, "Failed to create {{Record}} record");
            Error::from(err)
        })?;

    tracing::info!(collection = col, document = %document, "Created record");
    Ok(())
}

/// Fetches the record with `public_id` from `col`.
pub async fn get<M: MongoDb>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    public_id: &str,
) -> Result<{{Record}}, Error> {
    let database = open(cx, db, col, "get", true).await?;
    find_one(&database, col, doc! { {{PublicIdKey}}: public_id }).await
}

/// Fetches the first record in `col` whose `key` equals `value`.
pub async fn get_by_field<M: MongoDb>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    key: &str,
    value: Bson,
) -> Result<{{Record}}, Error> {
    let database = open(cx, db, col, "get_by_field", true).await?;
    let mut query = Document::new();
    query.insert(key, value);
    find_one(&database, col, query).await
}

/// Sets the stored fields of `elem` on the record with `public_id`.
pub async fn update<M: MongoDb>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    public_id: &str,
    elem: &{{UpdateType}},
) -> Result<(), Error> {
    check_context(cx, col, "update")?;
{{UpdateValidation}}
    let database = open(cx, db, col, "update", false).await?;
    let query = doc! { {{PublicIdKey}}: public_id };
    let data = {{UpdateDocument}}(elem)?;
    let result = database
        .collection::<Document>(col)
        .update_one(query.clone(), doc! { "$set": data.clone() }, None)
        .await
        .map_err(|err| {
            tracing::error!(collection = col, query = %query, data = %data, error = %err, "Failed to update {{Record}} record");
            Error::from(err)
        })?;

    if result.matched_count == 0 {
        tracing::error!(collection = col, public_id, "Failed to update record, not found");
        return Err(Error::NotFound);
    }

    tracing::info!(collection = col, public_id, "Updated record");
    Ok(())
}

/// Lists every record in `col` sorted on `order_by`; `order` is `asc` or `desc`.
pub async fn get_all_by_order<M: MongoDb>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    order: &str,
    order_by: &str,
) -> Result<Vec<{{Record}}>, Error> {
    let database = open(cx, db, col, "get_all_by_order", true).await?;
    let options = FindOptions::builder().sort(sort_by(order, order_by)).build();
    find_all(&database, col, options).await
}

/// Lists one page of records in `col` and the collection total.
///
/// `page` is one-based. When both `page` and `per_page` are not positive every record is
/// returned and the total is the number returned.
pub async fn get_all<M: MongoDb>(
    cx: &CancellationToken,
    db: &M,
    col: &str,
    order: &str,
    order_by: &str,
    page: i64,
    per_page: i64,
) -> Result<(Vec<{{Record}}>, u64), Error> {
    if page <= 0 && per_page <= 0 {
        let records = get_all_by_order(cx, db, col, order, order_by).await?;
        let total = records.len() as u64;
        return Ok((records, total));
    }

    let total = count(cx, db, col).await?;
    let (skip, limit) = page_window(page, per_page);
    tracing::debug!(collection = col, order, order_by, page, per_page, skip, limit, "Retrieving page");

    let database = open(cx, db, col, "get_all", true).await?;
    let options = FindOptions::builder()
        .sort(sort_by(order, order_by))
        .skip(skip)
        .limit(limit)
        .build();
    let records = find_all(&database, col, options).await?;
    Ok((records, total))
}

async fn find_one(database: &Database, col: &str, query: Document) -> Result<{{Record}}, Error> {
    let found = database
        .collection::<{{Record}}>(col)
        .find_one(query.clone(), None)
        .await
        .map_err(|err| {
            tracing::error!(collection = col, query = %query, error = %err, "Failed to retrieve {{Record}} record");
            Error::from(err)
        })?;
    found.ok_or_else(|| {
        tracing::debug!(collection = col, query = %query, "No {{Record}} record matched");
        Error::NotFound
    })
}

async fn find_all(database: &Database, col: &str, options: FindOptions) -> Result<Vec<{{Record}}>, Error> {
    let collection = database.collection::<{{Record}}>(col);
    let records = match collection.find(doc! {}, options).await {
        Ok(cursor) => cursor.try_collect::<Vec<_>>().await,
        Err(err) => Err(err),
    };
    records.map_err(|err| {
        tracing::error!(collection = col, error = %err, "Failed to retrieve {{Record}} records");
        Error::from(err)
    })
}
{{QueryHelpers}}{{DocumentBuilders}}"##;

const TESTS_TEMPLATE: &str = r##"//! Tests for the `{{Record}}` functions.
//!
//! Tests touching the database read `API_MONGO_TEST_HOST`, `API_MONGO_TEST_DB`,
//! `API_MONGO_TEST_AUTHDB`, `API_MONGO_TEST_USER` and `API_MONGO_TEST_PASSWORD`, and
//! return early when none is set.

use super::*;

const TEST_COLLECTION: &str = "{{TestCollection}}";

fn test_db() -> Option<MongoConnection> {
    let config = Config::from_env("API_MONGO_TEST");
    if config.is_empty() {
        eprintln!("API_MONGO_TEST_* is not set, skipping MongoDB test");
        return None;
    }
    Some(MongoConnection::new(config))
}

async fn seed(db: &MongoConnection, cx: &CancellationToken) -> {{Record}} {
    let record = fixtures::{{RecordLoader}}(fixtures::{{RecordConst}}).expect("decode {{Record}} fixture");
    let _ = delete(cx, db, TEST_COLLECTION, &record.{{PublicIdField}}).await;
    let elem = fixtures::{{CreateLoader}}(fixtures::{{CreateConst}}).expect("decode {{CreateType}} fixture");
    create(cx, db, TEST_COLLECTION, &elem).await.expect("create {{Record}} record");
    record
}

#[tokio::test]
async fn test_{{Snake}}_round_trip() {
    let Some(db) = test_db() else { return };
    let cx = CancellationToken::new();
    let record = seed(&db, &cx).await;

    let found = get(&cx, &db, TEST_COLLECTION, &record.{{PublicIdField}}).await.expect("get {{Record}} record");
    assert_eq!(found.{{PublicIdField}}, record.{{PublicIdField}});

    let found = get_by_field(&cx, &db, TEST_COLLECTION, {{PublicIdKey}}, Bson::String(record.{{PublicIdField}}.clone()))
        .await
        .expect("get {{Record}} record by field");
    assert_eq!(found.{{PublicIdField}}, record.{{PublicIdField}});

    let elem = fixtures::{{UpdateLoader}}(fixtures::{{UpdateConst}}).expect("decode {{UpdateType}} fixture");
    update(&cx, &db, TEST_COLLECTION, &record.{{PublicIdField}}, &elem).await.expect("update {{Record}} record");

    delete(&cx, &db, TEST_COLLECTION, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
    assert!(matches!(
        get(&cx, &db, TEST_COLLECTION, &record.{{PublicIdField}}).await,
        Err(Error::NotFound)
    ));
}

#[tokio::test]
async fn test_{{Snake}}_listing() {
    let Some(db) = test_db() else { return };
    let cx = CancellationToken::new();
    let record = seed(&db, &cx).await;

    let total = count(&cx, &db, TEST_COLLECTION).await.expect("count {{Record}} records");
    assert!(total >= 1);

    let records = get_all_by_order(&cx, &db, TEST_COLLECTION, "asc", {{PublicIdKey}})
        .await
        .expect("get ordered {{Record}} records");
    assert!(records.iter().any(|r| r.{{PublicIdField}} == record.{{PublicIdField}}));

    let (page, total) = get_all(&cx, &db, TEST_COLLECTION, "asc", {{PublicIdKey}}, 1, 1)
        .await
        .expect("get {{Record}} page");
    assert_eq!(page.len(), 1);
    assert!(total >= 1);

    delete(&cx, &db, TEST_COLLECTION, &record.{{PublicIdField}}).await.expect("delete {{Record}} record");
}

#[tokio::test]
async fn test_{{Snake}}_cancelled_context() {
    let db = MongoConnection::new(Config::default());
    let cx = CancellationToken::new();
    cx.cancel();

    assert!(matches!(count(&cx, &db, TEST_COLLECTION).await, Err(Error::ExpiredContext)));
    assert!(matches!(
        get(&cx, &db, TEST_COLLECTION, "missing").await,
        Err(Error::ExpiredContext)
    ));
}
{{QueryHelperTests}}"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::validate_rust_source;
    use crate::parser::{parse_module, Annotation};
    use std::path::Path;

    const SOURCE: &str = r#"
/// An account record.
// @mongofunc
pub struct Account {
    pub public_id: String,
    pub owner: String,
    pub balance: i64,
}

impl Account {
    pub fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}
"#;

    fn generate() -> Vec<WriteDirective> {
        let module = parse_module(SOURCE, Path::new("src/bank/mod.rs"), "crate::bank");
        let annotation = Annotation::new("mongofunc");
        let record = module.find_struct("Account").unwrap();
        MongoFuncGenerator
            .generate(&GenerationInput::for_struct(&annotation, &module, record))
            .unwrap()
    }

    #[test]
    fn test_emits_function_package() {
        let out = generate();
        let names: Vec<&str> = out.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(names, vec!["mod.rs", "tests.rs", "fixtures.rs", "README.md"]);
        assert!(out.iter().all(|d| d.dir == Path::new("account_mgo")));

        for directive in out.iter().filter(|d| d.is_rust()) {
            validate_rust_source(&directive.file_name, &directive.contents).unwrap();
        }
    }

    #[test]
    fn test_functions_take_collection() {
        let out = generate();
        let module = &out[0].contents;
        assert!(module.contains("use crate::bank::{Account};"));
        assert!(module.contains("pub async fn add_index<M: MongoDb>"));
        assert!(module.contains("pub async fn get_by_field<M: MongoDb>"));
        assert!(module.contains("elem: &Account"));
        // Create and update share the record shape, so one builder and two guards.
        assert_eq!(module.matches("fn account_document(").count(), 1);
        assert_eq!(module.matches("elem.validate()").count(), 2);
        assert!(!module.contains("pub struct AccountDb"));
    }
}

//! # Package Docs
//!
//! Non-Rust files shipped with generated packages: READMEs, the Makefile driving the live
//! tests and the Dockerfile of the test database.

/// Dependencies every generated package needs, as a Cargo.toml snippet.
const DEPENDENCIES: &str = r#"```toml
[dependencies]
futures = "0.3"
mongodb = "2.8"
serde = { version = "1", features = ["derive"] }
thiserror = "2"
tokio = { version = "1", features = ["macros", "rt-multi-thread", "sync"] }
tokio-util = "0.7"
tracing = "0.1"

[dev-dependencies]
serde_json = "1"
```"#;

const TEST_ENV: &str = r#"Tests that reach the database read their connection from the environment and return
early when none is set:

| Variable | Meaning |
|----------|---------|
| `API_MONGO_TEST_HOST` | `host:port` of the server |
| `API_MONGO_TEST_DB` | database holding the test collection |
| `API_MONGO_TEST_AUTHDB` | authentication database |
| `API_MONGO_TEST_USER` | user name |
| `API_MONGO_TEST_PASSWORD` | password |"#;

/// README of an accessor package.
pub const API_README: &str = r#"# {{Module}}

MongoDB CRUD API for `{{RecordPath}}`, generated by mgokit.

{{RecordSummary}}Edit the source struct and regenerate with `mgokit generate --force` rather than editing
these files.

## Usage

Declare the module next to the struct (`mod {{Module}};`), then:

```rust,ignore
let config = {{Module}}::Config::from_env("API_MONGO");
let api = {{Module}}::{{Accessor}}::new("{{Snake}}s", {{Module}}::MongoConnection::new(config), Vec::new());
let cx = tokio_util::sync::CancellationToken::new();

let total = api.count(&cx).await?;
let (page, total) = api.get_all(&cx, "asc", "public_id", 1, 20).await?;
```

| Operation | Description |
|-----------|-------------|
| `count` | number of records |
| `create` | inserts a `{{CreateType}}` |
| `get` | fetches by public id |
| `get_by_field` | fetches the first record matching one field |
| `update` | sets the stored fields of an `{{UpdateType}}` |
| `delete` | removes by public id |
| `get_all_by_order` | lists every record sorted on a field |
| `get_all` | lists one page with the collection total |
| `exec` | runs a closure against the raw collection |

Missing records surface as `Error::NotFound`. A cancelled token fails the call with
`Error::ExpiredContext` before the database is touched. Indexes passed to `new` are applied
on first use; if one fails the error is returned once and index setup is skipped afterwards.

`{{Accessor}}` implements `{{Backend}}`, so callers can depend on the trait and swap in a fake.

## Dependencies

DEPENDENCIES

## Testing

TEST_ENV

`make mongo` starts a local server with matching credentials and `make test` runs the tests
against it. Review `fixtures.rs` if the struct holds nested types: fixture values are only
guessed from field names and types.
"#;

/// README of a function package.
pub const FUNC_README: &str = r#"# {{Module}}

MongoDB functions for `{{RecordPath}}`, generated by mgokit.

{{RecordSummary}}Every function takes a cancellation token, a `MongoDb` implementation and the collection
name, so one connection can serve many collections:

```rust,ignore
let db = {{Module}}::MongoConnection::new({{Module}}::Config::from_env("API_MONGO"));
let cx = tokio_util::sync::CancellationToken::new();

{{Module}}::add_index(&db, "{{Snake}}s", &indexes).await?;
let record = {{Module}}::get(&cx, &db, "{{Snake}}s", public_id).await?;
```

Functions: `add_index`, `count`, `create`, `get`, `get_by_field`, `update`, `delete`,
`get_all_by_order`, `get_all` and `exec`.

## Dependencies

DEPENDENCIES

## Testing

TEST_ENV
"#;

/// README of the base package.
pub const SOLO_README: &str = r#"# {{Module}}

Shared MongoDB plumbing generated by mgokit: `Config`, the `MongoDb` connection trait with
its `MongoConnection` implementation, the `Error` type, and the `add_index`, `count` and
`exec` helpers.

```rust,ignore
let db = {{Module}}::MongoConnection::new({{Module}}::Config::from_env("API_MONGO"));
let cx = tokio_util::sync::CancellationToken::new();
let total = {{Module}}::count(&cx, &db, "events").await?;
```

## Dependencies

DEPENDENCIES
"#;

/// Makefile driving the live tests. Recipes must be indented with tabs.
pub const MAKEFILE: &str = "MONGO_CONTAINER ?= {{Module}}_mongo
MONGO_PORT ?= 27017

export API_MONGO_TEST_HOST ?= localhost:$(MONGO_PORT)
export API_MONGO_TEST_DB ?= test
export API_MONGO_TEST_AUTHDB ?= admin
export API_MONGO_TEST_USER ?= test
export API_MONGO_TEST_PASSWORD ?= test

.PHONY: mongo test stop

mongo:
\tdocker build -t $(MONGO_CONTAINER) .
\tdocker run -d --rm --name $(MONGO_CONTAINER) -p $(MONGO_PORT):27017 $(MONGO_CONTAINER)

test:
\tcargo test {{Module}}::tests

stop:
\tdocker stop $(MONGO_CONTAINER)
";

/// Dockerfile of the test database.
pub const DOCKERFILE: &str = "FROM mongo:6

ENV MONGO_INITDB_ROOT_USERNAME=test
ENV MONGO_INITDB_ROOT_PASSWORD=test
ENV MONGO_INITDB_DATABASE=test

EXPOSE 27017
";

/// Expands the shared sections of a README template.
pub fn readme(template: &str) -> String {
    template
        .replace("DEPENDENCIES", DEPENDENCIES)
        .replace("TEST_ENV", TEST_ENV)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readme_sections_expand() {
        let out = readme(API_README);
        assert!(out.contains("mongodb = \"2.8\""));
        assert!(out.contains("API_MONGO_TEST_PASSWORD"));
        assert!(!out.contains("DEPENDENCIES"));
        assert!(!out.contains("TEST_ENV"));
    }

    #[test]
    fn test_solo_readme_has_no_test_section() {
        assert!(!readme(SOLO_README).contains("API_MONGO_TEST_HOST"));
    }

    #[test]
    fn test_makefile_recipes_use_tabs() {
        for line in MAKEFILE.lines() {
            if line.starts_with("docker") || line.starts_with("cargo") {
                panic!("recipe without tab: {}", line);
            }
        }
        assert!(MAKEFILE.contains("\n\tcargo test"));
    }
}

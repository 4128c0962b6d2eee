//! # Naming
//!
//! Derives every identifier a generator needs from the annotated struct's name.

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};

/// Names used across the files generated for one struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorNames {
    /// Snake case stem, e.g. `user`.
    pub snake: String,
    /// Directory of the accessor module, e.g. `user_db`.
    pub api_dir: String,
    /// Directory of the function module, e.g. `user_mgo`.
    pub func_dir: String,
    /// Accessor type, e.g. `UserDb`.
    pub accessor: String,
    /// Trait implemented by the accessor, e.g. `UserDbBackend`.
    pub backend: String,
    /// Collection used by generated tests, e.g. `user_test_collection`.
    pub test_collection: String,
}

impl AccessorNames {
    /// Builds the names for a struct.
    ///
    /// ```
    /// use mgokit_core::naming::AccessorNames;
    ///
    /// let names = AccessorNames::for_struct("HTTPRoute");
    /// assert_eq!(names.api_dir, "http_route_db");
    /// assert_eq!(names.accessor, "HttpRouteDb");
    /// ```
    pub fn for_struct(name: &str) -> Self {
        let snake = name.to_snake_case();
        let camel = name.to_upper_camel_case();
        Self {
            api_dir: format!("{}_db", snake),
            func_dir: format!("{}_mgo", snake),
            accessor: format!("{}Db", camel),
            backend: format!("{}DbBackend", camel),
            test_collection: format!("{}_test_collection", snake),
            snake,
        }
    }

    /// Name of the JSON fixture constant for a shape, e.g. `USER_JSON` or `NEW_USER_JSON`.
    pub fn fixture_const(shape: &str) -> String {
        format!("{}_JSON", shape.to_shouty_snake_case())
    }

    /// Name of the fixture loader for a shape, e.g. `load_user_json`.
    pub fn fixture_loader(shape: &str) -> String {
        format!("load_{}_json", shape.to_snake_case())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_struct() {
        let names = AccessorNames::for_struct("User");
        assert_eq!(names.snake, "user");
        assert_eq!(names.api_dir, "user_db");
        assert_eq!(names.func_dir, "user_mgo");
        assert_eq!(names.accessor, "UserDb");
        assert_eq!(names.backend, "UserDbBackend");
        assert_eq!(names.test_collection, "user_test_collection");
    }

    #[test]
    fn test_compound_struct() {
        let names = AccessorNames::for_struct("BillingAccount");
        assert_eq!(names.api_dir, "billing_account_db");
        assert_eq!(names.accessor, "BillingAccountDb");
        assert_eq!(names.backend, "BillingAccountDbBackend");
    }

    #[test]
    fn test_fixture_names() {
        assert_eq!(AccessorNames::fixture_const("NewUser"), "NEW_USER_JSON");
        assert_eq!(AccessorNames::fixture_loader("NewUser"), "load_new_user_json");
    }
}

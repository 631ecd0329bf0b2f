//! Bundled service groups.
//!
//! Each group is a plain type implementing
//! [`ServiceGroup`](crate::domains::operations::ServiceGroup); it becomes
//! loadable once registered in a [`GroupCatalog`].

pub mod data_processor;
pub mod example;
pub mod math;
pub mod schema;
pub mod stats;
pub mod timeout;

pub use data_processor::DataProcessorGroup;
pub use example::ExampleGroup;
pub use math::MathGroup;
pub use schema::SchemaGroup;
pub use stats::StatsGroup;
pub use timeout::TimeoutGroup;

use crate::domains::operations::GroupCatalog;

/// Catalog with every bundled group registered.
pub fn builtin_catalog() -> GroupCatalog {
    GroupCatalog::new()
        .with::<ExampleGroup>()
        .with::<TimeoutGroup>()
        .with::<SchemaGroup>()
        .with::<MathGroup>()
        .with::<StatsGroup>()
        .with::<DataProcessorGroup>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let catalog = builtin_catalog();
        let kinds: Vec<_> = catalog.kinds().collect();
        assert_eq!(
            kinds,
            vec!["example", "timeout", "schema", "math", "stats", "data-processor"]
        );
    }

    #[test]
    fn test_describe_lists_operations() {
        let catalog = builtin_catalog();
        let math = catalog.describe("math").unwrap();
        let names: Vec<_> = math.operations.iter().map(|op| op.name()).collect();
        assert_eq!(names, vec!["add", "subtract", "multiply", "divide", "power"]);
        assert!(math.settings_schema.get("properties").is_some());
        assert!(catalog.describe("weather").is_none());
    }
}

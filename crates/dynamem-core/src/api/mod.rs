//! Public API: engine handle, table orchestrator, conditions, and query plans.

pub mod builders;
pub mod condition;
pub mod engine;
pub mod projection;
pub mod query;
pub mod table;

pub use builders::TableBuilder;
pub use condition::{Condition, ConditionSet, Operator, Predicate};
pub use engine::Engine;
pub use query::{PageToken, QueryPlan, QueryResult, QueryStage};
pub use table::Table;

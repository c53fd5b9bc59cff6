//! Common re-exports for convenient entity usage.

pub use super::activity::{
    ActiveModel as ActivityActiveModel, Authors, Column as ActivityColumn, Entity as Activity,
    Model as ActivityModel,
};
pub use super::top_repository::{
    ActiveModel as TopRepositoryActiveModel, Column as TopRepositoryColumn,
    Entity as TopRepository, Model as TopRepositoryModel,
};

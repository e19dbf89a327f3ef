pub use std::{collections::HashMap, sync::Arc, time::Duration};

pub use anyhow::Context;
pub use chrono::{NaiveDateTime as DateTime, TimeDelta, Utc};
pub use migration::MigratorTrait;
pub use sea_orm::{
  ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition,
  ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
  QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
pub use tracing::{debug, error, info, trace, warn};

pub use crate::{
  config::Config,
  error::{Error, ErrorKind, Result},
};

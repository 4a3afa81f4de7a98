// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod bulk;
pub mod columns;
pub mod debounce;
pub mod fetch;
pub mod ids;
pub mod model;
pub mod query;
pub mod selection;
pub mod state;

pub use bulk::*;
pub use columns::*;
pub use debounce::*;
pub use fetch::*;
pub use ids::*;
pub use model::*;
pub use query::*;
pub use selection::*;
pub use state::*;

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod compare;
pub mod fence;
pub mod forms;
pub mod ids;
pub mod model;
pub mod normalize;
pub mod paging;
pub mod query;
pub mod selection;
pub mod session;
pub mod state;

pub use compare::*;
pub use fence::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use normalize::*;
pub use paging::*;
pub use query::*;
pub use selection::*;
pub use session::*;
pub use state::*;

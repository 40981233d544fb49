#![allow(dead_code)]

pub use dirwatch_test_utils::builders;
pub use dirwatch_test_utils::{init_tracing, with_timeout};

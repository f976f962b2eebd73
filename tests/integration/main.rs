#![allow(clippy::expect_used)]

mod support;

mod history_test;
mod pipeline_test;
mod rules_test;

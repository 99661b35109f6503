mod common;
mod info_tests;
mod plan_tests;
mod run_tests;
mod tasks_tests;

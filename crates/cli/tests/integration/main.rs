mod common;
mod gen_tests;
mod plan_tests;
mod run_tests;

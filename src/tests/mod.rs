mod fakes;
mod submission_tests;

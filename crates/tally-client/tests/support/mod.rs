pub mod tally_testkit;

pub mod filter_input;

pub mod scangate;

pub mod harvest;

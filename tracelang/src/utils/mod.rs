pub mod sexp;

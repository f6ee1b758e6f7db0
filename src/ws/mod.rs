pub mod broadcast;
pub mod connctx;
pub mod presence;

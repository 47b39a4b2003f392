pub mod chain_invoker;
pub mod unit_ctx;

pub use chain_invoker::ChainInvoker;
pub use unit_ctx::UnitCtx;

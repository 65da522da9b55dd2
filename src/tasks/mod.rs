pub(crate) mod retention;
pub(crate) mod scheduler;
